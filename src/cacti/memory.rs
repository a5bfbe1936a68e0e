use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::config::SnmpFilter;

use super::types::*;
use super::CactiApi;

/// Every write the reconciler made, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    HostCreated(i64),
    HostUpdated(i64),
    TreeItemCreated(i64),
    TreeItemUpdated(i64),
    TreeItemDeleted(i64),
    DataQueryAdded { host_id: i64, snmp_query_id: i64 },
    DataQueryRun { host_id: i64, snmp_query_id: i64 },
    GraphCreated(i64),
    PushedOut(i64),
}

impl Mutation {
    /// Everything except data query re-runs, which refresh the SNMP cache on every run
    pub fn is_change(&self) -> bool {
        !matches!(self, Mutation::DataQueryRun { .. })
    }
}

#[derive(Debug, Clone)]
pub struct StoredTreeItem {
    pub tree_id: i64,
    pub item: TreeItem,
}

/// One row of a data query as the device would report it: index → field values
type SnmpRows = Vec<(String, Vec<(String, String)>)>;

#[derive(Default)]
struct State {
    next_id: i64,
    templates: HashMap<i64, String>,
    hosts: BTreeMap<i64, HostSave>,
    trees: HashMap<String, i64>,
    tree_items: BTreeMap<i64, StoredTreeItem>,
    host_queries: Vec<(i64, i64)>,
    device_rows: HashMap<i64, SnmpRows>,
    snmp_cache: HashMap<(i64, i64), SnmpRows>,
    graphs: Vec<(i64, HostGraph)>,
    mutations: Vec<Mutation>,
    fail_host_saves: HashSet<String>,
    fail_data_queries: HashSet<i64>,
    fail_graph_templates: HashSet<i64>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory Cacti used by reconciler tests
#[derive(Default)]
pub struct MemoryCacti {
    state: Mutex<State>,
}

impl MemoryCacti {
    pub fn new(template_ids: &[i64]) -> Self {
        let cacti = Self::default();
        {
            let mut s = cacti.lock();
            for id in template_ids {
                s.templates.insert(*id, format!("Template {}", id));
            }
        }
        cacti
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an existing host without recording a mutation
    pub fn seed_host(&self, description: &str, hostname: &str, notes: &str) -> i64 {
        let mut s = self.lock();
        let id = s.next_id();
        s.hosts.insert(
            id,
            HostSave {
                id,
                host_template_id: 1,
                description: description.to_string(),
                hostname: hostname.to_string(),
                notes: notes.to_string(),
                snmp_community: "public".to_string(),
                snmp_version: 2,
                disabled: false,
                defaults: Default::default(),
            },
        );
        id
    }

    /// Seed an existing tree node without recording a mutation
    pub fn seed_tree_item(&self, tree_name: &str, parent: i64, title: &str, host_id: i64) -> i64 {
        let mut s = self.lock();
        let tree_id = match s.trees.get(tree_name) {
            Some(id) => *id,
            None => {
                let id = s.next_id();
                s.trees.insert(tree_name.to_string(), id);
                id
            }
        };
        let id = s.next_id();
        s.tree_items.insert(
            id,
            StoredTreeItem {
                tree_id,
                item: TreeItem { id, parent, title: title.to_string(), host_id, local_graph_id: 0 },
            },
        );
        id
    }

    /// Rows every host reports for this data query once it is run
    pub fn set_device_rows(&self, snmp_query_id: i64, rows: &[(&str, &[(&str, &str)])]) {
        let rows = rows
            .iter()
            .map(|(index, fields)| {
                (
                    index.to_string(),
                    fields.iter().map(|(f, v)| (f.to_string(), v.to_string())).collect(),
                )
            })
            .collect();
        self.lock().device_rows.insert(snmp_query_id, rows);
    }

    pub fn fail_host_save(&self, description: &str) {
        self.lock().fail_host_saves.insert(description.to_string());
    }

    pub fn fail_data_query(&self, snmp_query_id: i64) {
        self.lock().fail_data_queries.insert(snmp_query_id);
    }

    pub fn fail_graph_template(&self, graph_template_id: i64) {
        self.lock().fail_graph_templates.insert(graph_template_id);
    }

    pub fn host(&self, id: i64) -> Option<HostSave> {
        self.lock().hosts.get(&id).cloned()
    }

    pub fn hosts(&self) -> Vec<HostSave> {
        self.lock().hosts.values().cloned().collect()
    }

    pub fn tree_items(&self) -> Vec<TreeItem> {
        self.lock().tree_items.values().map(|t| t.item.clone()).collect()
    }

    pub fn header(&self, title: &str) -> Option<TreeItem> {
        self.tree_items().into_iter().find(|t| t.host_id == 0 && t.title == title)
    }

    pub fn leaf(&self, host_id: i64) -> Option<TreeItem> {
        self.tree_items().into_iter().find(|t| t.host_id == host_id)
    }

    pub fn graphs(&self, host_id: i64) -> Vec<HostGraph> {
        self.lock()
            .graphs
            .iter()
            .filter(|(h, _)| *h == host_id)
            .map(|(_, g)| g.clone())
            .collect()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.lock().mutations)
    }
}

#[async_trait]
impl CactiApi for MemoryCacti {
    async fn host_templates(&self) -> Result<HashMap<i64, String>> {
        Ok(self.lock().templates.clone())
    }

    async fn list_hosts(&self) -> Result<Vec<CactiHost>> {
        Ok(self
            .lock()
            .hosts
            .values()
            .map(|h| CactiHost {
                id: h.id,
                host_template_id: h.host_template_id,
                description: h.description.clone(),
                hostname: h.hostname.clone(),
                notes: h.notes.clone(),
                snmp_community: h.snmp_community.clone(),
                snmp_version: h.snmp_version,
                disabled: h.disabled,
                defaults: h.defaults.clone(),
            })
            .collect())
    }

    async fn find_or_create_tree(&self, name: &str) -> Result<i64> {
        let mut s = self.lock();
        if let Some(id) = s.trees.get(name) {
            return Ok(*id);
        }
        let id = s.next_id();
        s.trees.insert(name.to_string(), id);
        Ok(id)
    }

    async fn list_tree_items(&self, tree_id: i64) -> Result<Vec<TreeItem>> {
        Ok(self
            .lock()
            .tree_items
            .values()
            .filter(|t| t.tree_id == tree_id)
            .map(|t| t.item.clone())
            .collect())
    }

    async fn host_data_queries(&self, host_id: i64) -> Result<Vec<i64>> {
        Ok(self
            .lock()
            .host_queries
            .iter()
            .filter(|(h, _)| *h == host_id)
            .map(|(_, q)| *q)
            .collect())
    }

    async fn snmp_indexes(
        &self,
        host_id: i64,
        snmp_query_id: i64,
        filter: Option<&SnmpFilter>,
    ) -> Result<Vec<String>> {
        let s = self.lock();
        let rows = s.snmp_cache.get(&(host_id, snmp_query_id)).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|(_, fields)| match filter {
                None => true,
                Some(f) => fields.iter().any(|(name, value)| *name == f.field && *value == f.value),
            })
            .map(|(index, _)| index)
            .collect())
    }

    async fn host_graphs(&self, host_id: i64) -> Result<Vec<HostGraph>> {
        Ok(self.graphs(host_id))
    }

    async fn save_host(&self, host: &HostSave) -> Result<i64> {
        let mut s = self.lock();
        if s.fail_host_saves.contains(&host.description) {
            return Err(anyhow::anyhow!("simulated save failure"));
        }
        let mut saved = host.clone();
        if host.id == 0 {
            saved.id = s.next_id();
            s.mutations.push(Mutation::HostCreated(saved.id));
        } else {
            if !s.hosts.contains_key(&host.id) {
                return Err(anyhow::anyhow!("no host with id {}", host.id));
            }
            s.mutations.push(Mutation::HostUpdated(host.id));
        }
        let id = saved.id;
        s.hosts.insert(id, saved);
        Ok(id)
    }

    async fn save_tree_item(&self, item: &TreeItemSave) -> Result<i64> {
        let mut s = self.lock();
        let id = if item.id == 0 {
            let id = s.next_id();
            s.mutations.push(Mutation::TreeItemCreated(id));
            id
        } else {
            if !s.tree_items.contains_key(&item.id) {
                return Err(anyhow::anyhow!("no tree item with id {}", item.id));
            }
            s.mutations.push(Mutation::TreeItemUpdated(item.id));
            item.id
        };
        s.tree_items.insert(
            id,
            StoredTreeItem {
                tree_id: item.tree_id,
                item: TreeItem {
                    id,
                    parent: item.parent,
                    title: item.title().to_string(),
                    host_id: item.host_id(),
                    local_graph_id: 0,
                },
            },
        );
        Ok(id)
    }

    async fn delete_tree_item(&self, id: i64) -> Result<()> {
        let mut s = self.lock();
        s.tree_items.remove(&id);
        s.mutations.push(Mutation::TreeItemDeleted(id));
        Ok(())
    }

    async fn add_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()> {
        let mut s = self.lock();
        if s.fail_data_queries.contains(&snmp_query_id) {
            return Err(anyhow::anyhow!("simulated data query failure"));
        }
        if !s.host_queries.contains(&(host_id, snmp_query_id)) {
            s.host_queries.push((host_id, snmp_query_id));
        }
        s.mutations.push(Mutation::DataQueryAdded { host_id, snmp_query_id });
        Ok(())
    }

    async fn run_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()> {
        let mut s = self.lock();
        let rows = s.device_rows.get(&snmp_query_id).cloned().unwrap_or_default();
        s.snmp_cache.insert((host_id, snmp_query_id), rows);
        s.mutations.push(Mutation::DataQueryRun { host_id, snmp_query_id });
        Ok(())
    }

    async fn create_graph(&self, req: &GraphCreate) -> Result<i64> {
        let mut s = self.lock();
        if s.fail_graph_templates.contains(&req.graph_template_id) {
            return Err(anyhow::anyhow!("simulated graph failure"));
        }
        let id = s.next_id();
        let (snmp_query_id, snmp_index) = match &req.snmp {
            Some(t) => (t.snmp_query_id, t.snmp_index.clone()),
            None => (0, String::new()),
        };
        s.graphs.push((
            req.host_id,
            HostGraph { id, graph_template_id: req.graph_template_id, snmp_query_id, snmp_index },
        ));
        s.mutations.push(Mutation::GraphCreated(id));
        Ok(id)
    }

    async fn push_out_host(&self, host_id: i64) -> Result<()> {
        self.lock().mutations.push(Mutation::PushedOut(host_id));
        Ok(())
    }
}
