mod graphs;
mod identity;
mod tree;
mod types;

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;

use crate::cacti::{CactiApi, CactiHost, HostSave, TreeItemKind, TreeItemSave};
use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::models::{DeviceGroups, DeviceRecord};

use identity::{Annotation, HostIndex, HostMatch};
use tree::{StaleNode, TreeIndex};
use types::SyncCounts;
pub use types::SyncResult;

/// Single-pass reconciler: makes the Cacti tree, hosts and graphs mirror the device groups
pub struct Reconciler<'a, C: CactiApi + ?Sized> {
    cacti: &'a C,
    settings: &'a SyncSettings,
    graphs: bool,
}

/// Working state for one run
struct RunState {
    annotation: Annotation,
    hosts: HostIndex,
    tree: TreeIndex,
    tree_id: i64,
    /// Cacti hosts saved so far, to catch two records landing on one host
    touched: HashSet<i64>,
    counts: SyncCounts,
}

impl<'a, C: CactiApi + ?Sized> Reconciler<'a, C> {
    pub fn new(cacti: &'a C, settings: &'a SyncSettings) -> Self {
        Self { cacti, settings, graphs: true }
    }

    pub fn with_graphs(mut self, graphs: bool) -> Self {
        self.graphs = graphs;
        self
    }

    pub async fn run(&self, groups: &DeviceGroups) -> Result<SyncResult> {
        let started_at = Utc::now();

        let templates = self.cacti.host_templates().await.context("Failed to read host templates")?;
        for record in groups.records() {
            if !templates.contains_key(&record.template_id) {
                tracing::error!("{}: Unknown template id ({})", record.description, record.template_id);
                return Err(SyncError::UnknownTemplate(record.template_id).into());
            }
        }

        let annotation = Annotation::new(&self.settings.annotation_key)?;
        let hosts = self.cacti.list_hosts().await.context("Failed to read hosts")?;
        let hosts = HostIndex::build(hosts, &annotation);
        let tree_id = self
            .cacti
            .find_or_create_tree(&self.settings.tree_name)
            .await
            .with_context(|| format!("Failed to open tree {}", self.settings.tree_name))?;
        let items = self.cacti.list_tree_items(tree_id).await.context("Failed to read tree items")?;
        tracing::debug!(
            "Loaded {} hosts and {} tree items from tree {} ({})",
            hosts.len(),
            items.len(),
            self.settings.tree_name,
            tree_id
        );

        let mut state = RunState {
            annotation,
            hosts,
            tree: TreeIndex::build(items),
            tree_id,
            touched: HashSet::new(),
            counts: SyncCounts::default(),
        };

        for (group, records) in groups.iter() {
            // Existing headers are claimed up front; new ones are created on first use
            let mut header = state.tree.take_header(group);
            if let Some(id) = header {
                tracing::debug!("{}: Header exists: ({})", group, id);
            }
            for record in records {
                self.sync_record(&mut state, group, &mut header, record).await?;
            }
        }

        self.remove_stale(&mut state).await?;

        Ok(SyncResult::new(started_at, state.counts))
    }

    async fn ensure_header(&self, state: &mut RunState, group: &str, header: &mut Option<i64>) -> Result<i64> {
        if let Some(id) = *header {
            return Ok(id);
        }
        let item = TreeItemSave {
            id: 0,
            tree_id: state.tree_id,
            parent: 0,
            kind: TreeItemKind::Header { title: group.to_string() },
            host_grouping_type: self.settings.host_grouping_type,
        };
        let id = self
            .cacti
            .save_tree_item(&item)
            .await
            .with_context(|| format!("{}: Failed to add header", group))?;
        tracing::info!("{}: Added Header id: ({})", group, id);
        state.counts.headers_created += 1;
        *header = Some(id);
        Ok(id)
    }

    async fn sync_record(
        &self,
        state: &mut RunState,
        group: &str,
        header: &mut Option<i64>,
        record: &DeviceRecord,
    ) -> Result<()> {
        let existing: Option<CactiHost> = match state.hosts.resolve_host(record) {
            HostMatch::Matched { host, by } => {
                tracing::debug!("{}: Matched host {} by {:?}", record.description, host.id, by);
                Some(host.clone())
            }
            HostMatch::Conflict(host) => {
                let msg = format!(
                    "{}: ERROR: This IP already exists in the database ({}) device-id: {} ({})",
                    record.description, record.address, host.id, host.description
                );
                tracing::error!("{}", msg);
                state.counts.hosts_skipped += 1;
                state.counts.errors.push(msg);
                return Ok(());
            }
            HostMatch::NotFound => None,
        };

        if existing.is_none() && record.disabled {
            tracing::warn!("{}: Skipping disabled device not present in Cacti", record.description);
            state.counts.hosts_skipped += 1;
            return Ok(());
        }

        let save = HostSave {
            id: existing.as_ref().map_or(0, |h| h.id),
            host_template_id: record.template_id,
            description: record.description.clone(),
            hostname: record.address.clone(),
            notes: state.annotation.format(&record.external_id),
            snmp_community: record.community.clone(),
            snmp_version: record.snmp_version.as_i32(),
            disabled: record.disabled,
            defaults: self.settings.device.clone(),
        };

        let host_id = match &existing {
            Some(host) if save.matches(host) => {
                tracing::debug!("{}: Device already exists: {}", record.description, host.id);
                state.counts.hosts_unchanged += 1;
                host.id
            }
            _ => {
                let updating = existing.is_some();
                if updating {
                    tracing::info!("{}: Updating device ({})", record.description, record.address);
                } else {
                    tracing::info!("{}: Adding device ({})", record.description, record.address);
                }
                let id = self.cacti.save_host(&save).await.map_err(|e| SyncError::HostSaveFailed {
                    description: record.description.clone(),
                    reason: format!("{:#}", e),
                })?;
                if updating {
                    // The poller keeps its own copy of host fields
                    self.cacti
                        .push_out_host(id)
                        .await
                        .with_context(|| format!("{}: Failed to push out host {}", record.description, id))?;
                    state.counts.hosts_updated += 1;
                } else {
                    tracing::info!("{}: Added device id: ({})", record.description, id);
                    state.counts.hosts_created += 1;
                }
                id
            }
        };

        if !state.touched.insert(host_id) {
            tracing::warn!(
                "{}: Cacti host {} was already synced from another record in this run, last record wins",
                record.description,
                host_id
            );
        }
        state.hosts.upsert(save.into_host(host_id), &state.annotation);

        let header_id = self.ensure_header(state, group, header).await?;
        self.place_leaf(state, record, host_id, header_id).await?;

        if self.graphs && !record.disabled {
            let outcome =
                graphs::reconcile_graphs(self.cacti, self.settings, host_id, &record.description, record.template_id)
                    .await
                    .with_context(|| format!("{}: Failed to reconcile graphs", record.description))?;
            state.counts.graphs_created += outcome.created;
            state.counts.errors.extend(outcome.errors);
        }
        Ok(())
    }

    async fn place_leaf(&self, state: &mut RunState, record: &DeviceRecord, host_id: i64, header_id: i64) -> Result<()> {
        let leaf = state.tree.take_leaf(host_id);
        if let Some((item_id, parent)) = leaf {
            if parent == header_id {
                tracing::debug!("{}: Host node exists: {}", record.description, item_id);
                state.tree.place_leaf(host_id, item_id, parent);
                return Ok(());
            }
        }

        let item = TreeItemSave {
            id: leaf.map_or(0, |(id, _)| id),
            tree_id: state.tree_id,
            parent: header_id,
            kind: TreeItemKind::Host { host_id },
            host_grouping_type: self.settings.host_grouping_type,
        };
        let item_id = self
            .cacti
            .save_tree_item(&item)
            .await
            .with_context(|| format!("{}: Failed to add host node", record.description))?;
        if leaf.is_some() {
            tracing::info!("{}: Moved host node {} to {}", record.description, item_id, record.group);
            state.counts.leaves_moved += 1;
        } else {
            tracing::info!("{}: Added host node: {}", record.description, item_id);
            state.counts.leaves_created += 1;
        }
        state.tree.place_leaf(host_id, item_id, header_id);
        Ok(())
    }

    async fn remove_stale(&self, state: &mut RunState) -> Result<()> {
        let tree = std::mem::take(&mut state.tree);
        for node in tree.into_stale() {
            self.cacti
                .delete_tree_item(node.id())
                .await
                .with_context(|| format!("Failed to delete tree item {}", node.id()))?;
            match node {
                StaleNode::Leaf(id) => tracing::info!("Removed stale host node: {}", id),
                StaleNode::Header(id) => tracing::info!("Removed stale header: {}", id),
            }
            state.counts.nodes_deleted += 1;
        }
        Ok(())
    }
}
