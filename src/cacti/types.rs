use crate::config::DeviceDefaults;

// --- Cacti state types ---

#[derive(Debug, Clone, PartialEq)]
pub struct CactiHost {
    pub id: i64,
    pub host_template_id: i64,
    pub description: String,
    /// Management address (IP or DNS name)
    pub hostname: String,
    pub notes: String,
    pub snmp_community: String,
    pub snmp_version: i32,
    pub disabled: bool,
    pub defaults: DeviceDefaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub id: i64,
    pub parent: i64,
    pub title: String,
    pub host_id: i64,
    pub local_graph_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostGraph {
    pub id: i64,
    pub graph_template_id: i64,
    pub snmp_query_id: i64,
    pub snmp_index: String,
}

// --- Save request types ---

/// Full attribute set for a host upsert. `id == 0` creates a new host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSave {
    pub id: i64,
    pub host_template_id: i64,
    pub description: String,
    pub hostname: String,
    pub notes: String,
    pub snmp_community: String,
    pub snmp_version: i32,
    pub disabled: bool,
    pub defaults: DeviceDefaults,
}

impl HostSave {
    /// Cacti stores the disabled flag as 'on' or ''
    pub fn disabled_flag(&self) -> &'static str {
        if self.disabled {
            "on"
        } else {
            ""
        }
    }

    /// True when saving would leave `existing` unchanged
    pub fn matches(&self, existing: &CactiHost) -> bool {
        self.id == existing.id
            && self.host_template_id == existing.host_template_id
            && self.description == existing.description
            && self.hostname == existing.hostname
            && self.notes == existing.notes
            && self.snmp_community == existing.snmp_community
            && self.snmp_version == existing.snmp_version
            && self.disabled == existing.disabled
            && self.defaults == existing.defaults
    }

    /// The host as Cacti holds it after this save assigned `id`
    pub fn into_host(self, id: i64) -> CactiHost {
        CactiHost {
            id,
            host_template_id: self.host_template_id,
            description: self.description,
            hostname: self.hostname,
            notes: self.notes,
            snmp_community: self.snmp_community,
            snmp_version: self.snmp_version,
            disabled: self.disabled,
            defaults: self.defaults,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItemKind {
    Header { title: String },
    Host { host_id: i64 },
}

/// Tree node upsert. `id == 0` creates a new node; `parent == 0` is the tree root.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItemSave {
    pub id: i64,
    pub tree_id: i64,
    pub parent: i64,
    pub kind: TreeItemKind,
    pub host_grouping_type: i32,
}

impl TreeItemSave {
    pub fn title(&self) -> &str {
        match &self.kind {
            TreeItemKind::Header { title } => title,
            TreeItemKind::Host { .. } => "",
        }
    }

    pub fn host_id(&self) -> i64 {
        match self.kind {
            TreeItemKind::Header { .. } => 0,
            TreeItemKind::Host { host_id } => host_id,
        }
    }
}

/// The data query row a ds graph is built for
#[derive(Debug, Clone, PartialEq)]
pub struct SnmpGraphTarget {
    pub snmp_query_id: i64,
    pub query_type_id: i64,
    pub snmp_index: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphCreate {
    pub host_id: i64,
    pub graph_template_id: i64,
    /// None for host-level (cg) graphs
    pub snmp: Option<SnmpGraphTarget>,
}
