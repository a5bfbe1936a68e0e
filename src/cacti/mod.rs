pub mod cli;
pub mod client;
#[cfg(test)]
pub mod memory;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::SnmpFilter;

pub use client::CactiClient;
pub use types::*;

/// The Cacti operations the reconciler depends on
#[async_trait]
pub trait CactiApi: Send + Sync {
    // --- Reads ---

    /// Host template id → name
    async fn host_templates(&self) -> Result<HashMap<i64, String>>;

    async fn list_hosts(&self) -> Result<Vec<CactiHost>>;

    /// Id of the graph tree with this name, creating it (alphabetic sort) when missing
    async fn find_or_create_tree(&self, name: &str) -> Result<i64>;

    async fn list_tree_items(&self, tree_id: i64) -> Result<Vec<TreeItem>>;

    /// Data queries associated with a host
    async fn host_data_queries(&self, host_id: i64) -> Result<Vec<i64>>;

    /// Cached SNMP indexes for a host's data query
    async fn snmp_indexes(
        &self,
        host_id: i64,
        snmp_query_id: i64,
        filter: Option<&SnmpFilter>,
    ) -> Result<Vec<String>>;

    async fn host_graphs(&self, host_id: i64) -> Result<Vec<HostGraph>>;

    // --- Writes ---

    /// Create (`id == 0`) or update a host; returns its id
    async fn save_host(&self, host: &HostSave) -> Result<i64>;

    /// Create (`id == 0`) or update a tree node; returns its id
    async fn save_tree_item(&self, item: &TreeItemSave) -> Result<i64>;

    async fn delete_tree_item(&self, id: i64) -> Result<()>;

    async fn add_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()>;

    /// Re-run a data query so the SNMP cache reflects the device
    async fn run_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()>;

    /// Create a graph from a template; returns the new graph id
    async fn create_graph(&self, req: &GraphCreate) -> Result<i64>;

    /// Rebuild the poller cache for a host after its graphs changed
    async fn push_out_host(&self, host_id: i64) -> Result<()>;
}
