use indexmap::IndexMap;
use std::collections::HashMap;

use crate::cacti::TreeItem;

/// Existing group headers and host leaves of the managed tree.
///
/// Nodes are taken out as the sync claims them; whatever is left at the end is stale.
#[derive(Debug, Default)]
pub struct TreeIndex {
    headers: IndexMap<String, i64>,
    /// host id → (item id, parent)
    leaves: IndexMap<i64, (i64, i64)>,
    /// Second and later nodes for the same header title or host
    duplicates: Vec<StaleNode>,
    /// Leaves already placed during this run
    placed: HashMap<i64, (i64, i64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleNode {
    Leaf(i64),
    Header(i64),
}

impl StaleNode {
    pub fn id(&self) -> i64 {
        match self {
            StaleNode::Leaf(id) | StaleNode::Header(id) => *id,
        }
    }
}

impl TreeIndex {
    /// Graph nodes are ignored. The first node wins for a repeated title or host.
    pub fn build(mut items: Vec<TreeItem>) -> Self {
        items.sort_by_key(|i| i.id);
        let mut index = Self::default();
        for item in items {
            if item.local_graph_id != 0 {
                continue;
            }
            if item.host_id != 0 {
                if index.leaves.contains_key(&item.host_id) {
                    index.duplicates.push(StaleNode::Leaf(item.id));
                } else {
                    index.leaves.insert(item.host_id, (item.id, item.parent));
                }
            } else if !item.title.is_empty() {
                if index.headers.contains_key(&item.title) {
                    index.duplicates.push(StaleNode::Header(item.id));
                } else {
                    index.headers.insert(item.title, item.id);
                }
            }
        }
        index
    }

    pub fn take_header(&mut self, title: &str) -> Option<i64> {
        self.headers.shift_remove(title)
    }

    /// Returns (item id, parent) of the host's leaf, including one placed earlier in this run
    pub fn take_leaf(&mut self, host_id: i64) -> Option<(i64, i64)> {
        self.leaves
            .shift_remove(&host_id)
            .or_else(|| self.placed.get(&host_id).copied())
    }

    pub fn place_leaf(&mut self, host_id: i64, item_id: i64, parent: i64) {
        self.placed.insert(host_id, (item_id, parent));
    }

    /// Unclaimed nodes, leaves before headers so no header is removed under a live leaf
    pub fn into_stale(self) -> Vec<StaleNode> {
        let (dup_leaves, dup_headers): (Vec<StaleNode>, Vec<StaleNode>) = self
            .duplicates
            .into_iter()
            .partition(|n| matches!(n, StaleNode::Leaf(_)));
        self.leaves
            .values()
            .map(|(id, _)| StaleNode::Leaf(*id))
            .chain(dup_leaves)
            .chain(self.headers.values().map(|id| StaleNode::Header(*id)))
            .chain(dup_headers)
            .collect()
    }
}
