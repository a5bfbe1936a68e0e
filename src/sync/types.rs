use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: SyncCounts,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncCounts {
    pub hosts_created: i32,
    pub hosts_updated: i32,
    pub hosts_unchanged: i32,
    /// Conflicts and disabled devices not yet in Cacti
    pub hosts_skipped: i32,
    pub headers_created: i32,
    pub leaves_created: i32,
    pub leaves_moved: i32,
    pub graphs_created: i32,
    pub nodes_deleted: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn new(started_at: DateTime<Utc>, result: SyncCounts) -> Self {
        let finished_at = Utc::now();
        let message = format!(
            "Synced {} hosts ({} created, {} updated, {} skipped), {} graphs created, {} stale nodes removed in {}ms",
            result.hosts_created + result.hosts_updated + result.hosts_unchanged,
            result.hosts_created,
            result.hosts_updated,
            result.hosts_skipped,
            result.graphs_created,
            result.nodes_deleted,
            (finished_at - started_at).num_milliseconds(),
        );
        Self { message, started_at, finished_at, result }
    }
}
