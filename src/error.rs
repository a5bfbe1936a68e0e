use thiserror::Error;

/// Fatal validation failures. Any of these aborts the whole run with exit code 1.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown template id ({0})")]
    UnknownTemplate(i64),

    #[error("Malformed template id ({0})")]
    MalformedTemplateId(String),

    #[error("Invalid snmp version ({0})")]
    InvalidSnmpVersion(String),

    #[error("Invalid enable flag: {0}")]
    InvalidEnableFlag(String),

    #[error("expected {expected} ';'-separated fields, found {found}")]
    MalformedLine {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{description}: Failed device save: {reason}")]
    HostSaveFailed { description: String, reason: String },

    #[error("--file=<path> is required when SYNC_SOURCE=file")]
    MissingFileArgument,
}
