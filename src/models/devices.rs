use indexmap::IndexMap;
use serde::Serialize;

use crate::error::SyncError;

/// SNMP protocol version accepted by Cacti
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnmpVersion {
    V1,
    V2,
    V3,
}

impl SnmpVersion {
    pub fn as_i32(self) -> i32 {
        match self {
            SnmpVersion::V1 => 1,
            SnmpVersion::V2 => 2,
            SnmpVersion::V3 => 3,
        }
    }

    /// Parse a version field; only the exact values 1, 2 and 3 are accepted
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        match raw {
            "1" => Ok(SnmpVersion::V1),
            "2" => Ok(SnmpVersion::V2),
            "3" => Ok(SnmpVersion::V3),
            other => Err(SyncError::InvalidSnmpVersion(other.to_string())),
        }
    }

    pub fn from_i64(v: i64) -> Result<Self, SyncError> {
        Self::parse(&v.to_string())
    }
}

impl std::fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Parse a disable flag; only "0" and "1" are accepted. Returns true when disabled.
pub fn parse_disable_flag(raw: &str) -> Result<bool, SyncError> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(SyncError::InvalidEnableFlag(other.to_string())),
    }
}

/// DeviceRecord is one source-side device, consumed once per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub external_id: String,
    pub description: String,
    pub address: String,
    pub template_id: i64,
    pub group: String,
    pub disabled: bool,
    pub snmp_version: SnmpVersion,
    pub community: String,
}

/// Records grouped by group name, then by description, both in first-seen order
#[derive(Debug, Default)]
pub struct DeviceGroups {
    groups: IndexMap<String, IndexMap<String, DeviceRecord>>,
}

impl DeviceGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A later record with the same description in the same
    /// group replaces the earlier one but keeps its position.
    pub fn insert(&mut self, record: DeviceRecord) {
        let hosts = self.groups.entry(record.group.clone()).or_default();
        if let Some(previous) = hosts.insert(record.description.clone(), record) {
            tracing::warn!(
                "{}: duplicate description in group {}, replacing record {}",
                previous.description,
                previous.group,
                previous.external_id
            );
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, indexmap::map::Values<'_, String, DeviceRecord>)> {
        self.groups
            .iter()
            .map(|(group, hosts)| (group.as_str(), hosts.values()))
    }

    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.groups.values().flat_map(|hosts| hosts.values())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<DeviceRecord> for DeviceGroups {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        let mut groups = DeviceGroups::new();
        for record in iter {
            groups.insert(record);
        }
        groups
    }
}
