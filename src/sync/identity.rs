use anyhow::Result;
use regex_lite::Regex;
use std::collections::HashMap;

use crate::cacti::CactiHost;
use crate::models::DeviceRecord;

/// The `key:<id>` annotation that ties a Cacti host to its source record.
/// Stored in the host notes so renames and re-addressing keep the association.
pub struct Annotation {
    key: String,
    pattern: Regex,
}

impl Annotation {
    pub fn new(key: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(?:^|\s){}:(\S+)", regex_lite::escape(key)))?;
        Ok(Self { key: key.to_string(), pattern })
    }

    pub fn format(&self, external_id: &str) -> String {
        format!("{}:{}", self.key, external_id)
    }

    pub fn parse<'n>(&self, notes: &'n str) -> Option<&'n str> {
        self.pattern.captures(notes).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    StableId,
    Description,
}

/// Outcome of looking a record up in Cacti
#[derive(Debug, PartialEq)]
pub enum HostMatch<'a> {
    Matched { host: &'a CactiHost, by: MatchKey },
    /// Only the management address matched, and it belongs to another host
    Conflict(&'a CactiHost),
    NotFound,
}

/// Lookup indices over the Cacti hosts: by stable id, description and address
pub struct HostIndex {
    hosts: HashMap<i64, CactiHost>,
    by_stable_id: HashMap<String, i64>,
    by_description: HashMap<String, i64>,
    by_address: HashMap<String, i64>,
}

impl HostIndex {
    /// Build the indices. When several hosts share a key, the lowest id wins.
    pub fn build(mut hosts: Vec<CactiHost>, annotation: &Annotation) -> Self {
        hosts.sort_by_key(|h| h.id);
        let mut index = Self {
            hosts: HashMap::with_capacity(hosts.len()),
            by_stable_id: HashMap::new(),
            by_description: HashMap::new(),
            by_address: HashMap::new(),
        };
        for host in hosts {
            if let Some(stable_id) = annotation.parse(&host.notes) {
                index.by_stable_id.entry(stable_id.to_string()).or_insert(host.id);
            }
            if !host.description.is_empty() {
                index.by_description.entry(host.description.clone()).or_insert(host.id);
            }
            if !host.hostname.is_empty() {
                index.by_address.entry(host.hostname.clone()).or_insert(host.id);
            }
            index.hosts.insert(host.id, host);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    fn get(&self, map: &HashMap<String, i64>, key: &str) -> Option<&CactiHost> {
        map.get(key).and_then(|id| self.hosts.get(id))
    }

    /// Stable id first, then description. An address that is already taken is a conflict.
    pub fn resolve_host(&self, record: &DeviceRecord) -> HostMatch<'_> {
        if let Some(host) = self.get(&self.by_stable_id, &record.external_id) {
            return HostMatch::Matched { host, by: MatchKey::StableId };
        }
        if let Some(host) = self.get(&self.by_description, &record.description) {
            return HostMatch::Matched { host, by: MatchKey::Description };
        }
        if let Some(host) = self.get(&self.by_address, &record.address) {
            return HostMatch::Conflict(host);
        }
        HostMatch::NotFound
    }

    /// Record a host saved during this run so later records see it. Keys the host
    /// held before the save no longer resolve to it.
    pub fn upsert(&mut self, host: CactiHost, annotation: &Annotation) {
        if let Some(previous) = self.hosts.get(&host.id) {
            if let Some(stable_id) = annotation.parse(&previous.notes) {
                if self.by_stable_id.get(stable_id) == Some(&host.id) {
                    self.by_stable_id.remove(stable_id);
                }
            }
            if self.by_description.get(&previous.description) == Some(&host.id) {
                self.by_description.remove(&previous.description);
            }
            if self.by_address.get(&previous.hostname) == Some(&host.id) {
                self.by_address.remove(&previous.hostname);
            }
        }
        if let Some(stable_id) = annotation.parse(&host.notes) {
            self.by_stable_id.insert(stable_id.to_string(), host.id);
        }
        self.by_description.insert(host.description.clone(), host.id);
        self.by_address.insert(host.hostname.clone(), host.id);
        self.hosts.insert(host.id, host);
    }
}
