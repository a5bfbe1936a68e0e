use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which Netdot attribute becomes the tree group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSource {
    /// Owning organization (device.used_by)
    UsedBy,
    Site,
}

/// Pattern → host template id. Rules are tried in order, first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRule {
    pub pattern: String,
    pub template_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateRules {
    /// Matched against the product sysObjectID
    #[serde(default)]
    pub oid: Vec<TemplateRule>,
    /// Matched against the product name
    #[serde(default)]
    pub product: Vec<TemplateRule>,
    /// Matched against the manufacturer name
    #[serde(default)]
    pub manufacturer: Vec<TemplateRule>,
}

/// Host attributes that Netdot does not carry, applied to every saved host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    pub snmp_username: String,
    pub snmp_password: String,
    pub snmp_auth_protocol: String,
    pub snmp_priv_passphrase: String,
    pub snmp_priv_protocol: String,
    pub snmp_context: String,
    pub snmp_port: i32,
    pub snmp_timeout: i32,
    pub availability_method: i32,
    pub ping_method: i32,
    pub ping_port: i32,
    pub ping_timeout: i32,
    pub ping_retries: i32,
    pub max_oids: i32,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            snmp_username: String::new(),
            snmp_password: String::new(),
            snmp_auth_protocol: "MD5".to_string(),
            snmp_priv_passphrase: String::new(),
            snmp_priv_protocol: "DES".to_string(),
            snmp_context: String::new(),
            snmp_port: 161,
            snmp_timeout: 500,
            availability_method: 2,
            ping_method: 3,
            ping_port: 23,
            ping_timeout: 500,
            ping_retries: 2,
            max_oids: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wildcard {
    Any,
}

/// Host template selector for a graph spec: an exact id or "any"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateMatch {
    Id(i64),
    Wildcard(Wildcard),
}

impl TemplateMatch {
    pub fn matches(&self, template_id: i64) -> bool {
        match self {
            TemplateMatch::Id(id) => *id == template_id,
            TemplateMatch::Wildcard(Wildcard::Any) => true,
        }
    }
}

/// One data query graph type and the graph template used to render it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGraph {
    pub query_type_id: i64,
    pub graph_template_id: i64,
}

/// Restrict a data query to cache rows where `field` equals `value`
/// (e.g. ifOperStatus = Up)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpFilter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphKind {
    /// Data query graphs, one per (snmp index, graph template)
    Ds {
        snmp_query_id: i64,
        query_graphs: Vec<QueryGraph>,
        #[serde(default)]
        filter: Option<SnmpFilter>,
    },
    /// Host-level graphs (CPU, temperature, ...), one per graph template
    Cg { graph_template_id: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    pub name: String,
    pub host_template: TemplateMatch,
    #[serde(flatten)]
    pub kind: GraphKind,
}

/// SyncSettings is the reconciliation policy, read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Domain removed from Netdot host names
    pub strip_domain: String,
    pub group_source: GroupSource,
    pub tree_name: String,
    /// Key of the `key:<id>` annotation stored in Cacti host notes
    pub annotation_key: String,
    pub default_template_id: i64,
    /// 1 = Graph Template, 2 = Data Query Index
    pub host_grouping_type: i32,
    pub template_rules: TemplateRules,
    pub device: DeviceDefaults,
    pub graphs: Vec<GraphSpec>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            strip_domain: String::new(),
            group_source: GroupSource::UsedBy,
            tree_name: "Netdot".to_string(),
            annotation_key: "stableId".to_string(),
            default_template_id: 1,
            host_grouping_type: 2,
            template_rules: TemplateRules::default(),
            device: DeviceDefaults::default(),
            graphs: vec![GraphSpec {
                name: "Interfaces".to_string(),
                host_template: TemplateMatch::Wildcard(Wildcard::Any),
                kind: GraphKind::Ds {
                    snmp_query_id: 1,
                    query_graphs: vec![
                        // In/Out Errors/Discarded Packets
                        QueryGraph { query_type_id: 2, graph_template_id: 22 },
                        // In/Out Non-Unicast Packets
                        QueryGraph { query_type_id: 3, graph_template_id: 24 },
                        // In/Out Unicast Packets
                        QueryGraph { query_type_id: 4, graph_template_id: 23 },
                        // In/Out Bits
                        QueryGraph { query_type_id: 13, graph_template_id: 2 },
                    ],
                    filter: None,
                },
            }],
        }
    }
}

impl SyncSettings {
    /// Load settings from `path`. A missing file yields the defaults; an unreadable
    /// or invalid file is an error.
    pub async fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            tracing::warn!("Settings file {} not found, using defaults", path);
            return Ok(Self::default());
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid settings file {}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Graph specs that apply to hosts of the given template
    pub fn graphs_for(&self, template_id: i64) -> impl Iterator<Item = &GraphSpec> {
        self.graphs
            .iter()
            .filter(move |g| g.host_template.matches(template_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let s = SyncSettings::from_json("").unwrap();
        assert_eq!(s.tree_name, "Netdot");
        assert_eq!(s.annotation_key, "stableId");
        assert_eq!(s.default_template_id, 1);
        assert_eq!(s.device.snmp_port, 161);
        assert_eq!(s.graphs.len(), 1);
    }

    #[test]
    fn test_parse_full_settings() {
        let json = r#"{
            "strip_domain": "example.net",
            "group_source": "site",
            "template_rules": {
                "oid": [{"pattern": "^1\\.3\\.6\\.1\\.4\\.1\\.9\\.", "template_id": 5}],
                "manufacturer": [{"pattern": "(?i)net-snmp", "template_id": 3}]
            },
            "device": {"snmp_port": 1161},
            "graphs": [
                {"name": "Interfaces", "host_template": "any", "type": "ds",
                 "snmp_query_id": 1,
                 "query_graphs": [{"query_type_id": 13, "graph_template_id": 2}],
                 "filter": {"field": "ifOperStatus", "value": "Up"}},
                {"name": "CPU", "host_template": 5, "type": "cg", "graph_template_id": 18}
            ]
        }"#;
        let s = SyncSettings::from_json(json).unwrap();
        assert_eq!(s.group_source, GroupSource::Site);
        assert_eq!(s.strip_domain, "example.net");
        assert_eq!(s.template_rules.oid[0].template_id, 5);
        assert!(s.template_rules.product.is_empty());
        assert_eq!(s.device.snmp_port, 1161);
        assert_eq!(s.device.ping_port, 23);
        assert_eq!(s.graphs[0].host_template, TemplateMatch::Wildcard(Wildcard::Any));
        assert!(matches!(s.graphs[1].kind, GraphKind::Cg { graph_template_id: 18 }));

        let for_cisco: Vec<&str> = s.graphs_for(5).map(|g| g.name.as_str()).collect();
        assert_eq!(for_cisco, vec!["Interfaces", "CPU"]);
        let for_generic: Vec<&str> = s.graphs_for(1).map(|g| g.name.as_str()).collect();
        assert_eq!(for_generic, vec!["Interfaces"]);
    }

    #[test]
    fn test_invalid_host_template_rejected() {
        let json = r#"{"graphs": [{"name": "x", "host_template": "some", "type": "cg", "graph_template_id": 1}]}"#;
        assert!(SyncSettings::from_json(json).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let s = SyncSettings::load("/nonexistent/netdot_to_cacti.json").await.unwrap();
        assert_eq!(s.tree_name, "Netdot");
    }
}
