use anyhow::Result;
use std::collections::HashSet;

use crate::cacti::{CactiApi, GraphCreate, HostGraph, SnmpGraphTarget};
use crate::config::{GraphKind, SnmpFilter, SyncSettings};

#[derive(Debug, Default)]
pub struct GraphOutcome {
    pub created: i32,
    pub errors: Vec<String>,
}

/// Bring a host's graphs in line with the graph specs for its template.
///
/// Read failures abort; a data query or graph that cannot be created is logged,
/// recorded and skipped.
pub async fn reconcile_graphs<C: CactiApi + ?Sized>(
    cacti: &C,
    settings: &SyncSettings,
    host_id: i64,
    description: &str,
    template_id: i64,
) -> Result<GraphOutcome> {
    let mut outcome = GraphOutcome::default();

    // Refresh the SNMP cache for every query already attached
    let mut queries = cacti.host_data_queries(host_id).await?;
    for snmp_query_id in &queries {
        if let Err(e) = cacti.run_data_query(host_id, *snmp_query_id).await {
            tracing::warn!("{}: Failed to re-run data query {}: {}", description, snmp_query_id, e);
        }
    }

    let mut graphs = cacti.host_graphs(host_id).await?;

    for spec in settings.graphs_for(template_id) {
        match &spec.kind {
            GraphKind::Ds { snmp_query_id, query_graphs, filter } => {
                if !queries.contains(snmp_query_id) {
                    let added = match cacti.add_data_query(host_id, *snmp_query_id).await {
                        Ok(()) => cacti.run_data_query(host_id, *snmp_query_id).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = added {
                        let msg = format!("{}: Failed to add data query {} ({}): {}", description, snmp_query_id, spec.name, e);
                        tracing::error!("{}", msg);
                        outcome.errors.push(msg);
                        continue;
                    }
                    tracing::info!("{}: Added data query {} ({})", description, snmp_query_id, spec.name);
                    queries.push(*snmp_query_id);
                }

                let indexes = cacti.snmp_indexes(host_id, *snmp_query_id, filter.as_ref()).await?;
                let mut existing: HashSet<(String, i64)> = graphs
                    .iter()
                    .filter(|g| g.snmp_query_id == *snmp_query_id)
                    .map(|g| (g.snmp_index.clone(), g.graph_template_id))
                    .collect();

                for snmp_index in &indexes {
                    for qg in query_graphs {
                        let key = (snmp_index.clone(), qg.graph_template_id);
                        if existing.contains(&key) {
                            continue;
                        }
                        let req = GraphCreate {
                            host_id,
                            graph_template_id: qg.graph_template_id,
                            snmp: Some(SnmpGraphTarget {
                                snmp_query_id: *snmp_query_id,
                                query_type_id: qg.query_type_id,
                                snmp_index: snmp_index.clone(),
                            }),
                        };
                        match cacti.create_graph(&req).await {
                            Ok(id) => {
                                tracing::info!(
                                    "{}: Added {} graph {} (template {}, index {})",
                                    description, spec.name, id, qg.graph_template_id, snmp_index
                                );
                                existing.insert(key);
                                outcome.created += 1;
                            }
                            Err(e) => record_failure(&mut outcome, description, &spec.name, filter.as_ref(), e),
                        }
                    }
                }
            }
            GraphKind::Cg { graph_template_id } => {
                if graphs.iter().any(|g| g.graph_template_id == *graph_template_id) {
                    continue;
                }
                let req = GraphCreate { host_id, graph_template_id: *graph_template_id, snmp: None };
                match cacti.create_graph(&req).await {
                    Ok(id) => {
                        tracing::info!("{}: Added {} graph {} (template {})", description, spec.name, id, graph_template_id);
                        graphs.push(HostGraph {
                            id,
                            graph_template_id: *graph_template_id,
                            snmp_query_id: 0,
                            snmp_index: String::new(),
                        });
                        outcome.created += 1;
                    }
                    Err(e) => record_failure(&mut outcome, description, &spec.name, None, e),
                }
            }
        }
    }

    if outcome.created > 0 {
        cacti.push_out_host(host_id).await?;
    }
    Ok(outcome)
}

fn record_failure(
    outcome: &mut GraphOutcome,
    description: &str,
    spec: &str,
    filter: Option<&SnmpFilter>,
    e: anyhow::Error,
) {
    let msg = match filter {
        Some(f) => format!("{}: Failed to add {} graph ({}={}): {}", description, spec, f.field, f.value, e),
        None => format!("{}: Failed to add {} graph: {}", description, spec, e),
    };
    tracing::error!("{}", msg);
    outcome.errors.push(msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cacti::memory::{MemoryCacti, Mutation};
    use crate::config::{GraphSpec, QueryGraph, TemplateMatch, Wildcard};

    fn settings(filter: Option<SnmpFilter>) -> SyncSettings {
        SyncSettings {
            graphs: vec![
                GraphSpec {
                    name: "Interfaces".to_string(),
                    host_template: TemplateMatch::Wildcard(Wildcard::Any),
                    kind: GraphKind::Ds {
                        snmp_query_id: 1,
                        query_graphs: vec![
                            QueryGraph { query_type_id: 13, graph_template_id: 2 },
                            QueryGraph { query_type_id: 2, graph_template_id: 22 },
                        ],
                        filter,
                    },
                },
                GraphSpec {
                    name: "CPU".to_string(),
                    host_template: TemplateMatch::Id(5),
                    kind: GraphKind::Cg { graph_template_id: 18 },
                },
            ],
            ..SyncSettings::default()
        }
    }

    fn cacti() -> MemoryCacti {
        let cacti = MemoryCacti::new(&[1, 5]);
        cacti.set_device_rows(
            1,
            &[
                ("1", &[("ifOperStatus", "Up")]),
                ("2", &[("ifOperStatus", "Down")]),
            ],
        );
        cacti
    }

    #[tokio::test]
    async fn test_creates_ds_graphs_per_index() {
        let cacti = cacti();
        let host = cacti.seed_host("sw1", "10.0.0.1", "");
        let outcome = reconcile_graphs(&cacti, &settings(None), host, "sw1", 1).await.unwrap();
        assert_eq!(outcome.created, 4);
        assert!(outcome.errors.is_empty());
        let mutations = cacti.mutations();
        assert!(mutations.contains(&Mutation::DataQueryAdded { host_id: host, snmp_query_id: 1 }));
        assert_eq!(mutations.last(), Some(&Mutation::PushedOut(host)));
    }

    #[tokio::test]
    async fn test_filter_limits_indexes() {
        let cacti = cacti();
        let host = cacti.seed_host("sw1", "10.0.0.1", "");
        let filter = SnmpFilter { field: "ifOperStatus".to_string(), value: "Up".to_string() };
        let outcome = reconcile_graphs(&cacti, &settings(Some(filter)), host, "sw1", 1).await.unwrap();
        assert_eq!(outcome.created, 2);
        assert!(cacti.graphs(host).iter().all(|g| g.snmp_index == "1"));
    }

    #[tokio::test]
    async fn test_cg_graph_only_for_matching_template() {
        let cacti = cacti();
        let host = cacti.seed_host("rtr1", "10.0.0.2", "");
        let outcome = reconcile_graphs(&cacti, &settings(None), host, "rtr1", 5).await.unwrap();
        assert_eq!(outcome.created, 5);
        assert_eq!(cacti.graphs(host).iter().filter(|g| g.graph_template_id == 18).count(), 1);
    }

    #[tokio::test]
    async fn test_failed_graph_is_recorded_and_others_created() {
        let cacti = cacti();
        cacti.fail_graph_template(22);
        let host = cacti.seed_host("sw1", "10.0.0.1", "");
        let outcome = reconcile_graphs(&cacti, &settings(None), host, "sw1", 1).await.unwrap();
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].starts_with("sw1: Failed to add Interfaces graph"));
        assert!(cacti.graphs(host).iter().all(|g| g.graph_template_id == 2));
        assert_eq!(cacti.mutations().last(), Some(&Mutation::PushedOut(host)));
    }

    #[tokio::test]
    async fn test_failed_data_query_skips_its_graphs_only() {
        let cacti = cacti();
        cacti.fail_data_query(1);
        let host = cacti.seed_host("rtr1", "10.0.0.2", "");
        let outcome = reconcile_graphs(&cacti, &settings(None), host, "rtr1", 5).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Failed to add data query 1 (Interfaces)"));
        let graphs = cacti.graphs(host);
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].graph_template_id, 18);
    }

    #[tokio::test]
    async fn test_second_pass_creates_nothing() {
        let cacti = cacti();
        let host = cacti.seed_host("rtr1", "10.0.0.2", "");
        let s = settings(None);
        reconcile_graphs(&cacti, &s, host, "rtr1", 5).await.unwrap();
        cacti.take_mutations();

        let outcome = reconcile_graphs(&cacti, &s, host, "rtr1", 5).await.unwrap();
        assert_eq!(outcome.created, 0);
        let changes: Vec<Mutation> = cacti.mutations().into_iter().filter(Mutation::is_change).collect();
        assert!(changes.is_empty(), "unexpected changes: {:?}", changes);
        assert_eq!(
            cacti.mutations(),
            vec![Mutation::DataQueryRun { host_id: host, snmp_query_id: 1 }]
        );
    }
}
