use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;

use crate::config::{DeviceDefaults, SnmpFilter};

use super::cli::CactiCli;
use super::types::*;
use super::CactiApi;

/// graph_tree.sort_type for alphabetic ordering
const SORT_ALPHA: i32 = 2;

/// host_snmp_query.reindex_method: re-index when the index count changes
const REINDEX_INDEX_COUNT: i32 = 2;

/// Cacti access: table reads and simple saves go straight to the database,
/// graph creation and poller work go through Cacti's CLI scripts
pub struct CactiClient {
    pool: Pool<MySql>,
    cli: CactiCli,
}

impl CactiClient {
    pub async fn connect(url: &str, max_connections: u32, cli: CactiCli) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("Failed to connect to Cacti database")?;
        Ok(Self { pool, cli })
    }

    /// The index field Cacti chose for this host's data query, and the value that
    /// field has for one row
    async fn index_field_value(&self, host_id: i64, snmp_query_id: i64, snmp_index: &str) -> Result<(String, String)> {
        let sort_field: String = sqlx::query_scalar(
            "SELECT sort_field FROM host_snmp_query WHERE host_id = ? AND snmp_query_id = ?",
        )
        .bind(host_id)
        .bind(snmp_query_id)
        .fetch_optional(&self.pool)
        .await?
        .filter(|f: &String| !f.is_empty())
        .with_context(|| format!("Host {} has no index field for data query {}", host_id, snmp_query_id))?;

        let value: String = sqlx::query_scalar(
            r#"
            SELECT field_value FROM host_snmp_cache
            WHERE host_id = ? AND snmp_query_id = ? AND field_name = ? AND snmp_index = ?
            "#,
        )
        .bind(host_id)
        .bind(snmp_query_id)
        .bind(&sort_field)
        .bind(snmp_index)
        .fetch_optional(&self.pool)
        .await?
        .with_context(|| format!("Host {} has no cached {} for index {}", host_id, sort_field, snmp_index))?;

        Ok((sort_field, value))
    }
}

fn text(row: &MySqlRow, column: &str) -> Result<String, sqlx::Error> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

fn int(row: &MySqlRow, column: &str) -> Result<i32, sqlx::Error> {
    let v: Option<i64> = row.try_get(column)?;
    Ok(v.unwrap_or_default() as i32)
}

fn map_host_row(row: &MySqlRow) -> Result<CactiHost, sqlx::Error> {
    Ok(CactiHost {
        id: row.try_get("id")?,
        host_template_id: row.try_get("host_template_id")?,
        description: text(row, "description")?,
        hostname: text(row, "hostname")?,
        notes: text(row, "notes")?,
        snmp_community: text(row, "snmp_community")?,
        snmp_version: int(row, "snmp_version")?,
        disabled: text(row, "disabled")? == "on",
        defaults: DeviceDefaults {
            snmp_username: text(row, "snmp_username")?,
            snmp_password: text(row, "snmp_password")?,
            snmp_auth_protocol: text(row, "snmp_auth_protocol")?,
            snmp_priv_passphrase: text(row, "snmp_priv_passphrase")?,
            snmp_priv_protocol: text(row, "snmp_priv_protocol")?,
            snmp_context: text(row, "snmp_context")?,
            snmp_port: int(row, "snmp_port")?,
            snmp_timeout: int(row, "snmp_timeout")?,
            availability_method: int(row, "availability_method")?,
            ping_method: int(row, "ping_method")?,
            ping_port: int(row, "ping_port")?,
            ping_timeout: int(row, "ping_timeout")?,
            ping_retries: int(row, "ping_retries")?,
            max_oids: int(row, "max_oids")?,
        },
    })
}

fn map_tree_item_row(row: &MySqlRow) -> Result<TreeItem, sqlx::Error> {
    Ok(TreeItem {
        id: row.try_get("id")?,
        parent: row.try_get("parent")?,
        title: text(row, "title")?,
        host_id: row.try_get("host_id")?,
        local_graph_id: row.try_get("local_graph_id")?,
    })
}

fn map_graph_row(row: &MySqlRow) -> Result<HostGraph, sqlx::Error> {
    Ok(HostGraph {
        id: row.try_get("id")?,
        graph_template_id: row.try_get("graph_template_id")?,
        snmp_query_id: row.try_get("snmp_query_id")?,
        snmp_index: text(row, "snmp_index")?,
    })
}

fn insert_id(id: u64) -> Result<i64> {
    i64::try_from(id).context("Insert id out of range")
}

#[async_trait]
impl CactiApi for CactiClient {
    async fn host_templates(&self) -> Result<HashMap<i64, String>> {
        let rows = sqlx::query("SELECT CAST(id AS SIGNED) AS id, name FROM host_template")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read host templates")?;

        let mut templates = HashMap::new();
        for row in &rows {
            templates.insert(row.try_get("id")?, row.try_get("name")?);
        }
        Ok(templates)
    }

    async fn list_hosts(&self) -> Result<Vec<CactiHost>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(id AS SIGNED) AS id, CAST(host_template_id AS SIGNED) AS host_template_id,
                   description, hostname, notes, snmp_community,
                   CAST(snmp_version AS SIGNED) AS snmp_version, snmp_username, snmp_password,
                   snmp_auth_protocol, snmp_priv_passphrase, snmp_priv_protocol, snmp_context,
                   CAST(snmp_port AS SIGNED) AS snmp_port, CAST(snmp_timeout AS SIGNED) AS snmp_timeout,
                   CAST(availability_method AS SIGNED) AS availability_method,
                   CAST(ping_method AS SIGNED) AS ping_method, CAST(ping_port AS SIGNED) AS ping_port,
                   CAST(ping_timeout AS SIGNED) AS ping_timeout,
                   CAST(ping_retries AS SIGNED) AS ping_retries, CAST(max_oids AS SIGNED) AS max_oids,
                   disabled
            FROM host
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read hosts")?;

        Ok(rows.iter().map(map_host_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_or_create_tree(&self, name: &str) -> Result<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT CAST(id AS SIGNED) FROM graph_tree WHERE name = ? ORDER BY id LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(id) = existing {
            tracing::debug!("{} tree already exists - id: ({})", name, id);
            return Ok(id);
        }

        let result = sqlx::query("INSERT INTO graph_tree (name, sort_type) VALUES (?, ?)")
            .bind(name)
            .bind(SORT_ALPHA)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create tree {}", name))?;
        let id = insert_id(result.last_insert_id())?;
        tracing::info!("Created {} Tree - id: {}", name, id);
        Ok(id)
    }

    async fn list_tree_items(&self, tree_id: i64) -> Result<Vec<TreeItem>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(id AS SIGNED) AS id, CAST(parent AS SIGNED) AS parent, title,
                   CAST(host_id AS SIGNED) AS host_id, CAST(local_graph_id AS SIGNED) AS local_graph_id
            FROM graph_tree_items
            WHERE graph_tree_id = ?
            ORDER BY id
            "#,
        )
        .bind(tree_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read tree items")?;

        Ok(rows.iter().map(map_tree_item_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn host_data_queries(&self, host_id: i64) -> Result<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT CAST(snmp_query_id AS SIGNED) FROM host_snmp_query WHERE host_id = ? ORDER BY snmp_query_id",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn snmp_indexes(
        &self,
        host_id: i64,
        snmp_query_id: i64,
        filter: Option<&SnmpFilter>,
    ) -> Result<Vec<String>> {
        let mut sql = String::from(
            "SELECT DISTINCT snmp_index FROM host_snmp_cache WHERE host_id = ? AND snmp_query_id = ?",
        );
        if filter.is_some() {
            sql.push_str(" AND field_name = ? AND field_value = ?");
        }
        sql.push_str(" ORDER BY snmp_index");

        let mut query = sqlx::query_scalar::<_, String>(&sql).bind(host_id).bind(snmp_query_id);
        if let Some(f) = filter {
            query = query.bind(&f.field).bind(&f.value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn host_graphs(&self, host_id: i64) -> Result<Vec<HostGraph>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(id AS SIGNED) AS id, CAST(graph_template_id AS SIGNED) AS graph_template_id,
                   CAST(snmp_query_id AS SIGNED) AS snmp_query_id, snmp_index
            FROM graph_local
            WHERE host_id = ?
            "#,
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_graph_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn save_host(&self, host: &HostSave) -> Result<i64> {
        let d = &host.defaults;
        let sql = if host.id == 0 {
            r#"
            INSERT INTO host (host_template_id, description, hostname, notes, snmp_community,
                              snmp_version, snmp_username, snmp_password, snmp_auth_protocol,
                              snmp_priv_passphrase, snmp_priv_protocol, snmp_context, snmp_port,
                              snmp_timeout, availability_method, ping_method, ping_port,
                              ping_timeout, ping_retries, max_oids, disabled)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        } else {
            r#"
            UPDATE host SET host_template_id = ?, description = ?, hostname = ?, notes = ?,
                            snmp_community = ?, snmp_version = ?, snmp_username = ?,
                            snmp_password = ?, snmp_auth_protocol = ?, snmp_priv_passphrase = ?,
                            snmp_priv_protocol = ?, snmp_context = ?, snmp_port = ?,
                            snmp_timeout = ?, availability_method = ?, ping_method = ?,
                            ping_port = ?, ping_timeout = ?, ping_retries = ?, max_oids = ?,
                            disabled = ?
            WHERE id = ?
            "#
        };

        let mut query = sqlx::query(sql)
            .bind(host.host_template_id)
            .bind(&host.description)
            .bind(&host.hostname)
            .bind(&host.notes)
            .bind(&host.snmp_community)
            .bind(host.snmp_version)
            .bind(&d.snmp_username)
            .bind(&d.snmp_password)
            .bind(&d.snmp_auth_protocol)
            .bind(&d.snmp_priv_passphrase)
            .bind(&d.snmp_priv_protocol)
            .bind(&d.snmp_context)
            .bind(d.snmp_port)
            .bind(d.snmp_timeout)
            .bind(d.availability_method)
            .bind(d.ping_method)
            .bind(d.ping_port)
            .bind(d.ping_timeout)
            .bind(d.ping_retries)
            .bind(d.max_oids)
            .bind(host.disabled_flag());
        if host.id != 0 {
            query = query.bind(host.id);
        }

        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save host {}", host.description))?;

        if host.id == 0 {
            insert_id(result.last_insert_id())
        } else {
            Ok(host.id)
        }
    }

    async fn save_tree_item(&self, item: &TreeItemSave) -> Result<i64> {
        if item.id == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO graph_tree_items (graph_tree_id, parent, title, host_id,
                                              local_graph_id, host_grouping_type)
                VALUES (?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(item.tree_id)
            .bind(item.parent)
            .bind(item.title())
            .bind(item.host_id())
            .bind(item.host_grouping_type)
            .execute(&self.pool)
            .await
            .context("Failed to add tree item")?;
            return insert_id(result.last_insert_id());
        }

        sqlx::query(
            r#"
            UPDATE graph_tree_items SET graph_tree_id = ?, parent = ?, title = ?, host_id = ?,
                                        host_grouping_type = ?
            WHERE id = ?
            "#,
        )
        .bind(item.tree_id)
        .bind(item.parent)
        .bind(item.title())
        .bind(item.host_id())
        .bind(item.host_grouping_type)
        .bind(item.id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update tree item {}", item.id))?;
        Ok(item.id)
    }

    async fn delete_tree_item(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM graph_tree_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete tree item {}", id))?;
        Ok(())
    }

    async fn add_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()> {
        sqlx::query("REPLACE INTO host_snmp_query (host_id, snmp_query_id, reindex_method) VALUES (?, ?, ?)")
            .bind(host_id)
            .bind(snmp_query_id)
            .bind(REINDEX_INDEX_COUNT)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to add data query {} to host {}", snmp_query_id, host_id))?;
        Ok(())
    }

    async fn run_data_query(&self, host_id: i64, snmp_query_id: i64) -> Result<()> {
        self.cli.reindex(host_id, snmp_query_id).await
    }

    async fn create_graph(&self, req: &GraphCreate) -> Result<i64> {
        match &req.snmp {
            None => self.cli.add_cg_graph(req.host_id, req.graph_template_id).await,
            Some(target) => {
                let (field, value) = self
                    .index_field_value(req.host_id, target.snmp_query_id, &target.snmp_index)
                    .await?;
                self.cli
                    .add_ds_graph(
                        req.host_id,
                        req.graph_template_id,
                        target.snmp_query_id,
                        target.query_type_id,
                        &field,
                        &value,
                    )
                    .await
            }
        }
    }

    async fn push_out_host(&self, host_id: i64) -> Result<()> {
        self.cli.rebuild_poller_cache(host_id).await
    }
}
