use anyhow::{Context, Result};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, Pool, Row};

use super::types::NetdotDevice;

const SELECT_DEVICES: &str = r#"
    SELECT    rr.name AS name, zone.name AS zone,
              CAST(ipblock.address AS CHAR) AS address,
              CAST(ipblock.version AS SIGNED) AS address_version,
              site.name AS site, p.name AS product, p.sysobjectid AS sysobjectid,
              CAST(d.id AS SIGNED) AS id,
              CAST(d.snmp_managed AS SIGNED) AS snmp_managed,
              CAST(d.snmp_polling AS SIGNED) AS snmp_polling, d.community AS community,
              CAST(d.snmp_version AS SIGNED) AS snmp_version,
              e.name AS used_by, m.name AS manufacturer
    FROM      rr, zone, producttype pt, device d
    LEFT JOIN (site) ON (d.site = site.id)
    LEFT JOIN (ipblock) ON (d.snmp_target = ipblock.id)
    LEFT JOIN (entity e) ON (d.used_by = e.id),
              product p
    LEFT JOIN (entity m) ON (p.manufacturer = m.id)
    WHERE     d.name = rr.id
      AND     rr.zone = zone.id
      AND     d.product = p.id
      AND     p.type = pt.id
    ORDER BY  rr.name
"#;

/// Read-only access to the Netdot database
pub struct NetdotClient {
    pool: Pool<MySql>,
}

impl NetdotClient {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("Failed to connect to Netdot database")?;
        Ok(Self { pool })
    }

    /// All devices with their name, target address, site, owner and product, ordered by name
    pub async fn list_devices(&self) -> Result<Vec<NetdotDevice>> {
        let rows = sqlx::query(SELECT_DEVICES)
            .fetch_all(&self.pool)
            .await
            .context("Netdot device query failed")?;

        rows.iter()
            .map(map_device_row)
            .collect::<Result<Vec<_>, _>>()
            .context("Unexpected Netdot device row")
    }
}

fn flag(row: &MySqlRow, column: &str) -> Result<bool, sqlx::Error> {
    Ok(row.try_get::<Option<i64>, _>(column)?.unwrap_or(0) != 0)
}

fn map_device_row(row: &MySqlRow) -> Result<NetdotDevice, sqlx::Error> {
    Ok(NetdotDevice {
        id: row.try_get("id")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        zone: row.try_get::<Option<String>, _>("zone")?.unwrap_or_default(),
        address: row.try_get("address")?,
        address_version: row.try_get("address_version")?,
        site: row.try_get("site")?,
        product: row.try_get("product")?,
        sysobjectid: row.try_get("sysobjectid")?,
        snmp_managed: flag(row, "snmp_managed")?,
        snmp_polling: flag(row, "snmp_polling")?,
        community: row.try_get("community")?,
        snmp_version: row.try_get("snmp_version")?,
        used_by: row.try_get("used_by")?,
        manufacturer: row.try_get("manufacturer")?,
    })
}
