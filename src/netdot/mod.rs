pub mod client;
pub mod flatfile;
pub mod rules;
pub mod types;

use anyhow::Result;

use crate::config::{GroupSource, SyncSettings};
use crate::models::{DeviceRecord, SnmpVersion};
use crate::utils::{decimal_to_ip, non_empty, normalize_group, strip_domain};

pub use client::NetdotClient;
pub use flatfile::load_file;
pub use rules::TemplateAssigner;
pub use types::NetdotDevice;

/// Turn a Netdot row into a device record. Devices that are not SNMP managed yield None.
pub fn to_record(
    device: &NetdotDevice,
    settings: &SyncSettings,
    assigner: &TemplateAssigner,
) -> Result<Option<DeviceRecord>> {
    if !device.snmp_managed {
        return Ok(None);
    }

    let fqdn = device.fqdn();
    let address = device
        .address
        .as_deref()
        .and_then(|a| decimal_to_ip(a, device.address_version))
        .unwrap_or_else(|| fqdn.clone());
    let host = strip_domain(&fqdn, &settings.strip_domain);

    let group = match settings.group_source {
        GroupSource::UsedBy => device.used_by.as_deref(),
        GroupSource::Site => device.site.as_deref(),
    };

    let manufacturer = non_empty(device.manufacturer.clone()).unwrap_or_else(|| "unknown".to_string());
    let template_id = assigner.assign(
        &host,
        device.sysobjectid.as_deref().unwrap_or_default(),
        device.product.as_deref().unwrap_or_default(),
        &manufacturer,
    );

    let snmp_version = match device.snmp_version {
        None | Some(0) => SnmpVersion::V2,
        Some(v) => SnmpVersion::from_i64(v)?,
    };
    let community = non_empty(device.community.clone())
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| "public".to_string());

    Ok(Some(DeviceRecord {
        external_id: device.id.to_string(),
        description: host,
        address,
        template_id,
        group: normalize_group(group),
        disabled: !device.snmp_polling,
        snmp_version,
        community,
    }))
}

/// Query Netdot and build the device records for this run
pub async fn load_from_netdot(client: &NetdotClient, settings: &SyncSettings) -> Result<Vec<DeviceRecord>> {
    let assigner = TemplateAssigner::new(&settings.template_rules, settings.default_template_id)?;
    let devices = client.list_devices().await?;
    let mut records = Vec::with_capacity(devices.len());
    for device in &devices {
        if let Some(record) = to_record(device, settings, &assigner)? {
            records.push(record);
        }
    }
    tracing::info!(
        "Read {} Netdot devices ({} SNMP managed)",
        devices.len(),
        records.len()
    );
    Ok(records)
}
