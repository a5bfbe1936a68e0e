use anyhow::{Context, Result};
use std::path::Path;

use crate::error::SyncError;
use crate::models::{parse_disable_flag, DeviceRecord, SnmpVersion};
use crate::utils::normalize_group;

/// externalId;description;address;templateId;group;disable;snmpVersion;community
const FIELD_COUNT: usize = 8;

/// Parse one non-comment line. The community is the remainder of the line,
/// so it may itself contain ';'.
fn parse_line(line_no: usize, line: &str) -> Result<DeviceRecord, SyncError> {
    let fields: Vec<&str> = line.splitn(FIELD_COUNT, ';').collect();
    if fields.len() != FIELD_COUNT {
        return Err(SyncError::MalformedLine {
            line: line_no,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let template_id = fields[3]
        .trim()
        .parse::<i64>()
        .map_err(|_| SyncError::MalformedTemplateId(fields[3].trim().to_string()))?;

    Ok(DeviceRecord {
        external_id: fields[0].trim().to_string(),
        description: fields[1].trim().to_string(),
        address: fields[2].trim().to_string(),
        template_id,
        group: normalize_group(Some(fields[4])),
        disabled: parse_disable_flag(fields[5])?,
        snmp_version: SnmpVersion::parse(fields[6])?,
        community: fields[7].trim().to_string(),
    })
}

/// Parse a whole file body. Blank lines and `#` comments are skipped.
pub fn parse_records(text: &str) -> Result<Vec<DeviceRecord>> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = parse_line(idx + 1, line).with_context(|| format!("line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

pub async fn load_file(path: &Path) -> Result<Vec<DeviceRecord>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = parse_records(&text)?;
    tracing::info!("Read {} devices from {}", records.len(), path.display());
    Ok(records)
}
