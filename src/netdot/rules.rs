use anyhow::{Context, Result};
use regex_lite::Regex;

use crate::config::{TemplateRule, TemplateRules};

struct CompiledRule {
    pattern: Regex,
    template_id: i64,
}

fn compile(kind: &str, rules: &[TemplateRule]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|r| -> Result<CompiledRule> {
            let pattern = Regex::new(&r.pattern)
                .with_context(|| format!("Invalid {} template rule pattern '{}'", kind, r.pattern))?;
            Ok(CompiledRule { pattern, template_id: r.template_id })
        })
        .collect()
}

fn first_match(rules: &[CompiledRule], subject: &str, host: &str) -> Option<i64> {
    for rule in rules {
        if rule.pattern.is_match(subject) {
            tracing::debug!("{}: Assigning template {}", host, rule.template_id);
            return Some(rule.template_id);
        }
        tracing::debug!("{}: {} does not match {}", host, subject, rule.pattern.as_str());
    }
    None
}

/// Picks a host template for a device: sysObjectID rules, then product rules,
/// then manufacturer rules, then the default
pub struct TemplateAssigner {
    oid: Vec<CompiledRule>,
    product: Vec<CompiledRule>,
    manufacturer: Vec<CompiledRule>,
    default_template_id: i64,
}

impl TemplateAssigner {
    pub fn new(rules: &TemplateRules, default_template_id: i64) -> Result<Self> {
        Ok(Self {
            oid: compile("oid", &rules.oid)?,
            product: compile("product", &rules.product)?,
            manufacturer: compile("manufacturer", &rules.manufacturer)?,
            default_template_id,
        })
    }

    pub fn assign(&self, host: &str, sysobjectid: &str, product: &str, manufacturer: &str) -> i64 {
        first_match(&self.oid, sysobjectid, host)
            .or_else(|| first_match(&self.product, product, host))
            .or_else(|| first_match(&self.manufacturer, manufacturer, host))
            .unwrap_or(self.default_template_id)
    }
}
