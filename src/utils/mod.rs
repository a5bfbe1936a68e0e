use std::net::{Ipv4Addr, Ipv6Addr};

/// Normalize a group name for use as a tree header: runs of whitespace become '_'
/// and an empty name becomes "unknown"
pub fn normalize_group(name: Option<&str>) -> String {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return "unknown".to_string();
    }
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Remove a trailing domain from a fully qualified host name
/// e.g., ("sw1.example.net", "example.net") -> "sw1"
pub fn strip_domain(fqdn: &str, domain: &str) -> String {
    let domain = domain.trim_matches('.');
    if domain.is_empty() {
        return fqdn.to_string();
    }
    match fqdn.strip_suffix(domain) {
        Some(host) if host.ends_with('.') && host.len() > 1 => host.trim_end_matches('.').to_string(),
        _ => fqdn.to_string(),
    }
}

/// Render an address stored as a decimal integer (Netdot ipblock.address).
/// Values above the IPv4 range, or with version 6, render as IPv6.
pub fn decimal_to_ip(raw: &str, version: Option<i64>) -> Option<String> {
    let value: u128 = raw.trim().parse().ok()?;
    if version == Some(6) || value > u128::from(u32::MAX) {
        return Some(Ipv6Addr::from(value).to_string());
    }
    Some(Ipv4Addr::from(value as u32).to_string())
}

/// Treat empty or whitespace-only strings as missing
pub fn non_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_group() {
        assert_eq!(normalize_group(Some("Computer Science Dept")), "Computer_Science_Dept");
        assert_eq!(normalize_group(Some("  Lab \t 2 ")), "Lab_2");
        assert_eq!(normalize_group(Some("core")), "core");
        assert_eq!(normalize_group(Some("   ")), "unknown");
        assert_eq!(normalize_group(None), "unknown");
    }

    #[test]
    fn test_strip_domain() {
        assert_eq!(strip_domain("sw1.example.net", "example.net"), "sw1");
        assert_eq!(strip_domain("sw1.lab.example.net", "example.net"), "sw1.lab");
        assert_eq!(strip_domain("sw1.example.org", "example.net"), "sw1.example.org");
        assert_eq!(strip_domain("notexample.net", "example.net"), "notexample.net");
        assert_eq!(strip_domain("sw1.example.net", ""), "sw1.example.net");
    }

    #[test]
    fn test_decimal_to_ip() {
        assert_eq!(decimal_to_ip("167772161", None).as_deref(), Some("10.0.0.1"));
        assert_eq!(decimal_to_ip("167772161", Some(4)).as_deref(), Some("10.0.0.1"));
        assert_eq!(decimal_to_ip("1", Some(6)).as_deref(), Some("::1"));
        assert_eq!(
            decimal_to_ip("42540766411282592856903984951653826561", None).as_deref(),
            Some("2001:db8::1")
        );
        assert_eq!(decimal_to_ip("not-a-number", None), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
