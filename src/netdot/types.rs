/// One row of the Netdot device inventory query
#[derive(Debug, Clone, Default)]
pub struct NetdotDevice {
    pub id: i64,
    pub name: String,
    pub zone: String,
    /// Decimal SNMP target address from ipblock.address
    pub address: Option<String>,
    pub address_version: Option<i64>,
    pub site: Option<String>,
    pub product: Option<String>,
    pub sysobjectid: Option<String>,
    pub snmp_managed: bool,
    pub snmp_polling: bool,
    pub community: Option<String>,
    pub snmp_version: Option<i64>,
    pub used_by: Option<String>,
    pub manufacturer: Option<String>,
}

impl NetdotDevice {
    pub fn fqdn(&self) -> String {
        if self.zone.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.zone)
        }
    }
}
