//! Compute Engine resource records.

use serde::Deserialize;

use crate::gcp::rest::short_name;

/// Access config type that carries an instance's external address.
pub const ONE_TO_ONE_NAT: &str = "ONE_TO_ONE_NAT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupRecord {
    pub name: String,
    #[serde(default)]
    pub target_size: i64,
}

/// One member of a managed instance group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    /// Full instance URL, `.../zones/<zone>/instances/<name>`.
    pub instance: String,
}

impl ManagedInstance {
    pub fn name(&self) -> &str {
        short_name(&self.instance)
    }

    /// True when the instance URL ends in `/instances/<hostname>`.
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        !hostname.is_empty()
            && self
                .instance
                .strip_suffix(hostname)
                .is_some_and(|prefix| prefix.ends_with("/instances/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "natIP", default)]
    pub nat_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "networkIP", default)]
    pub network_ip: Option<String>,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl InstanceRecord {
    /// First non-empty one-to-one NAT address across all interfaces.
    pub fn nat_ip(&self) -> Option<&str> {
        self.network_interfaces
            .iter()
            .flat_map(|ni| &ni.access_configs)
            .filter(|ac| ac.kind == ONE_TO_ONE_NAT)
            .filter_map(|ac| ac.nat_ip.as_deref())
            .find(|ip| !ip.is_empty())
    }
}
