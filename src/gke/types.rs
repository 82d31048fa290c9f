//! GKE resource snapshots and request types.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::Deserialize;

use crate::error::GkupError;
use crate::gcp::rest::short_name;

/// Identifies one zonal cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub project: String,
    pub zone: String,
    pub cluster: String,
}

impl ClusterRef {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            cluster: cluster.into(),
        }
    }

    /// Zonal REST path, relative to the API root.
    pub fn path(&self) -> String {
        format!(
            "projects/{}/zones/{}/clusters/{}",
            self.project, self.zone, self.cluster
        )
    }
}

impl fmt::Display for ClusterRef {
    /// Resource name as used in request bodies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/clusters/{}",
            self.project, self.zone, self.cluster
        )
    }
}

/// Read of a cluster at one point in time. Never cached across runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_master_version: String,
    #[serde(default)]
    pub current_node_count: i64,
    #[serde(default)]
    pub node_pools: Vec<NodePoolSnapshot>,
}

impl ClusterSnapshot {
    pub fn node_pool(&self, name: &str) -> Option<&NodePoolSnapshot> {
        self.node_pools.iter().find(|np| np.name == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSnapshot {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub instance_group_urls: Vec<String>,
}

impl NodePoolSnapshot {
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.config.labels
    }

    /// Short name of the backing instance group manager.
    ///
    /// A node pool without one is an inconsistency, not a retryable state.
    pub fn instance_group_name(&self) -> Result<String> {
        self.instance_group_urls
            .first()
            .map(|url| short_name(url).to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GkupError::MissingInstanceGroup(self.name.clone()).into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Newest first.
    #[serde(default)]
    pub valid_master_versions: Vec<String>,
}

impl ServerConfig {
    pub fn latest_master_version(&self) -> Option<&str> {
        self.valid_master_versions.first().map(String::as_str)
    }
}

/// A mutating cluster update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterUpdate {
    MasterVersion(String),
    NodePoolVersion { node_pool: String, version: String },
}

impl fmt::Display for ClusterUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterUpdate::MasterVersion(v) => write!(f, "master version -> {}", v),
            ClusterUpdate::NodePoolVersion { node_pool, version } => {
                write!(f, "node pool {} version -> {}", node_pool, version)
            }
        }
    }
}

/// Parameters for a new node pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNodePool {
    pub name: String,
    pub machine_type: Option<String>,
    pub initial_node_count: i64,
    pub version: String,
}

impl NewNodePool {
    /// One node on the newest version.
    pub fn new(name: impl Into<String>, machine_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            machine_type: machine_type.filter(|m| !m.is_empty()),
            initial_node_count: 1,
            version: "latest".to_string(),
        }
    }
}
