//! Control plane and node pool upgrade driver.
//!
//! One invocation walks snapshot -> gate -> target -> {up to date | available | apply}
//! and returns. Mutations are fire-and-forget: the returned operation is
//! tracked server-side and observed by the next invocation's gate.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::client::ClusterApi;
use super::operation::{GateStatus, OperationGate};
use super::types::{ClusterRef, ClusterSnapshot, ClusterUpdate};
use crate::error::GkupError;
use crate::gcp::OperationRecord;
use crate::version::{UpgradeTarget, VersionParseError, VersionSource, VersionTriple, needs_upgrade};

/// Terminal state of one upgrade invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// In-flight operations exist; nothing was attempted.
    Blocked { pending: Vec<OperationRecord> },
    UpToDate { current: String },
    /// An upgrade exists but was not requested.
    Available {
        current: String,
        target: UpgradeTarget,
    },
    Applied {
        current: String,
        target: UpgradeTarget,
        operation: OperationRecord,
    },
}

/// Upgrade-needed status of one node pool against the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePoolStatus {
    pub name: String,
    pub status: String,
    pub version: String,
    pub labels: BTreeMap<String, String>,
    pub needs_upgrade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePoolReport {
    pub master_version: String,
    pub pools: Vec<NodePoolStatus>,
    /// Pools excluded because their version did not parse.
    pub unparseable: Vec<VersionParseError>,
}

impl NodePoolReport {
    pub fn pending_upgrades(&self) -> usize {
        self.pools.iter().filter(|p| p.needs_upgrade).count()
    }
}

pub struct UpgradeDriver<'a> {
    api: &'a dyn ClusterApi,
}

impl<'a> UpgradeDriver<'a> {
    pub fn new(api: &'a dyn ClusterApi) -> Self {
        Self { api }
    }

    /// Read the cluster. Every decision below works off this snapshot.
    pub async fn snapshot(&self, cluster: &ClusterRef) -> Result<ClusterSnapshot> {
        let snapshot = self
            .api
            .get_cluster(cluster)
            .await
            .with_context(|| format!("Failed to describe cluster {}", cluster.cluster))?;

        info!(
            cluster = %snapshot.name,
            master_version = %snapshot.current_master_version,
            node_count = snapshot.current_node_count,
            "Fetched cluster snapshot"
        );
        Ok(snapshot)
    }

    /// Move the control plane toward the newest valid version, at most one
    /// minor at a time. Without `apply` an available upgrade is only reported.
    pub async fn upgrade_master(
        &self,
        cluster: &ClusterRef,
        snapshot: &ClusterSnapshot,
        apply: bool,
    ) -> Result<UpgradeOutcome> {
        let current_raw = snapshot.current_master_version.clone();
        let current = VersionTriple::parse(&current_raw, VersionSource::ControlPlane)
            .map_err(GkupError::from)?;

        let gate = OperationGate::new(self.api);
        if let GateStatus::Blocked(pending) = gate.check(&cluster.project, &cluster.zone).await? {
            return Ok(UpgradeOutcome::Blocked { pending });
        }

        let server_config = self
            .api
            .get_server_config(&cluster.project, &cluster.zone)
            .await
            .context("Failed to fetch server config")?;
        let latest_raw = server_config
            .latest_master_version()
            .ok_or(GkupError::NoServerVersions)?;
        let latest =
            VersionTriple::parse(latest_raw, VersionSource::ServerConfig).map_err(GkupError::from)?;

        debug!(current = %current, latest = %latest, "Comparing control plane version");

        if !needs_upgrade(current, latest) {
            return Ok(UpgradeOutcome::UpToDate {
                current: current_raw,
            });
        }

        let target = UpgradeTarget::for_master(current, latest);
        if !apply {
            return Ok(UpgradeOutcome::Available {
                current: current_raw,
                target,
            });
        }

        let update = ClusterUpdate::MasterVersion(target.desired_version());
        let operation = self
            .api
            .update_cluster(cluster, &update)
            .await
            .context("Failed to request control plane upgrade")?;

        info!(
            cluster = %cluster.cluster,
            operation = %operation.name,
            target = %target,
            "Requested control plane upgrade"
        );
        Ok(UpgradeOutcome::Applied {
            current: current_raw,
            target,
            operation,
        })
    }

    /// Upgrade-needed status of every pool against the control plane.
    ///
    /// A control plane version that does not parse is fatal; a pool version
    /// that does not parse excludes only that pool.
    pub fn node_pool_report(snapshot: &ClusterSnapshot) -> Result<NodePoolReport> {
        let master =
            VersionTriple::parse(&snapshot.current_master_version, VersionSource::ControlPlane)
                .map_err(GkupError::from)?;

        let mut pools = Vec::with_capacity(snapshot.node_pools.len());
        let mut unparseable = Vec::new();

        for pool in &snapshot.node_pools {
            match VersionTriple::parse(&pool.version, VersionSource::NodePool(pool.name.clone())) {
                Ok(version) => pools.push(NodePoolStatus {
                    name: pool.name.clone(),
                    status: pool.status.clone(),
                    version: pool.version.clone(),
                    labels: pool.labels().clone(),
                    needs_upgrade: needs_upgrade(version, master),
                }),
                Err(e) => {
                    warn!(node_pool = %pool.name, "Skipping node pool: {}", e);
                    unparseable.push(e);
                }
            }
        }

        Ok(NodePoolReport {
            master_version: snapshot.current_master_version.clone(),
            pools,
            unparseable,
        })
    }

    /// Bring one named node pool toward the control plane version.
    /// The control plane version is a ceiling that is never exceeded.
    pub async fn upgrade_node_pool(
        &self,
        cluster: &ClusterRef,
        snapshot: &ClusterSnapshot,
        node_pool: &str,
    ) -> Result<UpgradeOutcome> {
        let master_raw = snapshot.current_master_version.as_str();
        let master =
            VersionTriple::parse(master_raw, VersionSource::ControlPlane).map_err(GkupError::from)?;

        let gate = OperationGate::new(self.api);
        if let GateStatus::Blocked(pending) = gate.check(&cluster.project, &cluster.zone).await? {
            return Ok(UpgradeOutcome::Blocked { pending });
        }

        let pool = snapshot
            .node_pool(node_pool)
            .ok_or_else(|| GkupError::NodePoolNotFound(node_pool.to_string()))?;
        let source = VersionSource::NodePool(pool.name.clone());
        let current = VersionTriple::parse(&pool.version, source).map_err(GkupError::from)?;

        if !needs_upgrade(current, master) {
            return Ok(UpgradeOutcome::UpToDate {
                current: pool.version.clone(),
            });
        }

        let target = UpgradeTarget::for_node_pool(current, master, master_raw);
        let update = ClusterUpdate::NodePoolVersion {
            node_pool: pool.name.clone(),
            version: target.desired_version(),
        };
        let operation = self
            .api
            .update_cluster(cluster, &update)
            .await
            .with_context(|| format!("Failed to request upgrade of node pool {}", pool.name))?;

        info!(
            cluster = %cluster.cluster,
            node_pool = %pool.name,
            operation = %operation.name,
            target = %target,
            "Requested node pool upgrade"
        );
        Ok(UpgradeOutcome::Applied {
            current: pool.version.clone(),
            target,
            operation,
        })
    }
}
