//! gkup - GKE upgrade and node pool scaling.
//!
//! - Control plane upgrades, one minor version per run
//! - Node pool upgrades toward the control plane version
//! - Node pool grow/shrink through the backing instance group
//! - External address lookup for a node

pub mod compute;
pub mod config;
pub mod error;
pub mod gcp;
pub mod gke;
pub mod k8s;
pub mod logging;
pub mod output;
pub mod resolver;
pub mod scale;
pub mod version;

#[cfg(test)]
mod testing;

use anyhow::Result;
use tracing::debug;

use compute::{ComputeApi, ComputeClient};
use config::{ApiConfig, Args, Command};
use error::GkupError;
use gcp::RestClient;
use gke::{
    ClusterApi, ClusterRef, CreateOutcome, GkeClient, NodePoolCreator, OperationGate,
    UpgradeDriver, UpgradeOutcome,
};
use k8s::{KubeNodeClient, NodeApi};
use resolver::{AddressLookup, InstanceResolver};
use scale::{GrowResult, ScaleController, ShrinkOutcome};

/// Dispatch one subcommand against the production clients.
pub async fn run(args: &Args) -> Result<()> {
    let api = ApiConfig::from_args(args);
    let token = gcp::token::access_token().await?;

    let gke_client = GkeClient::new(RestClient::new(
        &api.container_endpoint,
        token.clone(),
        api.request_timeout,
        "gke::client",
    )?);
    let compute_client = ComputeClient::new(RestClient::new(
        &api.compute_endpoint,
        token,
        api.request_timeout,
        "compute::client",
    )?);

    match &args.command {
        Command::UpgradeMaster { cluster, force } => {
            run_upgrade_master(&gke_client, &ClusterRef::from(cluster), *force).await?;
        }
        Command::UpgradeNodePool { cluster, node_pool } => {
            run_upgrade_node_pool(&gke_client, &ClusterRef::from(cluster), node_pool.as_deref())
                .await?;
        }
        Command::Grow { cluster, node_pool } => {
            run_grow(
                &gke_client,
                &compute_client,
                &ClusterRef::from(cluster),
                node_pool,
            )
            .await?;
        }
        Command::Shrink { cluster, node_pool } => {
            let nodes = node_client(&api).await?;
            run_shrink(
                &gke_client,
                &compute_client,
                &nodes,
                &ClusterRef::from(cluster),
                node_pool,
            )
            .await?;
        }
        Command::CreateNodePool {
            cluster,
            node_pool,
            machine_type,
        } => {
            run_create_node_pool(
                &gke_client,
                &ClusterRef::from(cluster),
                node_pool,
                machine_type.clone(),
            )
            .await?;
        }
        Command::NodeIp {
            project,
            zone,
            hostname,
        } => {
            let nodes = node_client(&api).await?;
            run_node_ip(&compute_client, &nodes, project, zone, hostname).await?;
        }
    }

    Ok(())
}

async fn node_client(api: &ApiConfig) -> Result<KubeNodeClient> {
    KubeNodeClient::connect(api.context.as_deref()).await
}

/// Control plane upgrade. Without `force` an available upgrade is only reported.
pub async fn run_upgrade_master(
    cluster_api: &dyn ClusterApi,
    cluster: &ClusterRef,
    force: bool,
) -> Result<UpgradeOutcome> {
    let driver = UpgradeDriver::new(cluster_api);
    let snapshot = driver.snapshot(cluster).await?;
    output::print_cluster_summary(&snapshot);

    let outcome = driver.upgrade_master(cluster, &snapshot, force).await?;
    output::print_upgrade_outcome("Control plane", &outcome);
    Ok(outcome)
}

/// Report every pool, then upgrade the named one if given.
pub async fn run_upgrade_node_pool(
    cluster_api: &dyn ClusterApi,
    cluster: &ClusterRef,
    node_pool: Option<&str>,
) -> Result<Option<UpgradeOutcome>> {
    let driver = UpgradeDriver::new(cluster_api);
    let snapshot = driver.snapshot(cluster).await?;
    output::print_cluster_summary(&snapshot);

    let report = UpgradeDriver::node_pool_report(&snapshot)?;
    output::print_node_pool_report(&report);

    let Some(name) = node_pool else {
        debug!("No node pool named, report only");
        let in_flight = OperationGate::new(cluster_api)
            .list_in_flight(&cluster.project, &cluster.zone)
            .await?;
        output::print_in_flight(&in_flight);
        return Ok(None);
    };

    let outcome = driver.upgrade_node_pool(cluster, &snapshot, name).await?;
    output::print_upgrade_outcome(&format!("Node pool {}", name), &outcome);
    Ok(Some(outcome))
}

pub async fn run_grow(
    cluster_api: &dyn ClusterApi,
    compute: &dyn ComputeApi,
    cluster: &ClusterRef,
    node_pool: &str,
) -> Result<GrowResult> {
    let result = ScaleController::new(cluster_api, compute)
        .grow(cluster, node_pool)
        .await?;
    output::print_grow_result(node_pool, &result);
    Ok(result)
}

/// Remove cordoned nodes. An empty result is not an error.
pub async fn run_shrink(
    cluster_api: &dyn ClusterApi,
    compute: &dyn ComputeApi,
    nodes: &dyn NodeApi,
    cluster: &ClusterRef,
    node_pool: &str,
) -> Result<ShrinkOutcome> {
    let outcome = ScaleController::new(cluster_api, compute)
        .shrink(cluster, node_pool, nodes)
        .await?;
    output::print_shrink_outcome(node_pool, &outcome);
    Ok(outcome)
}

pub async fn run_create_node_pool(
    cluster_api: &dyn ClusterApi,
    cluster: &ClusterRef,
    node_pool: &str,
    machine_type: Option<String>,
) -> Result<CreateOutcome> {
    let outcome = NodePoolCreator::new(cluster_api)
        .create(cluster, node_pool, machine_type)
        .await?;
    output::print_create_outcome(node_pool, &outcome);
    Ok(outcome)
}

/// Print a node's external address. A node without one is an error.
pub async fn run_node_ip(
    compute: &dyn ComputeApi,
    nodes: &dyn NodeApi,
    project: &str,
    zone: &str,
    hostname: &str,
) -> Result<String> {
    let lookup = InstanceResolver::new(compute, nodes, project, zone)
        .resolve_external_address(hostname)
        .await?;
    output::print_address(&lookup);

    match lookup {
        AddressLookup::Found { address, .. } => Ok(address),
        AddressLookup::Absent { .. } => {
            Err(GkupError::NoExternalAddress(hostname.to_string()).into())
        }
    }
}
