//! GKE (Kubernetes Engine v1) REST client.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    ClusterRef, ClusterSnapshot, ClusterUpdate, NewNodePool, NodePoolSnapshot, ServerConfig,
};
use crate::error::GkupError;
use crate::gcp::{OperationRecord, RestClient};

pub const DEFAULT_ENDPOINT: &str = "https://container.googleapis.com/v1/";

/// Cluster control-plane operations used by the orchestrator.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_cluster(&self, cluster: &ClusterRef) -> Result<ClusterSnapshot>;

    async fn get_node_pool(
        &self,
        cluster: &ClusterRef,
        node_pool: &str,
    ) -> Result<NodePoolSnapshot>;

    async fn update_cluster(
        &self,
        cluster: &ClusterRef,
        update: &ClusterUpdate,
    ) -> Result<OperationRecord>;

    async fn list_operations(&self, project: &str, zone: &str) -> Result<Vec<OperationRecord>>;

    async fn get_server_config(&self, project: &str, zone: &str) -> Result<ServerConfig>;

    async fn create_node_pool(
        &self,
        cluster: &ClusterRef,
        node_pool: &NewNodePool,
    ) -> Result<OperationRecord>;
}

#[derive(Debug, Default, Deserialize)]
struct ListOperationsResponse {
    #[serde(default)]
    operations: Vec<OperationRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateClusterRequest {
    name: String,
    update: ClusterUpdateBody,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    desired_master_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    desired_node_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    desired_node_version: Option<String>,
}

impl From<&ClusterUpdate> for ClusterUpdateBody {
    fn from(update: &ClusterUpdate) -> Self {
        match update {
            ClusterUpdate::MasterVersion(version) => Self {
                desired_master_version: Some(version.clone()),
                ..Default::default()
            },
            ClusterUpdate::NodePoolVersion { node_pool, version } => Self {
                desired_node_pool_id: Some(node_pool.clone()),
                desired_node_version: Some(version.clone()),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateNodePoolRequest {
    node_pool: NodePoolBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodePoolBody {
    name: String,
    initial_node_count: i64,
    version: String,
    config: NodeConfigBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeConfigBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    machine_type: Option<String>,
}

impl From<&NewNodePool> for CreateNodePoolRequest {
    fn from(pool: &NewNodePool) -> Self {
        Self {
            node_pool: NodePoolBody {
                name: pool.name.clone(),
                initial_node_count: pool.initial_node_count,
                version: pool.version.clone(),
                config: NodeConfigBody {
                    machine_type: pool.machine_type.clone(),
                },
            },
        }
    }
}

/// GKE client over the zonal REST endpoints.
#[derive(Clone)]
pub struct GkeClient {
    rest: RestClient,
}

impl GkeClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

/// Map a 404 onto a more specific not-found error.
fn not_found_as(err: anyhow::Error, replacement: GkupError) -> anyhow::Error {
    match err.downcast_ref::<GkupError>() {
        Some(GkupError::Api { status: 404, .. }) => replacement.into(),
        _ => err,
    }
}

#[async_trait]
impl ClusterApi for GkeClient {
    async fn get_cluster(&self, cluster: &ClusterRef) -> Result<ClusterSnapshot> {
        debug!("Describing cluster: {}", cluster);

        self.rest
            .get(&cluster.path())
            .await
            .map_err(|e| not_found_as(e, GkupError::ClusterNotFound(cluster.to_string())))
    }

    async fn get_node_pool(
        &self,
        cluster: &ClusterRef,
        node_pool: &str,
    ) -> Result<NodePoolSnapshot> {
        debug!("Describing node pool {} in {}", node_pool, cluster);

        let path = format!("{}/nodePools/{}", cluster.path(), node_pool);
        self.rest
            .get(&path)
            .await
            .map_err(|e| not_found_as(e, GkupError::NodePoolNotFound(node_pool.to_string())))
    }

    async fn update_cluster(
        &self,
        cluster: &ClusterRef,
        update: &ClusterUpdate,
    ) -> Result<OperationRecord> {
        debug!("Updating cluster {}: {}", cluster, update);

        let request = UpdateClusterRequest {
            name: cluster.to_string(),
            update: ClusterUpdateBody::from(update),
        };
        self.rest.put(&cluster.path(), &request).await
    }

    async fn list_operations(&self, project: &str, zone: &str) -> Result<Vec<OperationRecord>> {
        debug!("Listing operations in {}/{}", project, zone);

        let path = format!("projects/{}/zones/{}/operations", project, zone);
        let response: ListOperationsResponse = self.rest.get(&path).await?;
        Ok(response.operations)
    }

    async fn get_server_config(&self, project: &str, zone: &str) -> Result<ServerConfig> {
        debug!("Fetching server config for {}/{}", project, zone);

        let path = format!("projects/{}/zones/{}/serverconfig", project, zone);
        self.rest.get(&path).await
    }

    async fn create_node_pool(
        &self,
        cluster: &ClusterRef,
        node_pool: &NewNodePool,
    ) -> Result<OperationRecord> {
        debug!("Creating node pool {} in {}", node_pool.name, cluster);

        let path = format!("{}/nodePools", cluster.path());
        self.rest
            .post(&path, &CreateNodePoolRequest::from(node_pool))
            .await
    }
}
