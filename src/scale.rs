//! Node pool grow and shrink through the backing managed instance group.

use anyhow::{Context, Result};
use tracing::info;

use crate::compute::ComputeApi;
use crate::gcp::OperationRecord;
use crate::gke::{ClusterApi, ClusterRef};
use crate::k8s::NodeApi;
use crate::resolver::InstanceResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowResult {
    pub instance_group: String,
    pub previous_size: i64,
    pub new_size: i64,
    pub operation: OperationRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShrinkOutcome {
    NothingToRemove,
    Removed {
        instance_group: String,
        instances: Vec<String>,
        operation: OperationRecord,
    },
}

pub struct ScaleController<'a> {
    cluster_api: &'a dyn ClusterApi,
    compute: &'a dyn ComputeApi,
}

impl<'a> ScaleController<'a> {
    pub fn new(cluster_api: &'a dyn ClusterApi, compute: &'a dyn ComputeApi) -> Self {
        Self {
            cluster_api,
            compute,
        }
    }

    /// Add one instance to the pool's group. No upper bound is enforced.
    pub async fn grow(&self, cluster: &ClusterRef, node_pool: &str) -> Result<GrowResult> {
        let pool = self.cluster_api.get_node_pool(cluster, node_pool).await?;
        let group = pool.instance_group_name()?;

        let record = self
            .compute
            .get_instance_group(&cluster.project, &cluster.zone, &group)
            .await
            .with_context(|| format!("Failed to describe instance group {}", group))?;
        let new_size = record.target_size + 1;

        let operation = self
            .compute
            .resize_instance_group(&cluster.project, &cluster.zone, &group, new_size)
            .await
            .with_context(|| format!("Failed to resize instance group {}", group))?;

        info!(
            node_pool = %node_pool,
            instance_group = %group,
            previous_size = record.target_size,
            new_size = new_size,
            "Requested node pool grow"
        );
        Ok(GrowResult {
            instance_group: group,
            previous_size: record.target_size,
            new_size,
            operation,
        })
    }

    /// Remove every cordoned node of the pool in one batched request.
    pub async fn shrink(
        &self,
        cluster: &ClusterRef,
        node_pool: &str,
        nodes: &dyn NodeApi,
    ) -> Result<ShrinkOutcome> {
        let pool = self.cluster_api.get_node_pool(cluster, node_pool).await?;

        let resolver = InstanceResolver::new(self.compute, nodes, &cluster.project, &cluster.zone);
        let instances = resolver.resolve_cordoned_instances(&pool).await?;
        if instances.is_empty() {
            info!(node_pool = %node_pool, "Nothing to remove");
            return Ok(ShrinkOutcome::NothingToRemove);
        }

        let group = pool.instance_group_name()?;
        let operation = self
            .compute
            .delete_instances(&cluster.project, &cluster.zone, &group, &instances)
            .await
            .with_context(|| format!("Failed to delete instances from group {}", group))?;

        info!(
            node_pool = %node_pool,
            instance_group = %group,
            count = instances.len(),
            "Requested removal of cordoned instances"
        );
        Ok(ShrinkOutcome::Removed {
            instance_group: group,
            instances,
            operation,
        })
    }
}
