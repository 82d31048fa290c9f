//! Node pool creation.

use anyhow::{Context, Result};
use tracing::info;

use super::client::ClusterApi;
use super::operation::{GateStatus, OperationGate};
use super::types::{ClusterRef, NewNodePool};
use crate::gcp::OperationRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Blocked { pending: Vec<OperationRecord> },
    Submitted { operation: OperationRecord },
}

pub struct NodePoolCreator<'a> {
    api: &'a dyn ClusterApi,
}

impl<'a> NodePoolCreator<'a> {
    pub fn new(api: &'a dyn ClusterApi) -> Self {
        Self { api }
    }

    /// Create a one-node pool on the newest version, unless another
    /// operation is still in flight.
    pub async fn create(
        &self,
        cluster: &ClusterRef,
        name: &str,
        machine_type: Option<String>,
    ) -> Result<CreateOutcome> {
        let gate = OperationGate::new(self.api);
        if let GateStatus::Blocked(pending) = gate.check(&cluster.project, &cluster.zone).await? {
            return Ok(CreateOutcome::Blocked { pending });
        }

        let pool = NewNodePool::new(name, machine_type);
        let operation = self
            .api
            .create_node_pool(cluster, &pool)
            .await
            .with_context(|| format!("Failed to create node pool {}", name))?;

        info!(
            cluster = %cluster.cluster,
            node_pool = %name,
            operation = %operation.name,
            "Requested node pool creation"
        );
        Ok(CreateOutcome::Submitted { operation })
    }
}
