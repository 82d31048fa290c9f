//! Operation concurrency gate.
//!
//! Any unfinished operation in the project/zone, whatever its kind, blocks a
//! new structural mutation. This is a best-effort check-then-act gate: two
//! invocations racing each other can both observe "clear" before either
//! mutation lands. The control plane rejects conflicting structural changes
//! on its own; callers needing real mutual exclusion must serialize
//! invocations externally (e.g. with a distributed lock).

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::client::ClusterApi;
use crate::gcp::OperationRecord;

/// Result of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Clear,
    Blocked(Vec<OperationRecord>),
}

pub struct OperationGate<'a> {
    api: &'a dyn ClusterApi,
}

impl<'a> OperationGate<'a> {
    pub fn new(api: &'a dyn ClusterApi) -> Self {
        Self { api }
    }

    /// Operations whose status is not terminal.
    pub async fn list_in_flight(&self, project: &str, zone: &str) -> Result<Vec<OperationRecord>> {
        let operations = self
            .api
            .list_operations(project, zone)
            .await
            .context("Failed to list cluster operations")?;
        let total = operations.len();

        let in_flight: Vec<OperationRecord> = operations
            .into_iter()
            .filter(OperationRecord::is_in_progress)
            .collect();

        debug!(
            project = %project,
            zone = %zone,
            total = total,
            in_flight = in_flight.len(),
            "Checked operation gate"
        );
        Ok(in_flight)
    }

    pub async fn has_in_flight(&self, project: &str, zone: &str) -> Result<bool> {
        Ok(!self.list_in_flight(project, zone).await?.is_empty())
    }

    /// Evaluate the gate. Call immediately before the mutation it guards.
    pub async fn check(&self, project: &str, zone: &str) -> Result<GateStatus> {
        let in_flight = self.list_in_flight(project, zone).await?;
        if in_flight.is_empty() {
            return Ok(GateStatus::Clear);
        }

        for op in &in_flight {
            info!(
                operation = %op.name,
                operation_type = %op.operation_type,
                status = %op.status,
                "Operation in progress"
            );
        }
        Ok(GateStatus::Blocked(in_flight))
    }
}
