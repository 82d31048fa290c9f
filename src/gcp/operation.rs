//! Long-running operation records returned by GKE and Compute Engine.
//!
//! Both APIs return operations with the same `name`, `operationType`,
//! `status`, `targetLink` and `startTime` fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Lifecycle status of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    Aborting,
    #[default]
    Unspecified,
    Other(String),
}

impl From<String> for OperationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => OperationStatus::Pending,
            "RUNNING" => OperationStatus::Running,
            "DONE" => OperationStatus::Done,
            "ABORTING" => OperationStatus::Aborting,
            "" | "STATUS_UNSPECIFIED" => OperationStatus::Unspecified,
            _ => OperationStatus::Other(value),
        }
    }
}

impl OperationStatus {
    /// Only DONE is terminal. Unknown values count as in progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Done)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "PENDING"),
            OperationStatus::Running => write!(f, "RUNNING"),
            OperationStatus::Done => write!(f, "DONE"),
            OperationStatus::Aborting => write!(f, "ABORTING"),
            OperationStatus::Unspecified => write!(f, "STATUS_UNSPECIFIED"),
            OperationStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// An asynchronous, server-tracked unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub name: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default)]
    pub target_link: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
}

impl OperationRecord {
    pub fn is_in_progress(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Time since the operation started, when the API reported a start time.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = self.start_time.as_deref()?;
        let started = DateTime::parse_from_rfc3339(started).ok()?;
        Some(now.signed_duration_since(started.with_timezone(&Utc)))
    }
}
