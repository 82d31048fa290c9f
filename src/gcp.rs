//! Shared Google Cloud plumbing: access tokens, REST calls, operations.

pub mod operation;
pub mod rest;
pub mod token;

pub use operation::{OperationRecord, OperationStatus};
pub use rest::RestClient;
