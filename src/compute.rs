pub mod client;
pub mod types;

pub use client::{ComputeApi, ComputeClient};
pub use types::{InstanceGroupRecord, InstanceRecord, ManagedInstance};
