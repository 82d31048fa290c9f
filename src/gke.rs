pub mod client;
pub mod nodepool;
pub mod operation;
pub mod types;
pub mod upgrade;

pub use client::{ClusterApi, GkeClient};
pub use nodepool::{CreateOutcome, NodePoolCreator};
pub use operation::{GateStatus, OperationGate};
pub use types::{ClusterRef, ClusterSnapshot, ClusterUpdate, NewNodePool, NodePoolSnapshot};
pub use upgrade::{NodePoolReport, NodePoolStatus, UpgradeDriver, UpgradeOutcome};
