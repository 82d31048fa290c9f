pub mod node;

pub use node::{KubeNodeClient, NodeApi, NodeRecord};
