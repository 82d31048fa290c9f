//! Kubernetes node lookups.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use tracing::debug;

use crate::error::GkupError;

/// Label carrying the node's hostname, which matches its compute instance name.
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    ExternalIp,
    InternalIp,
    Hostname,
    Other,
}

impl From<&str> for AddressKind {
    fn from(value: &str) -> Self {
        match value {
            "ExternalIP" => AddressKind::ExternalIp,
            "InternalIP" => AddressKind::InternalIp,
            "Hostname" => AddressKind::Hostname,
            _ => AddressKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub kind: AddressKind,
    pub address: String,
}

/// The parts of a Kubernetes node the orchestrator reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub unschedulable: bool,
    pub addresses: Vec<NodeAddress>,
}

impl NodeRecord {
    /// Hostname label, falling back to the object name.
    pub fn hostname(&self) -> &str {
        self.labels
            .get(HOSTNAME_LABEL)
            .map(String::as_str)
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn external_ip(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.kind == AddressKind::ExternalIp && !a.address.is_empty())
            .map(|a| a.address.as_str())
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        let unschedulable = node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);

        let addresses = node
            .status
            .as_ref()
            .and_then(|s| s.addresses.as_ref())
            .map(|addrs| {
                addrs
                    .iter()
                    .map(|a| NodeAddress {
                        kind: AddressKind::from(a.type_.as_str()),
                        address: a.address.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            labels: node.metadata.labels.clone().unwrap_or_default(),
            unschedulable,
            addresses,
        }
    }
}

#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn list_nodes(
        &self,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<NodeRecord>>;

    async fn get_node(&self, name: &str) -> Result<NodeRecord>;
}

/// `NodeApi` backed by the cluster API server.
#[derive(Clone)]
pub struct KubeNodeClient {
    client: kube::Client,
}

impl KubeNodeClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Connect through the named kubeconfig context. Without one, in-cluster
    /// config is tried before the current kubeconfig context.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(ctx) => {
                debug!(context = %ctx, "Loading kubeconfig context");
                let options = KubeConfigOptions {
                    context: Some(ctx.to_string()),
                    ..Default::default()
                };
                kube::Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| GkupError::Kubeconfig(format!("context '{}': {}", ctx, e)))?
            }
            None => {
                debug!("Inferring Kubernetes client configuration");
                kube::Config::infer()
                    .await
                    .map_err(|e| GkupError::Kubeconfig(e.to_string()))?
            }
        };

        let client =
            kube::Client::try_from(config).map_err(|e| GkupError::Kubeconfig(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl NodeApi for KubeNodeClient {
    async fn list_nodes(
        &self,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<NodeRecord>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let params = ListParams::default()
            .labels(label_selector)
            .fields(field_selector);

        let list = nodes.list(&params).await.map_err(|e| {
            GkupError::KubernetesApi(format!("Failed to list nodes ({}): {}", label_selector, e))
        })?;
        debug!("Found {} nodes for {}", list.items.len(), label_selector);

        Ok(list.items.iter().map(NodeRecord::from).collect())
    }

    async fn get_node(&self, name: &str) -> Result<NodeRecord> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node = nodes
            .get(name)
            .await
            .map_err(|e| GkupError::KubernetesApi(format!("Failed to get node {}: {}", name, e)))?;

        Ok(NodeRecord::from(&node))
    }
}
