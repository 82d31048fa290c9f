//! Maps cordoned Kubernetes nodes onto the compute instances backing them.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::compute::ComputeApi;
use crate::gke::NodePoolSnapshot;
use crate::k8s::NodeApi;

pub const NODE_POOL_LABEL: &str = "cloud.google.com/gke-nodepool";
pub const CORDONED_FIELD_SELECTOR: &str = "spec.unschedulable==true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    ComputeNat,
    NodeStatus,
}

/// Result of an external address lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressLookup {
    Found {
        address: String,
        source: AddressSource,
    },
    /// Looked up successfully, but there is no external address.
    Absent { source: AddressSource },
}

pub struct InstanceResolver<'a> {
    compute: &'a dyn ComputeApi,
    nodes: &'a dyn NodeApi,
    project: &'a str,
    zone: &'a str,
}

impl<'a> InstanceResolver<'a> {
    pub fn new(
        compute: &'a dyn ComputeApi,
        nodes: &'a dyn NodeApi,
        project: &'a str,
        zone: &'a str,
    ) -> Self {
        Self {
            compute,
            nodes,
            project,
            zone,
        }
    }

    /// Instance URLs of the pool's cordoned nodes, in node order, deduplicated.
    ///
    /// A pool without a backing instance group is an error even when nothing
    /// is cordoned.
    pub async fn resolve_cordoned_instances(&self, pool: &NodePoolSnapshot) -> Result<Vec<String>> {
        let group = pool.instance_group_name()?;
        let label_selector = format!("{}={}", NODE_POOL_LABEL, pool.name);
        let nodes = self
            .nodes
            .list_nodes(&label_selector, CORDONED_FIELD_SELECTOR)
            .await
            .with_context(|| format!("Failed to list nodes of node pool {}", pool.name))?;

        let cordoned: Vec<_> = nodes
            .iter()
            .filter(|n| n.unschedulable)
            .filter(|n| n.labels.get(NODE_POOL_LABEL) == Some(&pool.name))
            .collect();

        if cordoned.is_empty() {
            debug!(node_pool = %pool.name, "No cordoned nodes");
            return Ok(Vec::new());
        }

        let managed = self
            .compute
            .list_managed_instances(self.project, self.zone, &group)
            .await
            .with_context(|| format!("Failed to list instances of group {}", group))?;

        let mut resolved: Vec<String> = Vec::with_capacity(cordoned.len());
        for node in cordoned {
            let hostname = node.hostname();
            match managed.iter().find(|mi| mi.matches_hostname(hostname)) {
                Some(mi) if !resolved.contains(&mi.instance) => resolved.push(mi.instance.clone()),
                Some(_) => {}
                None => warn!(
                    node_pool = %pool.name,
                    instance_group = %group,
                    "Cordoned node {} has no matching instance, skipping",
                    hostname
                ),
            }
        }

        info!(
            node_pool = %pool.name,
            instance_group = %group,
            count = resolved.len(),
            "Resolved cordoned instances"
        );
        Ok(resolved)
    }

    /// External address of a node: the instance's NAT address first, the
    /// node's `ExternalIP` only when the instance lookup fails.
    pub async fn resolve_external_address(&self, hostname: &str) -> Result<AddressLookup> {
        let compute_err = match self
            .compute
            .get_instance(self.project, self.zone, hostname)
            .await
        {
            Ok(instance) => {
                return Ok(match instance.nat_ip() {
                    Some(ip) => AddressLookup::Found {
                        address: ip.to_string(),
                        source: AddressSource::ComputeNat,
                    },
                    None => AddressLookup::Absent {
                        source: AddressSource::ComputeNat,
                    },
                });
            }
            Err(e) => e,
        };

        warn!(
            "Instance lookup for {} failed, falling back to node status: {:#}",
            hostname, compute_err
        );

        let node = self.nodes.get_node(hostname).await.with_context(|| {
            format!(
                "Failed to resolve address of {} (instance lookup: {:#})",
                hostname, compute_err
            )
        })?;

        Ok(match node.external_ip() {
            Some(ip) => AddressLookup::Found {
                address: ip.to_string(),
                source: AddressSource::NodeStatus,
            },
            None => AddressLookup::Absent {
                source: AddressSource::NodeStatus,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GkupError;
    use crate::testing::{FakeCompute, FakeNodes, group_of, instance_url, node, node_pool};

    fn pool() -> NodePoolSnapshot {
        node_pool("pool-a", "1.18.3")
    }

    #[tokio::test]
    async fn test_no_cordoned_nodes_yields_empty() {
        let compute = FakeCompute::new().with_group(&group_of("pool-a"), 3, &["a-1", "a-2", "a-3"]);
        let nodes = FakeNodes::new(vec![
            node("a-1", "pool-a", false),
            node("a-2", "pool-a", false),
        ]);

        let resolver = InstanceResolver::new(&compute, &nodes, "p", "z");
        assert!(resolver.resolve_cordoned_instances(&pool()).await.unwrap().is_empty());
        assert_eq!(compute.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolves_each_cordoned_node_once() {
        let compute = FakeCompute::new().with_group(&group_of("pool-a"), 3, &["a-1", "a-2", "a-3"]);
        let nodes = FakeNodes::new(vec![
            node("a-1", "pool-a", true),
            node("a-2", "pool-a", false),
            node("a-3", "pool-a", true),
            node("a-3", "pool-a", true),
            node("b-1", "pool-b", true),
        ]);

        let resolver = InstanceResolver::new(&compute, &nodes, "p", "z");
        let instances = resolver.resolve_cordoned_instances(&pool()).await.unwrap();
        assert_eq!(instances, vec![instance_url("a-1"), instance_url("a-3")]);
        assert_eq!(
            nodes.selectors(),
            vec![(
                "cloud.google.com/gke-nodepool=pool-a".to_string(),
                "spec.unschedulable==true".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_unmatched_hostname_is_skipped() {
        let compute = FakeCompute::new().with_group(&group_of("pool-a"), 2, &["a-1"]);
        let nodes = FakeNodes::new(vec![
            node("a-1", "pool-a", true),
            node("a-9", "pool-a", true),
        ]);

        let resolver = InstanceResolver::new(&compute, &nodes, "p", "z");
        let instances = resolver.resolve_cordoned_instances(&pool()).await.unwrap();
        assert_eq!(instances, vec![instance_url("a-1")]);
    }

    #[tokio::test]
    async fn test_pool_without_instance_group_is_fatal() {
        let compute = FakeCompute::new();
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", true)]);
        let mut pool = pool();
        pool.instance_group_urls.clear();

        let err = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_cordoned_instances(&pool)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GkupError>(),
            Some(GkupError::MissingInstanceGroup(_))
        ));
    }

    #[tokio::test]
    async fn test_pool_without_instance_group_and_nothing_cordoned_is_fatal() {
        let compute = FakeCompute::new();
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", false)]);
        let mut pool = pool();
        pool.instance_group_urls.clear();

        let err = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_cordoned_instances(&pool)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GkupError>(),
            Some(GkupError::MissingInstanceGroup(_))
        ));
        assert!(nodes.selectors().is_empty());
    }

    #[tokio::test]
    async fn test_nat_address_preferred() {
        let compute = FakeCompute::new().with_instance("a-1", Some("34.1.2.3"));
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", false).with_external_ip("35.9.9.9")]);

        let lookup = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_external_address("a-1")
            .await
            .unwrap();
        assert_eq!(
            lookup,
            AddressLookup::Found {
                address: "34.1.2.3".to_string(),
                source: AddressSource::ComputeNat
            }
        );
        assert_eq!(nodes.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_instance_without_nat_is_absent() {
        let compute = FakeCompute::new().with_instance("a-1", None);
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", false).with_external_ip("35.9.9.9")]);

        let lookup = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_external_address("a-1")
            .await
            .unwrap();
        assert_eq!(
            lookup,
            AddressLookup::Absent {
                source: AddressSource::ComputeNat
            }
        );
        assert_eq!(nodes.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_node_status() {
        let compute = FakeCompute::new();
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", false).with_external_ip("35.9.9.9")]);

        let lookup = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_external_address("a-1")
            .await
            .unwrap();
        assert_eq!(
            lookup,
            AddressLookup::Found {
                address: "35.9.9.9".to_string(),
                source: AddressSource::NodeStatus
            }
        );
    }

    #[tokio::test]
    async fn test_fallback_without_external_ip_is_absent() {
        let compute = FakeCompute::new();
        let nodes = FakeNodes::new(vec![node("a-1", "pool-a", false)]);

        let lookup = InstanceResolver::new(&compute, &nodes, "p", "z")
            .resolve_external_address("a-1")
            .await
            .unwrap();
        assert_eq!(
            lookup,
            AddressLookup::Absent {
                source: AddressSource::NodeStatus
            }
        );
    }

    #[tokio::test]
    async fn test_both_sources_failing_is_error() {
        let compute = FakeCompute::new();
        let nodes = FakeNodes::new(Vec::new());

        assert!(
            InstanceResolver::new(&compute, &nodes, "p", "z")
                .resolve_external_address("a-1")
                .await
                .is_err()
        );
    }
}
