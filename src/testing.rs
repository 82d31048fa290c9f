//! In-memory collaborators for unit tests. Mutating calls are recorded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::compute::types::{AccessConfig, NetworkInterface, ONE_TO_ONE_NAT};
use crate::compute::{ComputeApi, InstanceGroupRecord, InstanceRecord, ManagedInstance};
use crate::error::GkupError;
use crate::gcp::{OperationRecord, OperationStatus};
use crate::gke::types::{NodeConfig, ServerConfig};
use crate::gke::{
    ClusterApi, ClusterRef, ClusterSnapshot, ClusterUpdate, NewNodePool, NodePoolSnapshot,
};
use crate::k8s::NodeRecord;
use crate::k8s::node::{AddressKind, HOSTNAME_LABEL, NodeAddress, NodeApi};
use crate::resolver::NODE_POOL_LABEL;

pub fn cluster_ref() -> ClusterRef {
    ClusterRef::new("p", "z", "prod")
}

pub fn operation(name: &str, kind: &str, status: OperationStatus) -> OperationRecord {
    OperationRecord {
        name: name.to_string(),
        operation_type: kind.to_string(),
        status,
        target_link: None,
        start_time: None,
    }
}

pub fn group_of(pool: &str) -> String {
    format!("gke-prod-{}-grp", pool)
}

pub fn instance_url(hostname: &str) -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/{}",
        hostname
    )
}

pub fn node_pool(name: &str, version: &str) -> NodePoolSnapshot {
    NodePoolSnapshot {
        name: name.to_string(),
        status: "RUNNING".to_string(),
        version: version.to_string(),
        config: NodeConfig::default(),
        instance_group_urls: vec![format!(
            "https://www.googleapis.com/compute/v1/projects/p/zones/z/instanceGroupManagers/{}",
            group_of(name)
        )],
    }
}

pub fn node(hostname: &str, pool: &str, cordoned: bool) -> NodeRecord {
    NodeRecord {
        name: hostname.to_string(),
        labels: BTreeMap::from([
            (HOSTNAME_LABEL.to_string(), hostname.to_string()),
            (NODE_POOL_LABEL.to_string(), pool.to_string()),
        ]),
        unschedulable: cordoned,
        addresses: vec![NodeAddress {
            kind: AddressKind::InternalIp,
            address: "10.0.0.2".to_string(),
        }],
    }
}

impl NodeRecord {
    pub fn with_external_ip(mut self, ip: &str) -> Self {
        self.addresses.push(NodeAddress {
            kind: AddressKind::ExternalIp,
            address: ip.to_string(),
        });
        self
    }
}

pub struct FakeCluster {
    snapshot: ClusterSnapshot,
    server_config: ServerConfig,
    operations: Mutex<Vec<OperationRecord>>,
    fail_operations: bool,
    updates: Mutex<Vec<ClusterUpdate>>,
    created: Mutex<Vec<NewNodePool>>,
}

impl FakeCluster {
    pub fn new(master_version: &str) -> Self {
        Self {
            snapshot: ClusterSnapshot {
                name: "prod".to_string(),
                status: "RUNNING".to_string(),
                current_master_version: master_version.to_string(),
                current_node_count: 0,
                node_pools: Vec::new(),
            },
            server_config: ServerConfig {
                valid_master_versions: vec![master_version.to_string()],
            },
            operations: Mutex::new(Vec::new()),
            fail_operations: false,
            updates: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pool(mut self, pool: NodePoolSnapshot) -> Self {
        self.snapshot.node_pools.push(pool);
        self
    }

    pub fn with_server_versions(mut self, versions: &[&str]) -> Self {
        self.server_config.valid_master_versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_operations(self, operations: Vec<OperationRecord>) -> Self {
        *self.operations.lock().unwrap() = operations;
        self
    }

    pub fn failing_operations(mut self) -> Self {
        self.fail_operations = true;
        self
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        self.snapshot.clone()
    }

    pub fn updates(&self) -> Vec<ClusterUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewNodePool> {
        self.created.lock().unwrap().clone()
    }

    /// Record a new in-flight operation, as the control plane would.
    fn start_operation(&self, kind: &str) -> OperationRecord {
        let mut ops = self.operations.lock().unwrap();
        let op = operation(
            &format!("operation-{}", ops.len() + 1),
            kind,
            OperationStatus::Running,
        );
        ops.push(op.clone());
        op
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_cluster(&self, _cluster: &ClusterRef) -> Result<ClusterSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn get_node_pool(
        &self,
        _cluster: &ClusterRef,
        node_pool: &str,
    ) -> Result<NodePoolSnapshot> {
        self.snapshot
            .node_pool(node_pool)
            .cloned()
            .ok_or_else(|| GkupError::NodePoolNotFound(node_pool.to_string()).into())
    }

    async fn update_cluster(
        &self,
        _cluster: &ClusterRef,
        update: &ClusterUpdate,
    ) -> Result<OperationRecord> {
        self.updates.lock().unwrap().push(update.clone());
        let kind = match update {
            ClusterUpdate::MasterVersion(_) => "UPGRADE_MASTER",
            ClusterUpdate::NodePoolVersion { .. } => "UPGRADE_NODES",
        };
        Ok(self.start_operation(kind))
    }

    async fn list_operations(&self, _project: &str, _zone: &str) -> Result<Vec<OperationRecord>> {
        if self.fail_operations {
            return Err(anyhow!("operations unavailable"));
        }
        Ok(self.operations.lock().unwrap().clone())
    }

    async fn get_server_config(&self, _project: &str, _zone: &str) -> Result<ServerConfig> {
        Ok(self.server_config.clone())
    }

    async fn create_node_pool(
        &self,
        _cluster: &ClusterRef,
        node_pool: &NewNodePool,
    ) -> Result<OperationRecord> {
        self.created.lock().unwrap().push(node_pool.clone());
        Ok(self.start_operation("CREATE_NODE_POOL"))
    }
}

#[derive(Default)]
pub struct FakeCompute {
    groups: HashMap<String, (i64, Vec<String>)>,
    instances: HashMap<String, Option<String>>,
    list_calls: Mutex<usize>,
    resizes: Mutex<Vec<(String, i64)>>,
    deletions: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: &str, target_size: i64, hostnames: &[&str]) -> Self {
        let urls = hostnames.iter().map(|h| instance_url(h)).collect();
        self.groups.insert(name.to_string(), (target_size, urls));
        self
    }

    /// Register an instance; `None` means no NAT mapping.
    pub fn with_instance(mut self, name: &str, nat_ip: Option<&str>) -> Self {
        self.instances
            .insert(name.to_string(), nat_ip.map(str::to_string));
        self
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn resizes(&self) -> Vec<(String, i64)> {
        self.resizes.lock().unwrap().clone()
    }

    pub fn deletions(&self) -> Vec<(String, Vec<String>)> {
        self.deletions.lock().unwrap().clone()
    }

    fn group(&self, name: &str) -> Result<&(i64, Vec<String>)> {
        self.groups
            .get(name)
            .ok_or_else(|| GkupError::gcp("fake", 404, "instance group not found").into())
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn get_instance_group(
        &self,
        _project: &str,
        _zone: &str,
        group: &str,
    ) -> Result<InstanceGroupRecord> {
        let (target_size, _) = self.group(group)?;
        Ok(InstanceGroupRecord {
            name: group.to_string(),
            target_size: *target_size,
        })
    }

    async fn list_managed_instances(
        &self,
        _project: &str,
        _zone: &str,
        group: &str,
    ) -> Result<Vec<ManagedInstance>> {
        *self.list_calls.lock().unwrap() += 1;
        let (_, urls) = self.group(group)?;
        Ok(urls
            .iter()
            .map(|url| ManagedInstance {
                instance: url.clone(),
            })
            .collect())
    }

    async fn resize_instance_group(
        &self,
        _project: &str,
        _zone: &str,
        group: &str,
        size: i64,
    ) -> Result<OperationRecord> {
        self.group(group)?;
        self.resizes.lock().unwrap().push((group.to_string(), size));
        Ok(operation(
            "operation-resize",
            "compute.instanceGroupManagers.resize",
            OperationStatus::Running,
        ))
    }

    async fn delete_instances(
        &self,
        _project: &str,
        _zone: &str,
        group: &str,
        instances: &[String],
    ) -> Result<OperationRecord> {
        self.group(group)?;
        self.deletions
            .lock()
            .unwrap()
            .push((group.to_string(), instances.to_vec()));
        Ok(operation(
            "operation-delete",
            "compute.instanceGroupManagers.deleteInstances",
            OperationStatus::Running,
        ))
    }

    async fn get_instance(
        &self,
        _project: &str,
        _zone: &str,
        name: &str,
    ) -> Result<InstanceRecord> {
        let nat_ip = self
            .instances
            .get(name)
            .ok_or_else(|| GkupError::gcp("fake", 404, "instance not found"))?;

        let access_configs = nat_ip
            .iter()
            .map(|ip| AccessConfig {
                kind: ONE_TO_ONE_NAT.to_string(),
                name: Some("External NAT".to_string()),
                nat_ip: Some(ip.clone()),
            })
            .collect();
        Ok(InstanceRecord {
            name: name.to_string(),
            status: "RUNNING".to_string(),
            network_interfaces: vec![NetworkInterface {
                name: Some("nic0".to_string()),
                network_ip: Some("10.0.0.2".to_string()),
                access_configs,
            }],
        })
    }
}

/// Returns every node on `list_nodes`; selectors are only recorded.
pub struct FakeNodes {
    nodes: Vec<NodeRecord>,
    selectors: Mutex<Vec<(String, String)>>,
    get_calls: Mutex<usize>,
}

impl FakeNodes {
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self {
            nodes,
            selectors: Mutex::new(Vec::new()),
            get_calls: Mutex::new(0),
        }
    }

    pub fn selectors(&self) -> Vec<(String, String)> {
        self.selectors.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        *self.get_calls.lock().unwrap()
    }
}

#[async_trait]
impl NodeApi for FakeNodes {
    async fn list_nodes(
        &self,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<NodeRecord>> {
        self.selectors
            .lock()
            .unwrap()
            .push((label_selector.to_string(), field_selector.to_string()));
        Ok(self.nodes.clone())
    }

    async fn get_node(&self, name: &str) -> Result<NodeRecord> {
        *self.get_calls.lock().unwrap() += 1;
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| GkupError::KubernetesApi(format!("node {} not found", name)).into())
    }
}
