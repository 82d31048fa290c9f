//! Compute Engine REST client for managed instance groups and instances.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{InstanceGroupRecord, InstanceRecord, ManagedInstance};
use crate::gcp::{OperationRecord, RestClient};

pub const DEFAULT_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1/";

#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn get_instance_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<InstanceGroupRecord>;

    /// All members of the group, across pages.
    async fn list_managed_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<Vec<ManagedInstance>>;

    async fn resize_instance_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        size: i64,
    ) -> Result<OperationRecord>;

    /// Remove the given instances in one request.
    async fn delete_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        instances: &[String],
    ) -> Result<OperationRecord>;

    async fn get_instance(&self, project: &str, zone: &str, name: &str) -> Result<InstanceRecord>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedInstancesPage {
    #[serde(default)]
    managed_instances: Vec<ManagedInstance>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteInstancesRequest<'a> {
    instances: &'a [String],
}

#[derive(Clone)]
pub struct ComputeClient {
    rest: RestClient,
}

impl ComputeClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn group_path(project: &str, zone: &str, group: &str) -> String {
        format!(
            "projects/{}/zones/{}/instanceGroupManagers/{}",
            project, zone, group
        )
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn get_instance_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<InstanceGroupRecord> {
        debug!("Describing instance group manager {}", group);
        self.rest.get(&Self::group_path(project, zone, group)).await
    }

    async fn list_managed_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<Vec<ManagedInstance>> {
        let path = format!(
            "{}/listManagedInstances",
            Self::group_path(project, zone, group)
        );
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, String)> = page_token
                .iter()
                .map(|token| ("pageToken", token.clone()))
                .collect();
            let page: ManagedInstancesPage = self.rest.post_query(&path, &query).await?;
            instances.extend(page.managed_instances);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "Found {} managed instances in group {}",
            instances.len(),
            group
        );
        Ok(instances)
    }

    async fn resize_instance_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        size: i64,
    ) -> Result<OperationRecord> {
        debug!("Resizing instance group manager {} to {}", group, size);
        let path = format!("{}/resize", Self::group_path(project, zone, group));
        self.rest
            .post_query(&path, &[("size", size.to_string())])
            .await
    }

    async fn delete_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        instances: &[String],
    ) -> Result<OperationRecord> {
        debug!(
            "Deleting {} instances from group {}",
            instances.len(),
            group
        );
        let path = format!("{}/deleteInstances", Self::group_path(project, zone, group));
        self.rest
            .post(&path, &DeleteInstancesRequest { instances })
            .await
    }

    async fn get_instance(&self, project: &str, zone: &str, name: &str) -> Result<InstanceRecord> {
        debug!("Describing instance {}", name);
        let path = format!("projects/{}/zones/{}/instances/{}", project, zone, name);
        self.rest.get(&path).await
    }
}
