use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Pod};
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams},
    Client,
};
use tracing::debug;

use super::{resources, ClusterClient, WorkloadRef};
use crate::Result;

/// [`ClusterClient`] backed by the Kubernetes API. Workloads are Deployments.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Connects using in-cluster config or the local kubeconfig.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()> {
        debug!("Deleting pod {}/{}", namespace, pod);
        self.pods(namespace)
            .delete(pod, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn list_workloads_by_label(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<WorkloadRef>> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default().labels(selector))
            .await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|deployment| deployment.metadata.name)
            .map(|name| WorkloadRef {
                name,
                namespace: namespace.to_string(),
            })
            .collect())
    }

    async fn patch_rolling_restart_annotation(
        &self,
        namespace: &str,
        workload: &str,
        restarted_at: DateTime<Utc>,
    ) -> Result<()> {
        let patch = resources::rollout_restart_patch(restarted_at);
        self.deployments(namespace)
            .patch(workload, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn get_replica_count(&self, namespace: &str, workload: &str) -> Result<Option<i32>> {
        let scale = self.deployments(namespace).get_scale(workload).await?;
        Ok(scale.spec.and_then(|spec| spec.replicas))
    }

    async fn set_replica_count(
        &self,
        namespace: &str,
        workload: &str,
        replicas: i32,
    ) -> Result<()> {
        let patch = resources::scale_patch(replicas);
        self.deployments(namespace)
            .patch_scale(workload, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
