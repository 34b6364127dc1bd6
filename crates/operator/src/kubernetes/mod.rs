mod client;
mod resources;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

pub use client::KubeClusterClient;
pub use resources::{
    format_restarted_at, rollout_restart_patch, scale_patch, WorkloadRef,
    RESTARTED_AT_ANNOTATION,
};

/// The mutations the recovery executor needs from the orchestration API.
///
/// Implementations report failures as [`crate::Error::Kubernetes`]; deadlines
/// are applied by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()>;

    /// Workloads in `namespace` matching `selector`, in the order the API
    /// server returned them.
    async fn list_workloads_by_label(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<WorkloadRef>>;

    async fn patch_rolling_restart_annotation(
        &self,
        namespace: &str,
        workload: &str,
        restarted_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Desired replicas from the scale subresource; `None` when unset.
    async fn get_replica_count(&self, namespace: &str, workload: &str) -> Result<Option<i32>>;

    async fn set_replica_count(&self, namespace: &str, workload: &str, replicas: i32)
        -> Result<()>;
}
