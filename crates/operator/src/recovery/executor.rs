use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{ActionKind, RecoveryAction, RecoveryError};
use crate::config::{RecoveryConfig, DEFAULT_KUBE_API_TIMEOUT};
use crate::kubernetes::{ClusterClient, WorkloadRef};

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub call_timeout: Duration,
    pub max_replicas: Option<i32>,
    pub strict_workload_match: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_KUBE_API_TIMEOUT,
            max_replicas: None,
            strict_workload_match: false,
        }
    }
}

impl From<&RecoveryConfig> for ExecutorOptions {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            call_timeout: config.kube_api_timeout,
            max_replicas: config.max_replicas,
            strict_workload_match: config.strict_workload_match,
        }
    }
}

/// What a successful recovery changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    PodDeleted {
        namespace: String,
        pod: String,
    },
    RolloutTriggered {
        workload: WorkloadRef,
        restarted_at: DateTime<Utc>,
    },
    Scaled {
        workload: WorkloadRef,
        from: i32,
        to: i32,
    },
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryOutcome::PodDeleted { namespace, pod } => {
                write!(f, "deleted pod {}/{}", namespace, pod)
            }
            RecoveryOutcome::RolloutTriggered { workload, .. } => {
                write!(f, "rolling restart of {}/{}", workload.namespace, workload.name)
            }
            RecoveryOutcome::Scaled { workload, from, to } => write!(
                f,
                "scaled {}/{} from {} to {} replicas",
                workload.namespace, workload.name, from, to
            ),
        }
    }
}

/// Dispatches a [`RecoveryAction`] to its mutation sequence.
///
/// Cooldown and counters are the caller's concern; the executor only talks to
/// the cluster.
pub struct RecoveryExecutor {
    client: Arc<dyn ClusterClient>,
    options: ExecutorOptions,
}

impl RecoveryExecutor {
    pub fn new(client: Arc<dyn ClusterClient>, options: ExecutorOptions) -> Self {
        Self { client, options }
    }

    pub async fn execute(&self, action: &RecoveryAction) -> Result<RecoveryOutcome, RecoveryError> {
        debug!(
            "Executing {} for {}/{} (alert {})",
            action.kind, action.namespace, action.app, action.alert_name
        );

        match &action.kind {
            ActionKind::Restart => self.restart_pod(action).await,
            ActionKind::Redeploy => self.rolling_restart(action).await,
            ActionKind::Scale => self.scale_up(action).await,
            ActionKind::Unknown(raw) => Err(RecoveryError::UnknownAction(raw.clone())),
        }
    }

    async fn restart_pod(&self, action: &RecoveryAction) -> Result<RecoveryOutcome, RecoveryError> {
        let pod = action.pod.as_deref().ok_or(RecoveryError::MissingPod)?;

        self.bounded("delete pod", self.client.delete_pod(&action.namespace, pod))
            .await?;

        // The owning controller recreates the pod; that is not verified here.
        info!("Deleted pod {}/{}", action.namespace, pod);
        Ok(RecoveryOutcome::PodDeleted {
            namespace: action.namespace.clone(),
            pod: pod.to_string(),
        })
    }

    async fn rolling_restart(
        &self,
        action: &RecoveryAction,
    ) -> Result<RecoveryOutcome, RecoveryError> {
        let workload = self.find_workload(action).await?;
        let restarted_at = Utc::now();

        self.bounded(
            "patch restart annotation",
            self.client.patch_rolling_restart_annotation(
                &workload.namespace,
                &workload.name,
                restarted_at,
            ),
        )
        .await?;

        info!(
            "Triggered rolling restart of {}/{}",
            workload.namespace, workload.name
        );
        Ok(RecoveryOutcome::RolloutTriggered {
            workload,
            restarted_at,
        })
    }

    async fn scale_up(&self, action: &RecoveryAction) -> Result<RecoveryOutcome, RecoveryError> {
        let workload = self.find_workload(action).await?;

        let current = self
            .bounded(
                "get replica count",
                self.client
                    .get_replica_count(&workload.namespace, &workload.name),
            )
            .await?
            .unwrap_or(1);

        let ceiling = self.options.max_replicas.unwrap_or(i32::MAX);
        let target = match current.checked_add(1) {
            Some(next) if current < ceiling => next.min(ceiling),
            _ => {
                return Err(RecoveryError::ReplicaCeiling {
                    workload: workload.name,
                    max: ceiling,
                })
            }
        };

        self.bounded(
            "set replica count",
            self.client
                .set_replica_count(&workload.namespace, &workload.name, target),
        )
        .await?;

        info!(
            "Scaled {}/{} from {} to {} replicas",
            workload.namespace, workload.name, current, target
        );
        Ok(RecoveryOutcome::Scaled {
            workload,
            from: current,
            to: target,
        })
    }

    async fn find_workload(&self, action: &RecoveryAction) -> Result<WorkloadRef, RecoveryError> {
        let selector = action.app_selector();
        let mut matches = self
            .bounded(
                "list workloads",
                self.client
                    .list_workloads_by_label(&action.namespace, &selector),
            )
            .await?;

        match matches.len() {
            0 => Err(RecoveryError::NoMatchingWorkload {
                namespace: action.namespace.clone(),
                selector,
            }),
            1 => Ok(matches.remove(0)),
            count if self.options.strict_workload_match => Err(RecoveryError::AmbiguousWorkload {
                namespace: action.namespace.clone(),
                selector,
                count,
            }),
            count => {
                warn!(
                    "{} workloads match {} in {}, acting on {}",
                    count, selector, action.namespace, matches[0].name
                );
                Ok(matches.remove(0))
            }
        }
    }

    /// Runs one cluster call under the configured deadline.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, RecoveryError>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match timeout(self.options.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(RecoveryError::Mutation { operation, source }),
            Err(_) => Err(RecoveryError::Timeout {
                operation,
                after: self.options.call_timeout,
            }),
        }
    }
}
