//! Alert-to-action decision and execution.

mod action;
mod cooldown;
mod counters;
mod engine;
mod executor;

use std::time::Duration;

use thiserror::Error;

pub use action::{translate, ActionKind, CooldownKey, RecoveryAction};
pub use cooldown::{CooldownGuard, CooldownPermit, Suppressed};
pub use counters::{spawn_counter_logger, RecoveryCounters};
pub use engine::{AlertOutcome, BatchReport, RecoveryEngine};
pub use executor::{ExecutorOptions, RecoveryExecutor, RecoveryOutcome};

/// Why a single alert's recovery did not happen. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no pod identifier on restart action")]
    MissingPod,
    #[error("no workload matches {selector} in namespace {namespace}")]
    NoMatchingWorkload { namespace: String, selector: String },
    #[error("{count} workloads match {selector} in namespace {namespace}")]
    AmbiguousWorkload {
        namespace: String,
        selector: String,
        count: usize,
    },
    #[error("{workload} already at replica ceiling {max}")]
    ReplicaCeiling { workload: String, max: i32 },
    #[error("unknown recovery action '{0}'")]
    UnknownAction(String),
    #[error("{operation} failed: {source}")]
    Mutation {
        operation: &'static str,
        #[source]
        source: crate::Error,
    },
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl RecoveryError {
    /// Stable label for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            RecoveryError::MissingPod => "missing_pod",
            RecoveryError::NoMatchingWorkload { .. } => "no_matching_workload",
            RecoveryError::AmbiguousWorkload { .. } => "ambiguous_workload",
            RecoveryError::ReplicaCeiling { .. } => "replica_ceiling",
            RecoveryError::UnknownAction(_) => "unknown_action",
            RecoveryError::Mutation { .. } => "mutation",
            RecoveryError::Timeout { .. } => "timeout",
        }
    }
}
