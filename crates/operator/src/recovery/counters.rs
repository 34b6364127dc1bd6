use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::task::JoinHandle;
use tracing::info;

use super::{ActionKind, RecoveryError};
use crate::{Error, Result};

/// Process-lifetime tally of recovery outcomes. Observational only.
#[derive(Clone)]
pub struct RecoveryCounters {
    registry: Registry,
    actions: IntCounterVec,
    failures: IntCounterVec,
    suppressed: IntCounter,
}

impl RecoveryCounters {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let actions = IntCounterVec::new(
            Opts::new(
                "autoheal_recovery_actions_total",
                "Successful recovery actions by kind.",
            ),
            &["action"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new(
                "autoheal_recovery_failures_total",
                "Recovery attempts that did not mutate the cluster, by reason.",
            ),
            &["reason"],
        )?;
        let suppressed = IntCounter::new(
            "autoheal_recovery_suppressed_total",
            "Recovery actions skipped because the target was cooling down.",
        )?;

        registry.register(Box::new(actions.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(suppressed.clone()))?;

        // Pre-create series so they export as 0 before the first success.
        for kind in ActionKind::KNOWN.iter() {
            actions.with_label_values(&[kind.as_str()]);
        }

        Ok(Self {
            registry,
            actions,
            failures,
            suppressed,
        })
    }

    pub fn record_success(&self, kind: &ActionKind) {
        self.actions.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_failure(&self, err: &RecoveryError) {
        self.failures.with_label_values(&[err.reason()]).inc();
    }

    pub fn record_suppressed(&self) {
        self.suppressed.inc();
    }

    pub fn successes(&self, kind: &ActionKind) -> u64 {
        self.actions.with_label_values(&[kind.as_str()]).get()
    }

    pub fn failures(&self, reason: &str) -> u64 {
        self.failures.with_label_values(&[reason]).get()
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed.get()
    }

    /// Successful actions per known kind.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        ActionKind::KNOWN
            .iter()
            .map(|kind| (kind.to_string(), self.successes(kind)))
            .collect()
    }

    /// Prometheus text exposition of every counter.
    pub fn gather(&self) -> Result<String> {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics not UTF-8: {}", e)))
    }
}

/// Logs the success tally every `period` until the runtime shuts down.
pub fn spawn_counter_logger(counters: Arc<RecoveryCounters>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!(
                counts = ?counters.snapshot(),
                suppressed = counters.suppressed(),
                "Recovery action counters"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_tracked_per_kind() {
        let counters = RecoveryCounters::new().unwrap();
        counters.record_success(&ActionKind::Restart);
        counters.record_success(&ActionKind::Restart);
        counters.record_success(&ActionKind::Scale);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot["restart"], 2);
        assert_eq!(snapshot["redeploy"], 0);
        assert_eq!(snapshot["scale"], 1);
    }

    #[test]
    fn test_instances_are_isolated() {
        let first = RecoveryCounters::new().unwrap();
        let second = RecoveryCounters::new().unwrap();
        first.record_success(&ActionKind::Redeploy);
        assert_eq!(first.successes(&ActionKind::Redeploy), 1);
        assert_eq!(second.successes(&ActionKind::Redeploy), 0);
    }

    #[test]
    fn test_gather_exposes_all_series() {
        let counters = RecoveryCounters::new().unwrap();
        counters.record_failure(&RecoveryError::UnknownAction("reboot".to_string()));
        counters.record_suppressed();

        let text = counters.gather().unwrap();
        assert!(text.contains("autoheal_recovery_actions_total{action=\"restart\"} 0"));
        assert!(text.contains("autoheal_recovery_failures_total{reason=\"unknown_action\"} 1"));
        assert!(text.contains("autoheal_recovery_suppressed_total 1"));
    }
}
