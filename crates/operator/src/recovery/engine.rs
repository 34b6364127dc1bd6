use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{
    translate, CooldownGuard, CooldownKey, RecoveryCounters, RecoveryError, RecoveryExecutor,
    RecoveryOutcome, Suppressed,
};
use crate::alerts::{Alert, AlertBatch};

/// Result of processing one alert of a batch.
#[derive(Debug)]
pub enum AlertOutcome {
    /// Status was not `firing`.
    NotFiring,
    /// No `recovery_action` label.
    Skipped,
    Suppressed {
        key: CooldownKey,
        reason: Suppressed,
    },
    Recovered {
        key: CooldownKey,
        outcome: RecoveryOutcome,
    },
    Failed {
        key: CooldownKey,
        error: RecoveryError,
    },
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AlertOutcome>,
}

impl BatchReport {
    pub fn recovered(&self) -> usize {
        self.count(|o| matches!(o, AlertOutcome::Recovered { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AlertOutcome::Failed { .. }))
    }

    pub fn suppressed(&self) -> usize {
        self.count(|o| matches!(o, AlertOutcome::Suppressed { .. }))
    }

    pub fn ignored(&self) -> usize {
        self.count(|o| matches!(o, AlertOutcome::NotFiring | AlertOutcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&AlertOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Shared across all concurrent webhook deliveries. Alerts of one batch are
/// processed strictly in order.
pub struct RecoveryEngine {
    executor: RecoveryExecutor,
    cooldown: Arc<CooldownGuard>,
    counters: Arc<RecoveryCounters>,
}

impl RecoveryEngine {
    pub fn new(
        executor: RecoveryExecutor,
        cooldown: Arc<CooldownGuard>,
        counters: Arc<RecoveryCounters>,
    ) -> Self {
        Self {
            executor,
            cooldown,
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<RecoveryCounters> {
        &self.counters
    }

    pub fn cooldown(&self) -> &Arc<CooldownGuard> {
        &self.cooldown
    }

    pub async fn handle_batch(&self, batch: &AlertBatch) -> BatchReport {
        let mut report = BatchReport::default();
        for alert in &batch.alerts {
            report.outcomes.push(self.handle_alert(alert).await);
        }

        info!(
            "Processed {} alerts: {} recovered, {} failed, {} suppressed, {} ignored",
            batch.alerts.len(),
            report.recovered(),
            report.failed(),
            report.suppressed(),
            report.ignored()
        );
        report
    }

    pub async fn handle_alert(&self, alert: &Alert) -> AlertOutcome {
        if !alert.is_firing() {
            debug!(
                "Ignoring {:?} alert {}",
                alert.status,
                alert.labels.alert_name()
            );
            return AlertOutcome::NotFiring;
        }

        let Some(action) = translate(alert) else {
            debug!(
                "Skipping alert {}: no recovery_action label",
                alert.labels.alert_name()
            );
            return AlertOutcome::Skipped;
        };

        let key = action.cooldown_key();
        let permit = match self.cooldown.try_acquire(&key) {
            Ok(permit) => permit,
            Err(reason) => {
                info!(
                    "Skipping {} for {} (alert {}): {:?}",
                    action.kind, key, action.alert_name, reason
                );
                self.counters.record_suppressed();
                return AlertOutcome::Suppressed { key, reason };
            }
        };

        // The cooldown lock is not held here; only the in-flight claim is.
        match self.executor.execute(&action).await {
            Ok(outcome) => {
                permit.commit();
                self.counters.record_success(&action.kind);
                info!(
                    "Recovery {} for alert {}: {}",
                    action.kind, action.alert_name, outcome
                );
                AlertOutcome::Recovered { key, outcome }
            }
            Err(error) => {
                drop(permit);
                self.counters.record_failure(&error);
                match &error {
                    RecoveryError::Mutation { .. } | RecoveryError::Timeout { .. } => error!(
                        "Recovery {} for {} (alert {}) failed: {}",
                        action.kind, key, action.alert_name, error
                    ),
                    _ => warn!(
                        "Recovery {} for {} (alert {}) not attempted: {}",
                        action.kind, key, action.alert_name, error
                    ),
                }
                AlertOutcome::Failed { key, error }
            }
        }
    }
}
