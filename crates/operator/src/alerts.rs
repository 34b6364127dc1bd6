//! AlertManager webhook payload.
//!
//! Label names are the integration surface with the alerting rules and are
//! treated as a stable protocol; every lookup goes through [`AlertLabels`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const LABEL_RECOVERY_ACTION: &str = "recovery_action";
pub const LABEL_POD: &str = "pod";
pub const LABEL_NAMESPACE: &str = "namespace";
pub const LABEL_APP: &str = "app";
pub const LABEL_ALERT_NAME: &str = "alertname";
/// Prometheus Kubernetes service-discovery names, consulted when the short
/// labels are missing.
pub const LABEL_KUBERNETES_POD_NAME: &str = "kubernetes_pod_name";
pub const LABEL_KUBERNETES_NAMESPACE: &str = "kubernetes_namespace";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const UNKNOWN_APP: &str = "unknown";

/// A batch as posted by AlertManager. Only `alerts` is required; the group
/// metadata AlertManager adds is accepted and ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertBatch {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Alert {
    #[serde(default)]
    pub labels: AlertLabels,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub status: AlertStatus,
    #[serde(rename = "startsAt", default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(rename = "generatorURL", default)]
    pub generator_url: Option<String>,
}

impl Alert {
    pub fn is_firing(&self) -> bool {
        self.status == AlertStatus::Firing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
    /// Anything else AlertManager might send; handled like `resolved`.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AlertLabels(HashMap<String, String>);

impl AlertLabels {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Empty values count as absent.
    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn recovery_action(&self) -> Option<&str> {
        self.non_empty(LABEL_RECOVERY_ACTION)
    }

    pub fn alert_name(&self) -> &str {
        self.get(LABEL_ALERT_NAME).unwrap_or_default()
    }

    pub fn pod(&self) -> Option<&str> {
        self.non_empty(LABEL_POD)
            .or_else(|| self.non_empty(LABEL_KUBERNETES_POD_NAME))
    }

    pub fn namespace_or_default(&self) -> &str {
        self.non_empty(LABEL_NAMESPACE)
            .or_else(|| self.non_empty(LABEL_KUBERNETES_NAMESPACE))
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn app_or_unknown(&self) -> &str {
        self.non_empty(LABEL_APP).unwrap_or(UNKNOWN_APP)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AlertLabels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_alertmanager_payload() {
        let payload = json!({
            "receiver": "autoheal",
            "status": "firing",
            "groupLabels": {},
            "alerts": [
                {
                    "status": "firing",
                    "labels": {
                        "alertname": "HighMemoryUsage",
                        "recovery_action": "restart",
                        "pod": "nodejs-app-abc",
                        "namespace": "default",
                        "app": "nodejs-app"
                    },
                    "annotations": { "summary": "memory above 90%" },
                    "startsAt": "2024-05-01T10:00:00Z",
                    "fingerprint": "abc123"
                },
                {
                    "status": "resolved",
                    "labels": { "alertname": "HighLatency" }
                }
            ]
        });

        let batch: AlertBatch = serde_json::from_value(payload).unwrap();
        assert_eq!(batch.alerts.len(), 2);

        let first = &batch.alerts[0];
        assert!(first.is_firing());
        assert_eq!(first.labels.alert_name(), "HighMemoryUsage");
        assert_eq!(first.labels.recovery_action(), Some("restart"));
        assert_eq!(first.labels.pod(), Some("nodejs-app-abc"));
        assert_eq!(first.annotations["summary"], "memory above 90%");
        assert_eq!(first.fingerprint.as_deref(), Some("abc123"));

        let second = &batch.alerts[1];
        assert_eq!(second.status, AlertStatus::Resolved);
        assert!(second.annotations.is_empty());
    }

    #[test]
    fn test_unrecognised_status_is_not_a_decode_error() {
        let alert: Alert =
            serde_json::from_value(json!({ "status": "suppressed", "labels": {} })).unwrap();
        assert_eq!(alert.status, AlertStatus::Unknown);
        assert!(!alert.is_firing());
    }

    #[test]
    fn test_missing_alerts_field_fails() {
        assert!(serde_json::from_value::<AlertBatch>(json!({ "status": "firing" })).is_err());
    }

    #[test]
    fn test_label_fallbacks() {
        let labels: AlertLabels = [("namespace", ""), ("pod", "")].into_iter().collect();
        assert_eq!(labels.namespace_or_default(), "default");
        assert_eq!(labels.app_or_unknown(), "unknown");
        assert_eq!(labels.pod(), None);
        assert_eq!(labels.recovery_action(), None);
        assert_eq!(labels.alert_name(), "");
    }

    #[test]
    fn test_service_discovery_label_fallbacks() {
        let labels: AlertLabels = [
            ("kubernetes_pod_name", "web-1"),
            ("kubernetes_namespace", "shop"),
        ]
        .into_iter()
        .collect();
        assert_eq!(labels.pod(), Some("web-1"));
        assert_eq!(labels.namespace_or_default(), "shop");

        // short labels win when both are present
        let labels: AlertLabels = [
            ("pod", "web-2"),
            ("kubernetes_pod_name", "web-1"),
            ("namespace", "default"),
            ("kubernetes_namespace", "shop"),
        ]
        .into_iter()
        .collect();
        assert_eq!(labels.pod(), Some("web-2"));
        assert_eq!(labels.namespace_or_default(), "default");
    }
}
