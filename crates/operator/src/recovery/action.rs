use std::fmt;

use crate::alerts::Alert;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Restart,
    Redeploy,
    Scale,
    /// Carries the raw label value so it can be reported.
    Unknown(String),
}

impl ActionKind {
    pub const KNOWN: [ActionKind; 3] = [ActionKind::Restart, ActionKind::Redeploy, ActionKind::Scale];

    pub fn parse(raw: &str) -> Self {
        match raw {
            "restart" => ActionKind::Restart,
            "redeploy" => ActionKind::Redeploy,
            "scale" => ActionKind::Scale,
            other => ActionKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Restart => "restart",
            ActionKind::Redeploy => "redeploy",
            ActionKind::Scale => "scale",
            ActionKind::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAction {
    pub kind: ActionKind,
    pub pod: Option<String>,
    pub namespace: String,
    pub app: String,
    pub alert_name: String,
}

impl RecoveryAction {
    pub fn cooldown_key(&self) -> CooldownKey {
        CooldownKey::new(&self.namespace, &self.app)
    }

    /// Selector used to find the workload for `redeploy` and `scale`.
    pub fn app_selector(&self) -> String {
        format!("app={}", self.app)
    }
}

/// `namespace/app`, the unit of thrash prevention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CooldownKey(String);

impl CooldownKey {
    pub fn new(namespace: &str, app: &str) -> Self {
        Self(format!("{}/{}", namespace, app))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps an alert's labels to a recovery action.
///
/// Returns `None` when the alert carries no `recovery_action` label. The kind
/// is passed through unvalidated; the executor rejects unknown kinds. Status
/// is not looked at here, callers only translate firing alerts.
pub fn translate(alert: &Alert) -> Option<RecoveryAction> {
    let labels = &alert.labels;
    let kind = ActionKind::parse(labels.recovery_action()?);

    Some(RecoveryAction {
        kind,
        pod: labels.pod().map(str::to_string),
        namespace: labels.namespace_or_default().to_string(),
        app: labels.app_or_unknown().to_string(),
        alert_name: labels.alert_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertLabels, AlertStatus};
    use std::collections::HashMap;

    fn alert(labels: &[(&str, &str)]) -> Alert {
        Alert {
            labels: labels.iter().copied().collect::<AlertLabels>(),
            annotations: HashMap::new(),
            status: AlertStatus::Firing,
            starts_at: None,
            fingerprint: None,
            generator_url: None,
        }
    }

    #[test]
    fn test_translate_full_label_set() {
        let action = translate(&alert(&[
            ("alertname", "HighMemoryUsage"),
            ("recovery_action", "restart"),
            ("pod", "nodejs-app-abc"),
            ("namespace", "shop"),
            ("app", "nodejs-app"),
        ]))
        .unwrap();

        assert_eq!(
            action,
            RecoveryAction {
                kind: ActionKind::Restart,
                pod: Some("nodejs-app-abc".to_string()),
                namespace: "shop".to_string(),
                app: "nodejs-app".to_string(),
                alert_name: "HighMemoryUsage".to_string(),
            }
        );
        assert_eq!(action.cooldown_key().as_str(), "shop/nodejs-app");
        assert_eq!(action.app_selector(), "app=nodejs-app");
    }

    #[test]
    fn test_translate_without_action_label_is_none() {
        assert!(translate(&alert(&[("alertname", "Watchdog"), ("app", "x")])).is_none());
    }

    #[test]
    fn test_translate_applies_fallbacks() {
        let action = translate(&alert(&[("recovery_action", "scale")])).unwrap();
        assert_eq!(action.kind, ActionKind::Scale);
        assert_eq!(action.namespace, "default");
        assert_eq!(action.app, "unknown");
        assert_eq!(action.pod, None);
        assert_eq!(action.cooldown_key().as_str(), "default/unknown");
    }

    #[test]
    fn test_translate_uses_service_discovery_labels() {
        let action = translate(&alert(&[
            ("recovery_action", "restart"),
            ("kubernetes_pod_name", "web-1"),
            ("kubernetes_namespace", "shop"),
        ]))
        .unwrap();
        assert_eq!(action.namespace, "shop");
        assert_eq!(action.pod.as_deref(), Some("web-1"));
        assert_eq!(action.cooldown_key().as_str(), "shop/unknown");
    }

    #[test]
    fn test_translate_passes_unknown_kind_through() {
        let action = translate(&alert(&[("recovery_action", "reboot-node")])).unwrap();
        assert_eq!(action.kind, ActionKind::Unknown("reboot-node".to_string()));
        assert_eq!(action.kind.to_string(), "reboot-node");
    }

    #[test]
    fn test_translate_ignores_status() {
        let mut resolved = alert(&[("recovery_action", "redeploy")]);
        resolved.status = AlertStatus::Resolved;
        assert_eq!(translate(&resolved).unwrap().kind, ActionKind::Redeploy);
    }
}
