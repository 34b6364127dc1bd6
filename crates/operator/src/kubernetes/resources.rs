use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Pod-template annotation whose change makes the Deployment controller roll
/// every pod. Same key `kubectl rollout restart` writes.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
}

pub fn format_restarted_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Merge patch touching only the pod-template restart annotation.
pub fn rollout_restart_patch(at: DateTime<Utc>) -> Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: format_restarted_at(at)
                    }
                }
            }
        }
    })
}

/// Merge patch for the scale subresource.
pub fn scale_patch(replicas: i32) -> Value {
    json!({ "spec": { "replicas": replicas } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rollout_restart_patch_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let patch = rollout_restart_patch(at);
        let value = &patch["spec"]["template"]["metadata"]["annotations"][RESTARTED_AT_ANNOTATION];
        assert_eq!(value, "2024-05-01T10:30:00Z");
        assert!(DateTime::parse_from_rfc3339(value.as_str().unwrap()).is_ok());
        // only the pod template is patched
        assert_eq!(patch["spec"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_scale_patch_shape() {
        assert_eq!(scale_patch(4), json!({ "spec": { "replicas": 4 } }));
    }
}
