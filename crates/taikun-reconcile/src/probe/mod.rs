//! Status probes
//!
//! A probe performs one query against the control plane and reduces the
//! answer to a point-in-time snapshot. Each resource kind needs its own
//! probe because each endpoint shapes its answer differently:
//!
//! - [`ProjectProbe`]: list filtered by id, found when the list is non-empty
//! - [`VirtualClusterProbe`]: list by parent, found on an exact name match
//! - [`ApplicationProbe`]: details by id, 404 means absent, tolerant decode
//! - [`ServerProbe`]: counts servers matching a filter (verify-after-add)

use async_trait::async_trait;
use serde_json::Value;

use taikun_common::Result;

mod application;
mod project;
mod server;
mod virtual_cluster;

pub use application::{decode_app_status, AppStatus, ApplicationProbe, StatusSource};
pub use project::{HostReadiness, ProjectProbe, ProjectRecord};
pub use server::{ServerFilter, ServerInventory, ServerProbe, ServerSummary};
pub use virtual_cluster::{VirtualClusterProbe, VirtualClusterRecord};

/// What the poller needs to know about a snapshot
pub trait Observation {
    /// Whether the resource exists
    fn found(&self) -> bool;
    /// Lifecycle status as reported by the backend
    fn status(&self) -> &str;
    /// Health, for kinds that report one
    fn health(&self) -> Option<&str>;
}

/// Canonical snapshot of a resource's reported state
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeResult {
    /// Whether the resource exists
    pub found: bool,
    /// Lifecycle status, empty when absent
    pub status: String,
    /// Health, for kinds that report one
    pub health: Option<String>,
    /// The record the status was read from
    pub raw: Value,
}

impl ProbeResult {
    /// Snapshot of a resource that does not exist
    pub fn absent() -> Self {
        Self {
            found: false,
            status: String::new(),
            health: None,
            raw: Value::Null,
        }
    }

    /// Snapshot of an existing resource
    pub fn observed(status: impl Into<String>, health: Option<String>, raw: Value) -> Self {
        Self {
            found: true,
            status: status.into(),
            health,
            raw,
        }
    }
}

impl Observation for ProbeResult {
    fn found(&self) -> bool {
        self.found
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn health(&self) -> Option<&str> {
        self.health.as_deref()
    }
}

/// One query against the backend yielding a snapshot
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Snapshot type produced on every tick
    type Output: Observation + Send;

    /// Identifies the target in log lines (e.g. `project 42`)
    fn key(&self) -> String;

    /// Query the backend once.
    ///
    /// `Err` for transport-level failures only; absence is `Ok` with
    /// `found() == false`.
    async fn probe(&self) -> Result<Self::Output>;
}

/// Read a string field, tolerating numbers and enums rendered as numbers
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text of `field`, empty when missing, null or not a scalar
pub(crate) fn text_field(value: &Value, field: &str) -> String {
    value.get(field).and_then(scalar_text).unwrap_or_default()
}

/// Integer `field`, when present and in range
pub(crate) fn int_field(value: &Value, field: &str) -> Option<i32> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

/// Boolean `field`; anything but `true` reads as false
pub(crate) fn bool_field(value: &Value, field: &str) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_snapshot_is_empty() {
        let r = ProbeResult::absent();
        assert!(!r.found());
        assert_eq!(r.status(), "");
        assert_eq!(r.health(), None);
    }

    #[test]
    fn scalar_text_accepts_scalars_only() {
        assert_eq!(scalar_text(&json!("Ready")), Some("Ready".to_string()));
        assert_eq!(scalar_text(&json!(3)), Some("3".to_string()));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({ "a": 1 })), None);
    }

    #[test]
    fn field_readers_tolerate_nulls_and_wrong_types() {
        let record = json!({ "status": 3, "health": null, "id": "x", "isLocked": null });
        assert_eq!(text_field(&record, "status"), "3");
        assert_eq!(text_field(&record, "health"), "");
        assert_eq!(text_field(&record, "missing"), "");
        assert_eq!(int_field(&record, "id"), None);
        assert!(!bool_field(&record, "isLocked"));
    }
}
