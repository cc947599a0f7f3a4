//! Terminal-state classification
//!
//! Only exact sentinel values end a wait. Anything the classifier does not
//! recognize, including empty or garbled statuses, keeps polling.

use crate::probe::{Observation, ServerInventory};

/// Lifecycle status of a converged resource
pub const STATUS_READY: &str = "Ready";
/// Lifecycle status of a failed application or virtual cluster
pub const STATUS_FAILED: &str = "Failed";
/// Lifecycle status of a failed project
pub const STATUS_FAILURE: &str = "Failure";
/// Health of a converged resource
pub const HEALTH_HEALTHY: &str = "Healthy";
/// Health of a broken resource
pub const HEALTH_UNHEALTHY: &str = "Unhealthy";

/// What one snapshot means for the wait
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Still converging
    Continue,
    /// Reached the desired state
    Ready,
    /// Reached a terminal failure
    Failed(String),
}

fn is_failed_status(status: &str) -> bool {
    status == STATUS_FAILED || status == STATUS_FAILURE
}

/// Classifier for kinds reporting both status and health (projects,
/// virtual clusters).
///
/// Ready needs both axes green; either axis red is a failure.
pub fn classify_two_axis<O: Observation>(observation: &O) -> Verdict {
    let status = observation.status();
    let health = observation.health().unwrap_or_default();

    if is_failed_status(status) {
        return Verdict::Failed(format!("status is {} (health {})", status, display(health)));
    }
    if health == HEALTH_UNHEALTHY {
        return Verdict::Failed(format!("health is {} (status {})", health, display(status)));
    }
    if status == STATUS_READY && health == HEALTH_HEALTHY {
        return Verdict::Ready;
    }
    Verdict::Continue
}

/// Classifier for kinds reporting only a status (applications)
pub fn classify_single_axis<O: Observation>(observation: &O) -> Verdict {
    match observation.status() {
        STATUS_READY => Verdict::Ready,
        STATUS_FAILED => Verdict::Failed(format!("status is {}", STATUS_FAILED)),
        _ => Verdict::Continue,
    }
}

/// Classifier for verify-after-add: ready once enough servers match
pub fn classify_server_count(inventory: &ServerInventory) -> Verdict {
    if inventory.found_count() >= inventory.expected {
        Verdict::Ready
    } else {
        Verdict::Continue
    }
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}
