//! Poll interval and timeout defaults per resource kind
//!
//! Every wait resolves its interval and timeout here: the per-kind default
//! from [`DefaultsTable`], replaced by a per-call override when one is given.
//! Overrides of zero mean "not set".

use std::time::Duration;

use crate::kind::ResourceKind;
use crate::{Error, Result};

/// Project: poll every 30s, 10 minutes to become ready, 5 minutes to disappear
pub const PROJECT_DEFAULTS: WaitDefaults = WaitDefaults {
    interval: Duration::from_secs(30),
    ready_timeout: Duration::from_secs(600),
    deleted_timeout: Some(Duration::from_secs(300)),
};

/// Virtual cluster: poll every 10s, 15 minutes either way
pub const VIRTUAL_CLUSTER_DEFAULTS: WaitDefaults = WaitDefaults {
    interval: Duration::from_secs(10),
    ready_timeout: Duration::from_secs(900),
    deleted_timeout: Some(Duration::from_secs(900)),
};

/// Application: poll every 10s, 60s to become ready, 30s to disappear
pub const APPLICATION_DEFAULTS: WaitDefaults = WaitDefaults {
    interval: Duration::from_secs(10),
    ready_timeout: Duration::from_secs(60),
    deleted_timeout: Some(Duration::from_secs(30)),
};

/// Server verify-after-add: poll every 5s for up to 5 minutes
pub const SERVER_DEFAULTS: WaitDefaults = WaitDefaults {
    interval: Duration::from_secs(5),
    ready_timeout: Duration::from_secs(300),
    deleted_timeout: None,
};

/// What a wait is waiting for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitIntent {
    /// The resource reaches its ready state
    Ready,
    /// The resource disappears
    Deleted,
}

impl WaitIntent {
    /// Intent matching a `wait_for_deletion` flag
    pub fn from_deletion_flag(wait_for_deletion: bool) -> Self {
        if wait_for_deletion {
            WaitIntent::Deleted
        } else {
            WaitIntent::Ready
        }
    }
}

/// Default interval and timeouts for one resource kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitDefaults {
    /// Delay between probes
    pub interval: Duration,
    /// Deadline when waiting for the ready state
    pub ready_timeout: Duration,
    /// Deadline when waiting for deletion; `None` if the kind has no delete wait
    pub deleted_timeout: Option<Duration>,
}

impl WaitDefaults {
    /// Built-in defaults for a kind
    pub const fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Project => PROJECT_DEFAULTS,
            ResourceKind::VirtualCluster => VIRTUAL_CLUSTER_DEFAULTS,
            ResourceKind::Application => APPLICATION_DEFAULTS,
            ResourceKind::Server => SERVER_DEFAULTS,
        }
    }

    fn timeout_for(&self, intent: WaitIntent) -> Option<Duration> {
        match intent {
            WaitIntent::Ready => Some(self.ready_timeout),
            WaitIntent::Deleted => self.deleted_timeout,
        }
    }
}

/// Per-kind defaults for the whole process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultsTable {
    /// Project defaults
    pub project: WaitDefaults,
    /// Virtual cluster defaults
    pub virtual_cluster: WaitDefaults,
    /// Application defaults
    pub application: WaitDefaults,
    /// Server verification defaults
    pub server: WaitDefaults,
}

impl Default for DefaultsTable {
    fn default() -> Self {
        Self {
            project: PROJECT_DEFAULTS,
            virtual_cluster: VIRTUAL_CLUSTER_DEFAULTS,
            application: APPLICATION_DEFAULTS,
            server: SERVER_DEFAULTS,
        }
    }
}

impl DefaultsTable {
    /// Defaults for one kind
    pub fn get(&self, kind: ResourceKind) -> &WaitDefaults {
        match kind {
            ResourceKind::Project => &self.project,
            ResourceKind::VirtualCluster => &self.virtual_cluster,
            ResourceKind::Application => &self.application,
            ResourceKind::Server => &self.server,
        }
    }

    /// Mutable defaults for one kind
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut WaitDefaults {
        match kind {
            ResourceKind::Project => &mut self.project,
            ResourceKind::VirtualCluster => &mut self.virtual_cluster,
            ResourceKind::Application => &mut self.application,
            ResourceKind::Server => &mut self.server,
        }
    }
}

/// Interval and timeout for one concrete wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitSettings {
    /// Delay between probes
    pub interval: Duration,
    /// Deadline measured from the start of the wait
    pub timeout: Duration,
}

impl WaitSettings {
    /// Resolve settings for `kind` and `intent`, applying per-call overrides.
    ///
    /// Zero overrides fall back to the defaults. Asking for a deletion wait on
    /// a kind without a deletion default is a validation error unless an
    /// explicit timeout is supplied.
    pub fn resolve(
        defaults: &WaitDefaults,
        kind: ResourceKind,
        intent: WaitIntent,
        interval_override: Option<Duration>,
        timeout_override: Option<Duration>,
    ) -> Result<Self> {
        let interval = non_zero(interval_override).unwrap_or(defaults.interval);
        let timeout = match non_zero(timeout_override) {
            Some(timeout) => timeout,
            None => defaults.timeout_for(intent).ok_or_else(|| {
                Error::validation_for_field(
                    "wait_for_deletion",
                    format!("{} does not support waiting for deletion", kind),
                )
            })?,
        };

        if interval.is_zero() {
            return Err(Error::validation_for_field(
                "interval",
                format!("poll interval for {} must be greater than zero", kind),
            ));
        }
        if timeout.is_zero() {
            return Err(Error::validation_for_field(
                "timeout",
                format!("timeout for {} must be greater than zero", kind),
            ));
        }

        Ok(Self { interval, timeout })
    }
}

fn non_zero(value: Option<Duration>) -> Option<Duration> {
    value.filter(|d| !d.is_zero())
}
