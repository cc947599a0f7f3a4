//! Kind-aware entry point for waits
//!
//! [`Reconciler::await_reconciliation`] picks the probe, the classifier and
//! the defaults for a [`ResourceKey`], applies the caller's overrides and
//! hands the wait to the [`Poller`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use taikun_common::{DefaultsTable, ResourceKind, Result, WaitIntent, WaitSettings};

use crate::classify::{classify_single_axis, classify_two_axis, Verdict};
use crate::client::ControlPlane;
use crate::poller::{Poller, Reconciliation, ReconciliationRequest};
use crate::probe::{ApplicationProbe, ProbeResult, ProjectProbe, StatusProbe, VirtualClusterProbe};

/// Identifies a waitable resource
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Project by id
    Project(i32),
    /// Virtual cluster by name under its parent project
    VirtualCluster {
        /// Parent project id
        parent: i32,
        /// Cluster name
        name: String,
    },
    /// Installed application by project-app id
    Application(i32),
}

impl ResourceKey {
    /// Kind of the keyed resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceKey::Project(_) => ResourceKind::Project,
            ResourceKey::VirtualCluster { .. } => ResourceKind::VirtualCluster,
            ResourceKey::Application(_) => ResourceKind::Application,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Project(id) => write!(f, "project {}", id),
            ResourceKey::VirtualCluster { parent, name } => {
                write!(f, "virtual cluster {}/{}", parent, name)
            }
            ResourceKey::Application(id) => write!(f, "application {}", id),
        }
    }
}

/// Per-call overrides; unset values fall back to the kind's defaults
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// Poll interval override
    pub interval: Option<Duration>,
    /// Timeout override
    pub timeout: Option<Duration>,
    /// Wait for the resource to disappear instead of becoming ready
    pub wait_for_deletion: bool,
    /// The resource was just created and may not be listed yet
    pub await_appearance: bool,
}

impl WaitOptions {
    /// Wait for the ready state with default timing
    pub fn ready() -> Self {
        Self::default()
    }

    /// Wait for deletion with default timing
    pub fn deleted() -> Self {
        Self {
            wait_for_deletion: true,
            ..Self::default()
        }
    }

    fn intent(&self) -> WaitIntent {
        WaitIntent::from_deletion_flag(self.wait_for_deletion)
    }
}

/// Waits on projects, virtual clusters and applications
pub struct Reconciler {
    client: Arc<dyn ControlPlane>,
    defaults: DefaultsTable,
    poller: Poller,
}

impl Reconciler {
    /// Reconciler with built-in defaults and a tracing tick sink
    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        Self {
            client,
            defaults: DefaultsTable::default(),
            poller: Poller::default(),
        }
    }

    /// Replace the per-kind defaults (e.g. from the config file)
    pub fn with_defaults(mut self, defaults: DefaultsTable) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the poller (custom sink, cancellation)
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    /// The client waits are issued against
    pub fn client(&self) -> &Arc<dyn ControlPlane> {
        &self.client
    }

    /// The defaults in effect
    pub fn defaults(&self) -> &DefaultsTable {
        &self.defaults
    }

    /// The poller in effect
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Resolve options for `key` into a concrete request
    pub fn request_for(&self, key: &ResourceKey, options: &WaitOptions) -> Result<ReconciliationRequest> {
        let kind = key.kind();
        let intent = options.intent();
        let settings = WaitSettings::resolve(
            self.defaults.get(kind),
            kind,
            intent,
            options.interval,
            options.timeout,
        )?;
        Ok(ReconciliationRequest::new(kind, key.to_string(), settings, intent)
            .awaiting_appearance(options.await_appearance && !options.wait_for_deletion))
    }

    /// Wait until the keyed resource reaches a terminal state.
    ///
    /// `Err` only for invalid options; the remote side's behavior, including
    /// transport failures, is reported in the returned outcome.
    pub async fn await_reconciliation(
        &self,
        key: &ResourceKey,
        options: &WaitOptions,
    ) -> Result<Reconciliation<ProbeResult>> {
        let request = self.request_for(key, options)?;
        let client = Arc::clone(&self.client);

        match key {
            ResourceKey::Project(id) => {
                let probe = ProjectProbe::new(client, *id);
                self.run(&request, &probe, classify_two_axis).await
            }
            ResourceKey::VirtualCluster { parent, name } => {
                let probe = VirtualClusterProbe::new(client, *parent, name.clone());
                self.run(&request, &probe, classify_two_axis).await
            }
            ResourceKey::Application(id) => {
                let probe = ApplicationProbe::new(client, *id);
                self.run(&request, &probe, classify_single_axis).await
            }
        }
    }

    async fn run<P>(
        &self,
        request: &ReconciliationRequest,
        probe: &P,
        classify: fn(&ProbeResult) -> Verdict,
    ) -> Result<Reconciliation<ProbeResult>>
    where
        P: StatusProbe<Output = ProbeResult>,
    {
        self.poller.run(request, probe, classify).await
    }
}
