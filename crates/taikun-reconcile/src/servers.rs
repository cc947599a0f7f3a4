//! Verified server provisioning
//!
//! Adding servers is fire-and-forget on the backend, so the add is followed
//! by polling the project's server list until the expected number of
//! matching servers shows up. Several servers are matched by name prefix,
//! which would misattribute servers created by a concurrent add on the same
//! project; the per-project lock is therefore held across both the create
//! command and its verification.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use taikun_common::{Error, ResourceKind, Result, WaitDefaults, WaitIntent, WaitSettings};

use crate::classify::classify_server_count;
use crate::client::{ApiRequest, ControlPlane};
use crate::lock::LockRegistry;
use crate::poller::{Outcome, Poller, ReconciliationRequest};
use crate::probe::{ServerFilter, ServerProbe, ServerSummary, StatusProbe};

/// Roles a server can be created with
pub const SERVER_ROLES: [&str; 3] = ["Bastion", "Kubemaster", "Kubeworker"];

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

/// Command to add servers to a project
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddServers {
    /// Target project
    pub project_id: i32,
    /// Server name, or name prefix when adding several
    pub name: String,
    /// One of [`SERVER_ROLES`]
    pub role: String,
    /// Instance flavor
    pub flavor: String,
    /// How many servers; zero means one
    pub count: u32,
    /// Disk size in GiB; zero leaves the backend default
    pub disk_size_gib: u64,
}

impl AddServers {
    /// Number of servers the command creates
    pub fn expected(&self) -> u32 {
        self.count.max(1)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_for_field("name", "server name must not be empty"));
        }
        if !SERVER_ROLES.contains(&self.role.as_str()) {
            return Err(Error::validation_for_field(
                "role",
                format!(
                    "invalid role {:?}, expected one of {}",
                    self.role,
                    SERVER_ROLES.join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// JSON body of the create command
    pub fn body(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "role": self.role,
            "projectId": self.project_id,
            "flavor": self.flavor,
            "count": self.expected(),
        });
        if self.disk_size_gib > 0 {
            body["diskSize"] = json!(self.disk_size_gib.saturating_mul(BYTES_PER_GIB));
        }
        body
    }

    fn filter(&self) -> ServerFilter {
        ServerFilter {
            name: self.name.clone(),
            role: self.role.clone(),
            flavor: self.flavor.clone(),
            expected: self.expected(),
        }
    }
}

/// What a verified add observed
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAddReport {
    /// Summary line
    pub message: String,
    /// Whether the expected servers were seen before the deadline
    pub verified: bool,
    /// Servers requested
    pub expected: u32,
    /// Matching servers seen on the last probe
    pub found: u32,
    /// The matching servers
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerSummary>,
}

/// Adds servers and verifies they appear
pub struct ServerProvisioner {
    client: Arc<dyn ControlPlane>,
    registry: Arc<LockRegistry<i32>>,
    poller: Poller,
    defaults: WaitDefaults,
}

impl ServerProvisioner {
    /// Provisioner serializing adds through `registry`
    pub fn new(client: Arc<dyn ControlPlane>, registry: Arc<LockRegistry<i32>>) -> Self {
        Self {
            client,
            registry,
            poller: Poller::default(),
            defaults: WaitDefaults::for_kind(ResourceKind::Server),
        }
    }

    /// Replace the poller (custom sink, cancellation)
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    /// Replace the verification defaults
    pub fn with_defaults(mut self, defaults: WaitDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Create the servers, then poll until they are listed.
    ///
    /// A verification that runs out of time is an unverified report, not an
    /// error: the create command was accepted and the servers may still
    /// appear.
    pub async fn add_servers(
        &self,
        command: &AddServers,
        verify_timeout: Option<Duration>,
    ) -> Result<ServerAddReport> {
        command.validate()?;
        let settings = WaitSettings::resolve(
            &self.defaults,
            ResourceKind::Server,
            WaitIntent::Ready,
            None,
            verify_timeout,
        )?;
        let expected = command.expected();

        let _guard = self.registry.acquire(&command.project_id).await;

        self.client
            .execute(&ApiRequest::create_servers(command.body()))
            .await?
            .ensure_success("add servers")?;
        info!(
            project = command.project_id,
            name = %command.name,
            role = %command.role,
            count = expected,
            "Server create accepted, verifying"
        );

        let probe = ServerProbe::new(Arc::clone(&self.client), command.project_id, command.filter());
        let request = ReconciliationRequest::new(ResourceKind::Server, probe.key(), settings, WaitIntent::Ready);
        let result = self.poller.run(&request, &probe, classify_server_count).await?;

        let servers = result.last.map(|inventory| inventory.matched).unwrap_or_default();
        let found = u32::try_from(servers.len()).unwrap_or(u32::MAX);

        match result.outcome {
            Outcome::Ready => Ok(ServerAddReport {
                message: format!(
                    "Added {} server(s) of role {} with flavor {} to project {}",
                    expected, command.role, command.flavor, command.project_id
                ),
                verified: true,
                expected,
                found,
                servers,
            }),
            Outcome::TimedOut | Outcome::Cancelled => {
                warn!(
                    project = command.project_id,
                    expected,
                    found,
                    "Server create accepted but not verified"
                );
                Ok(ServerAddReport {
                    message: format!(
                        "Server create accepted but not verified ({} of {} found)",
                        found, expected
                    ),
                    verified: false,
                    expected,
                    found,
                    servers,
                })
            }
            Outcome::TransportError(e) => Err(e),
            other => Err(Error::internal_with_context(
                "add servers",
                format!("unexpected verification outcome: {}", other),
            )),
        }
    }
}
