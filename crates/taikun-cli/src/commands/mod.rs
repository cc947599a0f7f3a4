//! CLI commands

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use taikun_common::config::load_config;
use taikun_common::DefaultsTable;
use taikun_reconcile::{
    ClientConfig, ControlPlane, HttpControlPlane, LockRegistry, Poller, Reconciler,
    ServerProvisioner, WaitOptions,
};

use crate::{Error, Result};

pub mod k8s;
pub mod project;
pub mod server;
pub mod vcluster;
pub mod wait;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
///
/// This reduces boilerplate for the common pattern of `.map_err(|e| Error::command_failed(e.to_string()))`.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Connection settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Control-plane host or base URL
    #[arg(long, global = true, env = "TAIKUN_API_HOST")]
    pub api_host: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "TAIKUN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config file (defaults to $TAIKUN_CONFIG, then ~/.taikun/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Timing flags shared by the commands that wait
#[derive(Args, Debug, Clone, Default)]
pub struct WaitFlags {
    /// Give up after this many seconds (default depends on the resource kind)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between status checks (default depends on the resource kind)
    #[arg(long, global = true, value_name = "SECS")]
    pub interval: Option<u64>,
}

impl WaitFlags {
    /// Options for a wait; `deleted` selects a deletion wait
    pub fn options(&self, deleted: bool) -> WaitOptions {
        WaitOptions {
            interval: self.interval.map(Duration::from_secs),
            timeout: self.timeout.map(Duration::from_secs),
            wait_for_deletion: deleted,
            await_appearance: false,
        }
    }
}

/// Everything a command needs to talk to the control plane
pub struct Context {
    /// Control-plane client
    pub client: Arc<dyn ControlPlane>,
    /// Per-kind wait defaults, after config-file overrides
    pub defaults: DefaultsTable,
    /// Fired on Ctrl-C; aborts waits in progress
    pub cancel: CancellationToken,
    /// Per-project locks for server adds
    pub locks: Arc<LockRegistry<i32>>,
}

impl Context {
    /// Context around an existing client
    pub fn new(client: Arc<dyn ControlPlane>, defaults: DefaultsTable) -> Self {
        Self {
            client,
            defaults,
            cancel: CancellationToken::new(),
            locks: Arc::new(LockRegistry::new()),
        }
    }

    /// Build the HTTP client from flags, environment and config file.
    ///
    /// The host resolves flag or `TAIKUN_API_HOST` first, then the config
    /// file, then the built-in default.
    pub fn connect(args: &ConnectionArgs) -> Result<Self> {
        let config = load_config(args.config.as_deref())?;
        let defaults = config.defaults_table()?;
        let host = args
            .api_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| config.api_host());

        let client = HttpControlPlane::new(ClientConfig::from_host(host).with_token(args.token.clone()))?;
        debug!(base_url = %client.base_url(), "Connecting to control plane");
        Ok(Self::new(Arc::new(client), defaults))
    }

    /// Poller wired to this context's cancellation token
    pub fn poller(&self) -> Poller {
        Poller::default().with_cancellation(self.cancel.clone())
    }

    /// Reconciler using this context's client, defaults and poller
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.client))
            .with_defaults(self.defaults.clone())
            .with_poller(self.poller())
    }

    /// Server provisioner sharing this context's lock registry
    pub fn provisioner(&self) -> ServerProvisioner {
        ServerProvisioner::new(Arc::clone(&self.client), Arc::clone(&self.locks))
            .with_defaults(self.defaults.server)
            .with_poller(self.poller())
    }
}
