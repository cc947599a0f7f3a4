//! Taikun CLI library
//!
//! Every command prints one JSON document on stdout; logs go to stderr.

pub mod commands;
pub mod error;
pub mod output;

pub use error::{Error, Result};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use taikun_common::telemetry::{LogFormat, TelemetryConfig};

use commands::{ConnectionArgs, Context};
use output::Report;

/// Taikun - wait on, create and list control-plane resources
#[derive(Parser, Debug)]
#[command(name = "taikun")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Human)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

/// `--log-format` values
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Human,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => LogFormat::Human,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a resource to become ready or to be deleted
    Wait(commands::wait::WaitArgs),
    /// Create or delete virtual clusters
    Vcluster(commands::vcluster::VclusterArgs),
    /// Delete projects
    Project(commands::project::ProjectArgs),
    /// Add servers to a project
    Server(commands::server::ServerArgs),
    /// List Kubernetes resources of a project
    K8s(commands::k8s::K8sArgs),
}

impl Cli {
    /// Tracing setup for this invocation
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            format: self.log_format.into(),
            ..TelemetryConfig::default()
        }
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<Report> {
        let ctx = Context::connect(&self.connection)?;

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, stopping");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
            }
        });

        self.dispatch(&ctx).await
    }

    async fn dispatch(self, ctx: &Context) -> Result<Report> {
        match self.command {
            Commands::Wait(args) => commands::wait::run(ctx, args).await,
            Commands::Vcluster(args) => commands::vcluster::run(ctx, args).await,
            Commands::Project(args) => commands::project::run(ctx, args).await,
            Commands::Server(args) => commands::server::run(ctx, args).await,
            Commands::K8s(args) => commands::k8s::run(ctx, args).await,
        }
    }
}
