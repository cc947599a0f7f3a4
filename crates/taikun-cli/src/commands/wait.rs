//! Wait command: block until a resource is ready or gone

use clap::{Args, Subcommand};

use taikun_reconcile::ResourceKey;

use super::{Context, WaitFlags};
use crate::output::Report;
use crate::Result;

/// Wait for a resource to become ready, or to disappear with --deleted
#[derive(Args, Debug)]
pub struct WaitArgs {
    #[command(subcommand)]
    pub target: WaitTarget,

    /// Wait for the resource to be deleted instead of ready
    #[arg(long, global = true)]
    pub deleted: bool,

    #[command(flatten)]
    pub flags: WaitFlags,
}

#[derive(Subcommand, Debug)]
pub enum WaitTarget {
    /// A project, until Ready and Healthy
    Project {
        /// Project id
        id: i32,
    },
    /// A virtual cluster, located by name under its parent project
    Vcluster {
        /// Parent project id
        parent: i32,
        /// Virtual cluster name
        name: String,
    },
    /// An installed application, until Ready
    App {
        /// Project application id
        id: i32,
    },
}

impl WaitTarget {
    fn key(self) -> ResourceKey {
        match self {
            WaitTarget::Project { id } => ResourceKey::Project(id),
            WaitTarget::Vcluster { parent, name } => ResourceKey::VirtualCluster { parent, name },
            WaitTarget::App { id } => ResourceKey::Application(id),
        }
    }
}

pub async fn run(ctx: &Context, args: WaitArgs) -> Result<Report> {
    let options = args.flags.options(args.deleted);
    let key = args.target.key();
    let result = ctx.reconciler().await_reconciliation(&key, &options).await?;
    Ok(Report::from_reconciliation(&key.to_string(), &result))
}
