//! Virtual cluster commands
//!
//! `create` checks that the parent project can host a virtual cluster before
//! issuing the command, and can wait for the new cluster to become ready.
//! `delete` addresses the virtual cluster by its own project id.

use clap::{Args, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use taikun_reconcile::probe::{HostReadiness, ProjectProbe};
use taikun_reconcile::{ApiRequest, ResourceKey, WaitOptions};

use super::{Context, WaitFlags};
use crate::output::Report;
use crate::Result;

/// Manage virtual clusters
#[derive(Args, Debug)]
pub struct VclusterArgs {
    #[command(subcommand)]
    pub command: VclusterCommand,
}

#[derive(Subcommand, Debug)]
pub enum VclusterCommand {
    /// Create a virtual cluster inside a parent project
    Create(CreateArgs),
    /// Delete a virtual cluster
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Parent project id
    pub parent: i32,

    /// Virtual cluster name
    pub name: String,

    /// Delete the cluster automatically once it expires
    #[arg(long)]
    pub delete_on_expiration: bool,

    /// Expiration timestamp (RFC 3339), passed through to the backend
    #[arg(long)]
    pub expired_at: Option<String>,

    /// Alerting profile to attach
    #[arg(long)]
    pub alerting_profile_id: Option<i32>,

    /// Skip the parent readiness check
    #[arg(long)]
    pub skip_preflight: bool,

    /// Wait until the cluster is Ready and Healthy
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub flags: WaitFlags,
}

impl CreateArgs {
    fn body(&self) -> Value {
        let mut body = json!({
            "projectId": self.parent,
            "name": self.name,
            "deleteOnExpiration": self.delete_on_expiration,
        });
        if let Some(expired_at) = self.expired_at.as_deref().filter(|s| !s.is_empty()) {
            body["expiredAt"] = json!(expired_at);
        }
        if let Some(profile) = self.alerting_profile_id.filter(|id| *id != 0) {
            body["alertingProfileId"] = json!(profile);
        }
        body
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Project id of the virtual cluster
    pub id: i32,

    /// Wait until the cluster is gone
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub flags: WaitFlags,
}

pub async fn run(ctx: &Context, args: VclusterArgs) -> Result<Report> {
    match args.command {
        VclusterCommand::Create(args) => create(ctx, args).await,
        VclusterCommand::Delete(args) => delete(ctx, args).await,
    }
}

async fn create(ctx: &Context, args: CreateArgs) -> Result<Report> {
    if !args.skip_preflight {
        let parent = ProjectProbe::new(ctx.client.clone(), args.parent)
            .fetch_record()
            .await?;
        let readiness = match parent {
            Some((record, _)) => record.virtual_cluster_readiness(),
            None => HostReadiness::NotReady(format!("Project {} not found", args.parent)),
        };
        if let HostReadiness::NotReady(reason) = readiness {
            return Ok(Report::failed(format!(
                "Project {} cannot host a virtual cluster: {}",
                args.parent, reason
            )));
        }
    }

    ctx.client
        .execute(&ApiRequest::create_virtual_cluster(args.body()))
        .await?
        .ensure_success("create virtual cluster")?;
    info!(parent = args.parent, name = %args.name, "Virtual cluster creation initiated");

    let action = format!(
        "Virtual cluster '{}' creation initiated in project {}",
        args.name, args.parent
    );
    if !args.wait {
        return Ok(Report::done(json!({ "message": action })));
    }

    let key = ResourceKey::VirtualCluster {
        parent: args.parent,
        name: args.name.clone(),
    };
    let options = WaitOptions {
        await_appearance: true,
        ..args.flags.options(false)
    };
    let result = ctx.reconciler().await_reconciliation(&key, &options).await?;
    Ok(Report::from_reconciliation(&key.to_string(), &result).with("action", json!(action)))
}

async fn delete(ctx: &Context, args: DeleteArgs) -> Result<Report> {
    ctx.client
        .execute(&ApiRequest::delete_virtual_cluster(args.id))
        .await?
        .ensure_success("delete virtual cluster")?;
    info!(project = args.id, "Virtual cluster deletion requested");

    let action = format!("Virtual cluster with project id {} deletion requested", args.id);
    if !args.wait {
        return Ok(Report::done(json!({ "message": action })));
    }

    // The cluster is looked up through the project list by its own id, with
    // virtual-cluster timing
    let vc = ctx.defaults.virtual_cluster;
    let mut options: WaitOptions = args.flags.options(true);
    options.interval = options.interval.filter(|d| !d.is_zero()).or(Some(vc.interval));
    options.timeout = options.timeout.filter(|d| !d.is_zero()).or(vc.deleted_timeout);

    let key = ResourceKey::Project(args.id);
    let result = ctx.reconciler().await_reconciliation(&key, &options).await?;
    Ok(Report::from_reconciliation(&key.to_string(), &result).with("action", json!(action)))
}
