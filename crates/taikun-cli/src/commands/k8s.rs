//! Kubernetes listing commands

use clap::{Args, Subcommand};
use serde_json::json;

use taikun_reconcile::pagination::list_kubernetes_resources;
use taikun_reconcile::{KubernetesResource, WindowRequest};

use super::Context;
use crate::output::Report;
use crate::Result;

/// Inspect Kubernetes resources of a project
#[derive(Args, Debug)]
pub struct K8sArgs {
    #[command(subcommand)]
    pub command: K8sCommand,
}

#[derive(Subcommand, Debug)]
pub enum K8sCommand {
    /// List one kind of resource, e.g. pods, deployments, pvc
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Project id
    pub project_id: i32,

    /// Resource kind (pods, deployments, services, configmaps, secrets,
    /// ingress, daemonsets, nodes, pvcs, statefulsets)
    pub resource: String,

    /// Records to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Maximum records to return, 0 for all
    #[arg(long, default_value_t = 0)]
    pub limit: u32,

    /// Search term passed to the backend
    #[arg(long)]
    pub search: Option<String>,
}

pub async fn run(ctx: &Context, args: K8sArgs) -> Result<Report> {
    match args.command {
        K8sCommand::List(args) => list(ctx, args).await,
    }
}

async fn list(ctx: &Context, args: ListArgs) -> Result<Report> {
    let resource: KubernetesResource = args.resource.parse()?;
    let window = WindowRequest {
        offset: args.offset,
        limit: args.limit,
        search: args.search.filter(|s| !s.is_empty()),
    };
    let items = list_kubernetes_resources(ctx.client.clone(), args.project_id, resource, &window).await?;

    Ok(Report::done(json!({
        "resource": resource.as_str(),
        "project": args.project_id,
        "count": items.len(),
        "items": items,
    })))
}
