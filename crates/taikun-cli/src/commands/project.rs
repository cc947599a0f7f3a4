//! Project commands

use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;

use taikun_reconcile::{ApiRequest, ResourceKey};

use super::{Context, WaitFlags};
use crate::output::Report;
use crate::Result;

/// Manage projects
#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Delete a project
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Project id
    pub id: i32,

    /// Wait until the project is gone
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub flags: WaitFlags,
}

pub async fn run(ctx: &Context, args: ProjectArgs) -> Result<Report> {
    match args.command {
        ProjectCommand::Delete(args) => delete(ctx, args).await,
    }
}

async fn delete(ctx: &Context, args: DeleteArgs) -> Result<Report> {
    ctx.client
        .execute(&ApiRequest::delete_project(args.id))
        .await?
        .ensure_success("delete project")?;
    info!(project = args.id, "Project deletion requested");

    let action = format!("Project {} deletion requested", args.id);
    if !args.wait {
        return Ok(Report::done(json!({ "message": action })));
    }

    let key = ResourceKey::Project(args.id);
    let result = ctx
        .reconciler()
        .await_reconciliation(&key, &args.flags.options(true))
        .await?;
    Ok(Report::from_reconciliation(&key.to_string(), &result).with("action", json!(action)))
}
