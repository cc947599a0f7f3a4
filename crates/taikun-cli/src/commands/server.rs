//! Server commands

use std::time::Duration;

use clap::{Args, Subcommand};
use taikun_reconcile::{AddServers, OutcomeState};

use super::{CommandErrorExt, Context};
use crate::output::Report;
use crate::Result;

/// Manage project servers
#[derive(Args, Debug)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Add servers to a project and verify they are listed
    Add(AddArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Project id
    pub project_id: i32,

    /// Server name, used as a prefix when adding several
    #[arg(long)]
    pub name: String,

    /// Bastion, Kubemaster or Kubeworker
    #[arg(long)]
    pub role: String,

    /// Instance flavor
    #[arg(long)]
    pub flavor: String,

    /// Number of servers
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Disk size in GiB
    #[arg(long, value_name = "GIB", default_value_t = 0)]
    pub disk_size: u64,

    /// Seconds to wait for the servers to be listed
    #[arg(long, value_name = "SECS")]
    pub verify_timeout: Option<u64>,
}

impl AddArgs {
    fn command(&self) -> AddServers {
        AddServers {
            project_id: self.project_id,
            name: self.name.clone(),
            role: self.role.clone(),
            flavor: self.flavor.clone(),
            count: self.count,
            disk_size_gib: self.disk_size,
        }
    }
}

pub async fn run(ctx: &Context, args: ServerArgs) -> Result<Report> {
    match args.command {
        ServerCommand::Add(args) => add(ctx, args).await,
    }
}

async fn add(ctx: &Context, args: AddArgs) -> Result<Report> {
    let verify_timeout = args.verify_timeout.map(Duration::from_secs);
    let report = ctx
        .provisioner()
        .add_servers(&args.command(), verify_timeout)
        .await?;

    let state = if report.verified {
        OutcomeState::Done
    } else {
        OutcomeState::Pending
    };
    let document = serde_json::to_value(&report).cmd_err()?;
    Ok(Report::new(state, document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{context, FakePlane};
    use crate::Error;
    use serde_json::json;

    fn args(count: u32) -> AddArgs {
        AddArgs {
            project_id: 8,
            name: "worker".to_string(),
            role: "Kubeworker".to_string(),
            flavor: "m1.large".to_string(),
            count,
            disk_size: 30,
            verify_timeout: Some(20),
        }
    }

    fn listed(names: &[&str]) -> serde_json::Value {
        let servers: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                json!({ "id": i + 1, "name": name, "role": "Kubeworker", "flavor": "m1.large", "status": "Pending" })
            })
            .collect();
        json!({ "data": servers })
    }

    #[tokio::test(start_paused = true)]
    async fn verified_add_is_done() {
        let plane = FakePlane::answering(vec![
            (200, json!({})),
            (200, listed(&["worker-1"])),
            (200, listed(&["worker-1", "worker-2"])),
        ]);

        let report = add(&context(&plane), args(2)).await.unwrap();

        assert_eq!(report.state, OutcomeState::Done);
        assert_eq!(report.document["state"], "done");
        assert_eq!(report.document["verified"], true);
        assert_eq!(report.document["found"], 2);
        assert_eq!(report.document["servers"][1]["name"], "worker-2");

        let requests = plane.requests.lock().unwrap();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["diskSize"], json!(30u64 * 1024 * 1024 * 1024));
        assert_eq!(body["count"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_add_is_pending() {
        let empty = listed(&[]);
        let plane = FakePlane::answering(vec![
            (200, json!({})),
            (200, empty.clone()),
            (200, empty.clone()),
            (200, empty.clone()),
            (200, empty.clone()),
            (200, empty.clone()),
            (200, empty),
        ]);

        let report = add(&context(&plane), args(1)).await.unwrap();

        assert_eq!(report.state, OutcomeState::Pending);
        assert_eq!(report.document["state"], "pending");
        assert_eq!(report.document["verified"], false);
        assert_eq!(report.exit_status(), 2);
    }

    #[tokio::test]
    async fn invalid_role_is_rejected_before_any_request() {
        let plane = FakePlane::answering(vec![]);
        let mut bad = args(1);
        bad.role = "Master".to_string();

        let err = add(&context(&plane), bad).await.unwrap_err();

        assert!(matches!(err, Error::Taikun(_)));
        assert!(plane.paths().is_empty());
    }
}
