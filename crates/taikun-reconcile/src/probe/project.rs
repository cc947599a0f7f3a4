use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use taikun_common::Result;

use super::{bool_field, int_field, text_field, ProbeResult, StatusProbe};
use crate::classify::{HEALTH_HEALTHY, STATUS_READY};
use crate::client::{ApiRequest, ControlPlane};

/// One entry of the project list endpoint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectRecord {
    /// Project id
    pub id: i32,
    /// Project name
    pub name: String,
    /// Lifecycle status (e.g. `Ready`, `Updating`, `Failure`)
    pub status: String,
    /// Health (e.g. `Healthy`, `Warning`, `Unhealthy`)
    pub health: String,
    /// Whether the project runs Kubernetes
    pub is_kubernetes: bool,
    /// Read-only lock
    pub is_locked: bool,
    /// Whether the project is itself a virtual cluster
    pub is_virtual_cluster: bool,
    /// Parent project for virtual clusters
    pub parent_project_id: Option<i32>,
}

/// Whether a project can host a virtual cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostReadiness {
    /// It can
    Ready,
    /// It cannot, with the first failing condition
    NotReady(String),
}

impl ProjectRecord {
    /// Read a list entry field by field. Missing, null or mistyped fields
    /// fall back to their defaults; enum ordinals are kept as text.
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: int_field(value, "id").unwrap_or_default(),
            name: text_field(value, "name"),
            status: text_field(value, "status"),
            health: text_field(value, "health"),
            is_kubernetes: bool_field(value, "isKubernetes"),
            is_locked: bool_field(value, "isLocked"),
            is_virtual_cluster: bool_field(value, "isVirtualCluster"),
            parent_project_id: int_field(value, "parentProjectId"),
        }
    }

    /// Check the conditions for creating a virtual cluster inside this project
    pub fn virtual_cluster_readiness(&self) -> HostReadiness {
        if !self.is_kubernetes {
            return HostReadiness::NotReady("Not a Kubernetes project".to_string());
        }
        if self.status != STATUS_READY {
            return HostReadiness::NotReady(format!(
                "Status is {} (must be {})",
                self.status, STATUS_READY
            ));
        }
        if self.health != HEALTH_HEALTHY {
            let health = if self.health.is_empty() { "unknown" } else { &self.health };
            return HostReadiness::NotReady(format!(
                "Health is {} (must be {})",
                health, HEALTH_HEALTHY
            ));
        }
        if self.is_locked {
            return HostReadiness::NotReady("Project is locked (read-only)".to_string());
        }
        if self.is_virtual_cluster {
            return HostReadiness::NotReady(
                "Virtual clusters cannot host other virtual clusters".to_string(),
            );
        }
        HostReadiness::Ready
    }
}

#[derive(Deserialize)]
struct ProjectList {
    #[serde(default)]
    data: Vec<Value>,
}

/// Probe for a project, through the list endpoint filtered by id
pub struct ProjectProbe {
    client: Arc<dyn ControlPlane>,
    project_id: i32,
}

impl ProjectProbe {
    /// Probe for `project_id`
    pub fn new(client: Arc<dyn ControlPlane>, project_id: i32) -> Self {
        Self { client, project_id }
    }

    /// Fetch the project's record, `None` when the project does not exist
    pub async fn fetch_record(&self) -> Result<Option<(ProjectRecord, Value)>> {
        let response = self
            .client
            .execute(&ApiRequest::project_by_id(self.project_id))
            .await?
            .ensure_success("project probe")?;
        let list: ProjectList = response.json("project list")?;

        // The id filter yields at most one record; take the first
        match list.data.into_iter().next() {
            Some(raw) => Ok(Some((ProjectRecord::from_value(&raw), raw))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StatusProbe for ProjectProbe {
    type Output = ProbeResult;

    fn key(&self) -> String {
        format!("project {}", self.project_id)
    }

    async fn probe(&self) -> Result<ProbeResult> {
        Ok(match self.fetch_record().await? {
            Some((record, raw)) => {
                let health = Some(record.health).filter(|h| !h.is_empty());
                ProbeResult::observed(record.status, health, raw)
            }
            None => ProbeResult::absent(),
        })
    }
}
