use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use taikun_common::Result;

use super::{int_field, text_field, Observation, StatusProbe};
use crate::client::{ApiRequest, ControlPlane};

/// A server as reported by the project server list
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    /// Server id
    pub id: i32,
    /// Server name
    pub name: String,
    /// Cloud role (`Bastion`, `Kubemaster`, `Kubeworker`)
    pub role: String,
    /// Provisioning status
    pub status: String,
    /// Primary address, empty until assigned
    pub ip_address: String,
    /// Instance flavor
    pub flavor: String,
}

impl ServerSummary {
    // Role and status come back as strings or enum ordinals depending on
    // the backend version
    fn from_value(value: &Value) -> Self {
        Self {
            id: int_field(value, "id").unwrap_or_default(),
            name: text_field(value, "name"),
            role: text_field(value, "role"),
            status: text_field(value, "status"),
            ip_address: text_field(value, "ipAddress"),
            flavor: text_field(value, "flavor"),
        }
    }
}

/// Which servers count towards a verification
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerFilter {
    /// Name, exact for a single server and a prefix for several; empty matches all
    pub name: String,
    /// Role; empty matches all
    pub role: String,
    /// Flavor; empty matches all
    pub flavor: String,
    /// How many matching servers are expected
    pub expected: u32,
}

impl ServerFilter {
    /// Whether `server` counts towards the expected total
    pub fn matches(&self, server: &ServerSummary) -> bool {
        if !self.name.is_empty() {
            let name_ok = if self.expected > 1 {
                server.name.starts_with(&self.name)
            } else {
                server.name == self.name
            };
            if !name_ok {
                return false;
            }
        }
        if !self.role.is_empty() && server.role != self.role {
            return false;
        }
        if !self.flavor.is_empty() && server.flavor != self.flavor {
            return false;
        }
        true
    }
}

/// Servers matching a filter at one point in time
#[derive(Clone, Debug, PartialEq)]
pub struct ServerInventory {
    /// Matching servers
    pub matched: Vec<ServerSummary>,
    /// How many were expected
    pub expected: u32,
    status: String,
}

impl ServerInventory {
    /// Inventory from the matching servers
    pub fn new(matched: Vec<ServerSummary>, expected: u32) -> Self {
        let status = format!("{}/{} matched", matched.len(), expected);
        Self {
            matched,
            expected,
            status,
        }
    }

    /// Number of matching servers
    pub fn found_count(&self) -> u32 {
        u32::try_from(self.matched.len()).unwrap_or(u32::MAX)
    }
}

impl Observation for ServerInventory {
    // The project's server list always exists; an empty match is a count
    // of zero, not an absent resource
    fn found(&self) -> bool {
        true
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn health(&self) -> Option<&str> {
        None
    }
}

#[derive(Deserialize)]
struct ServerList {
    #[serde(default)]
    data: Vec<Value>,
}

/// Counts the servers of a project that match a filter
pub struct ServerProbe {
    client: Arc<dyn ControlPlane>,
    project_id: i32,
    filter: ServerFilter,
}

impl ServerProbe {
    /// Probe the servers of `project_id`
    pub fn new(client: Arc<dyn ControlPlane>, project_id: i32, filter: ServerFilter) -> Self {
        Self {
            client,
            project_id,
            filter,
        }
    }
}

#[async_trait]
impl StatusProbe for ServerProbe {
    type Output = ServerInventory;

    fn key(&self) -> String {
        format!("servers of project {}", self.project_id)
    }

    async fn probe(&self) -> Result<ServerInventory> {
        let response = self
            .client
            .execute(&ApiRequest::project_servers(self.project_id))
            .await?
            .ensure_success("server probe")?;
        let list: ServerList = response.json("server list")?;

        let matched = list
            .data
            .iter()
            .map(ServerSummary::from_value)
            .filter(|server| self.filter.matches(server))
            .collect();
        Ok(ServerInventory::new(matched, self.filter.expected))
    }
}
