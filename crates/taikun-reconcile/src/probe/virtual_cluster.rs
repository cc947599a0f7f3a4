use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use taikun_common::Result;

use super::{int_field, text_field, ProbeResult, StatusProbe};
use crate::client::{ApiRequest, ControlPlane};

/// One entry of the virtual-cluster list endpoint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VirtualClusterRecord {
    /// Project id of the virtual cluster
    pub id: i32,
    /// Cluster name, unique within the parent
    pub name: String,
    /// Lifecycle status
    pub status: String,
    /// Health
    pub health: String,
}

impl VirtualClusterRecord {
    /// Read a list entry, tolerating null or numeric status and health
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: int_field(value, "id").unwrap_or_default(),
            name: text_field(value, "name"),
            status: text_field(value, "status"),
            health: text_field(value, "health"),
        }
    }
}

#[derive(Deserialize)]
struct VirtualClusterList {
    #[serde(default)]
    data: Vec<Value>,
}

/// Probe for a virtual cluster, located by name under its parent project.
///
/// The endpoint has no id lookup for this kind and its search is a
/// substring match, so the probe scans for an exact name.
pub struct VirtualClusterProbe {
    client: Arc<dyn ControlPlane>,
    parent_project_id: i32,
    name: String,
}

impl VirtualClusterProbe {
    /// Probe for the cluster `name` under `parent_project_id`
    pub fn new(client: Arc<dyn ControlPlane>, parent_project_id: i32, name: impl Into<String>) -> Self {
        Self {
            client,
            parent_project_id,
            name: name.into(),
        }
    }
}

#[async_trait]
impl StatusProbe for VirtualClusterProbe {
    type Output = ProbeResult;

    fn key(&self) -> String {
        format!("virtual cluster {}/{}", self.parent_project_id, self.name)
    }

    async fn probe(&self) -> Result<ProbeResult> {
        let response = self
            .client
            .execute(&ApiRequest::virtual_clusters(
                self.parent_project_id,
                Some(&self.name),
            ))
            .await?
            .ensure_success("virtual cluster probe")?;
        let list: VirtualClusterList = response.json("virtual cluster list")?;

        // Siblings from the substring search are never decoded
        let target = list
            .data
            .into_iter()
            .find(|raw| raw.get("name").and_then(Value::as_str) == Some(self.name.as_str()));
        Ok(match target {
            Some(raw) => {
                let record = VirtualClusterRecord::from_value(&raw);
                let health = Some(record.health).filter(|h| !h.is_empty());
                ProbeResult::observed(record.status, health, raw)
            }
            None => ProbeResult::absent(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use taikun_common::{ResourceKind, WaitIntent, WaitSettings};

    use crate::classify::classify_two_axis;
    use crate::client::ApiResponse;
    use crate::poller::{Outcome, Poller, ReconciliationRequest};
    use crate::testing::{responding, scripted};

    #[tokio::test]
    async fn finds_exact_name_among_substring_matches() {
        let body = json!({ "data": [
            { "id": 10, "name": "dev-2", "status": "Failed", "health": "Unhealthy" },
            { "id": 11, "name": "dev", "status": "Pending", "health": "None" }
        ]});
        let client = scripted(vec![Ok(ApiResponse::json_body(200, &body))], |request| {
            assert_eq!(request.path, "/api/v1/virtual-cluster/3");
            assert_eq!(request.query_value("Search"), Some("dev"));
        });
        let probe = VirtualClusterProbe::new(client, 3, "dev");

        let result = probe.probe().await.unwrap();
        assert!(result.found);
        assert_eq!(result.status, "Pending");
        assert_eq!(result.raw["id"], 11);
        assert_eq!(probe.key(), "virtual cluster 3/dev");
    }

    /// Story: a non-empty list without the exact name is still "not found"
    #[tokio::test]
    async fn story_non_empty_list_without_match_is_absent() {
        let body = json!({ "data": [{ "id": 10, "name": "dev-old", "status": "Ready", "health": "Healthy" }] });
        let probe = VirtualClusterProbe::new(responding(200, body), 3, "dev");
        assert!(!probe.probe().await.unwrap().found);
    }

    #[tokio::test]
    async fn null_health_on_sibling_or_target_is_tolerated() {
        let body = json!({ "data": [
            { "id": 10, "name": "dev-2", "status": "Pending", "health": null },
            { "id": 11, "name": "dev", "status": null, "health": null }
        ]});
        let probe = VirtualClusterProbe::new(responding(200, body), 3, "dev");

        let result = probe.probe().await.unwrap();
        assert!(result.found);
        assert_eq!(result.status, "");
        assert_eq!(result.health, None);
        assert_eq!(result.raw["id"], 11);
    }

    /// Story: a half-populated record keeps the wait going until the cluster
    /// reports Ready and Healthy
    #[tokio::test(start_paused = true)]
    async fn story_null_health_continues_the_wait() {
        let converging = json!({ "data": [
            { "id": 10, "name": "dev-2", "status": "Pending", "health": null },
            { "id": 11, "name": "dev", "status": "Pending", "health": null }
        ]});
        let ready = json!({ "data": [{ "id": 11, "name": "dev", "status": "Ready", "health": "Healthy" }] });
        let client = scripted(
            vec![
                Ok(ApiResponse::json_body(200, &converging)),
                Ok(ApiResponse::json_body(200, &ready)),
            ],
            |_| {},
        );
        let probe = VirtualClusterProbe::new(client, 3, "dev");
        let request = ReconciliationRequest::new(
            ResourceKind::VirtualCluster,
            probe.key(),
            WaitSettings {
                interval: Duration::from_secs(10),
                timeout: Duration::from_secs(60),
            },
            WaitIntent::Ready,
        );

        let result = Poller::default()
            .run(&request, &probe, classify_two_axis)
            .await
            .unwrap();

        assert!(matches!(result.outcome, Outcome::Ready));
        assert_eq!(result.probes, 2);
    }

    #[tokio::test]
    async fn malformed_envelope_names_the_list() {
        let probe = VirtualClusterProbe::new(responding(200, json!({ "data": 5 })), 3, "dev");
        let err = probe.probe().await.unwrap_err();
        assert!(err.to_string().contains("[virtual cluster list]"));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let probe = VirtualClusterProbe::new(responding(500, json!({})), 3, "dev");
        let err = probe.probe().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
