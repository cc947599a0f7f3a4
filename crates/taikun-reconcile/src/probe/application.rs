use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use taikun_common::Result;

use super::{scalar_text, ProbeResult, StatusProbe};
use crate::client::{ApiRequest, ControlPlane};

/// Application statuses the details endpoint is documented to return
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum AppStatus {
    /// Helm install in progress
    Installing,
    /// Helm uninstall in progress
    Uninstalling,
    /// Installed and synced
    Ready,
    /// Install or sync failed
    Failed,
    /// Sync in progress
    Updating,
    /// Installed but not yet ready
    NotReady,
    /// Backend could not determine the state
    Unknown,
}

impl AppStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Installing => "Installing",
            AppStatus::Uninstalling => "Uninstalling",
            AppStatus::Ready => "Ready",
            AppStatus::Failed => "Failed",
            AppStatus::Updating => "Updating",
            AppStatus::NotReady => "NotReady",
            AppStatus::Unknown => "Unknown",
        }
    }
}

/// Where an application status came from.
///
/// Some backend versions answer with payloads that do not match the
/// documented schema. The typed decode is tried first; if it fails the
/// status is extracted structurally from the raw JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusSource {
    /// Decoded through the documented schema
    Typed(String),
    /// Pulled out of `status` or `data.status` in an undocumented payload
    RawExtracted(String),
    /// No status field anywhere
    Unknown,
}

impl StatusSource {
    /// The status text, if one was found
    pub fn status(&self) -> Option<&str> {
        match self {
            StatusSource::Typed(s) | StatusSource::RawExtracted(s) => Some(s),
            StatusSource::Unknown => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectAppDetails {
    #[allow(dead_code)]
    id: i32,
    status: AppStatus,
}

/// Decode an application status from a details body
pub fn decode_app_status(body: &str) -> StatusSource {
    if let Ok(details) = serde_json::from_str::<ProjectAppDetails>(body) {
        return StatusSource::Typed(details.status.as_str().to_string());
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return StatusSource::Unknown;
    };
    value
        .get("status")
        .and_then(scalar_text)
        .or_else(|| value.pointer("/data/status").and_then(scalar_text))
        .map(StatusSource::RawExtracted)
        .unwrap_or(StatusSource::Unknown)
}

/// Probe for an installed application, through the details endpoint
pub struct ApplicationProbe {
    client: Arc<dyn ControlPlane>,
    project_app_id: i32,
}

impl ApplicationProbe {
    /// Probe for `project_app_id`
    pub fn new(client: Arc<dyn ControlPlane>, project_app_id: i32) -> Self {
        Self {
            client,
            project_app_id,
        }
    }
}

#[async_trait]
impl StatusProbe for ApplicationProbe {
    type Output = ProbeResult;

    fn key(&self) -> String {
        format!("application {}", self.project_app_id)
    }

    async fn probe(&self) -> Result<ProbeResult> {
        let response = self
            .client
            .execute(&ApiRequest::project_app_details(self.project_app_id))
            .await?;
        if response.is_not_found() {
            return Ok(ProbeResult::absent());
        }
        let response = response.ensure_success("application probe")?;

        let source = decode_app_status(&response.body);
        let raw = serde_json::from_str(&response.body).unwrap_or(Value::Null);
        match source {
            StatusSource::Typed(status) => Ok(ProbeResult::observed(status, None, raw)),
            StatusSource::RawExtracted(status) => {
                debug!(
                    application = self.project_app_id,
                    status = %status,
                    "Application details did not match schema, extracted status from raw body"
                );
                Ok(ProbeResult::observed(status, None, raw))
            }
            StatusSource::Unknown => {
                debug!(
                    application = self.project_app_id,
                    "Application details carry no status, treating as absent"
                );
                Ok(ProbeResult::absent())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::responding;
    use serde_json::json;

    #[test]
    fn decode_prefers_typed_schema() {
        let body = json!({ "id": 4, "name": "redis", "status": "Installing" }).to_string();
        assert_eq!(
            decode_app_status(&body),
            StatusSource::Typed("Installing".to_string())
        );
    }

    #[test]
    fn decode_falls_back_to_raw_status() {
        // Undocumented status value breaks the typed decode
        let body = json!({ "id": 4, "status": "Pending" }).to_string();
        assert_eq!(
            decode_app_status(&body),
            StatusSource::RawExtracted("Pending".to_string())
        );

        // Wrapped payload
        let body = json!({ "data": { "status": "Ready" } }).to_string();
        assert_eq!(
            decode_app_status(&body),
            StatusSource::RawExtracted("Ready".to_string())
        );
    }

    #[test]
    fn decode_without_status_is_unknown() {
        assert_eq!(decode_app_status(r#"{"id": 4}"#), StatusSource::Unknown);
        assert_eq!(decode_app_status("<html>"), StatusSource::Unknown);
        assert_eq!(StatusSource::Unknown.status(), None);
    }

    #[tokio::test]
    async fn not_found_response_means_absent() {
        let probe = ApplicationProbe::new(responding(404, json!({ "title": "Not Found" })), 4);
        assert!(!probe.probe().await.unwrap().found);
    }

    #[tokio::test]
    async fn other_errors_are_transport_errors() {
        let probe = ApplicationProbe::new(responding(403, json!({ "title": "Forbidden" })), 4);
        let err = probe.probe().await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn raw_extracted_status_is_observed() {
        let probe = ApplicationProbe::new(responding(200, json!({ "data": { "status": "Failed" } })), 4);
        let result = probe.probe().await.unwrap();
        assert!(result.found);
        assert_eq!(result.status, "Failed");
        assert_eq!(result.health, None);
    }

    #[tokio::test]
    async fn body_without_status_means_absent() {
        let probe = ApplicationProbe::new(responding(200, json!({ "id": 4 })), 4);
        assert!(!probe.probe().await.unwrap().found);
        assert_eq!(probe.key(), "application 4");
    }
}
