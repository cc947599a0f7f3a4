//! Control-plane client seam
//!
//! Every remote call the orchestrator makes goes through [`ControlPlane::execute`].
//! A request that produced any HTTP response, including 4xx/5xx, is `Ok`;
//! only a request that never got an answer is `Err`. Callers decide what a
//! status means for them (a 404 on application details means "absent",
//! on most other endpoints it is a transport failure).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use taikun_common::error::STATUS_NOT_FOUND;
use taikun_common::{Error, Result};

/// Longest slice of a raw error body copied into an error message
const MAX_DETAIL_LEN: usize = 512;

/// HTTP method of a control-plane request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Read
    Get,
    /// Command
    Post,
    /// Removal
    Delete,
}

impl Method {
    /// Upper-case verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// A single command against the control plane
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the API base URL, starting with `/`
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// JSON body for commands
    pub body: Option<Value>,
}

impl ApiRequest {
    /// GET request for `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// POST request for `path` with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter when `value` is present and non-empty
    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.query(key, v),
            _ => self,
        }
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Short description for logs and error context, e.g. `GET /api/v1/projects`
    pub fn describe(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }

    // ----- endpoints -----

    /// Project list filtered to a single id
    pub fn project_by_id(project_id: i32) -> Self {
        Self::get("/api/v1/projects").query("Id", project_id)
    }

    /// Virtual clusters under a parent project, optionally filtered by a search term
    pub fn virtual_clusters(parent_project_id: i32, search: Option<&str>) -> Self {
        Self::get(format!("/api/v1/virtual-cluster/{}", parent_project_id))
            .query_opt("Search", search)
    }

    /// Details of one installed application
    pub fn project_app_details(project_app_id: i32) -> Self {
        Self::get(format!("/api/v1/projectapps/{}", project_app_id))
    }

    /// Servers attached to a project
    pub fn project_servers(project_id: i32) -> Self {
        Self::get(format!("/api/v1/servers/{}", project_id))
    }

    /// One cursor page of a Kubernetes resource list
    pub fn kubernetes_list(
        project_id: i32,
        resource: &str,
        limit: u32,
        cursor: Option<&str>,
        search: Option<&str>,
    ) -> Self {
        let mut request = Self::get(format!(
            "/api/v1/kubernetes/list/{}/{}",
            project_id, resource
        ));
        if limit > 0 {
            request = request.query("Limit", limit);
        }
        request
            .query_opt("Cursor", cursor)
            .query_opt("SearchTerm", search)
    }

    /// Create a virtual cluster
    pub fn create_virtual_cluster(body: Value) -> Self {
        Self::post("/api/v1/virtual-cluster/create", body)
    }

    /// Delete the virtual cluster whose project id is given
    pub fn delete_virtual_cluster(project_id: i32) -> Self {
        Self::post(
            "/api/v1/virtual-cluster/delete",
            serde_json::json!({ "projectId": project_id }),
        )
    }

    /// Delete a project
    pub fn delete_project(project_id: i32) -> Self {
        Self::post(
            "/api/v1/projects/delete",
            serde_json::json!({ "projectId": project_id }),
        )
    }

    /// Add servers to a project
    pub fn create_servers(body: Value) -> Self {
        Self::post("/api/v1/servers/create", body)
    }
}

/// Raw answer from the control plane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// Build a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response with a JSON body
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 404
    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }

    /// Turn a non-2xx response into a transport error carrying the backend detail
    pub fn ensure_success(self, context: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::transport_status(
                context,
                self.status,
                backend_detail(self.status, &self.body),
            ))
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, kind: &str) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
    }
}

/// Extract a human-readable error detail from a failed response body.
///
/// The control plane answers with RFC 7807 problem documents most of the
/// time; anything else is passed through, truncated.
pub fn backend_detail(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["detail", "title", "message", "error"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("request failed with status {}", status);
    }
    match trimmed.char_indices().nth(MAX_DETAIL_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Executes commands against the remote control plane
///
/// This trait allows mocking the backend in tests while production code
/// talks HTTP through [`crate::http::HttpControlPlane`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Send one request and return whatever the backend answered.
    ///
    /// `Err` only when no response was received.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}
