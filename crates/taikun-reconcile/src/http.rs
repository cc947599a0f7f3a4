//! HTTP implementation of [`ControlPlane`] on reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::trace;

use taikun_common::{Error, Result};

use crate::client::{ApiRequest, ApiResponse, ControlPlane, Method};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the control plane
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Scheme and host, without trailing slash (e.g. `https://api.taikun.cloud`)
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Timeout applied to each request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Settings for a host name or base URL. A bare host gets `https://`.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        Self {
            base_url,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Attach a bearer token; empty tokens are ignored
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

/// Control-plane client speaking JSON over HTTP
pub struct HttpControlPlane {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpControlPlane {
    /// Build the underlying HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                Error::internal_with_context("http client", format!("failed to build client: {}", e))
            })?;
        Ok(Self { http, config })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.config.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Delete => self.http.delete(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = builder.header(ACCEPT, "application/json");
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(request.describe(), e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(request.describe(), e.to_string()))?;

        trace!(request = %request.describe(), status, bytes = body.len(), "Control plane response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn test_router() -> Router {
        Router::new()
            .route(
                "/api/v1/projects",
                get(
                    |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        Json(json!({ "id": params.get("Id"), "auth": auth }))
                    },
                ),
            )
            .route(
                "/api/v1/projectapps/{id}",
                get(|Path(id): Path<i32>| async move {
                    (StatusCode::NOT_FOUND, Json(json!({ "title": format!("app {} not found", id) })))
                }),
            )
            .route(
                "/api/v1/servers/create",
                post(|Json(body): Json<Value>| async move { Json(json!({ "echo": body })) }),
            )
    }

    #[tokio::test]
    async fn get_sends_query_and_bearer_token() {
        let base = serve(test_router()).await;
        let client = HttpControlPlane::new(
            ClientConfig::from_host(&base).with_token(Some("s3cret".to_string())),
        )
        .unwrap();

        let response = client
            .execute(&ApiRequest::project_by_id(12))
            .await
            .unwrap();
        assert!(response.is_success());
        let body: Value = response.json("echo").unwrap();
        assert_eq!(body["id"], "12");
        assert_eq!(body["auth"], "Bearer s3cret");
    }

    #[tokio::test]
    async fn error_status_is_a_response_not_an_error() {
        let base = serve(test_router()).await;
        let client = HttpControlPlane::new(ClientConfig::from_host(&base)).unwrap();

        let response = client
            .execute(&ApiRequest::project_app_details(5))
            .await
            .unwrap();
        assert!(response.is_not_found());
        let err = response.ensure_success("application probe").unwrap_err();
        assert!(err.to_string().contains("app 5 not found"));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let base = serve(test_router()).await;
        let client = HttpControlPlane::new(ClientConfig::from_host(&base)).unwrap();

        let response = client
            .execute(&ApiRequest::create_servers(json!({ "name": "w1", "count": 2 })))
            .await
            .unwrap();
        let body: Value = response.json("echo").unwrap();
        assert_eq!(body["echo"]["count"], 2);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error_without_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpControlPlane::new(ClientConfig::from_host(&format!("http://{}", addr))).unwrap();
        let err = client
            .execute(&ApiRequest::project_by_id(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status: None, .. }));
        assert_eq!(err.context(), Some("GET /api/v1/projects"));
    }

    #[test]
    fn from_host_adds_scheme_and_trims() {
        assert_eq!(
            ClientConfig::from_host("api.taikun.cloud/").base_url,
            "https://api.taikun.cloud"
        );
        assert_eq!(
            ClientConfig::from_host("http://localhost:8080").base_url,
            "http://localhost:8080"
        );
        assert!(ClientConfig::from_host("x")
            .with_token(Some(String::new()))
            .token
            .is_none());
    }
}
