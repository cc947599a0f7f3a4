//! Offset/limit windows over cursor-paged list endpoints
//!
//! The backend pages with opaque cursors and picks its own page sizes;
//! callers ask for an arbitrary `offset`/`limit` slice of the logical
//! sequence. [`fetch_window`] walks pages from the start, drops the first
//! `offset` items, and stops as soon as the window is full so that no page
//! past the window's end is fetched.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use taikun_common::{Error, Result};

use crate::client::{ApiRequest, ControlPlane};

/// Page size requested when the window has no limit
pub const DEFAULT_PER_PAGE: u32 = 50;

/// One page of a cursor-paged list
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    /// Items on this page
    #[serde(rename = "data", default = "Vec::new", deserialize_with = "null_as_default")]
    pub items: Vec<T>,
    /// Page size the backend applied
    #[serde(default)]
    pub limit: Option<u32>,
    /// Whether another page follows
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_more: bool,
    /// Total items across all pages, as reported by the backend
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_count: i64,
    /// Cursor for the next page, passed back verbatim
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// The backend sends `null` for envelope fields it did not fill
fn null_as_default<'de, D, V>(deserializer: D) -> std::result::Result<V, D::Error>
where
    D: Deserializer<'de>,
    V: Default + Deserialize<'de>,
{
    Ok(Option::<V>::deserialize(deserializer)?.unwrap_or_default())
}

/// Slice of the logical item sequence a caller wants
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowRequest {
    /// Items to skip from the start
    pub offset: u32,
    /// Maximum items to return; zero means no cap
    pub limit: u32,
    /// Backend search term; empty means none
    pub search: Option<String>,
}

impl WindowRequest {
    /// Page size to request from the backend
    pub fn per_page(&self) -> u32 {
        if self.limit > 0 {
            self.limit
        } else {
            DEFAULT_PER_PAGE
        }
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// A cursor-paged list endpoint
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Names the listing in logs and errors
    fn describe(&self) -> String;

    /// Fetch the page at `cursor` (`None` for the first page)
    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<Page<T>>;
}

/// Collect the items of `window` from `source`.
///
/// An offset past the end yields an empty list. A page claiming more items
/// without a usable cursor (missing, empty, or already seen) is an
/// [`Error::Protocol`], never an endless loop.
pub async fn fetch_window<T, S>(source: &S, window: &WindowRequest) -> Result<Vec<T>>
where
    T: Send,
    S: PageSource<T> + ?Sized,
{
    let per_page = window.per_page();
    let limit = window.limit as usize;
    let mut remaining_offset = window.offset as usize;
    let mut collected: Vec<T> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors = HashSet::new();
    let mut pages = 0u32;

    loop {
        let page = source
            .fetch_page(cursor.as_deref(), per_page, window.search_term())
            .await?;
        pages += 1;

        let mut items = page.items;
        let skip = items.len().min(remaining_offset);
        items.drain(..skip);
        remaining_offset -= skip;

        if limit > 0 {
            items.truncate(limit.saturating_sub(collected.len()));
        }
        collected.extend(items);

        if limit > 0 && collected.len() >= limit {
            break;
        }
        if !page.has_more {
            break;
        }

        let next = match page.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) => next,
            None => {
                return Err(Error::protocol(
                    source.describe(),
                    format!("page {} reports more items but carries no cursor", pages),
                ))
            }
        };
        if !seen_cursors.insert(next.clone()) {
            return Err(Error::protocol(
                source.describe(),
                format!("page {} repeats cursor {:?}", pages, next),
            ));
        }
        cursor = Some(next);
    }

    debug!(
        source = %source.describe(),
        pages,
        items = collected.len(),
        offset = window.offset,
        limit = window.limit,
        "Fetched window"
    );
    Ok(collected)
}

/// Kubernetes resource kinds listable through the control plane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KubernetesResource {
    /// Pods
    Pods,
    /// Deployments
    Deployments,
    /// Services
    Services,
    /// Config maps
    ConfigMaps,
    /// Secrets
    Secrets,
    /// Ingresses
    Ingress,
    /// Daemon sets
    DaemonSets,
    /// Nodes
    Nodes,
    /// Persistent volume claims
    Pvcs,
    /// Stateful sets
    StatefulSets,
}

impl KubernetesResource {
    /// Every listable kind
    pub const ALL: [KubernetesResource; 10] = [
        KubernetesResource::Pods,
        KubernetesResource::Deployments,
        KubernetesResource::Services,
        KubernetesResource::ConfigMaps,
        KubernetesResource::Secrets,
        KubernetesResource::Ingress,
        KubernetesResource::DaemonSets,
        KubernetesResource::Nodes,
        KubernetesResource::Pvcs,
        KubernetesResource::StatefulSets,
    ];

    /// Path segment of the list endpoint
    pub fn path_segment(&self) -> &'static str {
        match self {
            KubernetesResource::Pods => "pods",
            KubernetesResource::Deployments => "deployments",
            KubernetesResource::Services => "service",
            KubernetesResource::ConfigMaps => "configmap",
            KubernetesResource::Secrets => "secret",
            KubernetesResource::Ingress => "ingress",
            KubernetesResource::DaemonSets => "daemonset",
            KubernetesResource::Nodes => "nodes",
            KubernetesResource::Pvcs => "pvc",
            KubernetesResource::StatefulSets => "sts",
        }
    }

    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            KubernetesResource::Pods => "Pods",
            KubernetesResource::Deployments => "Deployments",
            KubernetesResource::Services => "Services",
            KubernetesResource::ConfigMaps => "ConfigMaps",
            KubernetesResource::Secrets => "Secrets",
            KubernetesResource::Ingress => "Ingress",
            KubernetesResource::DaemonSets => "DaemonSets",
            KubernetesResource::Nodes => "Nodes",
            KubernetesResource::Pvcs => "Pvcs",
            KubernetesResource::StatefulSets => "StatefulSets",
        }
    }
}

impl fmt::Display for KubernetesResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KubernetesResource {
    type Err = Error;

    /// Accepts the display name or the path segment, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| {
                r.as_str().eq_ignore_ascii_case(wanted) || r.path_segment().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                Error::validation_for_field("resource", format!("unknown Kubernetes resource: {}", s))
            })
    }
}

/// Pages of one Kubernetes resource list in one project
pub struct KubernetesListSource {
    client: Arc<dyn ControlPlane>,
    project_id: i32,
    resource: KubernetesResource,
}

impl KubernetesListSource {
    /// Source for `resource` in `project_id`
    pub fn new(client: Arc<dyn ControlPlane>, project_id: i32, resource: KubernetesResource) -> Self {
        Self {
            client,
            project_id,
            resource,
        }
    }
}

#[async_trait]
impl<T> PageSource<T> for KubernetesListSource
where
    T: DeserializeOwned + Send + 'static,
{
    fn describe(&self) -> String {
        format!("{} of project {}", self.resource, self.project_id)
    }

    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<Page<T>> {
        let request = ApiRequest::kubernetes_list(
            self.project_id,
            self.resource.path_segment(),
            per_page,
            cursor,
            search,
        );
        let context = <Self as PageSource<T>>::describe(self);
        self.client
            .execute(&request)
            .await?
            .ensure_success(&context)?
            .json(&context)
    }
}

/// List a window of Kubernetes resources as raw JSON records
pub async fn list_kubernetes_resources(
    client: Arc<dyn ControlPlane>,
    project_id: i32,
    resource: KubernetesResource,
    window: &WindowRequest,
) -> Result<Vec<Value>> {
    let source = KubernetesListSource::new(client, project_id, resource);
    fetch_window::<Value, _>(&source, window).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use serde_json::json;

    use crate::client::ApiResponse;
    use crate::testing::scripted;

    #[test]
    fn null_envelope_fields_read_as_defaults() {
        let page: Page<u32> = serde_json::from_value(json!({
            "data": null,
            "limit": null,
            "hasMore": null,
            "totalCount": null,
            "nextCursor": null
        }))
        .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.total_count, 0);
        assert_eq!(page.next_cursor, None);

        let page: Page<u32> =
            serde_json::from_value(json!({ "data": [1, 2], "hasMore": true, "totalCount": 9, "nextCursor": "c" }))
                .unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more);
        assert_eq!(page.total_count, 9);
    }

    /// In-memory pages addressed by cursor; `None` is the first page
    struct FakePages {
        pages: Vec<(Option<&'static str>, Page<u32>)>,
        fetches: AtomicU32,
        requested: Mutex<Vec<(Option<String>, u32)>>,
    }

    impl FakePages {
        fn new(pages: Vec<(Option<&'static str>, Page<u32>)>) -> Self {
            Self {
                pages,
                fetches: AtomicU32::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource<u32> for FakePages {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn fetch_page(
            &self,
            cursor: Option<&str>,
            per_page: u32,
            _search: Option<&str>,
        ) -> Result<Page<u32>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.requested
                .lock()
                .unwrap()
                .push((cursor.map(str::to_string), per_page));
            self.pages
                .iter()
                .find(|(at, _)| *at == cursor)
                .map(|(_, page)| page.clone())
                .ok_or_else(|| Error::transport("fake", "unknown cursor"))
        }
    }

    fn page(items: std::ops::RangeInclusive<u32>, next: Option<&str>) -> Page<u32> {
        Page {
            items: items.collect(),
            limit: None,
            has_more: next.is_some(),
            total_count: 70,
            next_cursor: next.map(str::to_string),
        }
    }

    /// 1..=50 then 51..=70
    fn two_pages() -> FakePages {
        FakePages::new(vec![
            (None, page(1..=50, Some("a"))),
            (Some("a"), page(51..=70, None)),
        ])
    }

    fn window(offset: u32, limit: u32) -> WindowRequest {
        WindowRequest {
            offset,
            limit,
            search: None,
        }
    }

    // ==========================================================================
    // Windowing
    // ==========================================================================

    #[tokio::test]
    async fn window_inside_first_page_fetches_once() {
        let source = two_pages();
        let items = fetch_window(&source, &window(10, 30)).await.unwrap();
        assert_eq!(items, (11..=40).collect::<Vec<_>>());
        assert_eq!(source.fetches(), 1);
        assert_eq!(source.requested.lock().unwrap()[0], (None, 30));
    }

    #[tokio::test]
    async fn window_in_second_page_fetches_twice() {
        let source = two_pages();
        let items = fetch_window(&source, &window(55, 10)).await.unwrap();
        assert_eq!(items, (56..=65).collect::<Vec<_>>());
        assert_eq!(source.fetches(), 2);
        assert_eq!(source.requested.lock().unwrap()[1], (Some("a".to_string()), 10));
    }

    #[tokio::test]
    async fn window_spanning_pages_is_contiguous() {
        let source = two_pages();
        let items = fetch_window(&source, &window(45, 10)).await.unwrap();
        assert_eq!(items, (46..=55).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn offset_past_end_is_empty() {
        let source = two_pages();
        let items = fetch_window(&source, &window(1000, 10)).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn unbounded_window_reads_every_page() {
        let source = two_pages();
        let items = fetch_window(&source, &window(0, 0)).await.unwrap();
        assert_eq!(items, (1..=70).collect::<Vec<_>>());
        assert_eq!(source.fetches(), 2);
        assert_eq!(source.requested.lock().unwrap()[0].1, DEFAULT_PER_PAGE);
    }

    // ==========================================================================
    // Cursor protocol
    // ==========================================================================

    #[tokio::test]
    async fn more_without_cursor_is_protocol_error() {
        let mut broken = page(1..=50, None);
        broken.has_more = true;
        broken.next_cursor = Some(String::new());
        let source = FakePages::new(vec![(None, broken)]);

        let err = fetch_window(&source, &window(0, 0)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn repeated_cursor_is_protocol_error() {
        let source = FakePages::new(vec![
            (None, page(1..=50, Some("a"))),
            (Some("a"), page(51..=60, Some("a"))),
        ]);

        let err = fetch_window(&source, &window(0, 0)).await.unwrap_err();
        match err {
            Error::Protocol { context, message } => {
                assert_eq!(context, "fake");
                assert!(message.contains("repeats cursor"));
            }
            other => panic!("Expected Protocol, got {:?}", other),
        }
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn full_window_ignores_missing_cursor() {
        // The window is satisfied before the broken cursor matters
        let mut broken = page(1..=50, None);
        broken.has_more = true;
        let source = FakePages::new(vec![(None, broken)]);

        let items = fetch_window(&source, &window(0, 5)).await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    // ==========================================================================
    // Kubernetes source
    // ==========================================================================

    #[tokio::test]
    async fn kubernetes_source_walks_cursor_pages() {
        let client = scripted(
            vec![
                Ok(ApiResponse::json_body(
                    200,
                    &json!({ "data": [{ "name": "web-1" }, { "name": "web-2" }], "hasMore": true, "nextCursor": "c1", "totalCount": 3 }),
                )),
                Ok(ApiResponse::json_body(
                    200,
                    &json!({ "data": [{ "name": "web-3" }], "hasMore": false, "totalCount": 3 }),
                )),
            ],
            |request| {
                assert_eq!(request.path, "/api/v1/kubernetes/list/7/pods");
                assert_eq!(request.query_value("Limit"), Some("50"));
                assert_eq!(request.query_value("SearchTerm"), Some("web"));
            },
        );

        let window = WindowRequest {
            offset: 1,
            limit: 0,
            search: Some("web".to_string()),
        };
        let items = list_kubernetes_resources(client, 7, KubernetesResource::Pods, &window)
            .await
            .unwrap();
        let names: Vec<_> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["web-2", "web-3"]);
    }

    #[tokio::test]
    async fn kubernetes_source_error_names_resource() {
        let client = scripted(
            vec![Ok(ApiResponse::json_body(403, &json!({ "title": "Forbidden" })))],
            |_| {},
        );

        let err = list_kubernetes_resources(client, 7, KubernetesResource::StatefulSets, &window(0, 10))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.context(), Some("StatefulSets of project 7"));
    }

    #[test]
    fn resource_names_parse_either_way() {
        assert_eq!("pods".parse::<KubernetesResource>().unwrap(), KubernetesResource::Pods);
        assert_eq!("Sts".parse::<KubernetesResource>().unwrap(), KubernetesResource::StatefulSets);
        assert_eq!(
            "configmap".parse::<KubernetesResource>().unwrap(),
            KubernetesResource::ConfigMaps
        );
        assert!("cronjobs".parse::<KubernetesResource>().is_err());
        assert_eq!(KubernetesResource::Services.path_segment(), "service");
    }
}
