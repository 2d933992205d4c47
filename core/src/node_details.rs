//! Per-node detail page descriptors
//!
//! Fetched lazily from the backend and cached per node. Most nodes have no
//! customization, which the backend reports as 404 and we cache as `None`.

use crate::config::AppConfig;
use crate::{FlowboardError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Info,
    Metrics,
    Status,
    Logs,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailSection {
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailLink {
    pub label: String,
    pub url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Iframe,
    Markdown,
    Html,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomPage {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<DetailSection>,
    #[serde(default)]
    pub links: Vec<DetailLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_page: Option<CustomPage>,
}

impl NodeDetailConfig {
    /// Keep only well-formed parts of an arbitrary backend document
    pub fn sanitize(raw: &Value) -> Self {
        let text = |field: &str| raw.get(field).and_then(Value::as_str).map(str::to_string);
        let list = |field: &str| {
            raw.get(field)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        let sections = list("sections")
            .into_iter()
            .filter_map(|v| serde_json::from_value::<DetailSection>(v).ok())
            .collect();
        let links = list("links")
            .into_iter()
            .filter_map(|v| serde_json::from_value::<DetailLink>(v).ok())
            .filter(|l| l.url.starts_with("http://") || l.url.starts_with("https://"))
            .collect();
        let custom_page = raw
            .get("customPage")
            .and_then(|v| serde_json::from_value::<CustomPage>(v.clone()).ok());

        Self {
            title: text("title"),
            description: text("description"),
            sections,
            links,
            custom_page,
        }
    }
}

#[async_trait]
pub trait NodeDetailsSource: Send + Sync {
    /// `Ok(None)` when the node has no detail page
    async fn fetch(&self, node: &str) -> Result<Option<NodeDetailConfig>>;
}

/// `GET {base}/node-details/{name}`
pub struct HttpNodeDetailsSource {
    http: Client,
    config: AppConfig,
}

impl HttpNodeDetailsSource {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.api.request_timeout_ms))
            .build()
            .map_err(|e| FlowboardError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl NodeDetailsSource for HttpNodeDetailsSource {
    async fn fetch(&self, node: &str) -> Result<Option<NodeDetailConfig>> {
        let url = self.config.node_details_url(node);
        debug!(target: "details", node = %node, url = %url, "Loading node details");

        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(FlowboardError::Http(format!(
                "node details for {node} returned status {status}"
            ))),
            _ => {
                let raw: Value = response.json().await?;
                Ok(Some(NodeDetailConfig::sanitize(&raw)))
            }
        }
    }
}

type Slot = Arc<OnceCell<Option<NodeDetailConfig>>>;

/// Cache with one in-flight fetch per node
#[derive(Clone)]
pub struct NodeDetailsCache {
    source: Arc<dyn NodeDetailsSource>,
    entries: Arc<DashMap<String, Slot>>,
}

impl NodeDetailsCache {
    pub fn new(source: Arc<dyn NodeDetailsSource>) -> Self {
        Self {
            source,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub async fn get_or_fetch(&self, node: &str) -> Result<Option<NodeDetailConfig>> {
        let slot = self
            .entries
            .entry(node.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        // A failed init leaves the cell empty so the next caller retries
        let details = slot
            .get_or_try_init(|| async move {
                let fetched = self.source.fetch(node).await;
                if let Err(e) = &fetched {
                    warn!(target: "details", node = %node, error = %e, "Failed to load node details");
                }
                fetched
            })
            .await?;
        Ok(details.clone())
    }

    pub fn invalidate(&self, node: &str) {
        self.entries.remove(node);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn is_cached(&self, node: &str) -> bool {
        self.entries
            .get(node)
            .is_some_and(|slot| slot.initialized())
    }

    /// Warm the cache concurrently; failures are logged and left uncached
    pub async fn preload<I, S>(&self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tasks = JoinSet::new();
        for node in nodes {
            let cache = self.clone();
            let node = node.into();
            tasks.spawn(async move {
                let _ = cache.get_or_fetch(&node).await;
            });
        }
        let count = tasks.len();
        while tasks.join_next().await.is_some() {}
        debug!(target: "details", count, "Preloaded node details");
    }
}
