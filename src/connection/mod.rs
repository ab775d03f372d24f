//! Elasticsearch scroll client
//!
//! This module provides the remote side of an export:
//! - Client construction from the connection configuration
//! - Scroll cursors (initial search, continuation, release)
//! - Translation of HTTP and Elasticsearch failures into [`FetchError`]
//!
//! Requests are never retried. A scroll context lives on the server and a
//! page that was lost cannot be requested again.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConfigError, ErrorInfo, FetchError, Result};
use crate::export::record::{Filter, Hit, Page};
use crate::export::streaming::{FetchResult, ScrollCursor, SearchIndex};

/// Handle on one Elasticsearch index (or alias, or comma-separated list)
#[derive(Clone)]
pub struct ElasticIndex {
    /// HTTP client, shared by every cursor opened from this handle
    client: Client,
    /// Cluster URL; index and endpoint segments are appended to its path
    base_url: Url,
    /// Index name or pattern
    index: String,
    /// Scroll context keepalive, e.g. `5m`
    keepalive: String,
    username: Option<String>,
    password: Option<String>,
}

/// Body of a search or scroll response
#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    #[serde(default)]
    timed_out: bool,
    #[serde(rename = "_shards")]
    shards: Option<ShardStats>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct ShardStats {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    failed: u64,
}

impl ElasticIndex {
    /// Create a handle for `index` on the configured cluster
    ///
    /// No request is made until a cursor asks for its first page.
    ///
    /// # Arguments
    /// * `config` - Connection configuration
    /// * `index` - Index name, alias, or pattern
    pub fn new(config: &ConnectionConfig, index: impl Into<String>) -> Result<Self> {
        config.validate_url()?;
        let base_url = Url::parse(config.url.trim()).map_err(|e| ConfigError::InvalidValue {
            field: "connection.url".to_string(),
            value: format!("{} ({e})", config.url),
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(FetchError::from)?;

        Ok(Self {
            client,
            base_url,
            index: index.into(),
            keepalive: config.scroll_keepalive.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended as percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URLs always have a path to extend
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn search_url(&self) -> Url {
        let mut url = self.endpoint(&[&self.index, "_search"]);
        url.query_pairs_mut().append_pair("scroll", &self.keepalive);
        url
    }

    fn scroll_url(&self) -> Url {
        self.endpoint(&["_search", "scroll"])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    /// Send a request and decode a successful JSON answer
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> FetchResult<T> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status, response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

async fn rejected(status: StatusCode, response: reqwest::Response) -> FetchError {
    let body = response.text().await.unwrap_or_default();
    FetchError::Rejected {
        status: status.as_u16(),
        info: ErrorInfo::from_body(&body),
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn open_scroll(&self, filter: &Filter, page_size: usize) -> FetchResult<Box<dyn ScrollCursor>> {
        let query = filter.to_query()?;
        info!("Opening scroll on {} (page size {})", self.search_url(), page_size);

        Ok(Box::new(ElasticScroll {
            conn: self.clone(),
            initial_body: Some(json!({ "size": page_size, "query": query })),
            scroll_id: None,
            total_fetched: 0,
            closed: false,
        }))
    }
}

/// Scroll cursor over one search
///
/// The initial search is sent lazily by the first `next_page` call.
struct ElasticScroll {
    conn: ElasticIndex,
    /// Initial search body, taken by the first request
    initial_body: Option<Value>,
    scroll_id: Option<String>,
    total_fetched: u64,
    closed: bool,
}

#[async_trait]
impl ScrollCursor for ElasticScroll {
    async fn next_page(&mut self) -> FetchResult<Page> {
        if self.closed {
            return Ok(Vec::new());
        }

        let request = match self.initial_body.take() {
            Some(body) => self.conn.client.post(self.conn.search_url()).json(&body),
            None => {
                let scroll_id = self.scroll_id.as_deref().ok_or_else(|| {
                    FetchError::InvalidResponse("search response carried no _scroll_id".to_string())
                })?;
                self.conn.client.post(self.conn.scroll_url()).json(&json!({
                    "scroll": self.conn.keepalive,
                    "scroll_id": scroll_id,
                }))
            }
        };

        let response: ScrollResponse = self.conn.send(request).await?;

        if response.timed_out {
            warn!("Scroll page timed out on the server; results may be partial");
        }
        if let Some(shards) = &response.shards {
            if shards.failed > 0 {
                warn!("{} of {} shards failed for this page", shards.failed, shards.total);
            }
        }
        if let Some(id) = response.scroll_id {
            self.scroll_id = Some(id);
        }

        let page = response.hits.hits;
        self.total_fetched += page.len() as u64;
        debug!("Fetched page of {} hits (total: {})", page.len(), self.total_fetched);
        Ok(page)
    }

    async fn close(&mut self) -> FetchResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let Some(scroll_id) = self.scroll_id.take() else {
            return Ok(());
        };

        let request = self
            .conn
            .client
            .delete(self.conn.scroll_url())
            .json(&json!({ "scroll_id": [scroll_id] }));
        let response = self.conn.authorize(request).send().await?;
        let status = response.status();

        // 404: the context already expired
        if status.is_success() || status == StatusCode::NOT_FOUND {
            info!("Released scroll after fetching {} hits", self.total_fetched);
            Ok(())
        } else {
            Err(rejected(status, response).await)
        }
    }
}

impl Drop for ElasticScroll {
    fn drop(&mut self) {
        if !self.closed && self.scroll_id.is_some() {
            debug!("Scroll dropped without release; server will expire it after {}", self.conn.keepalive);
        }
    }
}
