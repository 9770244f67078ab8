//! # Tools Module
//!
//! The search-provider boundary used by research branches, and an HTTP
//! implementation against the Firecrawl search API (hosted or self-hosted),
//! which returns ranked pages with their content already scraped to markdown.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SearchError;

// =============================================================================
// CONSTANTS
// =============================================================================
/// Default Firecrawl endpoint.
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";

/// Default per-search deadline.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of pages requested per query.
pub const DEFAULT_RESULT_LIMIT: usize = 5;

// =============================================================================
// SEARCH TYPES
// =============================================================================
/// Options for a single search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results to return
    pub limit: usize,

    /// Deadline for the whole call
    pub timeout: Duration,

    /// Ask the provider to scrape each page to markdown
    pub markdown: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RESULT_LIMIT,
            timeout: DEFAULT_SEARCH_TIMEOUT,
            markdown: true,
        }
    }
}

/// One ranked search result. Any field may be missing.
///
/// # Rust Concept: Option Fields with serde
/// `#[serde(default)]` turns an absent JSON key into `None`, so partial
/// items from the provider deserialize instead of failing the whole page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub markdown: Option<String>,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: None,
            markdown: Some(markdown.into()),
        }
    }

    /// The URL, if present and non-empty.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// The page content, if present and non-empty.
    pub fn content(&self) -> Option<&str> {
        self.markdown.as_deref().filter(|c| !c.trim().is_empty())
    }
}

// =============================================================================
// SEARCH PROVIDER TRAIT
// =============================================================================
/// Resolves a query string into ranked pages.
///
/// # Rust Concept: async_trait
/// The engine holds providers as `Arc<dyn SearchProvider>`; `async_trait`
/// boxes the returned futures so the trait stays object safe.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

// =============================================================================
// FIRECRAWL CLIENT
// =============================================================================
/// Firecrawl search client.
///
/// Search and scraping happen in one call: each hit comes back with its page
/// rendered to markdown. Failures are mapped onto [`SearchError`] and never
/// retried.
///
/// # Example
/// ```ignore
/// let search = FirecrawlSearch::new(Some("fc-...".to_string()), DEFAULT_FIRECRAWL_BASE_URL);
/// let hits = search.search("rust async runtimes", &SearchOptions::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FirecrawlSearch {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl FirecrawlSearch {
    /// `api_key` may be omitted for self-hosted instances.
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/search", self.base_url)
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================
/// Body of `POST /v1/search`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlRequest<'a> {
    query: &'a str,
    limit: usize,
    /// Milliseconds
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    scrape_options: Option<ScrapeOptions>,
}

#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    data: Vec<SearchHit>,

    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// SEARCH PROVIDER IMPLEMENTATION
// =============================================================================
#[async_trait]
impl SearchProvider for FirecrawlSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        info!(query = %query, limit = options.limit, "Performing web search");

        let body = FirecrawlRequest {
            query,
            limit: options.limit,
            timeout: options.timeout.as_millis() as u64,
            scrape_options: options.markdown.then(|| ScrapeOptions {
                formats: vec!["markdown"],
            }),
        };

        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(options.timeout)
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(url = %self.endpoint(), "Sending search request");

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => SearchError::Unauthorized,
                429 => SearchError::RateLimited,
                code => SearchError::Http(code, error_text),
            });
        }

        let parsed: FirecrawlResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        if !parsed.success {
            return Err(SearchError::Parse(
                parsed
                    .error
                    .unwrap_or_else(|| "search reported failure".to_string()),
            ));
        }

        let hits: Vec<SearchHit> = parsed.data.into_iter().take(options.limit).collect();

        if hits.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = hits.len(), "Search completed");
        }

        Ok(hits)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
