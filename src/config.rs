//! Configuration for talking to the document-analysis API.
//!
//! Every knob lives in [`ApiConfig`], built via [`ApiConfigBuilder`]. The
//! library never reads environment variables itself: callers (the CLI, a
//! test, an embedding application) construct the config explicitly and hand
//! it to [`crate::api::HttpMessagesClient::new`] and the workflow functions.

use crate::error::CiteError;
use crate::pipeline::input::is_url;
use std::fmt;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Configuration for requests against the messages endpoint.
///
/// # Example
/// ```rust
/// use pdfcite::ApiConfig;
///
/// let config = ApiConfig::builder("https://llm.example.com/v1/messages", "secret")
///     .concurrency(3)
///     .max_tokens(2048)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 3);
/// ```
#[derive(Clone)]
pub struct ApiConfig {
    /// Full URL the messages request is POSTed to.
    pub endpoint: String,

    /// Bearer token sent in the `Authorization` header.
    pub token: String,

    /// Model identifier placed in every request body.
    pub model: String,

    /// Token limit for question-answering and summarize requests. Default: 1024.
    pub max_tokens: u32,

    /// Token limit for relevance-scoring requests. Default: 100.
    ///
    /// The model only has to emit a short JSON array.
    pub rank_max_tokens: u32,

    /// Maximum number of requests in flight during a batch. Default: 4.
    pub concurrency: usize,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// Large PDFs take a while to upload and analyse; this is well above the
    /// typical latency of a single-document request.
    pub api_timeout_secs: u64,

    /// Timeout for fetching URL inputs. Default: 120.
    pub download_timeout_secs: u64,

    /// Retries for transient failures (429, 5xx, transport). Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Consolidate per-document answers with a second request. Default: false.
    pub summarize: bool,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("rank_max_tokens", &self.rank_max_tokens)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("summarize", &self.summarize)
            .finish()
    }
}

impl ApiConfig {
    /// Create a builder for the given endpoint and bearer token.
    pub fn builder(endpoint: impl Into<String>, token: impl Into<String>) -> ApiConfigBuilder {
        ApiConfigBuilder {
            config: ApiConfig {
                endpoint: endpoint.into(),
                token: token.into(),
                model: DEFAULT_MODEL.to_string(),
                max_tokens: 1024,
                rank_max_tokens: 100,
                concurrency: 4,
                api_timeout_secs: 120,
                download_timeout_secs: 120,
                max_retries: 0,
                retry_backoff_ms: 500,
                summarize: false,
            },
        }
    }
}

/// Builder for [`ApiConfig`].
#[derive(Debug)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    /// Model identifier sent with every request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Output token cap for question and summarize requests.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    /// Output token cap for the relevance ranking request.
    pub fn rank_max_tokens(mut self, n: u32) -> Self {
        self.config.rank_max_tokens = n;
        self
    }

    /// Maximum requests in flight; values below 1 are clamped to 1.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Per-request timeout for the messages endpoint, in seconds.
    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Timeout for fetching URL inputs, in seconds.
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Retries for transient failures; 0 disables retrying.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Base delay before the first retry, doubled on each further retry.
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Whether a batch ends with a consolidated summarize request.
    pub fn summarize(mut self, v: bool) -> Self {
        self.config.summarize = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ApiConfig, CiteError> {
        let c = &self.config;
        if !is_url(&c.endpoint) {
            return Err(CiteError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.token.trim().is_empty() {
            return Err(CiteError::InvalidConfig("API token is empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(CiteError::InvalidConfig("model is empty".into()));
        }
        if c.max_tokens == 0 || c.rank_max_tokens == 0 {
            return Err(CiteError::InvalidConfig("token limits must be ≥ 1".into()));
        }
        if c.concurrency == 0 {
            return Err(CiteError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
