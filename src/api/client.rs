//! The seam between the workflows and the remote endpoint.
//!
//! Everything above this module talks to a [`MessagesApi`]; the real
//! implementation is [`HttpMessagesClient`], tests substitute a scripted one.

use crate::api::types::{MessagesRequest, MessagesResponse};
use crate::config::ApiConfig;
use crate::error::CiteError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Send one messages request and receive its response.
#[async_trait]
pub trait MessagesApi: Send + Sync {
    /// POST `request`; `Ok` only for HTTP 200 with a well-formed JSON body.
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, CiteError>;
}

/// reqwest-backed [`MessagesApi`] using bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpMessagesClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    timeout_secs: u64,
}

impl HttpMessagesClient {
    pub fn new(config: &ApiConfig) -> Result<Self, CiteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| CiteError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MessagesApi for HttpMessagesClient {
    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, CiteError> {
        debug!(
            "POST {} model={} max_tokens={}",
            self.endpoint, request.model, request.max_tokens
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CiteError::ApiTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    CiteError::RequestFailed {
                        endpoint: self.endpoint.clone(),
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CiteError::RequestFailed {
            endpoint: self.endpoint.clone(),
            detail: format!("reading body: {e}"),
        })?;

        if status != StatusCode::OK {
            return Err(CiteError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| CiteError::InvalidResponse {
            detail: e.to_string(),
        })
    }
}
