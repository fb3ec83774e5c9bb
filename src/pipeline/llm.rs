//! Dispatch of a single document request.
//!
//! This is the only pipeline stage with network I/O. Prompt wording lives in
//! [`crate::prompts`]; this module only builds the request body and drives
//! the call.
//!
//! ## Retry Strategy
//!
//! With the default `max_retries = 0` a failure is reported as-is. When
//! retries are enabled only transient failures (429, 5xx, timeouts,
//! transport errors) are retried, with exponential backoff
//! `retry_backoff_ms * 2^(attempt-1)`, capped at [`MAX_BACKOFF_MS`]. A 4xx other than 429 is returned
//! immediately with its status and body untouched.

use crate::api::{ContentBlock, MessageContent, MessagesApi, MessagesRequest, MessagesResponse};
use crate::config::ApiConfig;
use crate::error::{CiteError, DocumentError};
use crate::output::DocumentAnswer;
use crate::pipeline::encode::LoadedPdf;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// `[document block, text block]` for one PDF and one composed query.
pub fn document_request(pdf: &LoadedPdf, query: &str, config: &ApiConfig) -> MessagesRequest {
    MessagesRequest::single_user(
        config.model.clone(),
        config.max_tokens,
        MessageContent::Blocks(vec![pdf.to_block(), ContentBlock::text(query)]),
    )
}

/// Send `request`, retrying transient failures per `config`.
///
/// Returns the response (or the last error) and the number of retries spent.
pub async fn send_with_retry(
    api: &dyn MessagesApi,
    request: &MessagesRequest,
    config: &ApiConfig,
    label: &str,
) -> (Result<MessagesResponse, CiteError>, u32) {
    let mut attempt: u32 = 0;
    loop {
        match api.send(request).await {
            Ok(resp) => return (Ok(resp), attempt),
            Err(e) if attempt < config.max_retries && e.is_transient() => {
                attempt += 1;
                let backoff = backoff_ms(config.retry_backoff_ms, attempt);
                warn!(
                    "{}: attempt {} failed ({}); retry {}/{} after {}ms",
                    label, attempt, e, attempt, config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_BACKOFF_MS)
}

/// Ask `query` about one document.
///
/// Always returns a [`DocumentAnswer`]; a failure is stored in its `error`
/// field so one bad document does not abort the batch.
pub async fn process_document(
    api: &dyn MessagesApi,
    index: usize,
    pdf: &LoadedPdf,
    query: &str,
    config: &ApiConfig,
) -> DocumentAnswer {
    let start = Instant::now();
    let request = document_request(pdf, query, config);

    let (result, retries) = send_with_retry(api, &request, config, &pdf.title).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            debug!(
                "'{}': {} input tokens, {} output tokens, {} citations, {}ms",
                pdf.title,
                response.input_tokens(),
                response.output_tokens(),
                response.citations().count(),
                duration_ms
            );
            DocumentAnswer {
                index,
                title: pdf.title.clone(),
                response: Some(response),
                error: None,
                duration_ms,
                retries,
            }
        }
        Err(e) => {
            warn!("'{}': {}", pdf.title, e);
            DocumentAnswer {
                index,
                title: pdf.title.clone(),
                response: None,
                error: Some(DocumentError::from_fatal(&pdf.title, retries, e)),
                duration_ms,
                retries,
            }
        }
    }
}
