//! Question-answering over PDFs with citations.
//!
//! Two entry points:
//!
//! * [`ask_document`]: one document, one request. A non-200 response is
//!   returned as [`CiteError::ApiStatus`] with status and body untouched.
//! * [`ask_documents`]: a batch. Requests fan out over at most
//!   `config.concurrency` in-flight calls; answers come back in submission
//!   order and failed documents are kept as errors while the rest proceed.
//!   With `config.summarize` a second request consolidates the answers.

use crate::api::{MessageContent, MessagesApi, MessagesRequest, MessagesResponse};
use crate::config::ApiConfig;
use crate::error::{CiteError, DocumentError};
use crate::output::{AskOutput, AskStats, DocumentAnswer};
use crate::pipeline::encode::LoadedPdf;
use crate::pipeline::llm;
use crate::progress::ProgressCallback;
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, warn};

/// Ask a composed query about a single document.
pub async fn ask_document(
    api: &dyn MessagesApi,
    pdf: &LoadedPdf,
    query: &str,
    config: &ApiConfig,
) -> Result<MessagesResponse, CiteError> {
    info!("Asking about '{}'", pdf.title);
    let request = llm::document_request(pdf, query, config);
    let (result, _) = llm::send_with_retry(api, &request, config, &pdf.title).await;
    result
}

/// Ask the same query about every document in `pdfs`.
///
/// # Errors
/// Returns `Err` only when the batch is empty or every document failed;
/// otherwise per-document failures live in [`DocumentAnswer::error`].
pub async fn ask_documents(
    api: &dyn MessagesApi,
    pdfs: &[LoadedPdf],
    query: &str,
    config: &ApiConfig,
    progress: Option<ProgressCallback>,
) -> Result<AskOutput, CiteError> {
    let start = Instant::now();
    let total = pdfs.len();
    if total == 0 {
        return Err(CiteError::InvalidConfig("no documents to ask about".into()));
    }
    info!(
        "Asking {} document(s), concurrency {}",
        total, config.concurrency
    );

    if let Some(ref cb) = progress {
        cb.on_batch_start(total);
    }

    // `buffered` (not `buffer_unordered`) keeps results in submission order.
    let answers: Vec<DocumentAnswer> = stream::iter(pdfs.iter().enumerate().map(|(index, pdf)| {
        let progress = progress.clone();
        async move {
            if let Some(ref cb) = progress {
                cb.on_document_start(index, &pdf.title, total);
            }
            let answer = llm::process_document(api, index, pdf, query, config).await;
            if let Some(ref cb) = progress {
                match &answer.error {
                    None => cb.on_document_complete(index, &pdf.title, total, answer.citations().len()),
                    Some(e) => cb.on_document_error(index, &pdf.title, total, &e.to_string()),
                }
            }
            answer
        }
    }))
    .buffered(config.concurrency)
    .collect()
    .await;

    let succeeded = answers.iter().filter(|a| a.is_ok()).count();
    if succeeded == 0 {
        let first_error = answers
            .iter()
            .find_map(|a| a.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        if let Some(ref cb) = progress {
            cb.on_batch_complete(total, 0);
        }
        return Err(CiteError::AllDocumentsFailed { total, first_error });
    }

    let (summary, summary_error) = if config.summarize {
        match summarize(api, &answers, query, config).await {
            Ok(resp) => {
                if let Some(ref cb) = progress {
                    cb.on_summary(true);
                }
                (Some(resp), None)
            }
            Err(e) => {
                warn!("Summarize request failed: {}", e);
                if let Some(ref cb) = progress {
                    cb.on_summary(false);
                }
                (None, Some(DocumentError::from_fatal("summary", 0, e)))
            }
        }
    } else {
        (None, None)
    };

    if let Some(ref cb) = progress {
        cb.on_batch_complete(total, succeeded);
    }

    let stats = AskStats::collect(
        &answers,
        summary.as_ref(),
        start.elapsed().as_millis() as u64,
    );
    info!(
        "Batch complete: {}/{} documents, {} citations, {}ms",
        stats.succeeded, stats.total_documents, stats.total_citations, stats.total_duration_ms
    );

    Ok(AskOutput {
        query: query.to_string(),
        answers,
        summary,
        summary_error,
        stats,
    })
}

/// Consolidate per-document answers with a text-only request.
pub async fn summarize(
    api: &dyn MessagesApi,
    answers: &[DocumentAnswer],
    query: &str,
    config: &ApiConfig,
) -> Result<MessagesResponse, CiteError> {
    let prompt = prompts::summarize_prompt(query, answers);
    let request = MessagesRequest::single_user(
        config.model.clone(),
        config.max_tokens,
        MessageContent::Text(prompt),
    );
    let (result, _) = llm::send_with_retry(api, &request, config, "summary").await;
    result
}
