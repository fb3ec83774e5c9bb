//! Result types returned by the ask workflow.

use crate::api::{Citation, MessagesResponse};
use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

/// The outcome for one document of a batch.
///
/// Exactly one of `response` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnswer {
    /// Position of the document in the submitted batch (0-based).
    pub index: usize,
    pub title: String,
    pub response: Option<MessagesResponse>,
    pub error: Option<DocumentError>,
    pub duration_ms: u64,
    /// Retries spent before the final attempt.
    pub retries: u32,
}

impl DocumentAnswer {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.response.is_some()
    }

    pub fn citations(&self) -> Vec<&Citation> {
        self.response
            .as_ref()
            .map(|r| r.citations().collect())
            .unwrap_or_default()
    }
}

/// Everything produced by [`crate::ask::ask_documents`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOutput {
    /// The composed prompt sent with every document.
    pub query: String,
    /// One entry per submitted document, in submission order.
    pub answers: Vec<DocumentAnswer>,
    /// Consolidated answer, when summarize was requested and produced.
    pub summary: Option<MessagesResponse>,
    /// Why the summarize step failed, if it was attempted and did.
    pub summary_error: Option<DocumentError>,
    pub stats: AskStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskStats {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_citations: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

impl AskStats {
    /// Aggregate counters over the answers and the optional summary.
    pub fn collect(
        answers: &[DocumentAnswer],
        summary: Option<&MessagesResponse>,
        total_duration_ms: u64,
    ) -> Self {
        let responses = answers
            .iter()
            .filter_map(|a| a.response.as_ref())
            .chain(summary);

        let mut stats = AskStats {
            total_documents: answers.len(),
            succeeded: answers.iter().filter(|a| a.is_ok()).count(),
            failed: answers.iter().filter(|a| !a.is_ok()).count(),
            total_duration_ms,
            ..Default::default()
        };
        for r in responses {
            stats.total_citations += r.citations().count();
            stats.total_input_tokens += r.input_tokens();
            stats.total_output_tokens += r.output_tokens();
        }
        stats
    }
}
