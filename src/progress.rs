//! Progress-callback trait for per-document batch events.
//!
//! Pass an [`Arc<dyn AskProgressCallback>`] to
//! [`crate::ask::ask_documents`] to receive events as each document request
//! starts and finishes. The trait is `Send + Sync` because documents are
//! processed concurrently.
//!
//! # Example
//!
//! ```rust
//! use pdfcite::AskProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl AskProgressCallback for Counter {
//!     fn on_document_complete(&self, _index: usize, _title: &str, _total: usize, _citations: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the ask workflow as it processes each document.
///
/// All methods default to no-ops. When several documents are in flight the
/// per-document hooks may be called concurrently from different tasks.
pub trait AskProgressCallback: Send + Sync {
    /// Called once before any request is sent.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before the request for a document is sent.
    fn on_document_start(&self, index: usize, title: &str, total: usize) {
        let _ = (index, title, total);
    }

    /// Called when a document's response arrived with HTTP 200.
    ///
    /// `citations` is the number of citation records in the response.
    fn on_document_complete(&self, index: usize, title: &str, total: usize, citations: usize) {
        let _ = (index, title, total, citations);
    }

    /// Called when a document failed (after retries, if any).
    fn on_document_error(&self, index: usize, title: &str, total: usize, error: &str) {
        let _ = (index, title, total, error);
    }

    /// Called after the summarize request, when one was made.
    fn on_summary(&self, ok: bool) {
        let _ = ok;
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// The default when no callback is configured.
pub struct NoopProgressCallback;

impl AskProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn AskProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        citations: AtomicUsize,
    }

    impl AskProgressCallback for Tracking {
        fn on_document_start(&self, _index: usize, _title: &str, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _title: &str, _total: usize, citations: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.citations.fetch_add(citations, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _title: &str, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(0, "a", 2);
        cb.on_document_complete(0, "a", 2, 3);
        cb.on_document_error(1, "b", 2, "Error: 500 - x");
        cb.on_summary(true);
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_document_start(0, "a", 2);
        t.on_document_complete(0, "a", 2, 4);
        t.on_document_start(1, "b", 2);
        t.on_document_error(1, "b", 2, "timeout");

        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.completes.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.citations.load(Ordering::SeqCst), 4);
    }
}
