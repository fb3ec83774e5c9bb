//! Error types for the pdfcite library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CiteError`] is **fatal**: the operation cannot proceed at all (bad
//!   input file, invalid configuration, the registry cannot be opened, or the
//!   API rejected a single-document request). Returned as `Err(CiteError)`.
//!
//! * [`DocumentError`] is **non-fatal**: one document of a batch failed but
//!   the others are fine. Stored inside [`crate::output::DocumentAnswer`] so
//!   a batch keeps whatever succeeded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfcite library.
#[derive(Debug, Error)]
pub enum CiteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    // ── API errors ────────────────────────────────────────────────────────
    /// The endpoint answered with a status other than 200.
    ///
    /// `body` is the response text exactly as received.
    #[error("Error: {status} - {body}")]
    ApiStatus { status: u16, body: String },

    /// The request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("Request to '{endpoint}' failed: {detail}")]
    RequestFailed { endpoint: String, detail: String },

    /// The request exceeded `api_timeout_secs`.
    #[error("API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// A 200 response whose body is not the expected JSON shape.
    #[error("Malformed API response: {detail}")]
    InvalidResponse { detail: String },

    /// Every document in a batch failed; there is nothing to report.
    #[error("All {total} documents failed.\nFirst error: {first_error}")]
    AllDocumentsFailed { total: usize, first_error: String },

    // ── Registry errors ───────────────────────────────────────────────────
    /// SQLite rejected a statement or could not be opened.
    #[error("Document registry error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not list the directory to ingest.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CiteError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// 429 and 5xx statuses, timeouts and transport failures are transient;
    /// everything else (4xx, malformed bodies) will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            CiteError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            CiteError::RequestFailed { .. } | CiteError::ApiTimeout { .. } => true,
            _ => false,
        }
    }
}

/// A non-fatal error for a single document of a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The endpoint answered with a status other than 200.
    #[error("Error: {status} - {body}")]
    ApiStatus { status: u16, body: String },

    /// The request failed after `retries` retries.
    #[error("'{title}': request failed after {retries} retries: {detail}")]
    RequestFailed {
        title: String,
        retries: u32,
        detail: String,
    },

    /// The request timed out.
    #[error("'{title}': API call timed out after {secs}s")]
    Timeout { title: String, secs: u64 },

    /// The document could not be loaded or encoded.
    #[error("'{title}': {detail}")]
    Load { title: String, detail: String },
}

impl DocumentError {
    /// Demote a fatal error raised while processing `title` to a per-document one.
    pub fn from_fatal(title: &str, retries: u32, err: CiteError) -> Self {
        match err {
            CiteError::ApiStatus { status, body } => DocumentError::ApiStatus { status, body },
            CiteError::ApiTimeout { secs } => DocumentError::Timeout {
                title: title.to_string(),
                secs,
            },
            other => DocumentError::RequestFailed {
                title: title.to_string(),
                retries,
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_display_keeps_body_verbatim() {
        let e = CiteError::ApiStatus {
            status: 529,
            body: r#"{"type":"error","error":{"type":"overloaded_error"}}"#.into(),
        };
        assert_eq!(
            e.to_string(),
            r#"Error: 529 - {"type":"error","error":{"type":"overloaded_error"}}"#
        );
    }

    #[test]
    fn transient_classification() {
        assert!(CiteError::ApiStatus { status: 429, body: String::new() }.is_transient());
        assert!(CiteError::ApiStatus { status: 503, body: String::new() }.is_transient());
        assert!(!CiteError::ApiStatus { status: 400, body: String::new() }.is_transient());
        assert!(!CiteError::ApiStatus { status: 401, body: String::new() }.is_transient());
        assert!(CiteError::ApiTimeout { secs: 5 }.is_transient());
        assert!(!CiteError::InvalidResponse { detail: "x".into() }.is_transient());
    }

    #[test]
    fn from_fatal_preserves_status_and_body() {
        let e = DocumentError::from_fatal(
            "Q1 2025 Report",
            0,
            CiteError::ApiStatus {
                status: 413,
                body: "request too large".into(),
            },
        );
        match e {
            DocumentError::ApiStatus { status, body } => {
                assert_eq!(status, 413);
                assert_eq!(body, "request too large");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn all_documents_failed_display() {
        let e = CiteError::AllDocumentsFailed {
            total: 3,
            first_error: "Error: 500 - boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 documents"), "got: {msg}");
        assert!(msg.contains("Error: 500 - boom"), "got: {msg}");
    }
}
