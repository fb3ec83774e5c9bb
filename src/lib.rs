//! # pdfcite
//!
//! Ask questions about PDF documents through a citation-capable LLM messages
//! API, and keep a small SQLite registry of documents that can be searched by
//! keyword or ranked for relevance by the same model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (path or URL)
//!  │
//!  ├─ 1. Input     read the file or download it, check the %PDF magic
//!  ├─ 2. Encode    bytes → base64 document block, citations enabled
//!  ├─ 3. Ask       bounded fan-out of one request per document
//!  ├─ 4. Summarize optional second request consolidating the answers
//!  └─ 5. Report    text + [Cited from: …, Pages: …] lines + token usage
//! ```
//!
//! The registry side (`search`) is independent: documents are registered
//! with fiscal year, quarter and keywords, then found with a parameterized
//! keyword query or ranked by model-assigned 0–10 scores, falling back to the
//! keyword query when ranking fails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfcite::{ask_documents, load_pdf, ApiConfig, HttpMessagesClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::builder("https://llm.example.com/v1/messages", "token")
//!         .summarize(true)
//!         .build()?;
//!     let client = HttpMessagesClient::new(&config)?;
//!
//!     let pdf = load_pdf("q1-2025-earnings.pdf", &config).await?;
//!     let query = pdfcite::compose_query(&["What was total revenue?"]).unwrap_or_default();
//!     let output = ask_documents(&client, &[pdf], &query, &config, None).await?;
//!     println!("{}", pdfcite::report::format_ask_output(&output));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfcite` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfcite = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod ask;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod search;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{Citation, HttpMessagesClient, MessagesApi, MessagesRequest, MessagesResponse};
pub use ask::{ask_document, ask_documents, summarize};
pub use config::{ApiConfig, ApiConfigBuilder, DEFAULT_MODEL};
pub use error::{CiteError, DocumentError};
pub use output::{AskOutput, AskStats, DocumentAnswer};
pub use pipeline::encode::LoadedPdf;
pub use pipeline::load_pdf;
pub use progress::{AskProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::compose_query;
pub use search::{
    Document, DocumentFilter, DocumentSearch, DocumentStore, IngestReport, NewDocument,
    RankedSearch, SearchMethod,
};
