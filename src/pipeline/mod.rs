//! Pipeline stages for asking questions about PDFs.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm
//! (path/URL) (base64)  (messages API)
//! ```
//!
//! 1. [`input`] : read a local file or download a URL, check the `%PDF` magic
//! 2. [`encode`]: base64-wrap the bytes into a [`encode::LoadedPdf`]
//! 3. [`llm`]   : build the document + question request and send it; the
//!    only stage with network I/O

pub mod encode;
pub mod input;
pub mod llm;

use crate::config::ApiConfig;
use crate::error::CiteError;
use encode::LoadedPdf;

/// Resolve and encode one input.
pub async fn load_pdf(input: &str, config: &ApiConfig) -> Result<LoadedPdf, CiteError> {
    let resolved = input::resolve_input(input, config.download_timeout_secs).await?;
    Ok(encode::encode_document(resolved))
}
