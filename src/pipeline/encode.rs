//! PDF bytes → base64 document ready for a request body.
//!
//! The endpoint takes the whole PDF inline (`source.type = "base64"`) and
//! does its own page analysis, so there is nothing to render here.

use crate::api::ContentBlock;
use crate::pipeline::input::ResolvedInput;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A PDF loaded into memory and encoded for upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedPdf {
    /// Title sent with the document block; echoed back in citations.
    pub title: String,
    /// Optional one-line description sent as the block's `context`.
    pub context: Option<String>,
    /// Path or URL the bytes came from.
    pub source: String,
    /// Size of the raw PDF in bytes.
    pub size_bytes: usize,
    #[serde(skip)]
    pub data: String,
}

impl LoadedPdf {
    /// Override the title derived from the file name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The `document` content block for this PDF, citations enabled.
    pub fn to_block(&self) -> ContentBlock {
        ContentBlock::pdf(self.data.clone(), self.title.clone(), self.context.clone())
    }
}

/// Encode a resolved input; the title defaults to the file stem.
pub fn encode_document(input: ResolvedInput) -> LoadedPdf {
    let data = STANDARD.encode(&input.bytes);
    debug!(
        "Encoded '{}' → {} bytes base64",
        input.source,
        data.len()
    );

    LoadedPdf {
        title: input.stem,
        context: None,
        source: input.source,
        size_bytes: input.bytes.len(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_small_pdf() {
        let pdf = encode_document(ResolvedInput {
            source: "/tmp/a.pdf".into(),
            stem: "a".into(),
            bytes: b"%PDF-1.4".to_vec(),
        });
        assert_eq!(pdf.title, "a");
        assert_eq!(pdf.size_bytes, 8);
        let decoded = STANDARD.decode(&pdf.data).expect("valid base64");
        assert_eq!(decoded, b"%PDF-1.4");
    }

    #[test]
    fn block_carries_title_and_context() {
        let pdf = encode_document(ResolvedInput {
            source: "x".into(),
            stem: "x".into(),
            bytes: b"%PDF".to_vec(),
        })
        .with_title("Pattern Recognition Chapter 2")
        .with_context("Academic textbook chapter");

        match pdf.to_block() {
            ContentBlock::Document {
                title,
                context,
                citations,
                ..
            } => {
                assert_eq!(title, "Pattern Recognition Chapter 2");
                assert_eq!(context.as_deref(), Some("Academic textbook chapter"));
                assert!(citations.enabled);
            }
            other => panic!("expected document block, got {other:?}"),
        }
    }
}
