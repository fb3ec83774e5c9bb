//! Request and response bodies of the messages endpoint.
//!
//! Response types are deliberately lenient: every field defaults when absent
//! so an unexpected-but-valid response still renders (missing pages print as
//! `NA`) instead of failing the whole document.

use serde::{Deserialize, Serialize};

/// `{model, max_tokens, messages}`: the body POSTed to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    /// A request with a single user turn.
    pub fn single_user(model: impl Into<String>, max_tokens: u32, content: MessageContent) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: vec![Message {
                role: Role::User,
                content,
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Either a bare string or a list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Document {
        source: DocumentSource,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
        citations: CitationsFlag,
    },
    Text {
        text: String,
    },
}

impl ContentBlock {
    /// A base64 PDF block with citation extraction turned on.
    pub fn pdf(data: impl Into<String>, title: impl Into<String>, context: Option<String>) -> Self {
        ContentBlock::Document {
            source: DocumentSource::Base64 {
                media_type: PDF_MEDIA_TYPE.to_string(),
                data: data.into(),
            },
            title: title.into(),
            context,
            citations: CitationsFlag { enabled: true },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentSource {
    Base64 { media_type: String, data: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationsFlag {
    pub enabled: bool,
}

// ── Response ─────────────────────────────────────────────────────────────

/// `{content: [...], usage: {...}}` as returned on HTTP 200.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl MessagesResponse {
    /// Text of the first content item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|c| c.text.as_deref())
    }

    /// All generated text, concatenated in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Every citation across all content items, in order.
    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.content.iter().flat_map(|c| c.citations.iter())
    }

    pub fn input_tokens(&self) -> u64 {
        self.usage.as_ref().and_then(|u| u.input_tokens).unwrap_or(0)
    }

    pub fn output_tokens(&self) -> u64 {
        self.usage.as_ref().and_then(|u| u.output_tokens).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<Citation>,
}

/// A pointer from generated text back to a page range of a source document.
///
/// Page numbers are kept as raw JSON values so they are echoed exactly as the
/// API sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub start_page_number: Option<serde_json::Value>,
    #[serde(default)]
    pub end_page_number: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cited_text: Option<String>,
}

impl Citation {
    pub fn title_or_unknown(&self) -> &str {
        self.document_title.as_deref().unwrap_or("Unknown Document")
    }

    /// `start-end`, each side rendered verbatim or `NA` when missing.
    pub fn page_range(&self) -> String {
        format!(
            "{}-{}",
            render_page(self.start_page_number.as_ref()),
            render_page(self.end_page_number.as_ref())
        )
    }
}

fn render_page(v: Option<&serde_json::Value>) -> String {
    match v {
        None | Some(serde_json::Value::Null) => "NA".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_block_wire_shape() {
        let req = MessagesRequest::single_user(
            "m",
            1024,
            MessageContent::Blocks(vec![
                ContentBlock::pdf("JVBERi0=", "Report", None),
                ContentBlock::text("What is revenue?"),
            ]),
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "model": "m",
                "max_tokens": 1024,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "document",
                            "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBERi0="},
                            "title": "Report",
                            "citations": {"enabled": true}
                        },
                        {"type": "text", "text": "What is revenue?"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn plain_string_content() {
        let req = MessagesRequest::single_user("m", 100, MessageContent::Text("Scores:".into()));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["messages"][0]["content"], json!("Scores:"));
    }

    #[test]
    fn context_is_emitted_when_present() {
        let block = ContentBlock::pdf("x", "T", Some("Academic textbook chapter".into()));
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v["context"], json!("Academic textbook chapter"));
    }

    #[test]
    fn lenient_response_parsing() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Revenue grew ", "citations": null},
                {"type": "text", "text": "25%", "citations": [
                    {"type": "page_location", "document_title": "Q1", "start_page_number": 3,
                     "end_page_number": 4, "cited_text": "revenue grew 25%"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(resp.text(), "Revenue grew 25%");
        assert_eq!(resp.citations().count(), 1);
        assert_eq!(resp.input_tokens(), 0);
        let c = resp.citations().next().unwrap();
        assert_eq!(c.page_range(), "3-4");
    }

    #[test]
    fn missing_citation_fields_render_na() {
        let c = Citation::default();
        assert_eq!(c.title_or_unknown(), "Unknown Document");
        assert_eq!(c.page_range(), "NA-NA");
    }
}
