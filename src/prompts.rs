//! Prompt templates.
//!
//! Every piece of natural language sent to the model lives here so prompt
//! changes touch exactly one file and tests can inspect them directly.

use crate::output::DocumentAnswer;
use crate::search::Document;
use std::fmt::Write as _;

/// Header placed above the numbered question list.
pub const QUESTIONS_HEADER: &str = "Please answer the following questions about the document:";

/// Format collected questions into a single prompt.
///
/// Returns `None` for an empty list: there is nothing to ask.
pub fn compose_query<S: AsRef<str>>(questions: &[S]) -> Option<String> {
    if questions.is_empty() {
        return None;
    }
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("{QUESTIONS_HEADER}\n\n{numbered}"))
}

/// Relevance-scoring prompt: the model returns one 0–10 score per document.
pub fn relevance_prompt(query: &str, docs: &[Document]) -> String {
    let doc_list = docs
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {} - {}", i + 1, d.title, d.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "User query: \"{query}\"\n\n\
Available documents:\n{doc_list}\n\n\
Rate each document's relevance to the query on a scale of 0-10 (where 10 is most relevant).\n\
Return only a JSON array of scores in order, like: [8, 3, 0, 9, 2]\n\n\
Scores:"
    )
}

/// Consolidation prompt fed with every successful per-document answer.
///
/// Citations are rendered in the same `[Cited from: …]` form the console
/// report uses, and the model is told to carry them through unchanged.
pub fn summarize_prompt(query: &str, answers: &[DocumentAnswer]) -> String {
    let mut prompt = String::from(
        "You are given answers to the same questions, each produced from a different document.\n\
Consolidate them into a single answer per question.\n\n\
Rules:\n\
1. Keep every citation line exactly as written, including document title and page range.\n\
2. Quote cited text verbatim; do not paraphrase it.\n\
3. When documents disagree, say so and cite both.\n\
4. Do not add information that is not in the answers below.\n\n",
    );

    let _ = writeln!(prompt, "Questions:\n{query}\n");

    for answer in answers.iter().filter(|a| a.is_ok()) {
        let _ = writeln!(prompt, "=== Answer from: {} ===", answer.title);
        if let Some(ref resp) = answer.response {
            for item in &resp.content {
                if let Some(ref text) = item.text {
                    prompt.push_str(text);
                    prompt.push('\n');
                }
                for c in &item.citations {
                    let _ = writeln!(
                        prompt,
                        "  [Cited from: {}, Pages: {}]",
                        c.title_or_unknown(),
                        c.page_range()
                    );
                    if let Some(ref cited) = c.cited_text {
                        let _ = writeln!(prompt, "  Cited text: \"{}\"", cited);
                    }
                }
            }
        }
        prompt.push('\n');
    }

    prompt.push_str("Consolidated answer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Citation, ContentItem, MessagesResponse};
    use serde_json::json;

    #[test]
    fn compose_query_numbers_questions() {
        let q = compose_query(&["What is revenue?", "Who is the CFO?"]).unwrap();
        assert_eq!(
            q,
            "Please answer the following questions about the document:\n\n\
1. What is revenue?\n2. Who is the CFO?"
        );
    }

    #[test]
    fn compose_query_empty_is_none() {
        assert!(compose_query::<&str>(&[]).is_none());
    }

    #[test]
    fn summarize_prompt_keeps_citations() {
        let answers = vec![DocumentAnswer {
            index: 0,
            title: "Q1 2025".into(),
            response: Some(MessagesResponse {
                content: vec![ContentItem {
                    kind: None,
                    text: Some("Revenue was $2.4B.".into()),
                    citations: vec![Citation {
                        document_title: Some("Q1 2025".into()),
                        start_page_number: Some(json!(2)),
                        end_page_number: Some(json!(3)),
                        cited_text: Some("Revenue grew 27% to $2.4 billion".into()),
                    }],
                }],
                usage: None,
            }),
            error: None,
            duration_ms: 0,
            retries: 0,
        }];

        let p = summarize_prompt("1. What is revenue?", &answers);
        assert!(p.contains("=== Answer from: Q1 2025 ==="));
        assert!(p.contains("[Cited from: Q1 2025, Pages: 2-3]"));
        assert!(p.contains("\"Revenue grew 27% to $2.4 billion\""));
        assert!(p.ends_with("Consolidated answer:"));
    }

    #[test]
    fn summarize_prompt_quotes_cited_text_verbatim() {
        let answers = vec![DocumentAnswer {
            index: 0,
            title: "Letter".into(),
            response: Some(MessagesResponse {
                content: vec![ContentItem {
                    kind: None,
                    text: Some("Margins improved.".into()),
                    citations: vec![Citation {
                        document_title: Some("Letter".into()),
                        start_page_number: Some(json!(1)),
                        end_page_number: None,
                        cited_text: Some(" Operating margin rose to 12%.\n".into()),
                    }],
                }],
                usage: None,
            }),
            error: None,
            duration_ms: 0,
            retries: 0,
        }];

        let p = summarize_prompt("1. Margins?", &answers);
        assert!(p.contains("  Cited text: \" Operating margin rose to 12%.\n\"\n"));
    }
}
