//! Relevance ranking from model-assigned scores.

use crate::search::store::Document;
use once_cell::sync::Lazy;
use regex::Regex;

// Models sometimes wrap the array in a ```json fence despite the prompt.
static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n?(.*?)\n?\s*```$").expect("fence regex"));

/// Parse the model's reply as a JSON array of scores.
///
/// Scores are read as `f64`, so `[8.5, 3, 0]` is as valid as `[8, 3, 0]`.
pub fn parse_scores(text: &str) -> Result<Vec<f64>, serde_json::Error> {
    let trimmed = text.trim();
    let body = RE_OUTER_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);
    serde_json::from_str(body)
}

/// Pair documents with scores positionally, sort by descending score and
/// drop everything scored zero or below.
///
/// The sort is stable, so equal scores keep the registry order. Documents
/// beyond the end of `scores` have no score and are dropped; surplus scores
/// are ignored.
pub fn rank_by_scores(docs: Vec<Document>, scores: &[f64]) -> Vec<Document> {
    let mut scored: Vec<(Document, f64)> = docs.into_iter().zip(scores.iter().copied()).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .map(|(doc, _)| doc)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn docs(n: usize) -> Vec<Document> {
        (1..=n)
            .map(|i| Document {
                id: i as i64,
                title: format!("doc{i}"),
                format: "PDF".into(),
                url: None,
                path: None,
                description: String::new(),
                fiscal_year: None,
                fiscal_quarter: None,
                keywords: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    fn titles(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.title.as_str()).collect()
    }

    #[test]
    fn sorts_descending_and_drops_zero() {
        let ranked = rank_by_scores(docs(5), &[8.0, 3.0, 0.0, 9.0, 2.0]);
        assert_eq!(titles(&ranked), vec!["doc4", "doc1", "doc2", "doc5"]);
    }

    #[test]
    fn ties_keep_registry_order() {
        let ranked = rank_by_scores(docs(3), &[5.0, 7.0, 5.0]);
        assert_eq!(titles(&ranked), vec!["doc2", "doc1", "doc3"]);
    }

    #[test]
    fn short_score_list_drops_unscored() {
        let ranked = rank_by_scores(docs(3), &[1.0, 2.0]);
        assert_eq!(titles(&ranked), vec!["doc2", "doc1"]);
    }

    #[test]
    fn parses_plain_and_fenced_arrays() {
        assert_eq!(
            parse_scores(" [8, 3, 0, 9, 2]\n").unwrap(),
            vec![8.0, 3.0, 0.0, 9.0, 2.0]
        );
        assert_eq!(parse_scores("```json\n[1, 2]\n```").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn fractional_scores_rank() {
        let scores = parse_scores("[8.5, 3, 0]").unwrap();
        assert_eq!(scores, vec![8.5, 3.0, 0.0]);

        let ranked = rank_by_scores(docs(3), &[3.0, 8.5, 0.5]);
        assert_eq!(titles(&ranked), vec!["doc2", "doc1", "doc3"]);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_scores("The most relevant is document 4.").is_err());
        assert!(parse_scores("[8, 3, \"high\"]").is_err());
        assert!(parse_scores("").is_err());
    }
}
