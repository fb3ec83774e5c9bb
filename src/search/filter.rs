//! Composable, parameterized search predicates.
//!
//! A [`Predicate`] renders to a SQL fragment containing only `?`
//! placeholders plus the values to bind, so user text never becomes SQL.
//! [`DocumentFilter::from_query`] turns a free-text query such as
//! `"revenue Q1 2025"` into year, quarter and keyword predicates.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("year regex"));

static RE_QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bq([1-4])\b|quarter\s*([1-4])").expect("quarter regex"));

/// A boolean condition over the `documents` table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `fiscal_year = ?`
    FiscalYear(i32),
    /// `fiscal_quarter = ?`, value normalised to `Q1`..`Q4`.
    FiscalQuarter(String),
    /// Any keyword appears (case-insensitively) in the title or keywords.
    AnyKeyword(Vec<String>),
    /// Every inner predicate holds. Empty means "match everything".
    All(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction, flattening nested `All`s.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = match self {
            Predicate::All(p) => p,
            p => vec![p],
        };
        match other {
            Predicate::All(p) => parts.extend(p),
            p => parts.push(p),
        }
        Predicate::All(parts)
    }

    /// Render to a SQL fragment and its bound parameters, in placeholder order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.render(&mut params);
        (sql, params)
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::FiscalYear(y) => {
                params.push(Value::Integer(i64::from(*y)));
                "fiscal_year = ?".to_string()
            }
            Predicate::FiscalQuarter(q) => {
                params.push(Value::Text(q.clone()));
                "fiscal_quarter = ?".to_string()
            }
            Predicate::AnyKeyword(words) if words.is_empty() => "1=1".to_string(),
            Predicate::AnyKeyword(words) => {
                let clauses: Vec<String> = words
                    .iter()
                    .map(|w| {
                        let pattern = format!("%{}%", escape_like(&w.to_lowercase()));
                        params.push(Value::Text(pattern.clone()));
                        params.push(Value::Text(pattern));
                        "(LOWER(title) LIKE ? ESCAPE '\\' OR LOWER(COALESCE(keywords, '')) LIKE ? ESCAPE '\\')"
                            .to_string()
                    })
                    .collect();
                format!("({})", clauses.join(" OR "))
            }
            Predicate::All(parts) if parts.is_empty() => "1=1".to_string(),
            Predicate::All(parts) => parts
                .iter()
                .map(|p| p.render(params))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Structured reading of a free-text query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub fiscal_year: Option<i32>,
    pub fiscal_quarter: Option<String>,
    pub keywords: Vec<String>,
}

impl DocumentFilter {
    /// Extract the first year (`20xx`), the first quarter (`Q3`, `quarter 3`)
    /// and the remaining lower-cased words.
    pub fn from_query(query: &str) -> Self {
        let fiscal_year = extract_year(query);
        let fiscal_quarter = extract_quarter(query);

        let without_quarter = RE_QUARTER.replace_all(query, " ");
        let without_year = RE_YEAR.replace_all(&without_quarter, " ");
        let keywords = without_year
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            fiscal_year,
            fiscal_quarter,
            keywords,
        }
    }

    pub fn predicate(&self) -> Predicate {
        let mut p = Predicate::All(Vec::new());
        if let Some(y) = self.fiscal_year {
            p = p.and(Predicate::FiscalYear(y));
        }
        if let Some(ref q) = self.fiscal_quarter {
            p = p.and(Predicate::FiscalQuarter(q.clone()));
        }
        if !self.keywords.is_empty() {
            p = p.and(Predicate::AnyKeyword(self.keywords.clone()));
        }
        p
    }
}

/// First `20xx` in `text`.
pub fn extract_year(text: &str) -> Option<i32> {
    RE_YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First quarter mention in `text`, normalised to `QN`.
pub fn extract_quarter(text: &str) -> Option<String> {
    let caps = RE_QUARTER.captures(text)?;
    let digit = caps.get(1).or_else(|| caps.get(2))?;
    Some(format!("Q{}", digit.as_str()))
}
