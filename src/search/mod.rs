//! Document registry search: keyword filtering and LLM relevance ranking.
//!
//! ```text
//! query ──▶ llm_search ──▶ scoring prompt ──▶ [8, 3, 0, 9, 2] ──▶ rank
//!                │  (transport error, unreadable scores)
//!                └──────────▶ keyword_search (year / quarter / LIKE)
//! ```
//!
//! A non-200 status from the endpoint is not a fallback case: it is reported
//! as [`SearchMethod::ApiError`] with no documents.

pub mod filter;
pub mod rank;
pub mod store;

pub use filter::{DocumentFilter, Predicate};
pub use store::{Document, DocumentStore, NewDocument};

use crate::api::{MessageContent, MessagesApi, MessagesRequest};
use crate::config::ApiConfig;
use crate::error::CiteError;
use crate::prompts;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Which path produced a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SearchMethod {
    /// Ranked by model-assigned scores.
    Llm,
    /// Plain keyword search; `reason` says why ranking was abandoned.
    KeywordFallback { reason: String },
    /// The endpoint answered with a non-200 status; no documents returned.
    ApiError { status: u16, body: String },
    /// The registry is empty; nothing was asked.
    EmptyRegistry,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedSearch {
    pub documents: Vec<Document>,
    pub method: SearchMethod,
}

/// Outcome of [`DocumentSearch::ingest_dir`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub added: Vec<Document>,
    /// Paths already present in the registry.
    pub skipped: Vec<String>,
}

/// Search operations over a [`DocumentStore`].
pub struct DocumentSearch {
    store: DocumentStore,
}

impl DocumentSearch {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, CiteError> {
        Ok(Self::new(DocumentStore::open(db_path)?))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn add_document(&self, doc: &NewDocument) -> Result<i64, CiteError> {
        self.store.add_document(doc)
    }

    pub fn all_documents(&self) -> Result<Vec<Document>, CiteError> {
        self.store.all_documents()
    }

    /// Year / quarter / keyword search, newest first.
    pub fn keyword_search(&self, query: &str) -> Result<Vec<Document>, CiteError> {
        let filter = DocumentFilter::from_query(query);
        debug!("keyword search {:?}", filter);
        self.store.search(&filter.predicate())
    }

    /// Rank every registered document by model-judged relevance to `query`.
    ///
    /// A non-200 status yields an empty [`SearchMethod::ApiError`] result.
    /// Other failures (transport, missing text, malformed score text) are
    /// logged and answered with [`Self::keyword_search`] instead. Only
    /// registry errors propagate.
    pub async fn llm_search(
        &self,
        api: &dyn MessagesApi,
        config: &ApiConfig,
        query: &str,
    ) -> Result<RankedSearch, CiteError> {
        let docs = self.store.all_documents()?;
        if docs.is_empty() {
            return Ok(RankedSearch {
                documents: Vec::new(),
                method: SearchMethod::EmptyRegistry,
            });
        }

        let request = MessagesRequest::single_user(
            config.model.clone(),
            config.rank_max_tokens,
            MessageContent::Text(prompts::relevance_prompt(query, &docs)),
        );

        let reason = match api.send(&request).await {
            Ok(resp) => match resp.first_text().map(rank::parse_scores) {
                Some(Ok(scores)) => {
                    info!("Ranked {} documents by relevance", docs.len());
                    return Ok(RankedSearch {
                        documents: rank::rank_by_scores(docs, &scores),
                        method: SearchMethod::Llm,
                    });
                }
                Some(Err(e)) => format!("malformed scores: {e}"),
                None => "response has no text".to_string(),
            },
            Err(CiteError::ApiStatus { status, body }) => {
                warn!("Error: {} - {}", status, body);
                return Ok(RankedSearch {
                    documents: Vec::new(),
                    method: SearchMethod::ApiError { status, body },
                });
            }
            Err(e) => e.to_string(),
        };

        warn!("LLM search error: {}; falling back to keyword search", reason);
        Ok(RankedSearch {
            documents: self.keyword_search(query)?,
            method: SearchMethod::KeywordFallback { reason },
        })
    }

    /// Register every `*.pdf` directly inside `dir`.
    ///
    /// Title is the file stem; fiscal year, quarter and keywords are derived
    /// from it. Files whose path is already registered are skipped.
    pub fn ingest_dir<P: AsRef<Path>>(&self, dir: P) -> Result<IngestReport, CiteError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| CiteError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut pdfs: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
            })
            .collect();
        pdfs.sort();

        let mut report = IngestReport::default();
        for path in pdfs {
            let path_str = path.display().to_string();
            if self.store.find_by_path(&path_str)?.is_some() {
                debug!("Already registered: {}", path_str);
                report.skipped.push(path_str);
                continue;
            }

            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path_str.clone());
            let mut doc = describe_title(&title);
            doc.path = Some(path_str);

            let id = self.store.add_document(&doc)?;
            info!("Added: {}", title);
            if let Some(added) = self.store.get(id)? {
                report.added.push(added);
            }
        }
        Ok(report)
    }
}

/// Registry record for a PDF known only by its title.
pub fn describe_title(title: &str) -> NewDocument {
    let filter = DocumentFilter::from_query(title);
    let keywords = if filter.keywords.is_empty() {
        None
    } else {
        let mut words = filter.keywords.clone();
        words.dedup();
        Some(words.join(", "))
    };

    NewDocument {
        description: format!("Financial document: {title}"),
        fiscal_year: filter.fiscal_year,
        fiscal_quarter: filter.fiscal_quarter,
        keywords,
        ..NewDocument::pdf(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_title_derives_metadata() {
        let d = describe_title("Shopify Q1 2025 Earnings");
        assert_eq!(d.title, "Shopify Q1 2025 Earnings");
        assert_eq!(d.format, "PDF");
        assert_eq!(d.description, "Financial document: Shopify Q1 2025 Earnings");
        assert_eq!(d.fiscal_year, Some(2025));
        assert_eq!(d.fiscal_quarter.as_deref(), Some("Q1"));
        assert_eq!(d.keywords.as_deref(), Some("shopify, earnings"));
    }

    #[test]
    fn ingest_dir_registers_pdfs_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Q2 2024 Report.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("Press Release.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let search = DocumentSearch::new(DocumentStore::in_memory().unwrap());
        let first = search.ingest_dir(dir.path()).unwrap();
        assert_eq!(first.added.len(), 2);
        assert!(first.skipped.is_empty());

        let q2 = first
            .added
            .iter()
            .find(|d| d.title == "Q2 2024 Report")
            .unwrap();
        assert_eq!(q2.fiscal_year, Some(2024));
        assert_eq!(q2.fiscal_quarter.as_deref(), Some("Q2"));

        let second = search.ingest_dir(dir.path()).unwrap();
        assert!(second.added.is_empty());
        assert_eq!(second.skipped.len(), 2);
        assert_eq!(search.store().count().unwrap(), 2);
    }

    #[test]
    fn ingest_missing_dir() {
        let search = DocumentSearch::new(DocumentStore::in_memory().unwrap());
        let err = search.ingest_dir("/no/such/dir").unwrap_err();
        assert!(matches!(err, CiteError::ReadDirFailed { .. }));
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl MessagesApi for Unreachable {
        async fn send(&self, _: &MessagesRequest) -> Result<crate::api::MessagesResponse, CiteError> {
            Err(CiteError::RequestFailed {
                endpoint: "http://127.0.0.1:9".into(),
                detail: "connection refused".into(),
            })
        }
    }

    #[test]
    fn transport_failure_falls_back() {
        let search = DocumentSearch::new(DocumentStore::in_memory().unwrap());
        search.add_document(&describe_title("Q3 2024 Shareholder Letter")).unwrap();
        let config = ApiConfig::builder("http://127.0.0.1:9/v1/messages", "t")
            .build()
            .unwrap();

        let ranked =
            tokio_test::block_on(search.llm_search(&Unreachable, &config, "shareholder letter"))
                .unwrap();
        assert_eq!(ranked.documents.len(), 1);
        match ranked.method {
            SearchMethod::KeywordFallback { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    struct Overloaded;

    #[async_trait::async_trait]
    impl MessagesApi for Overloaded {
        async fn send(&self, _: &MessagesRequest) -> Result<crate::api::MessagesResponse, CiteError> {
            Err(CiteError::ApiStatus {
                status: 500,
                body: "overloaded".into(),
            })
        }
    }

    #[test]
    fn api_status_returns_nothing() {
        let search = DocumentSearch::new(DocumentStore::in_memory().unwrap());
        search.add_document(&describe_title("Q1 2025 Revenue")).unwrap();
        let config = ApiConfig::builder("http://127.0.0.1:9/v1/messages", "t")
            .build()
            .unwrap();

        let ranked =
            tokio_test::block_on(search.llm_search(&Overloaded, &config, "revenue")).unwrap();
        assert!(ranked.documents.is_empty());
        assert_eq!(
            ranked.method,
            SearchMethod::ApiError {
                status: 500,
                body: "overloaded".into()
            }
        );
    }

    #[test]
    fn keyword_search_uses_derived_metadata() {
        let search = DocumentSearch::new(DocumentStore::in_memory().unwrap());
        search.add_document(&describe_title("Q1 2025 Revenue Update")).unwrap();
        search.add_document(&describe_title("Q4 2024 Revenue Update")).unwrap();

        let hits = search.keyword_search("revenue Q1 2025").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Q1 2025 Revenue Update");
    }
}
