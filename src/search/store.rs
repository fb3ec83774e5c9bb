//! SQLite registry of known documents.
//!
//! One table, `documents`. Older registries that named the title column
//! `file_title` and lacked the fiscal/keyword columns are upgraded in place
//! by [`DocumentStore::open`].

use crate::error::CiteError;
use crate::search::filter::Predicate;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A persisted document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub format: String,
    pub url: Option<String>,
    pub path: Option<String>,
    pub description: String,
    pub fiscal_year: Option<i32>,
    pub fiscal_quarter: Option<String>,
    pub keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub format: String,
    pub url: Option<String>,
    pub path: Option<String>,
    pub description: String,
    pub fiscal_year: Option<i32>,
    pub fiscal_quarter: Option<String>,
    pub keywords: Option<String>,
}

impl NewDocument {
    /// A PDF record with only a title.
    pub fn pdf(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            format: "PDF".to_string(),
            ..Default::default()
        }
    }
}

const COLUMNS: &str = "id, title, format, url, path, description, fiscal_year, fiscal_quarter, \
keywords, created_at, updated_at";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        format TEXT NOT NULL DEFAULT 'PDF',
        url TEXT,
        path TEXT,
        description TEXT NOT NULL DEFAULT '',
        fiscal_year INTEGER,
        fiscal_quarter TEXT,
        keywords TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#;

const CREATE_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_documents_fiscal ON documents(fiscal_year, fiscal_quarter);
    CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(path);
    CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at);
"#;

/// Columns added to registries created before they existed.
const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("path", "TEXT"),
    ("fiscal_year", "INTEGER"),
    ("fiscal_quarter", "TEXT"),
    ("keywords", "TEXT"),
    ("updated_at", "TEXT"),
];

/// SQLite-backed document registry.
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Create or open the registry at `path`, migrating older layouts.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CiteError> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        debug!("Opened document registry at {}", path.as_ref().display());
        Ok(store)
    }

    /// A throwaway registry (tests, dry runs).
    pub fn in_memory() -> Result<Self, CiteError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), CiteError> {
        let conn = self.conn.lock();
        conn.execute_batch(CREATE_TABLE)?;

        let columns = table_columns(&conn)?;
        if columns.iter().any(|c| c == "file_title") && !columns.iter().any(|c| c == "title") {
            info!("Upgrading registry: renaming file_title → title");
            conn.execute_batch("ALTER TABLE documents RENAME COLUMN file_title TO title;")?;
        }
        for (name, ty) in ADDED_COLUMNS {
            if !columns.iter().any(|c| c == name) {
                info!("Upgrading registry: adding column {}", name);
                conn.execute_batch(&format!("ALTER TABLE documents ADD COLUMN {name} {ty};"))?;
            }
        }
        conn.execute(
            "UPDATE documents SET updated_at = created_at WHERE updated_at IS NULL",
            [],
        )?;

        conn.execute_batch(CREATE_INDEXES)?;
        Ok(())
    }

    /// Insert a document and return its id.
    pub fn add_document(&self, doc: &NewDocument) -> Result<i64, CiteError> {
        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (title, format, url, path, description, fiscal_year, \
             fiscal_quarter, keywords, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                doc.title,
                doc.format,
                doc.url,
                doc.path,
                doc.description,
                doc.fiscal_year,
                doc.fiscal_quarter,
                doc.keywords,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Document>, CiteError> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM documents WHERE id = ?1"),
                params![id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    pub fn find_by_path(&self, path: &str) -> Result<Option<Document>, CiteError> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM documents WHERE path = ?1 ORDER BY id LIMIT 1"),
                params![path],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// Every document, newest first.
    pub fn all_documents(&self) -> Result<Vec<Document>, CiteError> {
        self.search(&Predicate::All(Vec::new()))
    }

    /// Documents matching `predicate`, newest first.
    pub fn search(&self, predicate: &Predicate) -> Result<Vec<Document>, CiteError> {
        let (clause, values) = predicate.to_sql();
        let sql = format!(
            "SELECT {COLUMNS} FROM documents WHERE {clause} ORDER BY created_at DESC, id DESC"
        );
        debug!("search: {} ({} params)", sql, values.len());

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), row_to_document)?;
        let docs = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Remove a document; `true` when a row was deleted.
    pub fn delete(&self, id: i64) -> Result<bool, CiteError> {
        let conn = self.conn.lock();
        let n = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<usize, CiteError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

fn table_columns(conn: &Connection) -> Result<Vec<String>, CiteError> {
    let mut stmt = conn.prepare("PRAGMA table_info(documents)")?;
    let names = stmt
        .query_map([], |r| r.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let created_at: DateTime<Utc> = row.get(9)?;
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        format: row.get(2)?,
        url: row.get(3)?,
        path: row.get(4)?,
        description: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        fiscal_year: row.get(6)?,
        fiscal_quarter: row.get(7)?,
        keywords: row.get(8)?,
        created_at,
        updated_at: row.get::<_, Option<DateTime<Utc>>>(10)?.unwrap_or(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filter::DocumentFilter;

    fn doc(title: &str, year: Option<i32>, quarter: Option<&str>, keywords: Option<&str>) -> NewDocument {
        NewDocument {
            fiscal_year: year,
            fiscal_quarter: quarter.map(str::to_string),
            keywords: keywords.map(str::to_string),
            description: format!("Financial document: {title}"),
            ..NewDocument::pdf(title)
        }
    }

    fn seeded() -> DocumentStore {
        let store = DocumentStore::in_memory().unwrap();
        store
            .add_document(&doc("Q1 2025 Earnings Release", Some(2025), Some("Q1"), Some("revenue, earnings")))
            .unwrap();
        store
            .add_document(&doc("Q2 2024 Earnings Release", Some(2024), Some("Q2"), Some("earnings")))
            .unwrap();
        store
            .add_document(&doc("2025 Press Release", Some(2025), None, Some("press")))
            .unwrap();
        store
    }

    #[test]
    fn add_and_get() {
        let store = DocumentStore::in_memory().unwrap();
        let id = store.add_document(&NewDocument::pdf("Annual Report")).unwrap();
        let got = store.get(id).unwrap().unwrap();
        assert_eq!(got.title, "Annual Report");
        assert_eq!(got.format, "PDF");
        assert_eq!(got.created_at, got.updated_at);
        assert!(store.get(id + 100).unwrap().is_none());
    }

    #[test]
    fn all_documents_newest_first() {
        let store = seeded();
        let titles: Vec<_> = store
            .all_documents()
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(
            titles,
            vec!["2025 Press Release", "Q2 2024 Earnings Release", "Q1 2025 Earnings Release"]
        );
    }

    #[test]
    fn search_by_year_quarter_and_keyword() {
        let store = seeded();
        let hits = store
            .search(&DocumentFilter::from_query("revenue Q1 2025").predicate())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Q1 2025 Earnings Release");

        let hits = store
            .search(&DocumentFilter::from_query("earnings Q2 2024").predicate())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fiscal_quarter.as_deref(), Some("Q2"));

        let hits = store
            .search(&DocumentFilter::from_query("2025 results").predicate())
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .search(&DocumentFilter::from_query("press release").predicate())
            .unwrap();
        assert_eq!(hits.len(), 3, "'release' appears in every title");
    }

    #[test]
    fn delete_and_count() {
        let store = seeded();
        assert_eq!(store.count().unwrap(), 3);
        let id = store.all_documents().unwrap()[0].id;
        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn find_by_path() {
        let store = DocumentStore::in_memory().unwrap();
        let mut d = NewDocument::pdf("x");
        d.path = Some("/docs/x.pdf".into());
        let id = store.add_document(&d).unwrap();
        assert_eq!(store.find_by_path("/docs/x.pdf").unwrap().unwrap().id, id);
        assert!(store.find_by_path("/docs/y.pdf").unwrap().is_none());
    }

    #[test]
    fn upgrades_legacy_file_title_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("simple_docs.db");
        {
            let conn = Connection::open(&db).unwrap();
            conn.execute_batch(
                "CREATE TABLE documents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_title TEXT NOT NULL,
                    format TEXT NOT NULL,
                    url TEXT,
                    description TEXT,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                INSERT INTO documents (file_title, format, url, description)
                VALUES ('Q3 2024 Shareholder Letter', 'PDF', NULL, NULL);",
            )
            .unwrap();
        }

        let store = DocumentStore::open(&db).unwrap();
        let docs = store.all_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Q3 2024 Shareholder Letter");
        assert_eq!(docs[0].description, "");
        assert_eq!(docs[0].fiscal_year, None);

        store.add_document(&NewDocument::pdf("new")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }
}
