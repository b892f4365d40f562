//! Registry of institutions and their uploaded documents.
//!
//! The workflow only ever asks one question: "newest active document of this
//! kind for this institution". The SQLite implementation mirrors the upload
//! portal's schema; [`MemoryStore`] backs tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

/// Kind of uploaded institutional document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// The Erasmus call published by the home university.
    Call,
    /// The partner destinations table.
    Destinations,
    /// A destination university's course catalog.
    Courses,
}

impl DocumentKind {
    /// Storage tag, matching the upload portal's vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Call => "erasmus_call",
            DocumentKind::Destinations => "destinations",
            DocumentKind::Courses => "erasmus_courses",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Call => "call",
            DocumentKind::Destinations => "destinations",
            DocumentKind::Courses => "courses",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug)]
#[error("unknown document kind '{0}' (expected 'call', 'destinations' or 'courses')")]
pub struct UnknownKind(String);

impl std::str::FromStr for DocumentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(DocumentKind::Call),
            "destinations" => Ok(DocumentKind::Destinations),
            "courses" => Ok(DocumentKind::Courses),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A stored document resolved for an institution.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub path: PathBuf,
    pub original_filename: String,
    pub stored_filename: String,
    pub academic_year: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Lookup interface the workflow depends on.
pub trait DocumentStore: Send + Sync {
    /// Find the newest active document of `kind` for an institution.
    ///
    /// Institution matching is case-insensitive. For [`DocumentKind::Courses`]
    /// a partial match in either direction is also tried, because destination names
    /// coming out of model completions rarely equal the registered name
    /// exactly.
    fn find(
        &self,
        institution: &str,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRecord>, StoreError>;
}

/// SQLite-backed registry.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the registry at `path`, bootstrapping the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS universities (
                 id              INTEGER PRIMARY KEY AUTOINCREMENT,
                 university_name TEXT UNIQUE NOT NULL
             );
             CREATE TABLE IF NOT EXISTS uploaded_documents (
                 id                INTEGER PRIMARY KEY AUTOINCREMENT,
                 university_id     INTEGER NOT NULL REFERENCES universities(id),
                 document_type     TEXT NOT NULL,
                 original_filename TEXT NOT NULL,
                 stored_filename   TEXT NOT NULL,
                 file_path         TEXT NOT NULL,
                 upload_date       TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                 academic_year     TEXT,
                 is_active         BOOLEAN DEFAULT 1
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register an institution if missing; returns its id either way.
    pub fn add_institution(&self, name: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO universities (university_name) VALUES (?1)",
            params![name],
        )?;
        let id = conn.query_row(
            "SELECT id FROM universities WHERE university_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Register a document for an institution, creating the institution row
    /// when needed.
    pub fn add_document(
        &self,
        institution: &str,
        kind: DocumentKind,
        original_filename: &str,
        stored_filename: &str,
        file_path: &Path,
        academic_year: Option<&str>,
    ) -> Result<(), StoreError> {
        let university_id = self.add_institution(institution)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO uploaded_documents
                 (university_id, document_type, original_filename, stored_filename, file_path, academic_year)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                university_id,
                kind.as_str(),
                original_filename,
                stored_filename,
                file_path.to_string_lossy(),
                academic_year,
            ],
        )?;
        Ok(())
    }

    /// List every registered institution, alphabetically.
    pub fn list_institutions(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT university_name FROM universities ORDER BY university_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn query_one(
        &self,
        where_clause: &str,
        institution: &str,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let sql = format!(
            "SELECT d.file_path, d.original_filename, d.stored_filename, d.academic_year
             FROM uploaded_documents d
             JOIN universities u ON d.university_id = u.id
             WHERE d.document_type = ?1 AND d.is_active = 1 AND {where_clause}
             ORDER BY d.upload_date DESC, d.id DESC
             LIMIT 1"
        );
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(&sql, params![kind.as_str(), institution], |row| {
                Ok(DocumentRecord {
                    path: PathBuf::from(row.get::<_, String>(0)?),
                    original_filename: row.get(1)?,
                    stored_filename: row.get(2)?,
                    academic_year: row.get(3)?,
                })
            })
            .optional()?;
        Ok(record)
    }
}

impl DocumentStore for SqliteStore {
    fn find(
        &self,
        institution: &str,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let exact = self.query_one(
            "LOWER(u.university_name) = LOWER(?2)",
            institution,
            kind,
        )?;
        if exact.is_some() || kind != DocumentKind::Courses {
            return Ok(exact);
        }
        // Partial match both ways for course catalogs.
        self.query_one(
            "(LOWER(u.university_name) LIKE '%' || LOWER(?2) || '%'
              OR LOWER(?2) LIKE '%' || LOWER(u.university_name) || '%')",
            institution,
            kind,
        )
    }
}

/// In-memory registry for tests and fixtures.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<(String, DocumentKind, DocumentRecord)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, institution: &str, kind: DocumentKind, record: DocumentRecord) {
        self.docs
            .lock()
            .unwrap()
            .push((institution.to_string(), kind, record));
    }
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        institution: &str,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let docs = self.docs.lock().unwrap();
        let wanted = institution.to_lowercase();
        let exact = docs
            .iter()
            .rev()
            .find(|(name, k, _)| *k == kind && name.to_lowercase() == wanted)
            .map(|(_, _, record)| record.clone());
        if exact.is_some() || kind != DocumentKind::Courses {
            return Ok(exact);
        }
        Ok(docs
            .iter()
            .rev()
            .find(|(name, k, _)| {
                let name = name.to_lowercase();
                *k == kind && (name.contains(&wanted) || wanted.contains(&name))
            })
            .map(|(_, _, record)| record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("advisor.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trips_a_document() {
        let (_dir, store) = open_temp();
        store
            .add_document(
                "University of Pisa",
                DocumentKind::Call,
                "bando.pdf",
                "bando_2025.pdf",
                Path::new("data/calls/bando_2025.pdf"),
                Some("2025/2026"),
            )
            .unwrap();

        let record = store
            .find("university of pisa", DocumentKind::Call)
            .unwrap()
            .expect("document should be found case-insensitively");
        assert_eq!(record.stored_filename, "bando_2025.pdf");
        assert_eq!(record.academic_year.as_deref(), Some("2025/2026"));
    }

    #[test]
    fn newest_document_wins() {
        let (_dir, store) = open_temp();
        for year in ["2023/2024", "2024/2025"] {
            store
                .add_document(
                    "Pisa",
                    DocumentKind::Destinations,
                    "dest.pdf",
                    &format!("dest_{}.pdf", &year[..4]),
                    Path::new("data/dest.pdf"),
                    Some(year),
                )
                .unwrap();
        }
        let record = store.find("Pisa", DocumentKind::Destinations).unwrap().unwrap();
        assert_eq!(record.stored_filename, "dest_2024.pdf");
    }

    #[test]
    fn kind_mismatch_finds_nothing() {
        let (_dir, store) = open_temp();
        store
            .add_document(
                "Pisa",
                DocumentKind::Call,
                "bando.pdf",
                "bando.pdf",
                Path::new("data/bando.pdf"),
                None,
            )
            .unwrap();
        assert!(store.find("Pisa", DocumentKind::Courses).unwrap().is_none());
    }

    #[test]
    fn courses_match_partially_in_both_directions() {
        let (_dir, store) = open_temp();
        store
            .add_document(
                "TECHNICAL UNIVERSITY OF MUNICH",
                DocumentKind::Courses,
                "courses.pdf",
                "tum_courses.pdf",
                Path::new("data/tum_courses.pdf"),
                None,
            )
            .unwrap();

        // Query shorter than the registered name.
        let record = store
            .find("University of Munich", DocumentKind::Courses)
            .unwrap();
        assert!(record.is_some());

        // Query longer than the registered name.
        let record = store
            .find(
                "TECHNICAL UNIVERSITY OF MUNICH (TUM), Germany",
                DocumentKind::Courses,
            )
            .unwrap();
        assert!(record.is_some());

        // Partial matching stays off for other kinds.
        assert!(
            store
                .find("University of Munich", DocumentKind::Destinations)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn institutions_are_listed_once() {
        let (_dir, store) = open_temp();
        store.add_institution("Pisa").unwrap();
        store.add_institution("Bologna").unwrap();
        store.add_institution("Pisa").unwrap();
        assert_eq!(store.list_institutions().unwrap(), vec!["Bologna", "Pisa"]);
    }

    #[test]
    fn memory_store_mirrors_lookup_rules() {
        let store = MemoryStore::new();
        store.insert(
            "TECHNICAL UNIVERSITY OF MUNICH",
            DocumentKind::Courses,
            DocumentRecord {
                path: PathBuf::from("tum.pdf"),
                original_filename: "tum.pdf".into(),
                stored_filename: "tum.pdf".into(),
                academic_year: None,
            },
        );
        assert!(
            store
                .find("technical university of munich", DocumentKind::Courses)
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find("Munich", DocumentKind::Courses)
                .unwrap()
                .is_some()
        );
        assert!(store.find("Munich", DocumentKind::Call).unwrap().is_none());
    }
}
