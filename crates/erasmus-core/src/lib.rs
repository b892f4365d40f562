use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config_file;
pub mod extract;
pub mod model;
pub mod prompt;
pub mod response;
pub mod session;
pub mod store;
pub mod workflow;

// Re-export for convenience
pub use extract::{BackendError, PdfBackend, extract_document_text};
pub use model::{DEFAULT_MODEL, GeminiClient, MockCompletion, MockModel, ModelClient, ModelError};
pub use response::{ExpectedShape, ResponseError, parse_model_json};
pub use session::{
    AdvisingSession, DEFAULT_SESSION_TTL, Period, SessionError, SessionStore, Stage,
};
pub use store::{
    DocumentKind, DocumentRecord, DocumentStore, MemoryStore, SqliteStore, StoreError,
};
pub use workflow::{Advisor, AdvisorConfig};

/// Step 1 response: the call summary plus the session handle later steps use.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramSummary {
    pub has_program: bool,
    pub summary: Option<String>,
    pub session_id: Option<String>,
    /// Public locator of the call PDF, always offered alongside the summary.
    pub call_pdf_url: Option<String>,
}

/// One partner institution extracted from a department section.
///
/// Field names mirror the destination document columns; the model is
/// instructed to copy values verbatim, so anything absent in the source
/// arrives as an empty string or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub codice_europeo: Option<String>,
    #[serde(default)]
    pub nome_istituzione: Option<String>,
    #[serde(default)]
    pub codice_area: Option<String>,
    #[serde(default)]
    pub posti: Option<String>,
    #[serde(default)]
    pub durata_per_posto: Option<String>,
    #[serde(default)]
    pub livello: Option<String>,
    #[serde(default)]
    pub dettagli_livello: Option<String>,
    #[serde(default)]
    pub requisiti_linguistici: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A student exam matched against a destination course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedExam {
    #[serde(default)]
    pub student_exam: String,
    #[serde(default)]
    pub destination_course: String,
    /// Compatibility qualifier: alta / media / bassa.
    #[serde(default)]
    pub compatibility: String,
    #[serde(default)]
    pub credits_student: String,
    #[serde(default)]
    pub credits_destination: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A destination course suggested beyond the student's own plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedExam {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub credits: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Step 3 response: compatibility analysis plus the course PDF locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamsAnalysis {
    #[serde(default)]
    pub matched_exams: Vec<MatchedExam>,
    #[serde(default)]
    pub suggested_exams: Vec<SuggestedExam>,
    /// 0–100.
    #[serde(default)]
    pub compatibility_score: f64,
    #[serde(default)]
    pub analysis_summary: String,
    #[serde(default)]
    pub exams_pdf_url: String,
    #[serde(default)]
    pub exams_pdf_filename: String,
}

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no {kind} document found for '{institution}'")]
    DocumentNotFound {
        institution: String,
        kind: DocumentKind,
    },
    #[error("document store error: {0}")]
    Store(#[from] StoreError),
    #[error("PDF backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("document '{}' produced no text", .path.display())]
    EmptyExtraction { path: PathBuf },
    #[error(transparent)]
    Section(#[from] erasmus_parsing::SectionError),
    #[error(transparent)]
    Departments(#[from] erasmus_parsing::DepartmentsError),
    #[error("model response unusable: {0}")]
    Response(#[from] ResponseError),
    #[error("model completion failed: {0}")]
    Model(#[from] ModelError),
    #[error("step cancelled before completion")]
    Cancelled,
}
