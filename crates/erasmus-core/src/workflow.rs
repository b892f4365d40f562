//! The advising workflow orchestrator.
//!
//! Four operations, each independently callable but threaded through a
//! session: identify the home program (creates the session), list
//! departments, analyze destinations for a department/period, and match a
//! study plan against a destination's catalog. Collaborators (document
//! registry, PDF backend, completion model) are injected; everything here is
//! sequencing, prompt construction and commit discipline.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use erasmus_parsing::{
    SectionConfig, extract_department_section_with_config, list_departments_with_config,
};

use crate::extract::{PdfBackend, extract_document_text};
use crate::model::ModelClient;
use crate::prompt;
use crate::response::{ExpectedShape, ResponseError, parse_model_json};
use crate::session::{DEFAULT_SESSION_TTL, Period, SessionStore, Stage};
use crate::store::{DocumentKind, DocumentRecord, DocumentStore};
use crate::{AdvisorError, DestinationCandidate, ExamsAnalysis, ProgramSummary};

/// Tunables for the advising workflow.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub session_ttl: Duration,
    /// Character budget for call-document context in the summary prompt.
    pub max_context_chars: usize,
    pub section: SectionConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            max_context_chars: prompt::MAX_CONTEXT_CHARS,
            section: SectionConfig::default(),
        }
    }
}

/// Sequences the advising steps over injected collaborators.
pub struct Advisor {
    documents: Arc<dyn DocumentStore>,
    model: Arc<dyn ModelClient>,
    pdf: Arc<dyn PdfBackend>,
    sessions: SessionStore,
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        model: Arc<dyn ModelClient>,
        pdf: Arc<dyn PdfBackend>,
    ) -> Self {
        Self::with_config(documents, model, pdf, AdvisorConfig::default())
    }

    pub fn with_config(
        documents: Arc<dyn DocumentStore>,
        model: Arc<dyn ModelClient>,
        pdf: Arc<dyn PdfBackend>,
        config: AdvisorConfig,
    ) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            documents,
            model,
            pdf,
            sessions,
            config,
        }
    }

    /// The session registry, exposed for expiry sweeps.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// STEP 1: identify the home university's call and summarize it.
    ///
    /// A session is created only when a call document exists and the summary
    /// succeeded; callers use the returned id for every later step. No
    /// registered call is not an error: the student simply has no program.
    pub async fn identify_program(
        &self,
        home_university: &str,
        cancel: &CancellationToken,
    ) -> Result<ProgramSummary, AdvisorError> {
        let Some(record) = self.documents.find(home_university, DocumentKind::Call)? else {
            tracing::info!(university = home_university, "no call document registered");
            return Ok(ProgramSummary {
                has_program: false,
                summary: Some(format!("Nessun bando trovato per '{home_university}'.")),
                session_id: None,
                call_pdf_url: None,
            });
        };

        let call_text = extract_document_text(self.pdf.as_ref(), &record.path)?;
        let prompt = prompt::call_summary(&call_text, self.config.max_context_chars);
        let summary = self.complete(&prompt, cancel).await?;

        let session_id = self.sessions.create(home_university);
        tracing::info!(university = home_university, session = %session_id, "program identified");

        Ok(ProgramSummary {
            has_program: true,
            summary: Some(summary),
            session_id: Some(session_id),
            call_pdf_url: Some(format!(
                "/api/students/files/calls/{}",
                record.stored_filename
            )),
        })
    }

    /// STEP 1.5: departments available in the session university's
    /// destinations document. No input beyond the session id.
    pub async fn list_departments(&self, session_id: &str) -> Result<Vec<String>, AdvisorError> {
        let mut session = self.sessions.lock(session_id).await?;

        let record = self.find_document(&session.home_university, DocumentKind::Destinations)?;
        let full_text = extract_document_text(self.pdf.as_ref(), &record.path)?;
        let departments = list_departments_with_config(&full_text, &self.config.section)?;

        session.advance(Stage::DepartmentsListed);
        tracing::info!(count = departments.len(), "departments listed");
        Ok(departments)
    }

    /// STEP 2: partner destinations for one department and period.
    ///
    /// `period` is committed to the session only after the whole pipeline
    /// succeeded, so a failed or abandoned step leaves the session untouched.
    pub async fn analyze_destinations(
        &self,
        session_id: &str,
        department: &str,
        period: Period,
        cancel: &CancellationToken,
    ) -> Result<Vec<DestinationCandidate>, AdvisorError> {
        let mut session = self.sessions.lock(session_id).await?;

        let record = self.find_document(&session.home_university, DocumentKind::Destinations)?;
        let full_text = extract_document_text(self.pdf.as_ref(), &record.path)?;
        let section =
            extract_department_section_with_config(&full_text, department, &self.config.section)?;

        let prompt = prompt::destinations(department, period, &section);
        let raw = self.complete(&prompt, cancel).await?;
        let value = parse_model_json(&raw, ExpectedShape::Array)?;
        let destinations: Vec<DestinationCandidate> =
            serde_json::from_value(value).map_err(ResponseError::Decode)?;

        session.period = Some(period);
        session.advance(Stage::DestinationsListed);
        tracing::info!(count = destinations.len(), department, "destinations analyzed");
        Ok(destinations)
    }

    /// STEP 3: match a study plan against a destination's course catalog.
    ///
    /// Runs with or without a stored period (step 2 is optional). A response
    /// the parser cannot recover degrades to a zero-score result that still
    /// carries the course PDF locator: the document alone is useful to the
    /// student. Store, extraction and completion failures stay fatal.
    pub async fn analyze_exams(
        &self,
        session_id: &str,
        destination: &str,
        study_plan_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ExamsAnalysis, AdvisorError> {
        let mut session = self.sessions.lock(session_id).await?;
        let period = session.period;

        let record = self.find_document(destination, DocumentKind::Courses)?;
        let exam_text = extract_document_text(self.pdf.as_ref(), &record.path)?;

        let prompt = prompt::exam_analysis(destination, study_plan_text, &exam_text, period);
        let raw = self.complete(&prompt, cancel).await?;

        let mut analysis = match parse_model_json(&raw, ExpectedShape::Object).and_then(|value| {
            serde_json::from_value::<ExamsAnalysis>(value).map_err(ResponseError::Decode)
        }) {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::warn!(error = %err, "exam analysis unparsable, degrading to fallback");
                ExamsAnalysis {
                    matched_exams: vec![],
                    suggested_exams: vec![],
                    compatibility_score: 0.0,
                    analysis_summary: "Errore nell'analisi automatica. Si prega di consultare \
                                       manualmente il PDF dei corsi disponibili."
                        .to_string(),
                    exams_pdf_url: String::new(),
                    exams_pdf_filename: String::new(),
                }
            }
        };

        analysis.compatibility_score = analysis.compatibility_score.clamp(0.0, 100.0);
        analysis.exams_pdf_url = format!("/api/students/files/exams/{}", record.stored_filename);
        analysis.exams_pdf_filename = record.stored_filename.clone();

        session.advance(Stage::ExamsAnalyzed);
        tracing::info!(
            matched = analysis.matched_exams.len(),
            score = analysis.compatibility_score,
            "exam compatibility analyzed"
        );
        Ok(analysis)
    }

    fn find_document(
        &self,
        institution: &str,
        kind: DocumentKind,
    ) -> Result<DocumentRecord, AdvisorError> {
        self.documents
            .find(institution, kind)?
            .ok_or_else(|| AdvisorError::DocumentNotFound {
                institution: institution.to_string(),
                kind,
            })
    }

    /// Run a completion, racing it against cancellation.
    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AdvisorError> {
        if cancel.is_cancelled() {
            return Err(AdvisorError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AdvisorError::Cancelled),
            result = self.model.complete(prompt) => Ok(result?),
        }
    }
}
