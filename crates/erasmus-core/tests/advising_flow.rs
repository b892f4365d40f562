//! End-to-end advising flow through the public API only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use erasmus_core::{
    Advisor, BackendError, DocumentKind, DocumentRecord, MemoryStore, MockCompletion, MockModel,
    PdfBackend, Period,
};

struct FixtureBackend(HashMap<PathBuf, String>);

impl PdfBackend for FixtureBackend {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::OpenError(path.display().to_string()))
    }
}

fn record(path: &str) -> DocumentRecord {
    DocumentRecord {
        path: PathBuf::from(path),
        original_filename: path.to_string(),
        stored_filename: path.to_string(),
        academic_year: Some("2025/2026".to_string()),
    }
}

fn fixture_advisor(model: MockModel) -> Advisor {
    let store = MemoryStore::new();
    store.insert("Pisa", DocumentKind::Call, record("bando.pdf"));
    store.insert("Pisa", DocumentKind::Destinations, record("dest.pdf"));
    store.insert(
        "UNIVERSIDAD DE BARCELONA",
        DocumentKind::Courses,
        record("ub_courses.pdf"),
    );

    let backend = FixtureBackend(
        [
            (
                PathBuf::from("bando.pdf"),
                "Bando Erasmus 2025/2026. Scadenza 15 marzo 2026.".to_string(),
            ),
            (
                PathBuf::from("dest.pdf"),
                "Dipartimento di Informatica | n° borse 12\n\
                 E BARCELO01 | UNIVERSIDAD DE BARCELONA | 0613 | 2 | 5 | U\n\
                 Dipartimento di Fisica\n\
                 F PARIS006 | SORBONNE UNIVERSITE | 0533 | 1 | 9 | U"
                    .to_string(),
            ),
            (
                PathBuf::from("ub_courses.pdf"),
                "Advanced Algorithms | 6 ECTS | Fall semester".to_string(),
            ),
        ]
        .into_iter()
        .collect(),
    );

    Advisor::new(Arc::new(store), Arc::new(model), Arc::new(backend))
}

#[tokio::test]
async fn student_reaches_exam_analysis_through_all_steps() {
    let model = MockModel::with_sequence(vec![
        MockCompletion::Text("Riassunto del bando: scadenza 15 marzo.".into()),
        MockCompletion::Text(
            r#"```json
[{"name": "UNIVERSIDAD DE BARCELONA", "codice_europeo": "E BARCELO01",
  "posti": "2", "durata_per_posto": "5", "livello": "U",
  "description": "Università catalana."}]
```"#
                .into(),
        ),
        MockCompletion::Text(
            r#"Ecco l'analisi richiesta:
{"matched_exams": [{"student_exam": "Algoritmi", "destination_course": "Advanced Algorithms",
  "compatibility": "alta", "credits_student": "6 CFU", "credits_destination": "6 ECTS"}],
 "suggested_exams": [{"course_name": "Machine Learning", "credits": "6 ECTS",
  "reason": "Complementare al percorso"}],
 "compatibility_score": 78.5,
 "analysis_summary": "Un esame su uno trova corrispondenza."}"#
                .into(),
        ),
    ]);
    let advisor = fixture_advisor(model);
    let cancel = CancellationToken::new();

    let program = advisor.identify_program("Pisa", &cancel).await.unwrap();
    assert!(program.has_program);
    let session_id = program.session_id.expect("session created at step 1");

    let departments = advisor.list_departments(&session_id).await.unwrap();
    assert!(departments.contains(&"Dipartimento di Informatica".to_string()));

    let destinations = advisor
        .analyze_destinations(
            &session_id,
            "Dipartimento di Informatica",
            Period::Fall,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(destinations.len(), 1);

    let analysis = advisor
        .analyze_exams(
            &session_id,
            destinations[0].name.as_str(),
            "Algoritmi, 6 CFU",
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(analysis.matched_exams.len(), 1);
    assert_eq!(analysis.suggested_exams.len(), 1);
    assert!((0.0..=100.0).contains(&analysis.compatibility_score));
    assert_eq!(
        analysis.exams_pdf_url,
        "/api/students/files/exams/ub_courses.pdf"
    );
}
