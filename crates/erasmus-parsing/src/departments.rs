use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::SectionConfig;
use crate::normalize::WS_RE;

/// Per-student note annotations leak into table rows and would otherwise be
/// catalogued as department fragments. Stripped up to end-of-line.
static NOTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(note per gli studenti|note per lo studente)[^\n]*").unwrap());

/// Seat-count marker ("n° borse" and spacing variants) that follows the
/// department name on the same row in some documents.
static SEAT_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)n\s*°").unwrap());

/// Everything except letters (accented Latin included), digits, spaces and
/// apostrophes is stripped from a label.
static LABEL_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s'àèéìòùÀÈÉÌÒÙ]").unwrap());

#[derive(Error, Debug)]
pub enum DepartmentsError {
    #[error("no departments found in the destinations document")]
    NoDepartmentsFound,
}

/// Derive the distinct department labels present in a destinations document,
/// using the default [`SectionConfig`].
pub fn list_departments(full_text: &str) -> Result<Vec<String>, DepartmentsError> {
    list_departments_with_config(full_text, &SectionConfig::default())
}

/// Config-aware version of [`list_departments`].
///
/// A line is catalogued when, after note-annotation removal, it starts with
/// the configured label prefix ("dipartiment" by default, any case). The label
/// is the line truncated at the first seat-count marker, else at the first
/// pipe field boundary, else taken whole, then stripped down to
/// letters/digits/spaces/apostrophes and whitespace-collapsed. Labels shorter
/// than the configured minimum are fragments and are dropped. Deduplication is
/// case-insensitive; the result is sorted.
pub fn list_departments_with_config(
    full_text: &str,
    config: &SectionConfig,
) -> Result<Vec<String>, DepartmentsError> {
    let notes_re = config.notes_re.as_ref().unwrap_or(&NOTES_RE);
    let text = notes_re.replace_all(full_text, "");

    let mut seen: HashSet<String> = HashSet::new();
    let mut labels: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let line = line.trim();
        if !line.to_lowercase().starts_with(&config.label_prefix) {
            continue;
        }

        let cut = if let Some(m) = SEAT_MARKER_RE.find(line) {
            &line[..m.start()]
        } else if let Some(pos) = line.find('|') {
            &line[..pos]
        } else {
            line
        };

        let label = LABEL_CHARS_RE.replace_all(cut, "");
        let label = WS_RE.replace_all(&label, " ").trim().to_string();

        if label.chars().count() < config.min_label_len {
            continue;
        }
        if seen.insert(label.to_lowercase()) {
            labels.push(label);
        }
    }

    if labels.is_empty() {
        return Err(DepartmentsError::NoDepartmentsFound);
    }

    labels.sort();
    tracing::debug!(count = labels.len(), "catalogued departments");
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionConfigBuilder;

    #[test]
    fn catalogues_headers_and_sorts() {
        let text = "\
Dipartimento di Matematica | n° borse 4
E BARCELO01 | UNIVERSIDAD DE BARCELONA
Dipartimento di Informatica n° borse 12
some running text
Dipartimento di Fisica e Astronomia | 3";
        let departments = list_departments(text).unwrap();
        assert_eq!(
            departments,
            vec![
                "Dipartimento di Fisica e Astronomia",
                "Dipartimento di Informatica",
                "Dipartimento di Matematica",
            ]
        );
    }

    #[test]
    fn dedupes_after_punctuation_stripping() {
        // Both lines normalize to the same label once punctuation is removed.
        let text = "Dipartimento di Informatica.\nDIPARTIMENTO DI INFORMATICA |";
        let departments = list_departments(text).unwrap();
        assert_eq!(departments.len(), 1);
        assert_eq!(departments[0], "Dipartimento di Informatica");
    }

    #[test]
    fn truncates_at_seat_marker_before_pipe() {
        let text = "Dipartimento di Economia n ° borse 5 | altro campo";
        let departments = list_departments(text).unwrap();
        assert_eq!(departments, vec!["Dipartimento di Economia"]);
    }

    #[test]
    fn short_fragments_are_dropped() {
        let config = SectionConfigBuilder::new()
            .label_prefix("fac")
            .build()
            .unwrap();
        let text = "Fac. Sci.\nFacoltà di Scienze Politiche";
        let departments = list_departments_with_config(text, &config).unwrap();
        assert_eq!(departments, vec!["Facoltà di Scienze Politiche"]);
    }

    #[test]
    fn note_annotations_do_not_pollute() {
        let text = "Dipartimento di Giurisprudenza | NOTE PER GLI STUDENTI solo LM\nDipartimento di Lettere e Filosofia";
        let departments = list_departments(text).unwrap();
        assert_eq!(
            departments,
            vec![
                "Dipartimento di Giurisprudenza",
                "Dipartimento di Lettere e Filosofia",
            ]
        );
    }

    #[test]
    fn empty_catalog_is_an_error() {
        let err = list_departments("nothing relevant here").unwrap_err();
        assert!(matches!(err, DepartmentsError::NoDepartmentsFound));
    }

    #[test]
    fn accented_letters_survive_stripping() {
        let text = "Dipartimento di Civiltà e Forme del Sapere";
        let departments = list_departments(text).unwrap();
        assert_eq!(departments, vec!["Dipartimento di Civiltà e Forme del Sapere"]);
    }

    #[test]
    fn custom_label_prefix() {
        let config = SectionConfigBuilder::new()
            .label_prefix("faculty")
            .build()
            .unwrap();
        let text = "Faculty of Engineering Sciences";
        let departments = list_departments_with_config(text, &config).unwrap();
        assert_eq!(departments, vec!["Faculty of Engineering Sciences"]);
    }
}
