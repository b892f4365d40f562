use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::SectionConfig;
use crate::normalize::normalize_line;

/// A line introduces a new department section if it contains the token
/// "dipartimento"/"dipartimenti" as a whole word, any case.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bdipartiment[oi]\b").unwrap());

/// Start of a department name inside a user query. Queries pasted from the
/// frontend can carry several departments back-to-back with no delimiter:
/// "Dipartimento di Informatica Dipartimento di Fisica".
static CANDIDATE_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdipartiment[oi]\s+").unwrap());

/// Prefixes stripped from each candidate, most specific first.
static PREFIX_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^dipartiment[oi]\s+di\s+").unwrap(),
        Regex::new(r"(?i)^dipartiment[oi]\s+").unwrap(),
    ]
});

static TOKEN_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("no department header lines found in the destinations document")]
    NoHeadersFound,
    #[error("department '{query}' not found in the destinations document")]
    SectionNotFound { query: String },
}

/// Extract the text range belonging to one department from a destinations
/// document, using the default [`SectionConfig`].
pub fn extract_department_section(
    full_text: &str,
    department_query: &str,
) -> Result<String, SectionError> {
    extract_department_section_with_config(full_text, department_query, &SectionConfig::default())
}

/// Config-aware version of [`extract_department_section`].
///
/// Pipeline, each stage a separate function below:
/// 1. normalize every line for comparison;
/// 2. find all header lines, failing with [`SectionError::NoHeadersFound`] if none;
/// 3. split the query into candidate department names, deduplicated in order;
/// 4. match each candidate against the headers (substring first, then
///    significant-token containment);
/// 5. slice from the matched header up to (excluding) the next header, or
///    end-of-text. An empty slice falls through to the next candidate.
///
/// First candidate with a non-empty section wins; headers are tried in
/// document order.
pub fn extract_department_section_with_config(
    full_text: &str,
    department_query: &str,
    config: &SectionConfig,
) -> Result<String, SectionError> {
    let lines: Vec<&str> = full_text.split('\n').collect();
    let lines_norm: Vec<String> = lines.iter().map(|l| normalize_line(l)).collect();

    let header_re = config.header_re.as_ref().unwrap_or(&HEADER_RE);
    let header_indexes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| header_re.is_match(l))
        .map(|(i, _)| i)
        .collect();

    if header_indexes.is_empty() {
        return Err(SectionError::NoHeadersFound);
    }

    for candidate in split_candidates(department_query, config) {
        let Some(start) = find_header_index(&candidate, &lines_norm, &header_indexes) else {
            continue;
        };

        let end = header_indexes
            .iter()
            .copied()
            .find(|&i| i > start)
            .unwrap_or(lines.len());

        let section = lines[start..end].join("\n").trim().to_string();
        if !section.is_empty() {
            tracing::debug!(
                header = %lines[start].trim(),
                line = start,
                candidate = %candidate,
                chars = section.len(),
                "matched department header"
            );
            return Ok(section);
        }
    }

    Err(SectionError::SectionNotFound {
        query: department_query.to_string(),
    })
}

/// Split a query into normalized candidate department names.
///
/// Cuts before every new "dipartimento/i " occurrence (the regex crate has no
/// lookahead, so we cut at match starts), strips the prefix from each part,
/// and deduplicates preserving order.
fn split_candidates(query: &str, config: &SectionConfig) -> Vec<String> {
    let raw = normalize_line(query);
    let start_re = config
        .candidate_start_re
        .as_ref()
        .unwrap_or(&CANDIDATE_START_RE);

    let mut cuts: Vec<usize> = start_re.find_iter(&raw).map(|m| m.start()).collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }
    cuts.push(raw.len());

    let prefix_res: &[Regex] = match &config.prefix_res {
        Some(res) => res.as_slice(),
        None => PREFIX_RES.as_slice(),
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for pair in cuts.windows(2) {
        let part = raw[pair[0]..pair[1]].trim();
        if part.is_empty() {
            continue;
        }
        let mut candidate = part.to_string();
        for re in prefix_res {
            let stripped = re.replace(&candidate, "").trim().to_string();
            if stripped != candidate {
                candidate = stripped;
                break;
            }
        }
        if candidate.is_empty() {
            continue;
        }
        if seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Locate the header line matching a candidate, or `None`.
///
/// Direct substring containment wins; otherwise the first (up to) three
/// significant tokens of the candidate (length >= 3) must all appear in the
/// header line. Headers are scanned in document order.
fn find_header_index(
    candidate: &str,
    lines_norm: &[String],
    header_indexes: &[usize],
) -> Option<usize> {
    for &idx in header_indexes {
        if lines_norm[idx].contains(candidate) {
            return Some(idx);
        }
    }

    let tokens: Vec<&str> = TOKEN_SPLIT_RE
        .split(candidate)
        .filter(|t| t.chars().count() >= 3)
        .collect();
    if tokens.is_empty() {
        return None;
    }
    let required = &tokens[..tokens.len().min(3)];

    for &idx in header_indexes {
        let line = &lines_norm[idx];
        if required.iter().all(|t| line.contains(t)) {
            return Some(idx);
        }
    }
    None
}
