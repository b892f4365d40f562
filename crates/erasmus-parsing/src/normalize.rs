use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a line for comparison: lowercase, map the Unicode right single
/// quote (U+2019) to an ASCII apostrophe, collapse whitespace runs, trim.
///
/// PDF extraction is inconsistent about apostrophes in names like
/// "Dipartimento dell'Ingegneria": some documents carry the typographic
/// quote, user input almost never does.
pub fn normalize_line(s: &str) -> String {
    let lowered = s.to_lowercase().replace('\u{2019}', "'");
    WS_RE.replace_all(&lowered, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses() {
        assert_eq!(
            normalize_line("  Dipartimento   di\tINFORMATICA "),
            "dipartimento di informatica"
        );
    }

    #[test]
    fn maps_right_single_quote() {
        assert_eq!(
            normalize_line("Dipartimento dell\u{2019}Ingegneria"),
            "dipartimento dell'ingegneria"
        );
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize_line("   "), "");
    }
}
