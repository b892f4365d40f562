use regex::Regex;

/// Configuration for the department text heuristics.
///
/// All regex fields are `Option<Regex>`; `None` means "use the built-in
/// default". The defaults cover the Italian destination-document vocabulary
/// ("Dipartimento di ..."); overriding them adapts the pipeline to documents
/// from other vendors without touching the matching code.
///
/// Use [`SectionConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct SectionConfig {
    /// Regex marking a line as a department header.
    pub(crate) header_re: Option<Regex>,
    /// Regex locating the start of each department name inside a user query.
    pub(crate) candidate_start_re: Option<Regex>,
    /// Regexes stripping the department prefix from a candidate, tried in order.
    pub(crate) prefix_res: Option<Vec<Regex>>,
    /// Regex stripping trailing per-student note annotations before cataloguing.
    pub(crate) notes_re: Option<Regex>,
    /// Lowercase prefix a line must start with to be catalogued as a department.
    pub(crate) label_prefix: String,
    /// Minimum character length for a catalogued department label.
    pub(crate) min_label_len: usize,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            header_re: None,
            candidate_start_re: None,
            prefix_res: None,
            notes_re: None,
            label_prefix: "dipartiment".to_string(),
            min_label_len: 10,
        }
    }
}

impl SectionConfig {
    pub fn min_label_len(&self) -> usize {
        self.min_label_len
    }
}

/// Builder for [`SectionConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct SectionConfigBuilder {
    header_re: Option<String>,
    candidate_start_re: Option<String>,
    prefix_res: Option<Vec<String>>,
    notes_re: Option<String>,
    label_prefix: Option<String>,
    min_label_len: Option<usize>,
}

impl SectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern marking a line as a department header.
    pub fn header_regex(mut self, pattern: impl Into<String>) -> Self {
        self.header_re = Some(pattern.into());
        self
    }

    /// Pattern locating the start of each department name inside a query.
    pub fn candidate_start_regex(mut self, pattern: impl Into<String>) -> Self {
        self.candidate_start_re = Some(pattern.into());
        self
    }

    /// Prefix-stripping patterns, tried in order against each candidate.
    pub fn prefix_regexes(mut self, patterns: Vec<String>) -> Self {
        self.prefix_res = Some(patterns);
        self
    }

    /// Pattern for trailing note annotations removed before cataloguing.
    pub fn notes_regex(mut self, pattern: impl Into<String>) -> Self {
        self.notes_re = Some(pattern.into());
        self
    }

    /// Lowercase prefix a line must start with to be catalogued.
    pub fn label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = Some(prefix.into());
        self
    }

    /// Minimum character length for a catalogued label.
    pub fn min_label_len(mut self, len: usize) -> Self {
        self.min_label_len = Some(len);
        self
    }

    pub fn build(self) -> Result<SectionConfig, regex::Error> {
        let defaults = SectionConfig::default();
        Ok(SectionConfig {
            header_re: self.header_re.map(|p| Regex::new(&p)).transpose()?,
            candidate_start_re: self.candidate_start_re.map(|p| Regex::new(&p)).transpose()?,
            prefix_res: self
                .prefix_res
                .map(|ps| ps.iter().map(|p| Regex::new(p)).collect::<Result<Vec<_>, _>>())
                .transpose()?,
            notes_re: self.notes_re.map(|p| Regex::new(&p)).transpose()?,
            label_prefix: self.label_prefix.unwrap_or(defaults.label_prefix),
            min_label_len: self.min_label_len.unwrap_or(defaults.min_label_len),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_defaults() {
        let config = SectionConfigBuilder::new().build().unwrap();
        assert!(config.header_re.is_none());
        assert_eq!(config.label_prefix, "dipartiment");
        assert_eq!(config.min_label_len, 10);
    }

    #[test]
    fn build_rejects_bad_pattern() {
        let result = SectionConfigBuilder::new().header_regex("[unclosed").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_compiles_overrides() {
        let config = SectionConfigBuilder::new()
            .header_regex(r"(?i)\bfaculty\b")
            .label_prefix("faculty")
            .min_label_len(5)
            .build()
            .unwrap();
        assert!(config.header_re.is_some());
        assert_eq!(config.label_prefix, "faculty");
        assert_eq!(config.min_label_len, 5);
    }
}
