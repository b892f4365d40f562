//! Defensive recovery of structured JSON from free-form model completions.
//!
//! Models are instructed to answer with bare JSON, but completions routinely
//! arrive wrapped in markdown fences or with conversational prose around the
//! payload. This module recovers the value or reports exactly which way the
//! recovery failed, so callers decide whether a failure is fatal for their step.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Greedy first-`[` to last-`]` span, dot matching newlines.
static ARRAY_SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Greedy first-`{` to last-`}` span, dot matching newlines.
static OBJECT_SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// The JSON shape a call site expects from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Array,
    Object,
}

impl ExpectedShape {
    pub fn name(&self) -> &'static str {
        match self {
            ExpectedShape::Array => "array",
            ExpectedShape::Object => "object",
        }
    }

    fn opening(&self) -> char {
        match self {
            ExpectedShape::Array => '[',
            ExpectedShape::Object => '{',
        }
    }

    fn span_re(&self) -> &'static Regex {
        match self {
            ExpectedShape::Array => &ARRAY_SPAN_RE,
            ExpectedShape::Object => &OBJECT_SPAN_RE,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ExpectedShape::Array, Value::Array(_)) | (ExpectedShape::Object, Value::Object(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("no JSON {expected} found in model response")]
    NoJsonFound { expected: &'static str },
    #[error("model returned a JSON {found} where {expected} was expected")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("model response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Recover a JSON value of the expected shape from a raw completion.
///
/// Strips a leading ```` ```json ````/```` ``` ```` fence and a trailing
/// ```` ``` ```` fence, tries a direct parse when the text already leads with
/// the expected bracket, then falls back to the greedy bracket-pair span.
pub fn parse_model_json(raw: &str, expected: ExpectedShape) -> Result<Value, ResponseError> {
    let mut cleaned = raw.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(ResponseError::NoJsonFound {
            expected: expected.name(),
        });
    }

    // Fast path: the payload already leads with the right bracket.
    if cleaned.starts_with(expected.opening())
        && let Ok(value) = serde_json::from_str::<Value>(cleaned)
        && expected.matches(&value)
    {
        return Ok(value);
    }

    let span = expected
        .span_re()
        .find(cleaned)
        .ok_or(ResponseError::NoJsonFound {
            expected: expected.name(),
        })?;

    let value: Value = serde_json::from_str(span.as_str())?;
    if !expected.matches(&value) {
        return Err(ResponseError::TypeMismatch {
            expected: expected.name(),
            found: json_kind(&value),
        });
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_array_round_trips() {
        let raw = "```json\n[{\"name\": \"TU DELFT\", \"posti\": \"2\"}]\n```";
        let value = parse_model_json(raw, ExpectedShape::Array).unwrap();
        assert_eq!(value, json!([{"name": "TU DELFT", "posti": "2"}]));
    }

    #[test]
    fn bare_fence_without_language_tag() {
        let raw = "```\n{\"compatibility_score\": 85.0}\n```";
        let value = parse_model_json(raw, ExpectedShape::Object).unwrap();
        assert_eq!(value, json!({"compatibility_score": 85.0}));
    }

    #[test]
    fn prose_wrapped_array() {
        let raw = "Sure! [ {\"a\":1} ] Thanks";
        let value = parse_model_json(raw, ExpectedShape::Array).unwrap();
        assert_eq!(value, json!([{"a": 1}]));
    }

    #[test]
    fn prose_wrapped_object() {
        let raw = "Here is the analysis:\n{\"matched_exams\": []}\nHope it helps.";
        let value = parse_model_json(raw, ExpectedShape::Object).unwrap();
        assert_eq!(value, json!({"matched_exams": []}));
    }

    #[test]
    fn direct_parse_without_noise() {
        let raw = "[1, 2, 3]";
        let value = parse_model_json(raw, ExpectedShape::Array).unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn no_bracket_pair_is_no_json_found() {
        let err = parse_model_json("I could not produce a list.", ExpectedShape::Array).unwrap_err();
        assert!(matches!(err, ResponseError::NoJsonFound { expected: "array" }));
    }

    #[test]
    fn object_requested_but_only_array_present() {
        let err = parse_model_json("[1, 2]", ExpectedShape::Object).unwrap_err();
        assert!(matches!(err, ResponseError::NoJsonFound { expected: "object" }));
    }

    #[test]
    fn malformed_span_is_a_decode_error() {
        let err = parse_model_json("result: [ {\"a\": } ]", ExpectedShape::Array).unwrap_err();
        assert!(matches!(err, ResponseError::Decode(_)));
    }

    #[test]
    fn empty_response_is_no_json_found() {
        let err = parse_model_json("   ", ExpectedShape::Object).unwrap_err();
        assert!(matches!(err, ResponseError::NoJsonFound { .. }));
    }

    #[test]
    fn greedy_span_takes_first_to_last_bracket() {
        // Two arrays in one response: the greedy span covers both, so the
        // parse only succeeds if they form one valid value. A wrapping array
        // does.
        let raw = "[[1], [2]]";
        let value = parse_model_json(raw, ExpectedShape::Array).unwrap();
        assert_eq!(value, json!([[1], [2]]));
    }
}
