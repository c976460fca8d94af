//! Declarative body assertions and their evaluation.
//!
//! A [`FieldAssertion`] pairs a [`JsonPath`] with an [`AssertionKind`]. Each
//! assertion is evaluated independently against an [`ExecutionResult`] and
//! yields either `Ok(())` or a human-readable failure reason. Nothing here
//! panics or returns an error type: a missing field, a wrong type and a body
//! that is not JSON are all ordinary failures of that one assertion.
//!
//! Missing-path semantics:
//! - `NotNull`, `Equals`, `Contains`, `EndsWith`, `NotEmpty` treat a missing
//!   path as JSON `null`, which fails.
//! - `ListNotEmpty`, `ListEmpty`, `ListSizeAtMost` treat a missing path (or
//!   an explicit `null`) as an empty list.
//!
//! Root-addressed `Contains`, `EndsWith` and `NotEmpty` inspect the raw body
//! text and do not require the body to be JSON.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::Result;
use crate::json_path::JsonPath;
use crate::response::ExecutionResult;

/// What an assertion checks about the addressed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum AssertionKind {
    /// The value is present and not `null`.
    NotNull,
    /// The value equals `value`. Numbers compare numerically; an expected
    /// string also matches a number or boolean with the same text.
    Equals {
        /// Expected JSON value.
        value: Value,
    },
    /// The value is an array with at least one element.
    ListNotEmpty,
    /// The value is an empty array (or absent).
    ListEmpty,
    /// The value is an array with at most `max` elements.
    ListSizeAtMost {
        /// Inclusive upper bound.
        max: usize,
    },
    /// The value's text contains `substring`.
    Contains {
        /// Required substring.
        substring: String,
    },
    /// The value's text ends with `suffix`.
    EndsWith {
        /// Required suffix.
        suffix: String,
    },
    /// The value is present and non-empty (string, array or object).
    NotEmpty,
}

impl AssertionKind {
    /// The key holding this check's operand, if it takes one.
    pub(crate) fn operand_key(&self) -> Option<&'static str> {
        match self {
            AssertionKind::Equals { .. } => Some("value"),
            AssertionKind::ListSizeAtMost { .. } => Some("max"),
            AssertionKind::Contains { .. } => Some("substring"),
            AssertionKind::EndsWith { .. } => Some("suffix"),
            AssertionKind::NotNull
            | AssertionKind::ListNotEmpty
            | AssertionKind::ListEmpty
            | AssertionKind::NotEmpty => None,
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionKind::NotNull => write!(f, "not null"),
            AssertionKind::Equals { value } => write!(f, "equals {value}"),
            AssertionKind::ListNotEmpty => write!(f, "list not empty"),
            AssertionKind::ListEmpty => write!(f, "list empty"),
            AssertionKind::ListSizeAtMost { max } => write!(f, "list size <= {max}"),
            AssertionKind::Contains { substring } => write!(f, "contains {substring:?}"),
            AssertionKind::EndsWith { suffix } => write!(f, "ends with {suffix:?}"),
            AssertionKind::NotEmpty => write!(f, "not empty"),
        }
    }
}

/// A path plus the check applied to the value it addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssertion {
    path: JsonPath,
    kind: AssertionKind,
}

impl FieldAssertion {
    /// Parses `path` and pairs it with `kind`.
    ///
    /// # Errors
    ///
    /// `ContractError::InvalidPath` when the expression is malformed.
    pub fn new(path: &str, kind: AssertionKind) -> Result<Self> {
        Ok(FieldAssertion {
            path: JsonPath::parse(path)?,
            kind,
        })
    }

    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    pub fn kind(&self) -> &AssertionKind {
        &self.kind
    }

    /// Evaluates the assertion. `Err` carries the failure reason.
    pub fn evaluate(&self, response: &ExecutionResult) -> std::result::Result<(), String> {
        if self.path.is_root() {
            if let Some(outcome) = self.evaluate_raw(response.raw_body()) {
                return outcome;
            }
        }

        let doc = response
            .json()
            .map_err(|e| format!("response body is not valid JSON: {e}"))?;
        let value = self.path.resolve(doc);

        match &self.kind {
            AssertionKind::NotNull => match value {
                None => Err(format!("{} is missing", self.path)),
                Some(Value::Null) => Err(format!("{} is null", self.path)),
                Some(_) => Ok(()),
            },
            AssertionKind::Equals { value: expected } => {
                let actual = value.unwrap_or(&Value::Null);
                if values_equal(expected, actual) {
                    Ok(())
                } else if value.is_none() {
                    Err(format!("expected {expected}, but {} is missing", self.path))
                } else {
                    Err(format!("expected {expected}, found {actual}"))
                }
            }
            AssertionKind::ListNotEmpty => {
                let len = self.list_len(value)?;
                if len > 0 {
                    Ok(())
                } else {
                    Err(format!("{} is empty", self.path))
                }
            }
            AssertionKind::ListEmpty => {
                let len = self.list_len(value)?;
                if len == 0 {
                    Ok(())
                } else {
                    Err(format!("{} has {len} element(s), expected none", self.path))
                }
            }
            AssertionKind::ListSizeAtMost { max } => {
                let len = self.list_len(value)?;
                if len <= *max {
                    Ok(())
                } else {
                    Err(format!("{} has {len} element(s), expected at most {max}", self.path))
                }
            }
            AssertionKind::Contains { substring } => {
                let text = self.text_of(value)?;
                if text.contains(substring.as_str()) {
                    Ok(())
                } else {
                    Err(format!("{} = {text:?} does not contain {substring:?}", self.path))
                }
            }
            AssertionKind::EndsWith { suffix } => {
                let text = self.text_of(value)?;
                if text.ends_with(suffix.as_str()) {
                    Ok(())
                } else {
                    Err(format!("{} = {text:?} does not end with {suffix:?}", self.path))
                }
            }
            AssertionKind::NotEmpty => match value {
                None => Err(format!("{} is missing", self.path)),
                Some(Value::Null) => Err(format!("{} is null", self.path)),
                Some(Value::String(s)) if s.is_empty() => Err(format!("{} is an empty string", self.path)),
                Some(Value::Array(a)) if a.is_empty() => Err(format!("{} is an empty array", self.path)),
                Some(Value::Object(o)) if o.is_empty() => Err(format!("{} is an empty object", self.path)),
                Some(_) => Ok(()),
            },
        }
    }

    /// Text checks against the whole body skip JSON parsing. Returns `None`
    /// for kinds that need the parsed tree even at the root.
    fn evaluate_raw(&self, body: &str) -> Option<std::result::Result<(), String>> {
        let outcome = match &self.kind {
            AssertionKind::Contains { substring } => {
                if body.contains(substring.as_str()) {
                    Ok(())
                } else {
                    Err(format!("response body does not contain {substring:?}"))
                }
            }
            AssertionKind::EndsWith { suffix } => {
                if body.trim_end().ends_with(suffix.as_str()) {
                    Ok(())
                } else {
                    Err(format!("response body does not end with {suffix:?}"))
                }
            }
            AssertionKind::NotEmpty => {
                if body.trim().is_empty() {
                    Err("response body is empty".to_string())
                } else {
                    Ok(())
                }
            }
            _ => return None,
        };
        Some(outcome)
    }

    fn list_len(&self, value: Option<&Value>) -> std::result::Result<usize, String> {
        match value {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Array(items)) => Ok(items.len()),
            Some(other) => Err(format!(
                "{} is {}, expected an array",
                self.path,
                type_name(other)
            )),
        }
    }

    fn text_of(&self, value: Option<&Value>) -> std::result::Result<String, String> {
        match value {
            None => Err(format!("{} is missing", self.path)),
            Some(Value::Null) => Err(format!("{} is null", self.path)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }
}

impl fmt::Display for FieldAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.kind)
    }
}

impl Serialize for FieldAssertion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn values_equal(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(text), Value::Number(_) | Value::Bool(_)) => *text == actual.to_string(),
        _ => false,
    }
}

/// Integers compare exactly; only a float on either side falls back to
/// `f64`, so distinct IDs above 2^53 never collapse into one value.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y);
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        // At least one side exceeds i64::MAX; the other must match as u64.
        _ => matches!((a.as_u64(), b.as_u64()), (Some(x), Some(y)) if x == y),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn response(body: &str) -> ExecutionResult {
        ExecutionResult::new(200, Duration::from_millis(5), body.as_bytes())
    }

    fn check(path: &str, kind: AssertionKind, body: &str) -> std::result::Result<(), String> {
        FieldAssertion::new(path, kind).unwrap().evaluate(&response(body))
    }

    const AGENDA: &str = r#"{
        "page": 1,
        "limit": 10,
        "totalResults": 2,
        "results": [
            { "agendaName": "Q3", "status": "approved", "fileName": "minutes.pdf",
              "meetingId": { "notes": { "meetingType": "board_meeting" } } },
            { "agendaName": null, "status": "draft", "fileName": "notes.docx" }
        ]
    }"#;

    #[test]
    fn not_null_passes_on_value_and_fails_on_null_or_missing() {
        assert!(check("results[0].agendaName", AssertionKind::NotNull, AGENDA).is_ok());
        let null = check("results[1].agendaName", AssertionKind::NotNull, AGENDA).unwrap_err();
        assert!(null.contains("null"));
        let missing = check("results[0].auditor", AssertionKind::NotNull, AGENDA).unwrap_err();
        assert!(missing.contains("missing"));
    }

    #[test]
    fn equals_compares_strings_and_numbers() {
        let eq = |path: &str, value: Value| check(path, AssertionKind::Equals { value }, AGENDA);
        assert!(eq("results[0].meetingId.notes.meetingType", json!("board_meeting")).is_ok());
        assert!(eq("page", json!(1)).is_ok());
        assert!(eq("page", json!(1.0)).is_ok());
        assert!(eq("limit", json!("10")).is_ok(), "string form of a number should match");
        let reason = eq("results[1].status", json!("approved")).unwrap_err();
        assert!(reason.contains("\"draft\""));
    }

    #[test]
    fn equals_compares_large_integers_exactly() {
        let body = r#"{"id":9007199254740992,"big":18446744073709551615,"neg":-9007199254740993}"#;
        let eq = |path: &str, value: Value| check(path, AssertionKind::Equals { value }, body);
        assert!(eq("id", json!(9007199254740993_u64)).is_err(), "ids differ past 2^53");
        assert!(eq("id", json!(9007199254740992_u64)).is_ok());
        assert!(eq("big", json!(u64::MAX)).is_ok());
        assert!(eq("big", json!(u64::MAX - 1)).is_err());
        assert!(eq("neg", json!(-9007199254740992_i64)).is_err());
        assert!(eq("id", json!(9007199254740992.0)).is_ok(), "float side compares as f64");
    }

    #[test]
    fn equals_on_missing_path_fails_without_panicking() {
        let reason = check(
            "results[5].status",
            AssertionKind::Equals { value: json!("approved") },
            AGENDA,
        )
        .unwrap_err();
        assert!(reason.contains("missing"));
    }

    #[test]
    fn equals_null_matches_missing_path() {
        assert!(check("results[0].nope", AssertionKind::Equals { value: Value::Null }, AGENDA).is_ok());
    }

    #[test]
    fn list_assertions_treat_missing_path_as_empty() {
        assert!(check("docs", AssertionKind::ListEmpty, AGENDA).is_ok());
        assert!(check("docs", AssertionKind::ListSizeAtMost { max: 0 }, AGENDA).is_ok());
        assert!(check("docs", AssertionKind::ListNotEmpty, AGENDA).is_err());
    }

    #[test]
    fn list_size_at_most_never_passes_above_bound() {
        let body = json!({ "results": [1, 2, 3, 4, 5] }).to_string();
        for max in 0..5 {
            assert!(
                check("results", AssertionKind::ListSizeAtMost { max }, &body).is_err(),
                "5 elements must fail for max = {max}"
            );
        }
        for max in 5..8 {
            assert!(check("results", AssertionKind::ListSizeAtMost { max }, &body).is_ok());
        }
    }

    #[test]
    fn list_assertion_on_non_array_fails() {
        let reason = check("page", AssertionKind::ListNotEmpty, AGENDA).unwrap_err();
        assert!(reason.contains("a number"));
    }

    #[test]
    fn contains_and_ends_with_use_string_form() {
        assert!(check("results[0].fileName", AssertionKind::EndsWith { suffix: ".pdf".into() }, AGENDA).is_ok());
        assert!(check("results[1].fileName", AssertionKind::EndsWith { suffix: ".pdf".into() }, AGENDA).is_err());
        assert!(check("results[0].status", AssertionKind::Contains { substring: "prov".into() }, AGENDA).is_ok());
        assert!(check("totalResults", AssertionKind::Contains { substring: "2".into() }, AGENDA).is_ok());
        assert!(check("results[9].status", AssertionKind::Contains { substring: "a".into() }, AGENDA).is_err());
    }

    #[test]
    fn root_contains_inspects_raw_text_without_json() {
        let html = "<html>dashboard_permissions</html>";
        assert!(check("", AssertionKind::Contains { substring: "dashboard_permissions".into() }, html).is_ok());
        assert!(check("$", AssertionKind::NotEmpty, html).is_ok());
        assert!(check("$", AssertionKind::NotEmpty, "  ").is_err());
    }

    #[test]
    fn field_assertion_on_malformed_body_fails_locally() {
        let reason = check("results", AssertionKind::ListNotEmpty, "<html>oops</html>").unwrap_err();
        assert!(reason.contains("not valid JSON"));
    }

    #[test]
    fn not_empty_rejects_empty_containers() {
        let body = r#"{"a": "", "b": [], "c": {}, "d": 0, "e": "x"}"#;
        for path in ["a", "b", "c", "missing"] {
            assert!(check(path, AssertionKind::NotEmpty, body).is_err(), "{path} should fail");
        }
        for path in ["d", "e"] {
            assert!(check(path, AssertionKind::NotEmpty, body).is_ok(), "{path} should pass");
        }
    }

    #[test]
    fn kind_deserializes_from_tagged_table() {
        let kind: AssertionKind = toml::from_str("check = \"list_size_at_most\"\nmax = 5").unwrap();
        assert_eq!(kind, AssertionKind::ListSizeAtMost { max: 5 });
        let kind: AssertionKind = toml::from_str("check = \"equals\"\nvalue = \"approved\"").unwrap();
        assert_eq!(kind, AssertionKind::Equals { value: json!("approved") });
    }

    #[test]
    fn serializes_as_readable_string() {
        let assertion = FieldAssertion::new("results", AssertionKind::ListSizeAtMost { max: 5 }).unwrap();
        assert_eq!(serde_json::to_value(&assertion).unwrap(), json!("results list size <= 5"));
    }
}
