//! Dotted/indexed path expressions over parsed JSON documents.
//!
//! A path addresses a value inside a response body, e.g.
//! `results[0].agenda.meetingType` or `docs[0].directorDataDetails[0].name`.
//!
//! Grammar:
//! - Segments are separated by `.`.
//! - A segment is an object key, optionally followed by one or more
//!   bracket suffixes. A segment may also start with a bracket.
//! - A bracket holds an array index (`[0]`) or a quoted object key
//!   (`["@odata.context"]`) for keys containing `.`, `[` or `]`. Inside
//!   quotes, `\"` and `\\` escape a quote and a backslash.
//! - The empty expression and `$` address the document root. A leading
//!   `$.` or `$[` is accepted and the `$` ignored.
//!
//! Paths are parsed once, when a contract is built, so a typo in a path is a
//! configuration error rather than a failure discovered mid-run.

use std::fmt;

use serde_json::Value;

use crate::error::{ContractError, Result};

/// One traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    steps: Vec<Step>,
}

impl JsonPath {
    /// Parses a path expression.
    ///
    /// # Errors
    ///
    /// `ContractError::InvalidPath` for an empty key between dots, an
    /// unclosed or empty bracket, a non-numeric index, an unterminated quoted
    /// key, or characters after a closing bracket that do not start a new
    /// segment.
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        let body = match trimmed {
            "" | "$" => "",
            other => other
                .strip_prefix("$.")
                .or_else(|| other.strip_prefix('$').filter(|rest| rest.starts_with('[')))
                .unwrap_or(other),
        };

        let mut steps = Vec::new();
        let mut rest = body;
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('[') {
                let (step, tail) = parse_bracket(expr, inner)?;
                steps.push(step);
                rest = tail;
                continue;
            }

            let segment = if steps.is_empty() {
                rest
            } else {
                rest.strip_prefix('.')
                    .ok_or_else(|| invalid(expr, format!("unexpected characters '{rest}'")))?
            };
            if segment.starts_with('[') {
                rest = segment;
                continue;
            }

            let end = segment.find(['.', '[']).unwrap_or(segment.len());
            let key = &segment[..end];
            if key.is_empty() {
                return Err(invalid(expr, "empty segment"));
            }
            if key.contains(']') {
                return Err(invalid(expr, format!("unexpected ']' in '{key}'")));
            }
            steps.push(Step::Key(key.to_string()));
            rest = &segment[end..];
        }

        Ok(JsonPath {
            source: expr.to_string(),
            steps,
        })
    }

    /// Returns the root path (the whole document).
    pub fn root() -> Self {
        JsonPath {
            source: String::new(),
            steps: Vec::new(),
        }
    }

    /// True when this path addresses the whole document.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// The expression as written in the contract.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Resolves the path against a document. `None` when any step misses:
    /// a key absent from an object, an index past the end of an array, or a
    /// step applied to the wrong kind of value.
    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for step in &self.steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(key)?,
                (Step::Index(idx), Value::Array(items)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "$")
        } else {
            write!(f, "{}", self.source)
        }
    }
}

fn invalid(expr: &str, message: impl Into<String>) -> ContractError {
    ContractError::InvalidPath {
        path: expr.to_string(),
        message: message.into(),
    }
}

/// Parses the inside of a bracket (after `[`), returning the step and the
/// text after the closing `]`.
fn parse_bracket<'a>(expr: &str, inner: &'a str) -> Result<(Step, &'a str)> {
    if let Some(quoted) = inner.strip_prefix('"') {
        let mut key = String::new();
        let mut chars = quoted.char_indices();
        while let Some((pos, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => key.push(escaped),
                    None => break,
                },
                '"' => {
                    let tail = quoted[pos + 1..]
                        .strip_prefix(']')
                        .ok_or_else(|| invalid(expr, "expected ']' after quoted key"))?;
                    return Ok((Step::Key(key), tail));
                }
                other => key.push(other),
            }
        }
        return Err(invalid(expr, "unterminated quoted key"));
    }

    let close = inner
        .find(']')
        .ok_or_else(|| invalid(expr, "unclosed '['"))?;
    let digits = inner[..close].trim();
    if digits.is_empty() {
        return Err(invalid(expr, "empty index"));
    }
    let index = digits
        .parse::<usize>()
        .map_err(|_| invalid(expr, format!("index '{digits}' is not a non-negative integer")))?;
    Ok((Step::Index(index), &inner[close + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "page": 1,
            "results": [
                {
                    "agendaName": "Q3 review",
                    "meetingId": { "notes": { "meetingType": "board_meeting" } },
                    "directors": [["a", "b"], ["c"]]
                }
            ]
        })
    }

    #[test]
    fn resolves_nested_keys_and_indexes() {
        let path = JsonPath::parse("results[0].meetingId.notes.meetingType").unwrap();
        assert_eq!(path.resolve(&doc()), Some(&json!("board_meeting")));
    }

    #[test]
    fn resolves_chained_indexes() {
        let path = JsonPath::parse("results[0].directors[1][0]").unwrap();
        assert_eq!(path.resolve(&doc()), Some(&json!("c")));
    }

    #[test]
    fn root_forms_address_whole_document() {
        for expr in ["", "$", "  "] {
            let path = JsonPath::parse(expr).unwrap();
            assert!(path.is_root(), "'{expr}' should be the root path");
            assert_eq!(path.resolve(&doc()), Some(&doc()));
        }
    }

    #[test]
    fn dollar_prefix_is_ignored() {
        let path = JsonPath::parse("$.page").unwrap();
        assert_eq!(path.resolve(&doc()), Some(&json!(1)));
        assert_eq!(path.as_str(), "$.page");
    }

    #[test]
    fn missing_steps_resolve_to_none() {
        let d = doc();
        for expr in [
            "results[5].agendaName",
            "results[0].status",
            "page.value",
            "results.agendaName",
            "[0]",
        ] {
            let path = JsonPath::parse(expr).unwrap();
            assert_eq!(path.resolve(&d), None, "'{expr}' should not resolve");
        }
    }

    #[test]
    fn bare_index_segment_addresses_array_root() {
        let path = JsonPath::parse("[1].name").unwrap();
        let d = json!([{ "name": "x" }, { "name": "y" }]);
        assert_eq!(path.resolve(&d), Some(&json!("y")));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in [
            "results..name",
            "results[0",
            "results[]",
            "results[-1]",
            "results[a]",
            "results[0]x",
            "results]",
            ".results",
        ] {
            let err = JsonPath::parse(expr).unwrap_err();
            assert!(
                matches!(err, ContractError::InvalidPath { .. }),
                "'{expr}' should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn quoted_keys_address_dotted_and_bracketed_names() {
        let d = json!({
            "@odata.context": "https://api.test/$metadata#users",
            "value": [{ "a[b]": { "say \"hi\"": 1 } }]
        });
        let path = JsonPath::parse(r#"["@odata.context"]"#).unwrap();
        assert_eq!(path.resolve(&d), Some(&json!("https://api.test/$metadata#users")));

        let path = JsonPath::parse(r#"$["@odata.context"]"#).unwrap();
        assert!(path.resolve(&d).is_some());

        let path = JsonPath::parse(r#"value[0]["a[b]"]["say \"hi\""]"#).unwrap();
        assert_eq!(path.resolve(&d), Some(&json!(1)));

        let path = JsonPath::parse(r#"value[0].["a[b]"]"#).unwrap();
        assert!(path.resolve(&d).is_some(), "a dot before a bracket is allowed");
    }

    #[test]
    fn malformed_quoted_keys_are_rejected() {
        for expr in [r#"["open"#, r#"["a"x]"#, r#"["a"]b"#, r#"["a\"]"#] {
            assert!(JsonPath::parse(expr).is_err(), "'{expr}' should be rejected");
        }
    }

    #[test]
    fn display_uses_dollar_for_root() {
        assert_eq!(JsonPath::root().to_string(), "$");
        assert_eq!(
            JsonPath::parse("results[0].name").unwrap().to_string(),
            "results[0].name"
        );
    }
}
