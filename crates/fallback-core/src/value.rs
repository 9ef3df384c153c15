//! Value classification and module-name normalization.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Runtime type of a module value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module names passed to `require`: one name or a sequence.
///
/// Entries are kept raw; `Fallback` drops the invalid ones with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    entries: Vec<String>,
    invalid: usize,
}

impl Names {
    /// Collect names from a JSON string or array of strings.
    ///
    /// Non-string entries are counted as invalid rather than kept.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(name) => Self::from(name.as_str()),
            Value::Array(items) => {
                let mut names = Self::default();
                for item in items {
                    match item.as_str() {
                        Some(name) => names.entries.push(name.to_string()),
                        None => names.invalid += 1,
                    }
                }
                names
            }
            _ => Self {
                entries: Vec::new(),
                invalid: 1,
            },
        }
    }

    /// Split into trimmed, non-empty names and a count of dropped entries
    pub fn normalize(self) -> (Vec<String>, usize) {
        let mut dropped = self.invalid;
        let mut names = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                dropped += 1;
            } else {
                names.push(trimmed.to_string());
            }
        }

        (names, dropped)
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Self {
            entries: vec![name.to_string()],
            invalid: 0,
        }
    }
}

impl From<String> for Names {
    fn from(name: String) -> Self {
        Self {
            entries: vec![name],
            invalid: 0,
        }
    }
}

impl From<Vec<String>> for Names {
    fn from(entries: Vec<String>) -> Self {
        Self {
            entries,
            invalid: 0,
        }
    }
}

impl From<Vec<&str>> for Names {
    fn from(entries: Vec<&str>) -> Self {
        Self::from(entries.as_slice())
    }
}

impl From<&[&str]> for Names {
    fn from(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|name| name.to_string()).collect(),
            invalid: 0,
        }
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(entries: [&str; N]) -> Self {
        Self::from(entries.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_kind() {
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(false)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!(0)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!("String")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!([])), ValueKind::Array);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Object);
        assert_eq!(ValueKind::Boolean.to_string(), "boolean");
    }

    #[test]
    fn test_single_name() {
        let (names, dropped) = Names::from("jquery").normalize();
        assert_eq!(names, vec!["jquery"]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_normalize_drops_empty() {
        let (names, dropped) = Names::from(["a", "", "  ", " b "]).normalize();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_from_value_counts_non_strings() {
        let (names, dropped) = Names::from_value(&json!(["a", 1, null, "c"])).normalize();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(dropped, 2);

        let (names, dropped) = Names::from_value(&json!({ "a": 1 })).normalize();
        assert!(names.is_empty());
        assert_eq!(dropped, 1);
    }
}
