//! Submitted values and the per-field validation accumulator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::form_tag::FormTag;
use crate::types::TagName;

/// Value of one submitted field: a scalar or a list (`name[]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Single(String),
    Multiple(Vec<String>),
}

impl SubmittedValue {
    /// The scalar value; the first entry of a list.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Single(s) => s,
            Self::Multiple(v) => v.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
        }
    }

    /// True for `""` and for lists with no non-empty entry. `"0"` is a value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(s) => s.is_empty(),
            Self::Multiple(v) => v.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for SubmittedValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for SubmittedValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<&str>> for SubmittedValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for SubmittedValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

/// Posted form data keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(IndexMap<String, SubmittedValue>);

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SubmittedValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SubmittedValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&SubmittedValue> {
        self.0.get(name)
    }
}

/// Why a submitted field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidKind {
    InvalidRequired,
    InvalidTooLong,
    InvalidTooShort,
}

impl InvalidKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequired => "invalid_required",
            Self::InvalidTooLong => "invalid_too_long",
            Self::InvalidTooShort => "invalid_too_short",
        }
    }
}

/// A rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    pub kind: InvalidKind,
    pub reason: String,
    /// The control's `id:` option, when it is a usable name.
    pub idref: Option<String>,
}

/// Accumulates rejected fields during one submission.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    invalid_fields: IndexMap<String, InvalidField>,
    messages: [String; 3],
}

impl ValidationResult {
    pub fn new(config: &Config) -> Self {
        Self {
            invalid_fields: IndexMap::new(),
            messages: [
                config.invalid_required.clone(),
                config.invalid_too_long.clone(),
                config.invalid_too_short.clone(),
            ],
        }
    }

    fn message(&self, kind: InvalidKind) -> &str {
        match kind {
            InvalidKind::InvalidRequired => &self.messages[0],
            InvalidKind::InvalidTooLong => &self.messages[1],
            InvalidKind::InvalidTooShort => &self.messages[2],
        }
    }

    /// Reject the field of `tag`. Only the first rejection of a field is kept;
    /// nameless tags are ignored.
    pub fn invalidate(&mut self, tag: &FormTag, kind: InvalidKind) {
        let Some(name) = &tag.name else {
            return;
        };
        if self.invalid_fields.contains_key(name.as_str()) {
            return;
        }

        let idref = tag
            .get_id_option()
            .filter(|id| TagName::new(id).is_ok())
            .map(str::to_string);

        let field = InvalidField {
            kind,
            reason: self.message(kind).to_string(),
            idref,
        };
        self.invalid_fields.insert(name.to_string(), field);
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_fields.is_empty()
    }

    pub fn is_field_valid(&self, name: &str) -> bool {
        !self.invalid_fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&InvalidField> {
        self.invalid_fields.get(name)
    }

    pub fn invalid_fields(&self) -> &IndexMap<String, InvalidField> {
        &self.invalid_fields
    }
}

/// Remove backslash escapes (`\'` → `'`, `\\` → `\`).
pub fn unslash(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Length in UTF-16 code units, with CRLF counted as one unit.
pub fn count_code_units(value: &str) -> usize {
    value.replace("\r\n", "\n").encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness() {
        assert!(SubmittedValue::from("").is_empty());
        assert!(!SubmittedValue::from("0").is_empty());
        assert!(SubmittedValue::from(Vec::<&str>::new()).is_empty());
        assert!(SubmittedValue::from(vec!["", ""]).is_empty());
        assert!(!SubmittedValue::from(vec!["", "Red"]).is_empty());
    }

    #[test]
    fn first_rejection_wins() {
        let config = Config::new();
        let tag = FormTag::parse("[textarea* message id:msg-box]").unwrap();
        let mut result = ValidationResult::new(&config);

        result.invalidate(&tag, InvalidKind::InvalidRequired);
        result.invalidate(&tag, InvalidKind::InvalidTooShort);

        let field = result.get("message").unwrap();
        assert_eq!(field.kind, InvalidKind::InvalidRequired);
        assert_eq!(field.reason, "The field is required.");
        assert_eq!(field.idref.as_deref(), Some("msg-box"));
        assert!(!result.is_valid());
        assert!(!result.is_field_valid("message"));
    }

    #[test]
    fn nameless_tags_are_ignored() {
        let mut result = ValidationResult::new(&Config::new());
        let tag = FormTag::parse("[textarea]").unwrap();
        result.invalidate(&tag, InvalidKind::InvalidRequired);
        assert!(result.is_valid());
    }

    #[test]
    fn submission_from_json() {
        let submission: Submission =
            serde_json::from_str(r#"{"menu-1": "Blue", "colors": ["Red", "Green"]}"#).unwrap();
        assert_eq!(submission.get("menu-1").unwrap().as_text(), "Blue");
        assert!(submission.get("colors").unwrap().contains("Green"));
    }

    #[test]
    fn code_units() {
        assert_eq!(count_code_units("abc"), 3);
        assert_eq!(count_code_units("a\r\nb"), 3);
        assert_eq!(count_code_units("😀"), 2);
        assert_eq!(count_code_units(&unslash(r"it\'s")), 4);
    }
}
