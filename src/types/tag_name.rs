//! Validated form-tag name.
//!
//! A `TagName` can only be constructed via `TagName::new()`, which validates:
//! - Non-empty after trimming
//! - Starts with an ASCII letter
//! - Continues with ASCII letters, digits, `:`, `.`, `_` or `-`

use crate::error::FormError;

/// A validated field name, safe to use as an HTML `name`/`class` fragment
/// and as a mail-tag reference.
///
/// Invariant (enforced at construction): matches `[A-Za-z][0-9A-Za-z:._-]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagName(String);

impl TagName {
    /// Punctuation allowed after the first character.
    const EXTRA_CHARS: [char; 4] = [':', '.', '_', '-'];

    /// Attempt to create a validated name from raw input.
    pub fn new(raw: &str) -> Result<Self, FormError> {
        let trimmed = raw.trim();

        let Some(first) = trimmed.chars().next() else {
            return Err(FormError::InvalidName {
                name: raw.to_string(),
                reason: "name is empty",
            });
        };

        if !first.is_ascii_alphabetic() {
            return Err(FormError::InvalidName {
                name: raw.to_string(),
                reason: "name must start with a letter",
            });
        }

        if !trimmed.chars().all(Self::is_name_char) {
            return Err(FormError::InvalidName {
                name: raw.to_string(),
                reason: "name contains characters outside [0-9A-Za-z:._-]",
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// True for characters allowed after the leading letter.
    pub fn is_name_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || Self::EXTRA_CHARS.contains(&c)
    }

    /// Get the validated name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_name() {
        let name = TagName::new("menu-1").unwrap();
        assert_eq!(name.as_str(), "menu-1");
    }

    #[test]
    fn allows_punctuation_after_first_letter() {
        assert!(TagName::new("your:email.addr_2-x").is_ok());
    }

    #[test]
    fn trims_whitespace() {
        let name = TagName::new("  message  ").unwrap();
        assert_eq!(name.as_str(), "message");
    }

    #[test]
    fn rejects_empty() {
        assert!(TagName::new("").is_err());
        assert!(TagName::new("   ").is_err());
    }

    #[test]
    fn rejects_leading_non_letter() {
        assert!(TagName::new("1menu").is_err());
        assert!(TagName::new("_private").is_err());
    }

    #[test]
    fn rejects_html_chars() {
        assert!(TagName::new("na<me").is_err());
        assert!(TagName::new("a\"b").is_err());
    }
}
