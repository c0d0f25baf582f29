//! Ordered HTML attribute set.

use std::fmt;

use super::html_safe::EscapeHtml;

/// Attributes written first and kept even when empty.
const PRIORITIZED: [&str; 3] = ["type", "name", "value"];

/// Attributes in insertion order. Setting an existing key replaces its
/// value in place. When formatting, `type`/`name`/`value` come first and
/// other attributes with empty values are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. Keys are lowercased.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    /// Set `key` only when `value` is present.
    pub fn set_opt(&mut self, key: &str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prioritized = PRIORITIZED
            .iter()
            .filter_map(|key| self.0.iter().find(|(k, _)| k == key));
        let rest = self
            .0
            .iter()
            .filter(|(k, v)| !PRIORITIZED.contains(&k.as_str()) && !v.trim().is_empty());

        for (i, (key, value)) in prioritized.chain(rest).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, r#"{}="{}""#, key, value.trim().escape_html())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prioritizes_name_and_skips_empty() {
        let mut atts = Attributes::new();
        atts.set("class", "a b").set("id", "").set("Name", "x");
        assert_eq!(atts.to_string(), r#"name="x" class="a b""#);
    }

    #[test]
    fn empty_value_is_kept() {
        let mut atts = Attributes::new();
        atts.set("selected", "").set("value", "");
        assert_eq!(atts.to_string(), r#"value="""#);
    }

    #[test]
    fn replaces_in_place() {
        let mut atts = Attributes::new();
        atts.set("cols", "1").set("rows", "2").set("cols", "3");
        assert_eq!(atts.to_string(), r#"cols="3" rows="2""#);
    }

    #[test]
    fn escapes_values() {
        let mut atts = Attributes::new();
        atts.set("placeholder", r#"say "hi""#);
        assert_eq!(atts.to_string(), r#"placeholder="say &quot;hi&quot;""#);
    }
}
