//! Mail-tag expansion: `[your-name]` references inside mail templates.
//!
//! The expander only finds references; what each one becomes is decided by
//! an injected [`MailTagResolver`].

use std::sync::LazyLock;

use regex::{Captures, Regex};

static MAIL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\[?)\[[\t ]*([a-zA-Z_][0-9a-zA-Z:._-]*)((?:[\t ]+"[^"]*"|[\t ]+'[^']*')*)[\t ]*\](\]?)"#,
    )
    .unwrap()
});
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());

/// One mail-tag reference handed to a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTag<'a> {
    /// The reference as written, e.g. `[_format_date "Y-m-d"]`.
    pub source: &'a str,
    /// Field name with any `_raw_`/`_format_` prefix removed.
    pub name: String,
    /// `_raw_` prefix: the visitor-facing (pre-pipe) value is wanted.
    pub raw: bool,
    /// `_format_` prefix: the first quoted value.
    pub format: Option<String>,
    pub values: Vec<String>,
}

impl<'a> MailTag<'a> {
    fn from_captures(source: &'a str, caps: &Captures<'_>) -> Self {
        let mut name = caps.get(2).map_or("", |m| m.as_str()).to_string();
        let values: Vec<String> = caps
            .get(3)
            .map(|m| {
                QUOTED
                    .find_iter(m.as_str())
                    .map(|v| strip_quotes(v.as_str()).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut raw = false;
        if let Some(rest) = name.strip_prefix("_raw_").filter(|r| !r.is_empty()) {
            name = rest.trim().to_string();
            raw = true;
        }

        let mut format = None;
        if let Some(rest) = name.strip_prefix("_format_").filter(|r| !r.is_empty()) {
            name = rest.trim().to_string();
            format = values.first().cloned();
        }

        Self {
            source,
            name,
            raw,
            format,
            values,
        }
    }
}

fn strip_quotes(quoted: &str) -> &str {
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| quoted.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(quoted)
}

/// Decides the replacement text of a mail-tag reference.
pub trait MailTagResolver {
    fn resolve(&mut self, tag: &MailTag<'_>) -> String;
}

impl<F> MailTagResolver for F
where
    F: FnMut(&MailTag<'_>) -> String,
{
    fn resolve(&mut self, tag: &MailTag<'_>) -> String {
        self(tag)
    }
}

/// Replace every mail-tag reference in `text`, single pass, left to right.
///
/// `[[name]]` is an escape and becomes `[name]` without consulting the
/// resolver. Everything outside references, newlines included, is kept.
pub fn expand<R>(text: &str, resolver: &mut R) -> String
where
    R: MailTagResolver + ?Sized,
{
    MAIL_TAG
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let open = caps.get(1).map_or("", |m| m.as_str());
            let close = caps.get(4).map_or("", |m| m.as_str());

            if !open.is_empty() && !close.is_empty() {
                return whole[1..whole.len() - 1].to_string();
            }

            let source = &whole[open.len()..whole.len() - close.len()];
            let tag = MailTag::from_captures(source, caps);
            format!("{open}{}{close}", resolver.resolve(&tag))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(tag: &MailTag<'_>) -> String {
        tag.name.to_uppercase()
    }

    #[test]
    fn replaces_references() {
        let out = expand("From: [your-name] <[your-email]>", &mut upper);
        assert_eq!(out, "From: YOUR-NAME <YOUR-EMAIL>");
    }

    #[test]
    fn doubled_brackets_escape_without_callback() {
        let mut calls = 0;
        let out = expand("[[foo]]", &mut |_: &MailTag<'_>| {
            calls += 1;
            String::from("X")
        });
        assert_eq!(out, "[foo]");
        assert_eq!(calls, 0);
    }

    #[test]
    fn half_escaped_keeps_extra_bracket() {
        assert_eq!(expand("[[foo]", &mut upper), "[FOO");
        assert_eq!(expand("[foo]]", &mut upper), "FOO]");
    }

    #[test]
    fn prefixes_and_values() {
        let mut seen = Vec::new();
        expand(
            r#"[_raw_menu] [_format_date "D, d M y" 'x'] [plain "a" "b"]"#,
            &mut |tag: &MailTag<'_>| {
                seen.push(tag.clone().name);
                match tag.name.as_str() {
                    "menu" => assert!(tag.raw),
                    "date" => assert_eq!(tag.format.as_deref(), Some("D, d M y")),
                    "plain" => assert_eq!(tag.values, vec!["a", "b"]),
                    other => panic!("unexpected tag {other}"),
                }
                String::new()
            },
        );
        assert_eq!(seen, vec!["menu", "date", "plain"]);
    }

    #[test]
    fn source_is_the_reference() {
        expand("x [ name  'v' ] y", &mut |tag: &MailTag<'_>| {
            assert_eq!(tag.source, "[ name  'v' ]");
            String::new()
        });
    }

    #[test]
    fn preserves_newlines() {
        let out = expand("Name: [n]\nBody:\n[b]\n", &mut |_: &MailTag<'_>| "v".to_string());
        assert_eq!(out, "Name: v\nBody:\nv\n");
    }

    #[test]
    fn idempotent_once_no_references_remain() {
        let text = "Hi [name], see [[literal]] and [other].";
        let once = expand(text, &mut |_: &MailTag<'_>| "ok".to_string());
        assert_eq!(once, "Hi ok, see [literal] and ok.");
        let plain = "Hi ok, no references.";
        assert_eq!(expand(plain, &mut upper), plain);
        let twice = expand(&expand(plain, &mut upper), &mut upper);
        assert_eq!(twice, expand(plain, &mut upper));
    }

    #[test]
    fn non_tags_are_untouched() {
        assert_eq!(expand("[1abc] [ ] [a b]", &mut upper), "[1abc] [ ] [a b]");
    }
}
