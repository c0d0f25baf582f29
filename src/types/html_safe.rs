//! Escaped text for rendered controls.
//!
//! Option labels, textarea values, hangover input and error tips reach the
//! page only through `HtmlSafe`.

/// Text safe to embed in element content or a double-quoted attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlSafe(String);

impl HtmlSafe {
    /// Escapes `&` `<` `>` `"` `'`.
    pub fn escape(raw: &str) -> Self {
        let mut escaped = String::with_capacity(raw.len());
        for ch in raw.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#x27;"),
                _ => escaped.push(ch),
            }
        }
        Self(escaped)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for HtmlSafe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait EscapeHtml {
    fn escape_html(&self) -> HtmlSafe;
}

impl EscapeHtml for str {
    fn escape_html(&self) -> HtmlSafe {
        HtmlSafe::escape(self)
    }
}

impl EscapeHtml for String {
    fn escape_html(&self) -> HtmlSafe {
        HtmlSafe::escape(self)
    }
}

/// Reduce a field name to a class token for the control wrapper:
/// percent-encoded octets are dropped, then everything outside
/// `[A-Za-z0-9_-]`.
pub fn sanitize_html_class(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        let c = bytes[i] as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_labels() {
        assert_eq!("Tom & Jerry".escape_html().as_str(), "Tom &amp; Jerry");
        assert_eq!(
            "<script>alert('x')</script>".escape_html().as_str(),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn attribute_values() {
        let safe = String::from(r#"say "hi""#).escape_html();
        assert_eq!(safe.to_string(), "say &quot;hi&quot;");
        assert!(HtmlSafe::escape("").is_empty());
    }

    #[test]
    fn class_sanitizing() {
        assert_eq!(sanitize_html_class("menu-1"), "menu-1");
        assert_eq!(sanitize_html_class("your:email.x"), "youremailx");
        assert_eq!(sanitize_html_class("a%20b"), "ab");
        assert_eq!(sanitize_html_class("100%"), "100");
    }
}
