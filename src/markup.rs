//! Markup detection for user-facing messages.
//!
//! A message carries markup when stripping tags changes it. Stripping drops
//! `<script>`/`<style>` blocks with their content, comments, and anything
//! from a `<` followed by a non-space character up to the next `>` or the
//! end of the text.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>").unwrap()
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?(?:-->|$)").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\S[^>]*(?:>|$)").unwrap());

/// `text` with every tag, comment and script or style block removed.
pub fn strip_tags(text: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(text, "");
    let text = COMMENT.replace_all(&text, "");
    TAG.replace_all(&text, "").into_owned()
}

/// True when `message` contains anything [`strip_tags`] would remove.
pub fn contains_markup(message: &str) -> bool {
    strip_tags(message) != message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_clean() {
        assert!(!contains_markup("Thank you for your message. It has been sent."));
        assert!(!contains_markup("1 < 2 and 3 > 2"));
        assert!(!contains_markup(""));
    }

    #[test]
    fn inline_tags() {
        assert!(contains_markup("Thank you <strong>very</strong> much."));
        assert!(contains_markup("Line one<br>Line two"));
        assert!(contains_markup(r#"Read <a href="/faq">the FAQ</a>."#));
    }

    #[test]
    fn block_markup_and_comments() {
        assert!(contains_markup("<p>Sent.</p>"));
        assert!(contains_markup("Sent. <!-- note -->"));
    }

    #[test]
    fn autolinks() {
        assert!(contains_markup("Write to <help@example.com>"));
        assert!(contains_markup("See <https://example.com>"));
    }

    #[test]
    fn markup_in_code_like_text() {
        assert!(contains_markup("Use `<b>bold</b>` here"));
        assert!(contains_markup("    <b>x</b>"));
        assert!(contains_markup(r"\<b\>hi\</b\>"));
    }

    #[test]
    fn unclosed_tag_openers() {
        assert!(contains_markup("I <3 you"));
        assert!(contains_markup("Sent. <!-- unterminated"));
        assert_eq!(strip_tags("I <3 you"), "I ");
    }

    #[test]
    fn strips_blocks_with_content() {
        assert_eq!(strip_tags("a<script>alert(1)</script>b"), "ab");
        assert_eq!(strip_tags("a<STYLE type=\"x\">p{}</style>b"), "ab");
        assert_eq!(strip_tags("x <!-- a > b --> y"), "x  y");
        assert_eq!(strip_tags("<p>Sent.</p>"), "Sent.");
    }
}
