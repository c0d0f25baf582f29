//! Form-tag parsing: `[type* name option... "value" ...]`.
//!
//! Tags are parsed every time they are needed and never cached. A tag whose
//! bracket syntax cannot be read yields a recoverable [`FormError`], which the
//! controls turn into "render nothing, validate nothing".

use std::ops::Range;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::error::FormError;
use crate::pipes::Pipes;
use crate::types::TagName;

/// Types whose first bare option is not a field name.
const NAMELESS_TYPES: [&str; 1] = ["submit"];

static COLS_ROWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*)x([0-9]*)(?:/[0-9]+)?$").unwrap());
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*)(?:/[0-9]+)?$").unwrap());
static SLASH_MAXLENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]*x?[0-9]*)?/([0-9]+)$").unwrap());

/// Value shapes accepted by [`FormTag::get_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionPattern {
    /// Any non-empty value.
    Any,
    /// `[0-9]+`
    Int,
    /// `-?[0-9]+`
    SignedInt,
    /// `[-0-9a-zA-Z_]+`, used for `class:` and `id:`.
    Class,
    /// `[-0-9a-zA-Z]+`
    Word,
}

impl OptionPattern {
    fn matches(self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        match self {
            Self::Any => true,
            Self::Int => value.bytes().all(|b| b.is_ascii_digit()),
            Self::SignedInt => {
                let digits = value.strip_prefix('-').unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            Self::Class => value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
            Self::Word => value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'),
        }
    }
}

/// Source of values for `default:<source>` options (`default:get`,
/// `default:post`, `default:user_email`, ...).
pub trait DefaultSource {
    fn default_values(&self, source: &str, field: &str) -> Vec<String>;
}

impl DefaultSource for () {
    fn default_values(&self, _source: &str, _field: &str) -> Vec<String> {
        Vec::new()
    }
}

/// A parsed form tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTag {
    /// Type as written, including a trailing `*` for required fields.
    pub tag_type: String,
    /// Type without the required marker.
    pub basetype: String,
    pub name: Option<TagName>,
    /// Raw option tokens in declaration order (`id:foo`, `multiple`, ...).
    pub options: Vec<String>,
    /// Quoted values as written, unquoted.
    pub raw_values: Vec<String>,
    /// The shown part of each value (before any `|`).
    pub values: Vec<String>,
    pub labels: Vec<String>,
    pub pipes: Pipes,
    /// Inner text of a container tag.
    pub content: String,
}

impl FormTag {
    /// Assemble a tag from already separated parts.
    pub fn new(
        tag_type: impl Into<String>,
        name: Option<TagName>,
        options: Vec<String>,
        raw_values: Vec<String>,
    ) -> Self {
        let tag_type = tag_type.into();
        let basetype = tag_type.trim_end_matches('*').to_string();
        let pipes = Pipes::new(&raw_values);
        let values = pipes.collect_befores();

        Self {
            tag_type,
            basetype,
            name,
            options,
            raw_values,
            labels: values.clone(),
            values,
            pipes,
            content: String::new(),
        }
    }

    /// Builder: set container content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Parse a single tag string such as `[select* menu-1 "Red" "Blue"]`.
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        let trimmed = raw.trim();
        let malformed = |reason| FormError::MalformedTag {
            tag: raw.to_string(),
            reason,
        };

        if !trimmed.starts_with('[') {
            return Err(malformed("expected an opening bracket"));
        }
        if !trimmed.contains(']') {
            return Err(malformed("missing closing bracket"));
        }

        let head = RawTag::read(trimmed, 0).ok_or_else(|| malformed("invalid tag type"))?;
        if head.end != trimmed.len() {
            return Err(malformed("unexpected text after the tag"));
        }
        head.build(trimmed)
    }

    pub fn name_str(&self) -> &str {
        self.name.as_ref().map(TagName::as_str).unwrap_or("")
    }

    pub fn is_required(&self) -> bool {
        self.tag_type.ends_with('*')
    }

    /// True for `opt` itself or any `opt:value` token.
    pub fn has_option(&self, opt: &str) -> bool {
        self.options.iter().any(|o| {
            o == opt
                || o
                    .strip_prefix(opt)
                    .and_then(|rest| rest.strip_prefix(':'))
                    .is_some_and(|v| !v.is_empty())
        })
    }

    /// Every value of `key:value` options whose value fits `pattern`.
    pub fn get_options(&self, key: &str, pattern: OptionPattern) -> Vec<&str> {
        self.options
            .iter()
            .filter_map(|o| o.strip_prefix(key).and_then(|rest| rest.strip_prefix(':')))
            .filter(|v| pattern.matches(v))
            .collect()
    }

    /// The first value of `key:value` fitting `pattern`.
    pub fn get_option(&self, key: &str, pattern: OptionPattern) -> Option<&str> {
        self.get_options(key, pattern).into_iter().next()
    }

    /// Captures of the first option matching `re`.
    pub fn get_first_match_option<'a>(&'a self, re: &Regex) -> Option<Captures<'a>> {
        self.options.iter().find_map(|o| re.captures(o))
    }

    fn get_all_match_options<'a>(&'a self, re: &'a Regex) -> impl Iterator<Item = Captures<'a>> {
        self.options.iter().filter_map(move |o| re.captures(o))
    }

    pub fn get_id_option(&self) -> Option<&str> {
        self.get_option("id", OptionPattern::Class)
    }

    /// `default` classes followed by every `class:` option, deduplicated.
    pub fn get_class_option(&self, default: &str) -> String {
        let mut classes: Vec<&str> = Vec::new();
        for class in default
            .split_whitespace()
            .chain(self.get_options("class", OptionPattern::Class))
        {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes.join(" ")
    }

    pub fn get_tabindex_option(&self) -> Option<&str> {
        self.get_option("tabindex", OptionPattern::Int)
    }

    pub fn get_size_option(&self, default: u32) -> u32 {
        self.get_option("size", OptionPattern::Int)
            .and_then(|v| v.parse().ok())
            .or_else(|| self.first_group_number(&SIZE, 1))
            .unwrap_or(default)
    }

    pub fn get_cols_option(&self, default: u32) -> u32 {
        self.get_option("cols", OptionPattern::Int)
            .and_then(|v| v.parse().ok())
            .or_else(|| self.first_group_number(&COLS_ROWS, 1))
            .unwrap_or(default)
    }

    pub fn get_rows_option(&self, default: u32) -> u32 {
        self.get_option("rows", OptionPattern::Int)
            .and_then(|v| v.parse().ok())
            .or_else(|| self.first_group_number(&COLS_ROWS, 2))
            .unwrap_or(default)
    }

    /// `maxlength:N`, or the `/N` suffix of a size option such as `40x10/200`.
    pub fn get_maxlength_option(&self) -> Option<u32> {
        self.get_option("maxlength", OptionPattern::Int)
            .and_then(|v| v.parse().ok())
            .or_else(|| self.first_group_number(&SLASH_MAXLENGTH, 1))
    }

    pub fn get_minlength_option(&self) -> Option<u32> {
        self.get_option("minlength", OptionPattern::Int)
            .and_then(|v| v.parse().ok())
    }

    fn first_group_number(&self, re: &Regex, group: usize) -> Option<u32> {
        self.get_all_match_options(re)
            .filter_map(|caps| caps.get(group))
            .find(|m| !m.as_str().is_empty())
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Values supplied by `default:<source>` options, deduplicated.
    ///
    /// Numeric index defaults (`default:1_3`) refer to the tag's own values
    /// and are resolved by the control that owns them.
    pub fn get_default_option(&self, source: &dyn DefaultSource) -> Vec<String> {
        let Some(name) = &self.name else {
            return Vec::new();
        };

        let mut values = Vec::new();
        for opt in self.get_options("default", OptionPattern::Any) {
            let key: String = opt
                .to_ascii_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect();

            if key.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
                continue;
            }

            for value in source.default_values(&key, name.as_str()) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        values
    }

    /// Values of every `data:<set>` option, looked up in `data_sets`.
    pub fn get_data_option(&self, data_sets: &IndexMap<String, Vec<String>>) -> Vec<String> {
        self.get_options("data", OptionPattern::Any)
            .into_iter()
            .filter_map(|set| data_sets.get(set))
            .flatten()
            .cloned()
            .collect()
    }

    /// Serialize back to tag syntax.
    pub fn to_tag_string(&self) -> String {
        let mut parts = vec![self.tag_type.clone()];
        if let Some(name) = &self.name {
            parts.push(name.to_string());
        }
        parts.extend(self.options.iter().map(|o| quote_option(o)));
        parts.extend(
            self.raw_values
                .iter()
                .map(|v| format!("\"{}\"", v.replace('"', "\"\""))),
        );

        let head = format!("[{}]", parts.join(" "));
        if self.content.is_empty() {
            head
        } else {
            format!("{head}{}[/{}]", self.content, self.tag_type)
        }
    }
}

impl std::fmt::Display for FormTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_tag_string())
    }
}

fn is_option_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-+*=:.!?#$&@_/|%".contains(c)
}

fn is_tag_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Options whose value needs quoting are written as `key:"value"`.
fn quote_option(opt: &str) -> String {
    if opt.chars().all(is_option_char) {
        return opt.to_string();
    }
    match opt.split_once(':') {
        Some((key, value)) => format!("{key}:\"{}\"", value.replace('"', "\"\"")),
        None => opt.to_string(),
    }
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, &'static str> {
    let Some(quote) = chars.next() else {
        return Err("unterminated quoted value");
    };
    let mut value = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => {
                if quote == '"' && chars.peek() == Some(&'"') {
                    chars.next();
                    value.push('"');
                } else {
                    return Ok(value);
                }
            }
            Some(c) => value.push(c),
            None => return Err("unterminated quoted value"),
        }
    }
}

/// Split the text after the tag type into option tokens and quoted values.
fn parse_attributes(text: &str) -> Result<(Vec<String>, Vec<String>), &'static str> {
    let text: String = text
        .chars()
        .map(|c| if c == '\u{a0}' || c == '\u{200b}' { ' ' } else { c })
        .collect();

    let mut options = Vec::new();
    let mut values = Vec::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if is_tag_space(c) {
            chars.next();
            continue;
        }

        if c == '"' || c == '\'' {
            values.push(read_quoted(&mut chars)?);
            continue;
        }

        if !values.is_empty() {
            return Err("options must precede quoted values");
        }

        let mut token = String::new();
        while let Some(&t) = chars.peek() {
            if is_tag_space(t) {
                break;
            }
            if t == '"' || t == '\'' {
                if !token.ends_with(':') {
                    break;
                }
                token.push_str(&read_quoted(&mut chars)?);
                continue;
            }
            if !is_option_char(t) {
                return Err("option contains an unsupported character");
            }
            token.push(t);
            chars.next();
        }
        options.push(token);
    }

    Ok((options, values))
}

/// Byte length of a tag type (`[A-Za-z][0-9A-Za-z:._-]*\*?`) at the start of `text`.
fn tag_type_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    let mut len = first.len_utf8();
    for (i, c) in chars {
        if TagName::is_name_char(c) {
            len = i + c.len_utf8();
        } else {
            if c == '*' {
                len = i + 1;
            }
            break;
        }
    }
    Some(len)
}

/// Byte offset of the first `]` outside a quoted value.
fn header_close(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match quote {
            None if c == ']' => return Some(i),
            None if c == '"' || c == '\'' => quote = Some(c),
            Some(q) if c == q => quote = None,
            _ => {}
        }
    }
    None
}

/// A tag located in text, not yet interpreted.
struct RawTag<'a> {
    tag_type: &'a str,
    attributes: &'a str,
    content: &'a str,
    start: usize,
    end: usize,
}

impl<'a> RawTag<'a> {
    /// Read a tag whose opening bracket is at `text[start]`.
    fn read(text: &'a str, start: usize) -> Option<Self> {
        let rest = text.get(start + 1..)?;
        let type_len = tag_type_len(rest)?;
        let tag_type = &rest[..type_len];
        let after_type = &rest[type_len..];

        let close = if after_type.starts_with(']') {
            0
        } else if after_type.starts_with(is_tag_space) {
            header_close(after_type)?
        } else {
            return None;
        };

        let header_end = start + 1 + type_len + close + 1;
        let mut end = header_end;
        let mut content = "";

        let tail = &text[header_end..];
        let closing = format!("[/{tag_type}]");
        if let Some(k) = tail.find('[') {
            if tail[k..].starts_with(&closing) {
                content = &tail[..k];
                end = header_end + k + closing.len();
            }
        }

        Some(Self {
            tag_type,
            attributes: after_type[..close].trim(),
            content,
            start,
            end,
        })
    }

    fn build(&self, text: &str) -> Result<FormTag, FormError> {
        let source = &text[self.start..self.end];
        let (mut options, raw_values) =
            parse_attributes(self.attributes).map_err(|reason| FormError::MalformedTag {
                tag: source.to_string(),
                reason,
            })?;

        let basetype = self.tag_type.trim_end_matches('*');
        let name = if !NAMELESS_TYPES.contains(&basetype) && !options.is_empty() {
            Some(TagName::new(&options.remove(0))?)
        } else {
            None
        };

        Ok(FormTag::new(self.tag_type, name, options, raw_values).with_content(self.content))
    }
}

/// What was found at a location of scanned text.
#[derive(Debug)]
pub enum SpanKind {
    /// `[[...]]`: shown literally with one bracket layer removed.
    Escaped,
    Tag(FormTag),
    Malformed(FormError),
}

/// A tag occurrence and the byte range it covers.
#[derive(Debug)]
pub struct TagSpan {
    pub range: Range<usize>,
    pub kind: SpanKind,
}

/// Locate every form tag in `text`, left to right, non-overlapping.
pub fn scan(text: &str) -> Vec<TagSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('[') {
        let start = pos + offset;

        if text[start..].starts_with("[[") {
            if let Some(inner) = RawTag::read(text, start + 1) {
                if text[inner.end..].starts_with(']') {
                    spans.push(TagSpan {
                        range: start..inner.end + 1,
                        kind: SpanKind::Escaped,
                    });
                    pos = inner.end + 1;
                    continue;
                }
            }
            pos = start + 1;
            continue;
        }

        match RawTag::read(text, start) {
            Some(raw) => {
                let kind = match raw.build(text) {
                    Ok(tag) => SpanKind::Tag(tag),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unreadable form-tag");
                        SpanKind::Malformed(e)
                    }
                };
                spans.push(TagSpan {
                    range: start..raw.end,
                    kind,
                });
                pos = raw.end;
            }
            None => pos = start + 1,
        }
    }

    spans
}

/// Every well-formed tag in `text`.
pub fn scan_form_tags(text: &str) -> Vec<FormTag> {
    scan(text)
        .into_iter()
        .filter_map(|span| match span.kind {
            SpanKind::Tag(tag) => Some(tag),
            _ => None,
        })
        .collect()
}

/// Replace every tag in `text` with `render(tag, source)`, where `source` is
/// the tag as written. Escaped tags lose one bracket layer; malformed tags
/// render as nothing.
pub fn replace_form_tags<F>(text: &str, mut render: F) -> String
where
    F: FnMut(&FormTag, &str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for span in scan(text) {
        out.push_str(&text[last..span.range.start]);
        match &span.kind {
            SpanKind::Escaped => {
                out.push_str(&text[span.range.start + 1..span.range.end - 1]);
            }
            SpanKind::Tag(tag) => out.push_str(&render(tag, &text[span.range.clone()])),
            SpanKind::Malformed(_) => {}
        }
        last = span.range.end;
    }

    out.push_str(&text[last..]);
    out
}
