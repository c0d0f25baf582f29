//! Admin tag generator: panel state, input normalization and tag composition.
//!
//! A panel is a list of inputs. Editing an input normalizes it, then the
//! panel is recomposed into a tag string and a mail-tag hint. Panels whose id
//! has a registered composer (`captcha`) bypass the default composition.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use rand::Rng;
use regex::Regex;

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static FILETYPE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,|\s]+").unwrap());
static LEADING_NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^a-zA-Z]+").unwrap());

/// Normalization rule of a text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextRole {
    #[default]
    Plain,
    /// The field name: `[0-9a-zA-Z:._-]`, starting with a letter.
    Name,
    Numeric,
    Id,
    Class,
    Color,
    FileSize,
    FileType,
    /// `yyyy-mm-dd`.
    Date,
}

impl TextRole {
    pub fn normalize(self, value: &str) -> String {
        let keep = |allowed: fn(char) -> bool| keep_chars(value, allowed);

        match self {
            Self::Plain => value.to_string(),
            Self::Name => {
                let kept = keep(|c| c.is_ascii_alphanumeric() || ":._-".contains(c));
                LEADING_NON_LETTERS.replace(&kept, "").into_owned()
            }
            Self::Numeric => keep(|c| c.is_ascii_digit() || c == '.' || c == '-'),
            Self::Id => keep(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            Self::Class => value
                .split(' ')
                .map(|word| {
                    word.chars()
                        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                        .collect::<String>()
                })
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Color => keep(|c| c.is_ascii_hexdigit()),
            Self::FileSize => keep(|c| c.is_ascii_digit() || "kKmMbB".contains(c)),
            Self::FileType => {
                keep(|c| c.is_ascii_alphanumeric() || ".,|".contains(c) || c.is_whitespace())
            }
            Self::Date => {
                let valid = DATE_SHAPE.is_match(value)
                    && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
                if valid { value.to_string() } else { String::new() }
            }
        }
    }
}

fn keep_chars(value: &str, allowed: fn(char) -> bool) -> String {
    value.chars().filter(|c| allowed(*c)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Single-line text. `option` inputs become `name:value` tokens.
    Text { value: String, role: TextRole, option: bool },
    /// `option` checkboxes become bare `name` tokens when checked. Checking an
    /// `exclusive` box unchecks its exclusive siblings.
    Checkbox { checked: bool, exclusive: bool, option: bool },
    /// Checked radios other than the `default` one become `name:value`.
    Radio { value: String, checked: bool, default: bool },
    /// Multi-line list of values, one per line.
    Values(String),
}

/// One input of a generator panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelInput {
    pub name: String,
    pub kind: InputKind,
    /// Sub-tag type this input belongs to, for panels composing several tags.
    pub scope: Option<String>,
}

impl PanelInput {
    fn new(name: &str, kind: InputKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            scope: None,
        }
    }

    /// The field-name input.
    pub fn name_field(value: &str) -> Self {
        Self::new(
            "name",
            InputKind::Text {
                value: value.to_string(),
                role: TextRole::Name,
                option: false,
            },
        )
    }

    /// The "required field" checkbox.
    pub fn required(checked: bool) -> Self {
        Self::new(
            "required",
            InputKind::Checkbox {
                checked,
                exclusive: false,
                option: false,
            },
        )
    }

    /// Overrides the tag type of the output.
    pub fn tag_type(value: &str) -> Self {
        Self::new(
            "tagtype",
            InputKind::Text {
                value: value.to_string(),
                role: TextRole::Plain,
                option: false,
            },
        )
    }

    pub fn values(text: &str) -> Self {
        Self::new("values", InputKind::Values(text.to_string()))
    }

    /// A text input composed as `name:value`.
    pub fn text_option(name: &str, value: &str, role: TextRole) -> Self {
        Self::new(
            name,
            InputKind::Text {
                value: value.to_string(),
                role,
                option: true,
            },
        )
    }

    pub fn checkbox_option(name: &str, checked: bool) -> Self {
        Self::new(
            name,
            InputKind::Checkbox {
                checked,
                exclusive: false,
                option: true,
            },
        )
    }

    pub fn exclusive_option(name: &str, checked: bool) -> Self {
        Self::new(
            name,
            InputKind::Checkbox {
                checked,
                exclusive: true,
                option: true,
            },
        )
    }

    pub fn radio_option(name: &str, value: &str, checked: bool, default: bool) -> Self {
        Self::new(
            name,
            InputKind::Radio {
                value: value.to_string(),
                checked,
                default,
            },
        )
    }

    /// Builder: restrict this input to one sub-tag.
    pub fn scoped(mut self, tag_type: &str) -> Self {
        self.scope = Some(tag_type.to_string());
        self
    }

    fn text_value(&self) -> Option<&str> {
        match &self.kind {
            InputKind::Text { value, .. } => Some(value),
            InputKind::Values(text) => Some(text),
            _ => None,
        }
    }

    fn is_checked(&self) -> bool {
        matches!(
            self.kind,
            InputKind::Checkbox { checked: true, .. } | InputKind::Radio { checked: true, .. }
        )
    }
}

/// State of one generator panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorPanel {
    /// Generator id (`menu`, `textarea`, `captcha`, ...).
    pub id: String,
    /// Tag type produced when no `tagtype` input overrides it.
    pub output: String,
    pub inputs: Vec<PanelInput>,
}

impl GeneratorPanel {
    pub fn new(id: &str, output: &str, inputs: Vec<PanelInput>) -> Self {
        Self {
            id: id.to_string(),
            output: output.to_string(),
            inputs,
        }
    }

    pub fn input(&self, name: &str) -> Option<&PanelInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    fn input_value(&self, name: &str) -> Option<&str> {
        self.input(name).and_then(PanelInput::text_value)
    }

    /// Inputs scoped to `tag_type`, or every input when none is.
    fn scope<'a>(&'a self, tag_type: &str) -> Vec<&'a PanelInput> {
        let scoped: Vec<_> = self
            .inputs
            .iter()
            .filter(|i| i.scope.as_deref() == Some(tag_type))
            .collect();
        if scoped.is_empty() {
            self.inputs.iter().collect()
        } else {
            scoped
        }
    }

    /// Apply the rules of input `index` after it changed.
    pub fn normalize(&mut self, index: usize) {
        let Some(input) = self.inputs.get_mut(index) else {
            return;
        };
        let is_name = input.name == "name";
        let is_values = input.name == "values";

        match &mut input.kind {
            InputKind::Text { value, role, .. } => {
                let role = if is_name { TextRole::Name } else { *role };
                *value = role.normalize(value);
                if is_values {
                    *value = value.trim().to_string();
                }
            }
            InputKind::Values(text) => *text = text.trim().to_string(),
            _ => {}
        }

        let exclusive_checked = matches!(
            input.kind,
            InputKind::Checkbox {
                checked: true,
                exclusive: true,
                ..
            }
        );
        if !exclusive_checked {
            return;
        }

        let scope = input.scope.clone();
        for (i, sibling) in self.inputs.iter_mut().enumerate() {
            if i == index || sibling.scope != scope {
                continue;
            }
            if let InputKind::Checkbox {
                checked,
                exclusive: true,
                ..
            } = &mut sibling.kind
            {
                *checked = false;
            }
        }
    }
}

/// Compose `[tag_type name options "values"...]` from the panel.
pub fn compose(tag_type: &str, panel: &GeneratorPanel) -> String {
    let name = panel.input_value("name").unwrap_or("");
    let scope = panel.scope(tag_type);

    let mut options: Vec<String> = Vec::new();

    for input in &scope {
        let InputKind::Text {
            value,
            role,
            option: true,
        } = &input.kind
        else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let value = match role {
            TextRole::FileType => FILETYPE_SEPARATORS.split(value).collect::<Vec<_>>().join("|"),
            TextRole::Color => format!("#{value}"),
            _ => value.clone(),
        };

        if input.name == "class" {
            options.extend(value.split(' ').map(|c| format!("class:{c}")));
        } else {
            options.push(format!("{}:{}", input.name, value));
        }
    }

    options.extend(
        scope
            .iter()
            .filter(|i| matches!(i.kind, InputKind::Checkbox { option: true, .. }) && i.is_checked())
            .map(|i| i.name.clone()),
    );

    for input in &scope {
        if let InputKind::Radio {
            value,
            checked: true,
            default: false,
        } = &input.kind
        {
            options.push(format!("{}:{}", input.name, value));
        }
    }

    if tag_type == "radio" {
        options.push("default:1".to_string());
    }

    let values: String = scope
        .iter()
        .find(|i| i.name == "values")
        .and_then(|i| i.text_value())
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.split('\n')
                .map(|line| format!(" \"{}\"", line.replace('"', "&quot;")))
                .collect()
        })
        .unwrap_or_default();

    let options = options.join(" ");
    let components: Vec<&str> = [tag_type, name, options.as_str(), values.as_str()]
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    format!("[{}]", components.join(" "))
}

/// A panel-specific replacement for the default composition.
pub type Composer = fn(&GeneratorPanel) -> String;

/// `[captchac name ...] [captchar name ...]`
pub fn compose_captcha(panel: &GeneratorPanel) -> String {
    format!("{} {}", compose("captchac", panel), compose("captchar", panel))
}

/// What the panel shows after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOutput {
    pub tag: String,
    /// `[name]`; absent for panels with their own composer.
    pub mail_tag: Option<String>,
}

/// Composer lookup by panel id, with the default composition as fallback.
pub struct TagGenerator {
    composers: HashMap<String, Composer>,
}

impl Default for TagGenerator {
    fn default() -> Self {
        let mut generator = Self {
            composers: HashMap::new(),
        };
        generator.register("captcha", compose_captcha);
        generator
    }
}

impl TagGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, panel_id: &str, composer: Composer) {
        self.composers.insert(panel_id.to_string(), composer);
    }

    /// Recompose the panel. An empty name is first replaced with
    /// `<panel id>-<0..999>`.
    pub fn update(&self, panel: &mut GeneratorPanel) -> GeneratorOutput {
        let id = panel.id.clone();
        let mut name = String::new();

        if let Some(InputKind::Text { value, .. }) = panel
            .inputs
            .iter_mut()
            .find(|i| i.name == "name")
            .map(|i| &mut i.kind)
        {
            if value.is_empty() {
                *value = format!("{id}-{}", rand::thread_rng().gen_range(0..1000));
                tracing::debug!(panel = %id, name = %value, "generated field name");
            }
            name = value.clone();
        }

        if let Some(composer) = self.composers.get(&id) {
            return GeneratorOutput {
                tag: composer(panel),
                mail_tag: None,
            };
        }

        let mut tag_type = panel
            .input_value("tagtype")
            .unwrap_or(&panel.output)
            .to_string();
        if panel.input("required").is_some_and(PanelInput::is_checked) {
            tag_type.push('*');
        }

        GeneratorOutput {
            tag: compose(&tag_type, panel),
            mail_tag: Some(format!("[{name}]")),
        }
    }
}

/// The form body being edited, with an optional caret (byte offset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormEditor {
    pub text: String,
    pub caret: Option<usize>,
}

impl FormEditor {
    pub fn new(text: impl Into<String>, caret: Option<usize>) -> Self {
        Self {
            text: text.into(),
            caret,
        }
    }

    /// Insert at the caret and move the caret past the insertion; append
    /// when there is no caret.
    pub fn insert(&mut self, content: &str) {
        match self.caret {
            Some(caret) => {
                let mut at = caret.min(self.text.len());
                while !self.text.is_char_boundary(at) {
                    at -= 1;
                }
                self.text.insert_str(at, content);
                self.caret = Some(at + content.len());
            }
            None => self.text.push_str(content),
        }
    }
}
