//! Configuration validation of an application form.
//!
//! A validator inspects the form body, the mail templates and the
//! user-facing messages, records problems per section (`mail.subject`,
//! `form.body`, `messages.mail_sent_ok`, ...) and persists them through an
//! [`ErrorStore`]. Problems are advisory: they never block saving a form.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::application::ApplicationForm;
use crate::config::Config;
use crate::error::FormError;
use crate::form_tag::{FormTag, scan_form_tags};
use crate::mail_tag::{MailTag, MailTagResolver, expand};
use crate::mailbox::{is_email_in_site_domain, is_mailbox_list, strip_newline};
use crate::markup::contains_markup;
use crate::store::ErrorStore;

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<label(?:[ \t\n]+.*?)?>(.+?)</label>").unwrap());
static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Za-z-]+):(.+)$").unwrap());
static PARAM_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_]+$").unwrap());

pub const EXAMPLE_EMAIL: &str = "example@example.com";
pub const EXAMPLE_TEXT: &str = "example";
pub const EXAMPLE_BLANK: &str = "";

const MAILBOX_HEADERS: [&str; 3] = ["reply-to", "cc", "bcc"];
const SELECTABLE_TYPES: [&str; 3] = ["radio", "checkbox", "select"];

/// Kind of configuration problem. Persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ErrorCode {
    Error,
    MaybeEmpty,
    InvalidSyntax,
    EmailNotInSiteDomain,
    HtmlInMessage,
    MultipleControlsInLabel,
    /// Codes registered by additional checks.
    Other(u32),
}

impl ErrorCode {
    /// Identifier used in documentation anchors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error | Self::Other(_) => "error",
            Self::MaybeEmpty => "error_maybe_empty",
            Self::InvalidSyntax => "error_invalid_syntax",
            Self::EmailNotInSiteDomain => "error_email_not_in_site_domain",
            Self::HtmlInMessage => "error_html_in_message",
            Self::MultipleControlsInLabel => "error_multiple_controls_in_label",
        }
    }

    /// Built-in message for the code; empty for generic and custom codes.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::MaybeEmpty => "This field can be empty depending on user input.",
            Self::InvalidSyntax => "This field has syntax errors.",
            Self::EmailNotInSiteDomain => {
                "This email address does not belong to the same domain as the site."
            }
            Self::HtmlInMessage => "HTML tags are not allowed in a message.",
            Self::MultipleControlsInLabel => {
                "Multiple form controls are placed inside a single label element."
            }
            Self::Error | Self::Other(_) => "",
        }
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            100 => Self::Error,
            101 => Self::MaybeEmpty,
            102 => Self::InvalidSyntax,
            103 => Self::EmailNotInSiteDomain,
            104 => Self::HtmlInMessage,
            105 => Self::MultipleControlsInLabel,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> u32 {
        match code {
            ErrorCode::Error => 100,
            ErrorCode::MaybeEmpty => 101,
            ErrorCode::InvalidSyntax => 102,
            ErrorCode::EmailNotInSiteDomain => 103,
            ErrorCode::HtmlInMessage => 104,
            ErrorCode::MultipleControlsInLabel => 105,
            ErrorCode::Other(other) => other,
        }
    }
}

/// Optional message override, its placeholder values and a documentation link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorArgs {
    pub message: String,
    pub params: IndexMap<String, String>,
    pub link: String,
}

impl ErrorArgs {
    pub fn link(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }
}

/// One recorded configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigError {
    pub code: ErrorCode,
    #[serde(default)]
    pub args: ErrorArgs,
}

impl ConfigError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            args: ErrorArgs::default(),
        }
    }
}

/// Section → errors, in recording order. This is what gets persisted.
pub type ErrorMap = IndexMap<String, Vec<ConfigError>>;

/// A rendered error ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub message: String,
    pub link: String,
}

/// A validation pass run by [`ConfigValidator::validate`].
pub trait ConfigCheck: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, validator: &mut ConfigValidator<'_>);
}

/// Label scan of the form body.
pub struct FormBodyCheck;

impl ConfigCheck for FormBodyCheck {
    fn name(&self) -> &str {
        "form"
    }

    fn run(&self, validator: &mut ConfigValidator<'_>) {
        validator.validate_form();
    }
}

/// Checks of one mail template (`mail`, `mail_2`).
pub struct MailCheck(pub String);

impl ConfigCheck for MailCheck {
    fn name(&self) -> &str {
        &self.0
    }

    fn run(&self, validator: &mut ConfigValidator<'_>) {
        validator.validate_mail(&self.0);
    }
}

/// Markup check of the user-facing messages.
pub struct MessagesCheck;

impl ConfigCheck for MessagesCheck {
    fn name(&self) -> &str {
        "messages"
    }

    fn run(&self, validator: &mut ConfigValidator<'_>) {
        validator.validate_messages();
    }
}

/// The checks run when none are configured explicitly.
pub fn default_checks() -> Vec<Box<dyn ConfigCheck>> {
    vec![
        Box::new(FormBodyCheck),
        Box::new(MailCheck("mail".to_string())),
        Box::new(MailCheck("mail_2".to_string())),
        Box::new(MessagesCheck),
    ]
}

/// Collects, persists and renders the configuration errors of one form.
pub struct ConfigValidator<'a> {
    form: &'a ApplicationForm,
    store: &'a dyn ErrorStore,
    config: &'a Config,
    errors: ErrorMap,
    checks: Vec<Box<dyn ConfigCheck>>,
}

impl<'a> ConfigValidator<'a> {
    /// A validator with no recorded errors and the default checks.
    pub fn new(form: &'a ApplicationForm, store: &'a dyn ErrorStore, config: &'a Config) -> Self {
        Self {
            form,
            store,
            config,
            errors: ErrorMap::new(),
            checks: default_checks(),
        }
    }

    /// A validator holding the errors persisted for `form`.
    pub fn load(
        form: &'a ApplicationForm,
        store: &'a dyn ErrorStore,
        config: &'a Config,
    ) -> Result<Self, FormError> {
        let persisted = store.load(&form.id)?;
        let mut validator = Self::new(form, store, config);
        for (section, errors) in persisted {
            for error in errors {
                validator.add_error(&section, error.code, error.args);
            }
        }
        Ok(validator)
    }

    /// Builder: run an additional check after the configured ones.
    pub fn with_check(mut self, check: impl ConfigCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Builder: replace the configured checks.
    pub fn with_checks(mut self, checks: Vec<Box<dyn ConfigCheck>>) -> Self {
        self.checks = checks;
        self
    }

    pub fn form(&self) -> &'a ApplicationForm {
        self.form
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.count_errors() == 0
    }

    pub fn count_errors(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Record an error. Repeated codes in a section are kept.
    pub fn add_error(&mut self, section: &str, code: ErrorCode, args: ErrorArgs) {
        self.errors
            .entry(section.to_string())
            .or_default()
            .push(ConfigError { code, args });
    }

    /// Drop every error of `code` in `section`.
    pub fn remove_error(&mut self, section: &str, code: ErrorCode) {
        if let Some(errors) = self.errors.get_mut(section) {
            errors.retain(|e| e.code != code);
            if errors.is_empty() {
                self.errors.shift_remove(section);
            }
        }
    }

    /// Reset, run every check, persist, and report validity.
    pub fn validate(&mut self) -> Result<bool, FormError> {
        self.errors.clear();

        let checks = std::mem::take(&mut self.checks);
        for check in &checks {
            tracing::debug!(form = %self.form.id, check = check.name(), "running config check");
            check.run(self);
        }
        self.checks = checks;

        self.save()?;
        Ok(self.is_valid())
    }

    /// Persist the current errors, deleting the record when there are none.
    pub fn save(&self) -> Result<(), FormError> {
        self.store.save(&self.form.id, &self.errors)
    }

    /// Render every error: the override message (with params) or the default.
    pub fn collect_error_messages(&self) -> IndexMap<String, Vec<ErrorMessage>> {
        self.errors
            .iter()
            .map(|(section, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| {
                        let message = if error.args.message.is_empty() {
                            error.code.default_message().to_string()
                        } else if error.args.params.is_empty() {
                            error.args.message.clone()
                        } else {
                            build_message(&error.args.message, &error.args.params)
                        };
                        ErrorMessage {
                            message,
                            link: error.args.link.clone(),
                        }
                    })
                    .collect();
                (section.clone(), messages)
            })
            .collect()
    }

    fn docs_args(&self, anchor: &str) -> ErrorArgs {
        ErrorArgs::link(self.config.docs_link(anchor))
    }

    /// Each `<label>` may wrap at most one control; stops at the first violation.
    /// Only tags of recognized form-tag types count as controls.
    pub fn validate_form(&mut self) {
        let form = self.form;
        let config = self.config;

        for caps in LABEL.captures_iter(&form.form) {
            let inside = caps.get(1).map_or("", |m| m.as_str());
            let mut fields_count = 0;

            let controls = scan_form_tags(inside)
                .into_iter()
                .filter(|tag| config.is_form_tag_type(&tag.basetype));
            for tag in controls {
                if tag.basetype == "checkbox" || tag.basetype == "radio" {
                    fields_count += tag.values.len();
                    if tag.has_option("free_text") {
                        fields_count += 1;
                    }
                } else if tag.name.is_some() {
                    fields_count += 1;
                }

                if fields_count > 1 {
                    let code = ErrorCode::MultipleControlsInLabel;
                    let args = self.docs_args(&format!("form.body:{}", code.as_str()));
                    self.add_error("form.body", code, args);
                    return;
                }
            }
        }
    }

    fn add_mail_error(&mut self, template: &str, field: &str, code: ErrorCode) {
        let args = self.docs_args(&format!("mail.{field}:{}", code.as_str()));
        self.add_error(&format!("{template}.{field}"), code, args);
    }

    /// Check one mail template after resolving its mail-tags to minimum input.
    pub fn validate_mail(&mut self, template: &str) {
        let form = self.form;
        let config = self.config;

        let Some(components) = form.mail_template(template) else {
            return;
        };
        if template != "mail" && !components.active {
            return;
        }

        let mut resolver = MinimumInput::new(form);

        let subject = strip_newline(&expand(&components.subject, &mut resolver));
        if subject.is_empty() {
            self.add_mail_error(template, "subject", ErrorCode::MaybeEmpty);
        }

        let sender = strip_newline(&expand(&components.sender, &mut resolver));
        if is_mailbox_list(&sender).is_none() {
            self.add_mail_error(template, "sender", ErrorCode::InvalidSyntax);
        } else if !is_email_in_site_domain(&sender, &config.site_domain) {
            self.add_mail_error(template, "sender", ErrorCode::EmailNotInSiteDomain);
        }

        let recipient = strip_newline(&expand(&components.recipient, &mut resolver));
        if is_mailbox_list(&recipient).is_none() {
            self.add_mail_error(template, "recipient", ErrorCode::InvalidSyntax);
        }

        let headers = expand(&components.additional_headers, &mut resolver);
        for header in headers.split('\n').map(str::trim) {
            if header.is_empty() {
                continue;
            }

            match HEADER_LINE.captures(header) {
                None => {
                    self.add_mail_error(template, "additional_headers", ErrorCode::InvalidSyntax);
                }
                Some(caps) => {
                    let name = caps.get(1).map_or("", |m| m.as_str());
                    let value = caps.get(2).map_or("", |m| m.as_str());
                    let is_mailbox_header =
                        MAILBOX_HEADERS.contains(&name.to_ascii_lowercase().as_str());

                    if is_mailbox_header && is_mailbox_list(value).is_none() {
                        let code = ErrorCode::InvalidSyntax;
                        let mut args =
                            self.docs_args(&format!("mail.additional_headers:{}", code.as_str()));
                        args.message = "The %name% field value is invalid.".to_string();
                        args.params.insert("name".to_string(), name.to_string());
                        self.add_error(&format!("{template}.additional_headers"), code, args);
                    }
                }
            }
        }

        let body = expand(&components.body, &mut resolver);
        if body.is_empty() {
            self.add_mail_error(template, "body", ErrorCode::MaybeEmpty);
        }
    }

    /// User-facing messages must be plain text.
    pub fn validate_messages(&mut self) {
        let form = self.form;

        for (key, message) in &form.messages {
            if key == "captcha_not_match" && !self.config.use_captcha {
                continue;
            }

            if contains_markup(message) {
                let code = ErrorCode::HtmlInMessage;
                let args = self.docs_args(&format!("messages:{}", code.as_str()));
                self.add_error(&format!("messages.{key}"), code, args);
            }
        }
    }
}

/// Substitute `%key%` placeholders (case-insensitive) with their values.
/// Keys outside `[0-9A-Za-z_]` are ignored.
pub fn build_message(message: &str, params: &IndexMap<String, String>) -> String {
    let mut message = message.to_string();

    for (key, value) in params {
        if !PARAM_KEY.is_match(key) {
            continue;
        }
        let Ok(placeholder) = Regex::new(&format!("(?i)%{key}%")) else {
            continue;
        };
        message = placeholder
            .replace_all(&message, NoExpand(value))
            .into_owned();
    }

    message
}

/// Resolves each mail-tag to the smallest plausible example value of its
/// field, so templates are checked against the input a visitor might give.
pub struct MinimumInput {
    tags: Vec<FormTag>,
}

impl MinimumInput {
    pub fn new(form: &ApplicationForm) -> Self {
        Self {
            tags: form.scan_form_tags(),
        }
    }
}

impl MailTagResolver for MinimumInput {
    fn resolve(&mut self, tag: &MailTag<'_>) -> String {
        let Some(form_tag) = self.tags.iter().find(|t| t.name_str() == tag.name) else {
            let name = match tag.name.strip_prefix("WELDPRESS.") {
                Some(rest) => format!("_{rest}"),
                None => tag.name.clone(),
            };

            return if name == "_post_author_email" {
                EXAMPLE_EMAIL.to_string()
            } else if name.starts_with('_') {
                EXAMPLE_TEXT.to_string()
            } else {
                tag.source.to_string()
            };
        };

        let is_required = form_tag.is_required() || form_tag.tag_type == "radio";
        if !is_required {
            return EXAMPLE_BLANK.to_string();
        }

        if SELECTABLE_TYPES.contains(&form_tag.basetype.as_str()) {
            let candidates = if form_tag.pipes.is_empty() {
                form_tag.values.clone()
            } else if tag.raw {
                form_tag.pipes.collect_befores()
            } else {
                form_tag.pipes.collect_afters()
            };

            let looks_like_email = candidates
                .last()
                .is_some_and(|last| !last.is_empty() && is_mailbox_list(last).is_some());

            return if looks_like_email {
                EXAMPLE_EMAIL.to_string()
            } else {
                EXAMPLE_TEXT.to_string()
            };
        }

        if form_tag.basetype == "email" {
            EXAMPLE_EMAIL.to_string()
        } else {
            EXAMPLE_TEXT.to_string()
        }
    }
}
