//! Checker and renderer configuration with typed defaults.

use std::path::{Path, PathBuf};

const DEFAULT_FORM_TAG_TYPES: [&str; 18] = [
    "text", "email", "url", "tel", "number", "range", "date", "textarea", "select", "checkbox",
    "radio", "acceptance", "quiz", "captchac", "captchar", "file", "submit", "hidden",
];

/// Configuration shared by the config validator, the controls and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing application form definitions (`*.json`).
    pub forms_dir: PathBuf,

    /// Directory where configuration errors are persisted per form.
    pub errors_dir: PathBuf,

    /// Host name of the site; sender addresses must belong to it.
    pub site_domain: String,

    /// Base URL of the configuration-error documentation.
    pub docs_base_url: String,

    /// Prefix of the classes attached to rendered controls (`<prefix>-form-control`, ...).
    pub class_prefix: String,

    /// Whether captcha messages are in use (otherwise their text is not checked).
    pub use_captcha: bool,

    /// Message shown for a missing required value.
    pub invalid_required: String,

    /// Message shown when a value exceeds its maximum length.
    pub invalid_too_long: String,

    /// Message shown when a value is below its minimum length.
    pub invalid_too_short: String,

    /// Timezone offset in hours (for report timestamps).
    pub timezone_offset_hours: i32,

    /// Base types recognized as form controls. Bracketed text of any other
    /// type is prose.
    pub form_tag_types: Vec<String>,
}

impl Config {
    /// Create config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set forms directory.
    pub fn forms_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.forms_dir = path.as_ref().to_path_buf();
        self
    }

    /// Builder: set errors directory.
    pub fn errors_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.errors_dir = path.as_ref().to_path_buf();
        self
    }

    /// Builder: set site domain.
    pub fn site_domain(mut self, domain: impl Into<String>) -> Self {
        self.site_domain = domain.into();
        self
    }

    /// Builder: set documentation base URL.
    pub fn docs_base_url(mut self, url: impl Into<String>) -> Self {
        self.docs_base_url = url.into();
        self
    }

    /// Builder: set the control class prefix.
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Builder: enable or disable captcha message checks.
    pub fn use_captcha(mut self, enabled: bool) -> Self {
        self.use_captcha = enabled;
        self
    }

    /// Builder: set timezone offset.
    pub fn timezone_offset(mut self, hours: i32) -> Self {
        self.timezone_offset_hours = hours;
        self
    }

    /// Builder: replace the recognized form-tag base types.
    pub fn form_tag_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.form_tag_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_form_tag_type(&self, basetype: &str) -> bool {
        self.form_tag_types.iter().any(|t| t == basetype)
    }

    /// Documentation link for an error anchor such as `mail.subject:error_maybe_empty`.
    pub fn docs_link(&self, anchor: &str) -> String {
        format!("{}#{}", self.docs_base_url, anchor)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forms_dir: PathBuf::from("./forms"),
            errors_dir: PathBuf::from("./forms/.errors"),
            site_domain: String::from("localhost"),
            docs_base_url: String::from("http://contactform7.com/configuration-errors/"),
            class_prefix: String::from("WELDPRESS"),
            use_captcha: false,
            invalid_required: String::from("The field is required."),
            invalid_too_long: String::from("The field is too long."),
            invalid_too_short: String::from("The field is too short."),
            timezone_offset_hours: 0,
            form_tag_types: DEFAULT_FORM_TAG_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .forms_dir("./site/forms")
            .site_domain("example.org")
            .use_captcha(true);

        assert_eq!(config.forms_dir, PathBuf::from("./site/forms"));
        assert_eq!(config.site_domain, "example.org");
        assert!(config.use_captcha);
    }

    #[test]
    fn form_tag_types() {
        assert!(Config::new().is_form_tag_type("select"));
        assert!(!Config::new().is_form_tag_type("see"));

        let config = Config::new().form_tag_types(["rating"]);
        assert!(config.is_form_tag_type("rating"));
        assert!(!config.is_form_tag_type("text"));
    }

    #[test]
    fn docs_links() {
        let config = Config::new().docs_base_url("https://docs.test/errors/");
        assert_eq!(
            config.docs_link("mail.body:error_maybe_empty"),
            "https://docs.test/errors/#mail.body:error_maybe_empty"
        );
    }
}
