//! Form rendering: the per-request render context and the control registry.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::Config;
use crate::controls::{FormControl, Select, Textarea};
use crate::form_tag::{DefaultSource, FormTag, replace_form_tags, scan_form_tags};
use crate::submission::{Submission, SubmittedValue, ValidationResult};
use crate::types::EscapeHtml;

/// What a control may consult while rendering: the previous validation
/// round, the previously submitted values, external data sets and
/// `default:` sources.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub config: &'a Config,
    pub validation: Option<&'a ValidationResult>,
    pub hangover: Option<&'a Submission>,
    pub data_sets: Option<&'a IndexMap<String, Vec<String>>>,
    pub defaults: Option<&'a dyn DefaultSource>,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            validation: None,
            hangover: None,
            data_sets: None,
            defaults: None,
        }
    }

    pub fn with_validation(mut self, result: &'a ValidationResult) -> Self {
        self.validation = Some(result);
        self
    }

    pub fn with_hangover(mut self, submission: &'a Submission) -> Self {
        self.hangover = Some(submission);
        self
    }

    pub fn with_data_sets(mut self, sets: &'a IndexMap<String, Vec<String>>) -> Self {
        self.data_sets = Some(sets);
        self
    }

    pub fn with_defaults(mut self, source: &'a dyn DefaultSource) -> Self {
        self.defaults = Some(source);
        self
    }

    pub fn is_invalid(&self, name: &str) -> bool {
        self.validation.is_some_and(|v| !v.is_field_valid(name))
    }

    /// Alert markup for a rejected field, or `""`.
    pub fn validation_error(&self, name: &str) -> String {
        let Some(field) = self.validation.and_then(|v| v.get(name)) else {
            return String::new();
        };
        format!(
            r#"<span role="alert" class="{}-not-valid-tip">{}</span>"#,
            self.config.class_prefix,
            field.reason.escape_html()
        )
    }

    /// Previously submitted value of `name`.
    pub fn hangover(&self, name: &str) -> Option<&'a SubmittedValue> {
        self.hangover.and_then(|s| s.get(name))
    }

    /// Values of the tag's `data:` sets.
    pub fn data_option(&self, tag: &FormTag) -> Vec<String> {
        match self.data_sets {
            Some(sets) => tag.get_data_option(sets),
            None => Vec::new(),
        }
    }

    /// Classes shared by every control of `tag_type`:
    /// `<prefix>-form-control <prefix>-<basetype>[ <prefix>-validates-as-required]`.
    pub fn form_controls_class(&self, tag_type: &str) -> String {
        let prefix = &self.config.class_prefix;
        let tag_type = tag_type.trim();
        let basetype = tag_type.trim_end_matches('*');

        let mut class = format!("{prefix}-form-control {prefix}-{basetype}");
        if tag_type.ends_with('*') {
            class.push_str(&format!(" {prefix}-validates-as-required"));
        }
        class
    }
}

impl DefaultSource for RenderContext<'_> {
    fn default_values(&self, source: &str, field: &str) -> Vec<String> {
        match self.defaults {
            Some(defaults) => defaults.default_values(source, field),
            None => Vec::new(),
        }
    }
}

/// Controls keyed by the tag types they handle.
#[derive(Default)]
pub struct ControlRegistry {
    controls: IndexMap<&'static str, Arc<dyn FormControl>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `select` and `textarea` controls.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Select);
        registry.register(Textarea);
        registry
    }

    /// Register `control` under every type it handles, replacing earlier ones.
    pub fn register(&mut self, control: impl FormControl + 'static) {
        let control: Arc<dyn FormControl> = Arc::new(control);
        for tag_type in control.types() {
            self.controls.insert(*tag_type, Arc::clone(&control));
        }
    }

    pub fn get(&self, tag_type: &str) -> Option<&dyn FormControl> {
        self.controls.get(tag_type).map(|c| c.as_ref())
    }

    /// Replace every known tag in `body` with its HTML. Tags of unknown
    /// types are kept as written.
    pub fn render_form(&self, body: &str, ctx: &RenderContext<'_>) -> String {
        replace_form_tags(body, |tag, source| match self.get(&tag.tag_type) {
            Some(control) => control.render(tag, ctx),
            None => source.to_string(),
        })
    }

    /// Run every known control's check against `submission`.
    pub fn validate_submission(
        &self,
        body: &str,
        submission: &Submission,
        config: &Config,
    ) -> ValidationResult {
        let mut result = ValidationResult::new(config);
        for tag in scan_form_tags(body) {
            if let Some(control) = self.get(&tag.tag_type) {
                control.validate(&mut result, &tag, submission);
            }
        }
        if !result.is_valid() {
            tracing::debug!(invalid = result.invalid_fields().len(), "submission rejected");
        }
        result
    }
}
