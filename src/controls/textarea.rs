//! `[textarea]` and `[textarea*]`: multi-line text input.

use super::FormControl;
use crate::form_tag::{FormTag, OptionPattern};
use crate::renderer::RenderContext;
use crate::submission::{InvalidKind, Submission, ValidationResult, count_code_units, unslash};
use crate::types::{Attributes, EscapeHtml, sanitize_html_class};

const DEFAULT_COLS: u32 = 40;
const DEFAULT_ROWS: u32 = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct Textarea;

/// `(maxlength, minlength)`. Zero means unbounded; a maximum below the
/// minimum drops both.
fn length_bounds(tag: &FormTag) -> (Option<u32>, Option<u32>) {
    let max = tag.get_maxlength_option().filter(|n| *n > 0);
    let min = tag.get_minlength_option().filter(|n| *n > 0);
    match (max, min) {
        (Some(max), Some(min)) if max < min => (None, None),
        bounds => bounds,
    }
}

impl FormControl for Textarea {
    fn types(&self) -> &'static [&'static str] {
        &["textarea", "textarea*"]
    }

    fn render(&self, tag: &FormTag, ctx: &RenderContext<'_>) -> String {
        let Some(name) = &tag.name else {
            return String::new();
        };
        let name = name.as_str();
        let prefix = &ctx.config.class_prefix;

        let validation_error = ctx.validation_error(name);
        let invalid = ctx.is_invalid(name);

        let mut class = ctx.form_controls_class(&tag.tag_type);
        if invalid {
            class.push_str(&format!(" {prefix}-not-valid"));
        }

        let (maxlength, minlength) = length_bounds(tag);

        let mut atts = Attributes::new();
        atts.set("cols", tag.get_cols_option(DEFAULT_COLS).to_string());
        atts.set("rows", tag.get_rows_option(DEFAULT_ROWS).to_string());
        atts.set_opt("maxlength", maxlength.map(|n| n.to_string()));
        atts.set_opt("minlength", minlength.map(|n| n.to_string()));
        atts.set("class", tag.get_class_option(&class));
        atts.set_opt("id", tag.get_id_option());
        atts.set_opt("tabindex", tag.get_tabindex_option());
        atts.set_opt("autocomplete", tag.get_option("autocomplete", OptionPattern::Word));
        if tag.has_option("readonly") {
            atts.set("readonly", "readonly");
        }
        if tag.is_required() {
            atts.set("aria-required", "true");
        }
        atts.set("aria-invalid", if invalid { "true" } else { "false" });

        let mut value = if tag.content.is_empty() {
            tag.values.first().cloned().unwrap_or_default()
        } else {
            tag.content.clone()
        };

        if tag.has_option("placeholder") || tag.has_option("watermark") {
            atts.set("placeholder", std::mem::take(&mut value));
        }

        if let Some(default) = tag.get_default_option(ctx).into_iter().next() {
            value = default;
        }
        if let Some(posted) = ctx.hangover(name) {
            value = unslash(posted.as_text());
        }

        atts.set("name", name);

        format!(
            r#"<span class="{prefix}-form-control-wrap {}"><textarea {atts}>{}</textarea>{validation_error}</span>"#,
            sanitize_html_class(name),
            value.escape_html()
        )
    }

    fn validate(&self, result: &mut ValidationResult, tag: &FormTag, submission: &Submission) {
        let Some(name) = &tag.name else {
            return;
        };

        let value = submission
            .get(name.as_str())
            .map(|v| v.as_text())
            .unwrap_or("");

        if tag.is_required() && value.is_empty() {
            result.invalidate(tag, InvalidKind::InvalidRequired);
        }

        if value.is_empty() {
            return;
        }

        let (maxlength, minlength) = length_bounds(tag);
        let code_units = count_code_units(&unslash(value));

        if maxlength.is_some_and(|max| (max as usize) < code_units) {
            result.invalidate(tag, InvalidKind::InvalidTooLong);
        } else if minlength.is_some_and(|min| code_units < min as usize) {
            result.invalidate(tag, InvalidKind::InvalidTooShort);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use proptest::prelude::*;

    fn validate(raw: &str, value: &str) -> ValidationResult {
        let config = Config::new();
        let mut result = ValidationResult::new(&config);
        let submission = Submission::new().with("message", value);
        Textarea.validate(&mut result, &FormTag::parse(raw).unwrap(), &submission);
        result
    }

    fn kind(result: &ValidationResult) -> Option<InvalidKind> {
        result.get("message").map(|f| f.kind)
    }

    #[test]
    fn renders_defaults() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let tag = FormTag::parse(r#"[textarea message "Hello <you>"]"#).unwrap();
        assert_eq!(
            Textarea.render(&tag, &ctx),
            concat!(
                r#"<span class="WELDPRESS-form-control-wrap message">"#,
                r#"<textarea name="message" cols="40" rows="10" class="WELDPRESS-form-control WELDPRESS-textarea" aria-invalid="false">"#,
                r#"Hello &lt;you&gt;</textarea></span>"#
            )
        );
    }

    #[test]
    fn renders_options() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let tag = FormTag::parse(
            r#"[textarea* message 30x4 maxlength:100 minlength:5 autocomplete:off readonly placeholder "Your text"]"#,
        )
        .unwrap();
        let html = Textarea.render(&tag, &ctx);
        assert!(html.contains(
            r#"<textarea name="message" cols="30" rows="4" maxlength="100" minlength="5" class="WELDPRESS-form-control WELDPRESS-textarea WELDPRESS-validates-as-required" autocomplete="off" readonly="readonly" aria-required="true" aria-invalid="false" placeholder="Your text"></textarea>"#
        ));
    }

    #[test]
    fn contradictory_bounds_are_not_rendered() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let tag = FormTag::parse("[textarea message minlength:10 maxlength:5]").unwrap();
        let html = Textarea.render(&tag, &ctx);
        assert!(!html.contains("maxlength"));
        assert!(!html.contains("minlength"));
    }

    #[test]
    fn content_and_hangover() {
        let config = Config::new();
        let tag = FormTag::parse("[textarea message]Dear team,[/textarea]").unwrap();
        let html = Textarea.render(&tag, &RenderContext::new(&config));
        assert!(html.contains(">Dear team,</textarea>"));

        let posted = Submission::new().with("message", r"It\'s me");
        let ctx = RenderContext::new(&config).with_hangover(&posted);
        assert!(Textarea.render(&tag, &ctx).contains(">It&#x27;s me</textarea>"));
    }

    #[test]
    fn minlength_scenario() {
        let tag = "[textarea message minlength:10]";
        assert_eq!(kind(&validate(tag, "short")), Some(InvalidKind::InvalidTooShort));
        assert!(validate(tag, "this is long enough").is_valid());
        assert!(validate(tag, "").is_valid());
    }

    #[test]
    fn required_and_too_long() {
        assert_eq!(
            kind(&validate("[textarea* message]", "")),
            Some(InvalidKind::InvalidRequired)
        );
        assert_eq!(
            kind(&validate("[textarea message maxlength:3 minlength:2]", "abcd")),
            Some(InvalidKind::InvalidTooLong)
        );
        assert!(validate("[textarea message maxlength:4]", "a\r\nbc").is_valid());
    }

    proptest! {
        #[test]
        fn contradictory_bounds_never_invalidate(value in "\\PC{0,40}") {
            let result = validate("[textarea message minlength:10 maxlength:5]", &value);
            prop_assert!(result.is_valid());
        }
    }
}
