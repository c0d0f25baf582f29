//! `[select]` and `[select*]`: drop-down menus.

use std::sync::LazyLock;

use regex::Regex;

use super::FormControl;
use crate::form_tag::FormTag;
use crate::renderer::RenderContext;
use crate::submission::{InvalidKind, Submission, SubmittedValue, ValidationResult};
use crate::types::{Attributes, EscapeHtml, sanitize_html_class};

static DEFAULT_INDICES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^default:([0-9_]+)$").unwrap());

const BLANK_LABEL: &str = "---";

#[derive(Debug, Default, Clone, Copy)]
pub struct Select;

impl Select {
    /// 1-based positions of the preselected values.
    fn default_positions(tag: &FormTag, values: &[String], ctx: &RenderContext<'_>) -> Vec<usize> {
        let mut positions: Vec<usize> = tag
            .get_default_option(ctx)
            .iter()
            .filter_map(|value| values.iter().position(|v| v == value))
            .map(|i| i + 1)
            .collect();

        if let Some(caps) = tag.get_first_match_option(&DEFAULT_INDICES) {
            positions.extend(caps[1].split('_').filter_map(|n| n.parse::<usize>().ok()));
        }

        let mut unique = Vec::with_capacity(positions.len());
        for p in positions {
            if !unique.contains(&p) {
                unique.push(p);
            }
        }
        unique
    }
}

impl FormControl for Select {
    fn types(&self) -> &'static [&'static str] {
        &["select", "select*"]
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

        let mut atts = Attributes::new();
        atts.set("class", tag.get_class_option(&class));
        atts.set_opt("id", tag.get_id_option());
        atts.set_opt("tabindex", tag.get_tabindex_option());
        if tag.is_required() {
            atts.set("aria-required", "true");
        }
        atts.set("aria-invalid", if invalid { "true" } else { "false" });

        let multiple = tag.has_option("multiple");
        let include_blank = tag.has_option("include_blank");
        let first_as_label = tag.has_option("first_as_label");

        let mut values = tag.values.clone();
        let mut labels = tag.labels.clone();
        let data = ctx.data_option(tag);
        values.extend(data.iter().cloned());
        labels.extend(data);

        let defaults = Self::default_positions(tag, &values, ctx);

        let shifted = include_blank || values.is_empty();
        if shifted {
            labels.insert(0, BLANK_LABEL.to_string());
            values.insert(0, String::new());
        } else if first_as_label {
            values[0].clear();
        }

        let hangover = ctx.hangover(name).filter(|v| !v.is_empty());

        let mut options = String::new();
        for (key, value) in values.iter().enumerate() {
            let selected = match hangover {
                Some(posted) if multiple => posted.contains(value),
                Some(posted) => posted.as_text() == value,
                None => {
                    let position = if shifted { key } else { key + 1 };
                    defaults.contains(&position)
                }
            };

            let mut item = Attributes::new();
            item.set("value", value.as_str());
            item.set("selected", if selected { "selected" } else { "" });

            let label = labels.get(key).unwrap_or(value);
            options.push_str(&format!("<option {item}>{}</option>", label.escape_html()));
        }

        if multiple {
            atts.set("multiple", "multiple");
        }
        atts.set("name", if multiple { format!("{name}[]") } else { name.to_string() });

        format!(
            r#"<span class="{prefix}-form-control-wrap {}"><select {atts}>{options}</select>{validation_error}</span>"#,
            sanitize_html_class(name)
        )
    }

    fn validate(&self, result: &mut ValidationResult, tag: &FormTag, submission: &Submission) {
        let Some(name) = &tag.name else {
            return;
        };

        // Empty entries of a multi-select do not count as a choice.
        let empty = submission
            .get(name.as_str())
            .is_none_or(SubmittedValue::is_empty);

        if tag.is_required() && empty {
            result.invalidate(tag, InvalidKind::InvalidRequired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::form_tag::DefaultSource;
    use indexmap::IndexMap;

    fn render(raw: &str, ctx: &RenderContext<'_>) -> String {
        Select.render(&FormTag::parse(raw).unwrap(), ctx)
    }

    fn validate(raw: &str, submission: &Submission) -> ValidationResult {
        let config = Config::new();
        let mut result = ValidationResult::new(&config);
        Select.validate(&mut result, &FormTag::parse(raw).unwrap(), submission);
        result
    }

    #[test]
    fn renders_required_menu() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let html = render(r#"[select* menu-1 "Red" "Blue" "Green"]"#, &ctx);
        assert_eq!(
            html,
            concat!(
                r#"<span class="WELDPRESS-form-control-wrap menu-1">"#,
                r#"<select name="menu-1" class="WELDPRESS-form-control WELDPRESS-select WELDPRESS-validates-as-required" aria-required="true" aria-invalid="false">"#,
                r#"<option value="Red">Red</option><option value="Blue">Blue</option><option value="Green">Green</option>"#,
                r#"</select></span>"#
            )
        );
    }

    #[test]
    fn nameless_renders_nothing() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        assert_eq!(render("[select]", &ctx), "");
    }

    #[test]
    fn blank_first_and_index_defaults() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let html = render(r#"[select menu include_blank default:2 "A" "B"]"#, &ctx);
        assert!(html.contains(r#"<option value="">---</option><option value="A">A</option><option value="B" selected="selected">B</option>"#));

        let empty = render("[select menu]", &ctx);
        assert!(empty.contains(r#"<option value="">---</option></select>"#));
    }

    #[test]
    fn first_as_label_blanks_value() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let html = render(r#"[select menu first_as_label "Pick one" "A"]"#, &ctx);
        assert!(html.contains(r#"<option value="">Pick one</option><option value="A">A</option>"#));
    }

    #[test]
    fn multiple_uses_array_name() {
        let config = Config::new();
        let ctx = RenderContext::new(&config);
        let html = render(r#"[select menu multiple id:m class:wide "A"]"#, &ctx);
        assert!(html.contains(
            r#"<select name="menu[]" class="WELDPRESS-form-control WELDPRESS-select wide" id="m" aria-invalid="false" multiple="multiple">"#
        ));
    }

    #[test]
    fn hangover_wins_over_defaults() {
        let config = Config::new();
        let posted = Submission::new().with("menu", vec!["B", "C"]);
        let ctx = RenderContext::new(&config).with_hangover(&posted);
        let html = render(r#"[select menu multiple default:1 "A" "B" "C"]"#, &ctx);
        assert!(html.contains(r#"<option value="A">A</option>"#));
        assert!(html.contains(r#"<option value="B" selected="selected">B</option>"#));
        assert!(html.contains(r#"<option value="C" selected="selected">C</option>"#));
    }

    struct Query;

    impl DefaultSource for Query {
        fn default_values(&self, source: &str, _field: &str) -> Vec<String> {
            if source == "get" { vec!["Peru".to_string()] } else { Vec::new() }
        }
    }

    #[test]
    fn data_sets_and_value_defaults() {
        let config = Config::new();
        let mut sets = IndexMap::new();
        sets.insert("countries".to_string(), vec!["Chile".to_string(), "Peru".to_string()]);
        let ctx = RenderContext::new(&config).with_data_sets(&sets).with_defaults(&Query);
        let html = render(r#"[select country data:countries default:get "Other"]"#, &ctx);
        assert!(html.contains(
            r#"<option value="Other">Other</option><option value="Chile">Chile</option><option value="Peru" selected="selected">Peru</option>"#
        ));
    }

    #[test]
    fn invalid_field_is_marked() {
        let config = Config::new();
        let tag = FormTag::parse(r#"[select* menu-1 "Red"]"#).unwrap();
        let mut result = ValidationResult::new(&config);
        Select.validate(&mut result, &tag, &Submission::new());

        let ctx = RenderContext::new(&config).with_validation(&result);
        let html = Select.render(&tag, &ctx);
        assert!(html.contains("WELDPRESS-not-valid"));
        assert!(html.contains(r#"aria-invalid="true""#));
        assert!(html.ends_with(
            r#"</select><span role="alert" class="WELDPRESS-not-valid-tip">The field is required.</span></span>"#
        ));
    }

    #[test]
    fn required_menu_scenario() {
        let tag = r#"[select* menu-1 "Red" "Blue" "Green"]"#;
        assert!(validate(tag, &Submission::new().with("menu-1", "Blue")).is_valid());

        let missing = validate(tag, &Submission::new());
        assert_eq!(missing.get("menu-1").unwrap().kind, InvalidKind::InvalidRequired);
    }

    #[test]
    fn empty_choices() {
        let tag = r#"[select* menu multiple "0" "1"]"#;
        assert!(!validate(tag, &Submission::new().with("menu", "")).is_valid());
        assert!(!validate(tag, &Submission::new().with("menu", vec!["", ""])).is_valid());
        assert!(validate(tag, &Submission::new().with("menu", "0")).is_valid());
        assert!(validate(r#"[select menu "A"]"#, &Submission::new()).is_valid());
    }
}
