//! Form controls: each pairs an HTML renderer with a submission check.

mod select;
mod textarea;

pub use select::Select;
pub use textarea::Textarea;

use crate::form_tag::FormTag;
use crate::renderer::RenderContext;
use crate::submission::{Submission, ValidationResult};

/// A control handling one family of tag types (`select`, `select*`).
pub trait FormControl: Send + Sync {
    /// Tag types this control handles, with and without the required marker.
    fn types(&self) -> &'static [&'static str];

    /// HTML for `tag`. Nameless tags render as nothing.
    fn render(&self, tag: &FormTag, ctx: &RenderContext<'_>) -> String;

    /// Record in `result` any rule the submitted value breaks.
    fn validate(&self, result: &mut ValidationResult, tag: &FormTag, submission: &Submission);
}
