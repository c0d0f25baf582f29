//! Type-safe wrappers for validated names and escaped markup.

mod attributes;
mod html_safe;
mod tag_name;

pub use attributes::Attributes;
pub use html_safe::{EscapeHtml, HtmlSafe, sanitize_html_class};
pub use tag_name::TagName;
