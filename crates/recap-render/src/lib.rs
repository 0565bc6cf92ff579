//! Snapshot to Markdown draft, Markdown to email-safe HTML, HTML into a
//! document template.

pub mod html;
pub mod markdown;
pub mod template;

pub use html::markdown_to_html;
pub use markdown::{render_markdown, Granularity, RenderOptions, UnknownGranularity};
pub use template::{select_template, Template, TemplateError};

/// Full HTML document for a (possibly hand-edited) Markdown draft.
pub fn render_document(markdown: &str, template: &Template) -> String {
    template.apply(&markdown_to_html(markdown))
}
