//! Documents domain module: company-defined templates with typed fields,
//! documents filled in from them, and placeholder rendering.

pub mod render;
pub mod submission;
pub mod template;

pub use render::{escape_html, render};
pub use submission::{RenderedDocument, SubmitDocument, SubmittedDocument, SubmittedDocumentId, validate_submission};
pub use template::{DocumentTemplate, DocumentTemplateId, FieldKind, TemplateField, TemplateInput};
