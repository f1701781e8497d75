use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tillstack_core::validate::looks_like_email;
use tillstack_core::{DomainResult, TenantId, UserId, Validator, record_id};

use crate::{DocumentTemplate, DocumentTemplateId, FieldKind, render};

record_id!(
    /// Submitted document identifier.
    SubmittedDocumentId
);

/// A document filled in from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocument {
    pub id: SubmittedDocumentId,
    pub company_id: TenantId,
    pub template_id: DocumentTemplateId,
    pub template_name: String,
    pub submitted_by: UserId,
    pub data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// A submitted document with its template body filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    #[serde(flatten)]
    pub document: SubmittedDocument,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitDocument {
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Check `data` against the template's fields.
///
/// Every declared field is required and typed; undeclared keys are dropped.
pub fn validate_submission(
    template: &DocumentTemplate,
    data: &Map<String, Value>,
) -> DomainResult<BTreeMap<String, String>> {
    let mut v = Validator::new();
    let mut out = BTreeMap::new();

    for field in &template.fields {
        let key = format!("data.{}", field.name);
        let value = match data.get(&field.name) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                v.check(false, &key, "is required");
                continue;
            }
            Some(_) => {
                v.check(false, &key, "must be a string");
                continue;
            }
        };

        match field.kind {
            FieldKind::Text => {
                v.required(&key, &value, 255);
            }
            FieldKind::Textarea => {
                v.required(&key, &value, 5000);
            }
            FieldKind::Date => {
                v.check(
                    NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok(),
                    &key,
                    "must be a date (YYYY-MM-DD)",
                );
            }
            FieldKind::Time => {
                v.check(
                    value.len() == 5 && NaiveTime::parse_from_str(&value, "%H:%M").is_ok(),
                    &key,
                    "must be a time (HH:MM)",
                );
            }
            FieldKind::Email => {
                v.check(looks_like_email(&value), &key, "must be a valid email address");
            }
            FieldKind::Other => {}
        }
        out.insert(field.name.clone(), value);
    }

    v.finish()?;
    Ok(out)
}

impl SubmittedDocument {
    pub fn submit(
        template: &DocumentTemplate,
        submitted_by: UserId,
        input: &SubmitDocument,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let data = validate_submission(template, &input.data)?;
        Ok(Self {
            id: SubmittedDocumentId::new(),
            company_id: template.company_id,
            template_id: template.id,
            template_name: template.name.clone(),
            submitted_by,
            data,
            created_at: now,
        })
    }

    /// Fill `template`'s placeholders with this document's values.
    pub fn rendered(self, template: &DocumentTemplate) -> RenderedDocument {
        let content = render(&template.content, &self.data);
        RenderedDocument {
            document: self,
            content,
        }
    }
}
