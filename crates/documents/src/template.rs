use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Search, TenantId, Validator, record_id};

record_id!(
    /// Document template identifier.
    DocumentTemplateId
);

/// Input type of a template field; decides how submitted values are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Textarea,
    Date,
    Time,
    Email,
    /// Any other declared type: a non-empty string.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub id: DocumentTemplateId,
    pub company_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// Body with `{{ field }}` placeholders.
    pub content: String,
    pub fields: Vec<TemplateField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub fields: Vec<TemplateField>,
}

impl TemplateInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
            description: normalize_optional(self.description),
            content: self.content,
            fields: self
                .fields
                .into_iter()
                .map(|f| TemplateField {
                    name: f.name.trim().to_string(),
                    label: normalize_optional(f.label),
                    kind: f.kind,
                })
                .collect(),
        };

        let mut v = Validator::new();
        v.required("name", &input.name, 255)
            .optional("description", input.description.as_deref(), 1000)
            .check(!input.content.trim().is_empty(), "content", "is required");

        let mut seen = HashSet::new();
        for (i, field) in input.fields.iter().enumerate() {
            let key = format!("fields.{i}.name");
            if field.name.is_empty() {
                v.check(false, &key, "is required");
            } else if !is_field_name(&field.name) {
                v.check(false, &key, "may only contain letters, digits and underscores");
            } else if !seen.insert(field.name.as_str()) {
                v.check(false, &key, "is duplicated");
            }
        }
        v.finish()?;
        Ok(input)
    }
}

fn is_field_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl DocumentTemplate {
    pub fn create(company_id: TenantId, input: TemplateInput, now: DateTime<Utc>) -> Self {
        Self {
            id: DocumentTemplateId::new(),
            company_id,
            name: input.name,
            description: input.description,
            content: input.content,
            fields: input.fields,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: TemplateInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.description = input.description;
        self.content = input.content;
        self.fields = input.fields;
        self.updated_at = now;
    }

    /// Copy under a fresh id, named `"<name> (Copy)"`.
    pub fn duplicate(&self, now: DateTime<Utc>) -> Self {
        Self {
            id: DocumentTemplateId::new(),
            name: format!("{} (Copy)", self.name),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;

    fn field(name: &str, kind: FieldKind) -> TemplateField {
        TemplateField {
            name: name.into(),
            label: None,
            kind,
        }
    }

    #[test]
    fn field_types_deserialise_with_fallback() {
        let fields: Vec<TemplateField> = serde_json::from_str(
            r#"[{"name":"a","type":"date"},{"name":"b"},{"name":"c","type":"signature"}]"#,
        )
        .unwrap();
        assert_eq!(fields[0].kind, FieldKind::Date);
        assert_eq!(fields[1].kind, FieldKind::Text);
        assert_eq!(fields[2].kind, FieldKind::Other);
    }

    #[test]
    fn field_names_must_be_unique_identifiers() {
        let err = TemplateInput {
            name: "Leave request".into(),
            description: None,
            content: "Hello {{ name }}".into(),
            fields: vec![
                field("name", FieldKind::Text),
                field("name", FieldKind::Text),
                field("start date", FieldKind::Date),
                field(" ", FieldKind::Text),
            ],
        }
        .validated()
        .unwrap_err();
        let DomainError::Validation(e) = err else {
            panic!("expected validation error");
        };
        assert!(!e.has("fields.0.name"));
        assert!(e.has("fields.1.name"));
        assert!(e.has("fields.2.name"));
        assert!(e.has("fields.3.name"));
    }

    #[test]
    fn content_is_required() {
        let err = TemplateInput {
            name: "x".into(),
            content: "   ".into(),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("content")));
    }

    #[test]
    fn duplicate_gets_new_id_and_copy_suffix() {
        let t = DocumentTemplate::create(
            TenantId::new(),
            TemplateInput {
                name: "Receipt".into(),
                content: "{{ who }}".into(),
                fields: vec![field("who", FieldKind::Text)],
                ..Default::default()
            },
            Utc::now(),
        );
        let copy = t.duplicate(Utc::now());
        assert_ne!(copy.id, t.id);
        assert_eq!(copy.name, "Receipt (Copy)");
        assert_eq!(copy.fields, t.fields);
        assert_eq!(copy.company_id, t.company_id);
    }
}
