use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Search, TenantId, Validator, record_id};

record_id!(
    /// Supplier identifier.
    SupplierId
);

/// A vendor goods are received from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub company_id: TenantId,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub nit: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub nit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SupplierInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
            contact_name: normalize_optional(self.contact_name),
            email: normalize_optional(self.email).map(|e| e.to_lowercase()),
            phone: normalize_optional(self.phone),
            address: normalize_optional(self.address),
            nit: normalize_optional(self.nit),
            notes: normalize_optional(self.notes),
        };
        let mut v = Validator::new();
        v.required("name", &input.name, 255)
            .optional("contact_name", input.contact_name.as_deref(), 255)
            .optional("email", input.email.as_deref(), 255)
            .optional("phone", input.phone.as_deref(), 50)
            .optional("address", input.address.as_deref(), 255)
            .optional("nit", input.nit.as_deref(), 50)
            .optional("notes", input.notes.as_deref(), 2000);
        if let Some(email) = &input.email {
            v.email("email", email);
        }
        v.finish()?;
        Ok(input)
    }
}

impl Supplier {
    pub fn create(company_id: TenantId, input: SupplierInput, now: DateTime<Utc>) -> Self {
        Self {
            id: SupplierId::new(),
            company_id,
            name: input.name,
            contact_name: input.contact_name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            nit: input.nit,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: SupplierInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.contact_name = input.contact_name;
        self.email = input.email;
        self.phone = input.phone;
        self.address = input.address;
        self.nit = input.nit;
        self.notes = input.notes;
        self.updated_at = now;
    }

    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name)
            || search.matches_opt(self.contact_name.as_deref())
            || search.matches_opt(self.email.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;

    #[test]
    fn email_is_optional_but_checked_when_present() {
        let ok = SupplierInput {
            name: "Acme".into(),
            email: Some("  ".into()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(ok.email, None);

        let err = SupplierInput {
            name: "Acme".into(),
            email: Some("sales@acme".into()),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("email")));
    }

    #[test]
    fn notes_are_capped() {
        let err = SupplierInput {
            name: "Acme".into(),
            notes: Some("n".repeat(2001)),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("notes")));
    }

    #[test]
    fn search_matches_contact_name() {
        let s = Supplier::create(
            TenantId::new(),
            SupplierInput {
                name: "Acme".into(),
                contact_name: Some("Luis Pardo".into()),
                ..Default::default()
            }
            .validated()
            .unwrap(),
            Utc::now(),
        );
        assert!(s.matches(&Search::parse(Some("pardo")).unwrap()));
    }
}
