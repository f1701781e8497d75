use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Search, TenantId, Validator, record_id};

record_id!(
    /// Client identifier.
    ClientId
);

/// A customer the company sells to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub company_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub identification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
}

impl ClientInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: normalize_optional(self.phone),
            address: normalize_optional(self.address),
            identification: normalize_optional(self.identification),
        };
        Validator::new()
            .required("name", &input.name, 255)
            .required("email", &input.email, 255)
            .email("email", &input.email)
            .optional("phone", input.phone.as_deref(), 50)
            .optional("address", input.address.as_deref(), 255)
            .optional("identification", input.identification.as_deref(), 50)
            .finish()?;
        Ok(input)
    }
}

impl Client {
    pub fn create(company_id: TenantId, input: ClientInput, now: DateTime<Utc>) -> Self {
        Self {
            id: ClientId::new(),
            company_id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            identification: input.identification,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: ClientInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.email = input.email;
        self.phone = input.phone;
        self.address = input.address;
        self.identification = input.identification;
        self.updated_at = now;
    }

    /// Free-text match over name, email and identification.
    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name)
            || search.matches(&self.email)
            || search.matches_opt(self.identification.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;

    fn input() -> ClientInput {
        ClientInput {
            name: "Ana Ruiz".into(),
            email: " Ana@Example.COM ".into(),
            identification: Some("CC-1001".into()),
            ..Default::default()
        }
    }

    #[test]
    fn email_is_required_and_normalised() {
        let ok = input().validated().unwrap();
        assert_eq!(ok.email, "ana@example.com");

        let err = ClientInput {
            email: String::new(),
            ..input()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("email")));
    }

    #[test]
    fn rejects_malformed_email_and_long_identification() {
        let err = ClientInput {
            email: "ana-at-example".into(),
            identification: Some("9".repeat(51)),
            ..input()
        }
        .validated()
        .unwrap_err();
        let DomainError::Validation(e) = err else {
            panic!("expected validation error");
        };
        assert!(e.has("email"));
        assert!(e.has("identification"));
    }

    #[test]
    fn search_covers_identification() {
        let c = Client::create(TenantId::new(), input().validated().unwrap(), Utc::now());
        assert!(c.matches(&Search::parse(Some("cc-10")).unwrap()));
        assert!(c.matches(&Search::parse(Some("RUIZ")).unwrap()));
        assert!(!c.matches(&Search::parse(Some("pedro")).unwrap()));
    }

    #[test]
    fn client_serialises_with_plain_uuid_ids() {
        let c = Client::create(TenantId::new(), input().validated().unwrap(), Utc::now());
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["id"], serde_json::Value::String(c.id.to_string()));
    }
}
