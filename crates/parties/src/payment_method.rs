use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::{DomainResult, Search, TenantId, Validator, record_id};

record_id!(
    /// Payment method identifier.
    PaymentMethodId
);

/// How a sale was paid (cash, card, transfer, ...). Names are unique per company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub company_id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodInput {
    pub name: String,
}

impl PaymentMethodInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
        };
        Validator::new().required("name", &input.name, 255).finish()?;
        Ok(input)
    }
}

impl PaymentMethod {
    pub fn create(company_id: TenantId, input: PaymentMethodInput, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentMethodId::new(),
            company_id,
            name: input.name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: PaymentMethodInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.updated_at = now;
    }

    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name)
    }

    /// Uniqueness key: names compare case-insensitively.
    pub fn same_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(
            PaymentMethodInput { name: " Cash ".into() }.validated().unwrap().name,
            "Cash"
        );
        assert!(PaymentMethodInput { name: "".into() }.validated().is_err());
    }

    #[test]
    fn same_name_ignores_case() {
        let pm = PaymentMethod::create(
            TenantId::new(),
            PaymentMethodInput { name: "Card".into() },
            Utc::now(),
        );
        assert!(pm.same_name("CARD"));
        assert!(!pm.same_name("Cash"));
    }
}
