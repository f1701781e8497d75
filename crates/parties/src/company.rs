use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, TenantId, Validator};

/// The tenant itself. Its id is the tenant id carried by tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: TenantId,
    pub name: String,
    pub nit: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable company profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub nit: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CompanyProfile {
    /// Trim fields and check lengths.
    pub fn validated(self) -> DomainResult<Self> {
        let profile = Self {
            name: self.name.trim().to_string(),
            nit: normalize_optional(self.nit),
            address: normalize_optional(self.address),
            phone: normalize_optional(self.phone),
        };
        Validator::new()
            .required("name", &profile.name, 255)
            .optional("nit", profile.nit.as_deref(), 50)
            .optional("address", profile.address.as_deref(), 255)
            .optional("phone", profile.phone.as_deref(), 50)
            .finish()?;
        Ok(profile)
    }
}

impl Company {
    pub fn create(id: TenantId, profile: CompanyProfile, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: profile.name,
            nit: profile.nit,
            address: profile.address,
            phone: profile.phone,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, profile: CompanyProfile, now: DateTime<Utc>) {
        self.name = profile.name;
        self.nit = profile.nit;
        self.address = profile.address;
        self.phone = profile.phone;
        self.updated_at = now;
    }
}
