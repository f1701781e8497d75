use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Search, TenantId, Validator, record_id};

record_id!(
    /// Category identifier.
    CategoryId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub company_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// `#RRGGBB`
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
}

impl CategoryInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
            description: normalize_optional(self.description),
            color: self.color.trim().to_string(),
        };
        Validator::new()
            .required("name", &input.name, 255)
            .optional("description", input.description.as_deref(), 1000)
            .check(is_hex_color(&input.color), "color", "must be a #RRGGBB hex color")
            .finish()?;
        Ok(input)
    }
}

impl Category {
    pub fn create(company_id: TenantId, input: CategoryInput, now: DateTime<Utc>) -> Self {
        Self {
            id: CategoryId::new(),
            company_id,
            name: input.name,
            description: input.description,
            color: input.color,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: CategoryInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.description = input.description;
        self.color = input.color;
        self.updated_at = now;
    }

    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name) || search.matches_opt(self.description.as_deref())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;

    #[test]
    fn color_must_be_hex() {
        for ok in ["#00ff00", "#ABCDEF", "#123abc"] {
            assert!(is_hex_color(ok), "{ok}");
        }
        for bad in ["00ff00", "#00ff0", "#00ff00f", "#GGGGGG", "", "#ééé"] {
            assert!(!is_hex_color(bad), "{bad}");
        }
    }

    #[test]
    fn missing_color_and_name_are_both_reported() {
        let err = CategoryInput::default().validated().unwrap_err();
        let DomainError::Validation(e) = err else {
            panic!("expected validation error");
        };
        assert!(e.has("name"));
        assert!(e.has("color"));
    }

    #[test]
    fn search_includes_description() {
        let c = Category::create(
            TenantId::new(),
            CategoryInput {
                name: "Drinks".into(),
                description: Some("Cold beverages".into()),
                color: "#3366ff".into(),
            }
            .validated()
            .unwrap(),
            Utc::now(),
        );
        assert!(c.matches(&Search::parse(Some("bever")).unwrap()));
    }
}
