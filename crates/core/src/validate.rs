//! Field-level input validation.
//!
//! A [`Validator`] collects every failing field instead of stopping at the
//! first one, so a client gets the whole list of problems in one response.

use serde::{Deserialize, Serialize};

use crate::{DomainError, Money};

/// One failing input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered list of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` has at least one error.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Error collector used by input types' `validate()` methods.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(field, message);
        }
        self
    }

    /// Non-blank string of at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(field, "is required");
        } else if value.chars().count() > max {
            self.errors.push(field, format!("must be at most {max} characters"));
        }
        self
    }

    /// Optional string of at most `max` characters.
    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.errors.push(field, format!("must be at most {max} characters"));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !looks_like_email(value) {
            self.errors.push(field, "must be a valid email address");
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, amount: Money) -> &mut Self {
        self.check(!amount.is_negative(), field, "must be zero or greater")
    }

    pub fn positive(&mut self, field: &str, amount: Money) -> &mut Self {
        self.check(amount.is_positive(), field, "must be greater than zero")
    }

    /// Quantities are whole units, at least one.
    pub fn quantity(&mut self, field: &str, quantity: i64) -> &mut Self {
        self.check(quantity >= 1, field, "must be at least 1")
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(&mut self) -> Result<(), DomainError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(core::mem::take(&mut self.errors)))
        }
    }
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Trim an optional string, mapping blank values to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failing_field() {
        let mut v = Validator::new();
        v.required("name", "  ", 255)
            .required("sku", &"x".repeat(256), 255)
            .email("email", "nope")
            .quantity("items.0.quantity", 0);

        let err = v.finish().unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().len(), 4);
        assert!(errors.has("name"));
        assert!(errors.has("sku"));
        assert!(errors.has("email"));
        assert!(errors.has("items.0.quantity"));
    }

    #[test]
    fn passes_when_all_fields_are_valid() {
        let mut v = Validator::new();
        v.required("name", "Coffee", 255)
            .optional("notes", None, 500)
            .email("email", "a@b.co")
            .non_negative("price", Money::from_cents(0));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("ana@shop.com"));
        assert!(!looks_like_email("ana@shop"));
        assert!(!looks_like_email("ana shop@x.com"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("a@b@c.com"));
    }

    #[test]
    fn blank_optional_becomes_none() {
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(Some(" x ".into())), Some("x".into()));
    }

    #[test]
    fn display_joins_fields() {
        let mut e = ValidationErrors::default();
        e.push("a", "bad");
        e.push("b", "worse");
        assert_eq!(e.to_string(), "a: bad; b: worse");
    }
}
