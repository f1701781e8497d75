//! Store error model and SQLSTATE mapping.

use thiserror::Error;
use tillstack_core::DomainError;

/// Errors returned by store implementations.
///
/// Business failures stay typed as [`DomainError`] so the API can map them to
/// status codes; everything else is an opaque database failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conflict raised when a per-company unique key is already in use.
pub(crate) fn taken(what: &str) -> StoreError {
    StoreError::Domain(DomainError::conflict(format!("{what} has already been taken")))
}

/// A sale, entry or exit line names a product the company does not have.
pub(crate) fn unknown_product() -> StoreError {
    StoreError::Domain(DomainError::field("items", "references an unknown product"))
}

pub(crate) fn already_open() -> StoreError {
    StoreError::Domain(DomainError::conflict("a cash register is already open"))
}

/// Map SQLx errors to `StoreError`.
///
/// | SQLSTATE | meaning | result |
/// |---|---|---|
/// | `23505` | unique violation | `Conflict` (named after the index) |
/// | `23503` | foreign key violation | validation error on the referencing field |
/// | `23514` | check violation | `InvariantViolation` |
/// | other / pool / IO | | `Database` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => match constraint.as_str() {
                    "uq_cash_registers_one_open" => already_open(),
                    "uq_companies_name" => taken("company name"),
                    "uq_products_company_sku" => taken("sku"),
                    "uq_clients_company_email" => taken("email"),
                    "uq_clients_company_identification" => taken("identification"),
                    "uq_payment_methods_company_name" => taken("name"),
                    _ => StoreError::Domain(DomainError::conflict(format!(
                        "duplicate key ({constraint})"
                    ))),
                },
                Some("23503") => StoreError::Domain(DomainError::field(
                    referencing_field(&constraint),
                    "does not exist",
                )),
                Some("23514") => StoreError::Domain(DomainError::invariant(format!(
                    "check constraint violated ({constraint})"
                ))),
                _ => StoreError::Database(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}

/// `fk_products_category_id` -> `category_id`.
fn referencing_field(constraint: &str) -> String {
    constraint
        .strip_prefix("fk_")
        .and_then(|rest| rest.split_once('_'))
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| "id".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referencing_field_strips_table_prefix() {
        assert_eq!(referencing_field("fk_products_category_id"), "category_id");
        assert_eq!(referencing_field("fk_sales_payment_method_id"), "payment_method_id");
        assert_eq!(referencing_field("something_else"), "id");
    }

    #[test]
    fn taken_is_a_conflict() {
        let StoreError::Domain(DomainError::Conflict(msg)) = taken("sku") else {
            panic!("expected conflict");
        };
        assert_eq!(msg, "sku has already been taken");
    }
}
