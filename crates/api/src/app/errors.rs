use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use tillstack_auth::AuthzError;
use tillstack_core::DomainError;
use tillstack_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Database(msg) => {
            error!(error = %msg, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal storage error",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "message": errors.to_string(),
                "fields": errors.fields(),
            })),
        )
            .into_response(),
        DomainError::InvariantViolation(msg) => {
            warn!(reason = %msg, "business rule rejected request");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(entity) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn forbidden(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (DomainError::field("name", "is required"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("no open cash register"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::not_found("product"), StatusCode::NOT_FOUND),
            (DomainError::conflict("sku is already taken"), StatusCode::CONFLICT),
            (DomainError::invalid_id("ProductId: bad"), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
        assert_eq!(
            store_error_to_response(StoreError::Database("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
