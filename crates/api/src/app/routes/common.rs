//! Extractors and response helpers shared by every route module.

use std::str::FromStr;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use tillstack_auth::Permission;
use tillstack_core::{DomainError, TenantId, UserId};
use tillstack_infra::StoreResult;

use crate::app::errors::{self, json_error};
use crate::authz::authorize_action;
use crate::context::{PrincipalContext, TenantContext};

/// Handlers answer with a response either way; `Err` carries the error body.
pub type ApiResult = Result<Response, Response>;

/// Tenant and principal of an authenticated request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub tenant: TenantContext,
    pub principal: PrincipalContext,
}

impl Caller {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant.tenant_id()
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id()
    }

    /// Reject with 403 unless the caller holds `permission`.
    pub fn require(&self, permission: &'static str) -> Result<(), Response> {
        authorize_action(&self.tenant, &self.principal, &Permission::new(permission))
            .map_err(errors::forbidden)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Both are inserted by the auth middleware.
        let tenant = parts.extensions.get::<TenantContext>().copied();
        let principal = parts.extensions.get::<PrincipalContext>().cloned();
        match (tenant, principal) {
            (Some(tenant), Some(principal)) => Ok(Caller { tenant, principal }),
            _ => Err(json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing authentication context",
            )),
        }
    }
}

/// JSON request body whose rejections use the API error format.
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(json_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                rejection.body_text(),
            )),
        }
    }
}

/// Parse a path id, answering 404 for anything that is not an id.
pub fn parse_id<T>(raw: &str, entity: &'static str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|_| errors::domain_error_to_response(DomainError::not_found(entity)))
}

/// Map a domain error raised before reaching the store.
pub fn checked<T>(result: Result<T, DomainError>) -> Result<T, Response> {
    result.map_err(errors::domain_error_to_response)
}

pub fn ok<T: Serialize>(result: StoreResult<T>) -> ApiResult {
    respond(StatusCode::OK, result)
}

pub fn created<T: Serialize>(result: StoreResult<T>) -> ApiResult {
    respond(StatusCode::CREATED, result)
}

pub fn deleted(result: StoreResult<()>) -> ApiResult {
    result
        .map(|()| StatusCode::NO_CONTENT.into_response())
        .map_err(errors::store_error_to_response)
}

fn respond<T: Serialize>(status: StatusCode, result: StoreResult<T>) -> ApiResult {
    result
        .map(|value| (status, Json(value)).into_response())
        .map_err(errors::store_error_to_response)
}

/// `{"data": ...}` wrapper for plain lists.
pub fn list<T: Serialize>(result: StoreResult<Vec<T>>) -> ApiResult {
    ok(result.map(|items| json!({ "data": items })))
}
