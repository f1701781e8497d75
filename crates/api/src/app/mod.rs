//! HTTP API application wiring (axum router + store wiring).
//!
//! - `services.rs`: which store backs the API
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: query-string DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use tillstack_infra::StoreResult;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router over `services`.
pub fn build_app(jwt_secret: String, services: AppServices) -> Router {
    let jwt = Arc::new(tillstack_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

/// Router for a configuration, connecting the configured store first.
pub async fn build_app_from_config(config: &ApiConfig) -> StoreResult<Router> {
    let services = services::build_services(&config.store).await?;
    Ok(build_app(config.jwt_secret.clone(), services))
}
