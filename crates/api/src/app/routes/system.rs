use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::routes::common::Caller;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": caller.tenant_id().to_string(),
        "user_id": caller.user_id().to_string(),
        "roles": caller.principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "store": services.backend,
    }))
}
