use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use chrono::Utc;

use tillstack_parties::CompanyProfile;

use crate::app::routes::common::{ApiResult, Body, Caller, ok};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(get_company).put(save_company))
}

pub async fn get_company(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
) -> ApiResult {
    ok(services.store.get_company(caller.tenant_id()).await)
}

pub async fn save_company(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<CompanyProfile>,
) -> ApiResult {
    caller.require("company.edit")?;
    ok(services
        .store
        .save_company(caller.tenant_id(), body, Utc::now())
        .await)
}
