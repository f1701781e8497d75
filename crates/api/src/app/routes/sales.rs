use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Router,
};
use chrono::Utc;

use tillstack_sales::{NewSale, SaleId};

use crate::app::dto::SalesParams;
use crate::app::routes::common::{ApiResult, Body, Caller, checked, created, ok, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale).delete(annul_sale))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<SalesParams>,
) -> ApiResult {
    ok(services
        .store
        .list_sales(caller.tenant_id(), params.filter(), params.page())
        .await)
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SaleId = parse_id(&id, "sale")?;
    ok(services.store.get_sale(caller.tenant_id(), id).await)
}

/// Unit prices sent by the client are ignored; every line is priced from
/// the product row.
pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<NewSale>,
) -> ApiResult {
    caller.require("sales.create")?;
    let draft = checked(body.validated())?;
    created(services
        .store
        .create_sale(caller.tenant_id(), caller.user_id(), draft, Utc::now())
        .await)
}

pub async fn annul_sale(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("sales.annul")?;
    let id: SaleId = parse_id(&id, "sale")?;
    ok(services.store.annul_sale(caller.tenant_id(), id, Utc::now()).await)
}
