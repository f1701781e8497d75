use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Router,
};
use chrono::Utc;

use tillstack_inventory::{EntryId, NewEntry, NewProductExit, ProductExitId};

use crate::app::dto::ListParams;
use crate::app::routes::common::{ApiResult, Body, Caller, checked, created, ok, parse_id};
use crate::app::services::AppServices;

pub fn entries() -> Router {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:id", get(get_entry))
}

pub fn exits() -> Router {
    Router::new()
        .route("/", get(list_exits).post(create_exit))
        .route("/:id", get(get_exit))
}

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_entries(caller.tenant_id(), &params.query()).await)
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: EntryId = parse_id(&id, "entry")?;
    ok(services.store.get_entry(caller.tenant_id(), id).await)
}

pub async fn create_entry(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<NewEntry>,
) -> ApiResult {
    caller.require("entries.create")?;
    let draft = checked(body.validated())?;
    created(services
        .store
        .create_entry(caller.tenant_id(), caller.user_id(), draft, Utc::now())
        .await)
}

pub async fn list_exits(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_exits(caller.tenant_id(), &params.query()).await)
}

pub async fn get_exit(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductExitId = parse_id(&id, "product exit")?;
    ok(services.store.get_exit(caller.tenant_id(), id).await)
}

pub async fn create_exit(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<NewProductExit>,
) -> ApiResult {
    caller.require("product_exits.create")?;
    let draft = checked(body.validated())?;
    created(services
        .store
        .create_exit(caller.tenant_id(), caller.user_id(), draft, Utc::now())
        .await)
}
