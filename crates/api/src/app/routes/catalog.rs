use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Router,
};
use chrono::Utc;

use tillstack_products::{CategoryId, CategoryInput, NewProduct, ProductId, ProductUpdate, quick_search_term};

use crate::app::dto::{ListParams, QuickSearchParams};
use crate::app::routes::common::{ApiResult, Body, Caller, checked, created, deleted, list, ok, parse_id};
use crate::app::services::AppServices;

pub fn categories() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
        .route("/:id/products", get(category_products))
}

pub fn products() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(quick_search))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services
        .store
        .list_categories(caller.tenant_id(), &params.query())
        .await)
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = parse_id(&id, "category")?;
    ok(services.store.get_category(caller.tenant_id(), id).await)
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<CategoryInput>,
) -> ApiResult {
    caller.require("categories.create")?;
    created(services
        .store
        .create_category(caller.tenant_id(), body, Utc::now())
        .await)
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<CategoryInput>,
) -> ApiResult {
    caller.require("categories.edit")?;
    let id: CategoryId = parse_id(&id, "category")?;
    ok(services
        .store
        .update_category(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("categories.delete")?;
    let id: CategoryId = parse_id(&id, "category")?;
    deleted(services
        .store
        .delete_category(caller.tenant_id(), id, Utc::now())
        .await)
}

pub async fn category_products(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = parse_id(&id, "category")?;
    list(services.store.category_products(caller.tenant_id(), id).await)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services
        .store
        .list_products(caller.tenant_id(), &params.query())
        .await)
}

pub async fn quick_search(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<QuickSearchParams>,
) -> ApiResult {
    let term = checked(quick_search_term(params.term.as_deref()))?;
    list(services
        .store
        .quick_search_products(caller.tenant_id(), &term)
        .await)
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = parse_id(&id, "product")?;
    ok(services.store.get_product(caller.tenant_id(), id).await)
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<NewProduct>,
) -> ApiResult {
    caller.require("products.create")?;
    created(services
        .store
        .create_product(caller.tenant_id(), body, Utc::now())
        .await)
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<ProductUpdate>,
) -> ApiResult {
    caller.require("products.edit")?;
    let id: ProductId = parse_id(&id, "product")?;
    ok(services
        .store
        .update_product(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("products.delete")?;
    let id: ProductId = parse_id(&id, "product")?;
    deleted(services
        .store
        .delete_product(caller.tenant_id(), id, Utc::now())
        .await)
}
