use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Router,
};
use chrono::Utc;

use tillstack_parties::{ClientId, ClientInput, PaymentMethodId, PaymentMethodInput, SupplierId, SupplierInput};

use crate::app::dto::ListParams;
use crate::app::routes::common::{ApiResult, Body, Caller, created, deleted, ok, parse_id};
use crate::app::services::AppServices;

pub fn clients() -> Router {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
}

pub fn suppliers() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_supplier).put(update_supplier).delete(delete_supplier))
}

pub fn payment_methods() -> Router {
    Router::new()
        .route("/", get(list_payment_methods).post(create_payment_method))
        .route(
            "/:id",
            get(get_payment_method)
                .put(update_payment_method)
                .delete(delete_payment_method),
        )
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_clients(caller.tenant_id(), &params.query()).await)
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ClientId = parse_id(&id, "client")?;
    ok(services.store.get_client(caller.tenant_id(), id).await)
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<ClientInput>,
) -> ApiResult {
    caller.require("clients.create")?;
    created(services.store.create_client(caller.tenant_id(), body, Utc::now()).await)
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<ClientInput>,
) -> ApiResult {
    caller.require("clients.edit")?;
    let id: ClientId = parse_id(&id, "client")?;
    ok(services
        .store
        .update_client(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("clients.delete")?;
    let id: ClientId = parse_id(&id, "client")?;
    deleted(services.store.delete_client(caller.tenant_id(), id, Utc::now()).await)
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_suppliers(caller.tenant_id(), &params.query()).await)
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SupplierId = parse_id(&id, "supplier")?;
    ok(services.store.get_supplier(caller.tenant_id(), id).await)
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<SupplierInput>,
) -> ApiResult {
    caller.require("suppliers.create")?;
    created(services.store.create_supplier(caller.tenant_id(), body, Utc::now()).await)
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<SupplierInput>,
) -> ApiResult {
    caller.require("suppliers.edit")?;
    let id: SupplierId = parse_id(&id, "supplier")?;
    ok(services
        .store
        .update_supplier(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("suppliers.delete")?;
    let id: SupplierId = parse_id(&id, "supplier")?;
    deleted(services.store.delete_supplier(caller.tenant_id(), id, Utc::now()).await)
}

pub async fn list_payment_methods(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services
        .store
        .list_payment_methods(caller.tenant_id(), &params.query())
        .await)
}

pub async fn get_payment_method(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PaymentMethodId = parse_id(&id, "payment method")?;
    ok(services.store.get_payment_method(caller.tenant_id(), id).await)
}

pub async fn create_payment_method(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<PaymentMethodInput>,
) -> ApiResult {
    caller.require("payment_methods.create")?;
    created(services
        .store
        .create_payment_method(caller.tenant_id(), body, Utc::now())
        .await)
}

pub async fn update_payment_method(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<PaymentMethodInput>,
) -> ApiResult {
    caller.require("payment_methods.edit")?;
    let id: PaymentMethodId = parse_id(&id, "payment method")?;
    ok(services
        .store
        .update_payment_method(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_payment_method(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("payment_methods.delete")?;
    let id: PaymentMethodId = parse_id(&id, "payment method")?;
    deleted(services
        .store
        .delete_payment_method(caller.tenant_id(), id, Utc::now())
        .await)
}
