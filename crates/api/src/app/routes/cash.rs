use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, post},
    Router,
};
use chrono::Utc;

use tillstack_cash::{CashRegisterId, CloseRegister, ExpenseId, ExpenseInput, OpenRegister};

use crate::app::dto::{ListParams, RegisterOverview};
use crate::app::errors::store_error_to_response;
use crate::app::routes::common::{ApiResult, Body, Caller, created, deleted, ok, parse_id};
use crate::app::services::AppServices;

pub fn registers() -> Router {
    Router::new()
        .route("/", get(overview).post(open_register))
        .route("/current", get(current_register))
        .route("/:id", get(register_summary))
        .route("/:id/close", post(close_register))
}

pub fn expenses() -> Router {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:id", get(get_expense).put(update_expense).delete(delete_expense))
}

pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let tenant = caller.tenant_id();
    let current = services
        .store
        .current_register(tenant)
        .await
        .map_err(store_error_to_response)?;
    let history = services.store.register_history(tenant, params.page()).await;
    ok(history.map(|history| RegisterOverview { current, history }))
}

pub async fn current_register(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
) -> ApiResult {
    ok(services.store.current_register(caller.tenant_id()).await)
}

pub async fn register_summary(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CashRegisterId = parse_id(&id, "cash register")?;
    ok(services.store.register_summary(caller.tenant_id(), id).await)
}

pub async fn open_register(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<OpenRegister>,
) -> ApiResult {
    caller.require("cash_registers.open")?;
    created(services
        .store
        .open_register(caller.tenant_id(), caller.user_id(), body, Utc::now())
        .await)
}

pub async fn close_register(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<CloseRegister>,
) -> ApiResult {
    caller.require("cash_registers.close")?;
    let id: CashRegisterId = parse_id(&id, "cash register")?;
    ok(services
        .store
        .close_register(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn list_expenses(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_expenses(caller.tenant_id(), &params.query()).await)
}

pub async fn get_expense(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ExpenseId = parse_id(&id, "expense")?;
    ok(services.store.get_expense(caller.tenant_id(), id).await)
}

pub async fn create_expense(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<ExpenseInput>,
) -> ApiResult {
    caller.require("expenses.create")?;
    created(services
        .store
        .create_expense(caller.tenant_id(), caller.user_id(), body, Utc::now())
        .await)
}

pub async fn update_expense(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<ExpenseInput>,
) -> ApiResult {
    caller.require("expenses.edit")?;
    let id: ExpenseId = parse_id(&id, "expense")?;
    ok(services
        .store
        .update_expense(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_expense(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("expenses.delete")?;
    let id: ExpenseId = parse_id(&id, "expense")?;
    deleted(services.store.delete_expense(caller.tenant_id(), id, Utc::now()).await)
}
