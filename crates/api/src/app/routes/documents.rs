use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, post},
    Router,
};
use chrono::Utc;

use tillstack_documents::{DocumentTemplateId, SubmitDocument, SubmittedDocumentId, TemplateInput};

use crate::app::dto::ListParams;
use crate::app::routes::common::{ApiResult, Body, Caller, created, deleted, ok, parse_id};
use crate::app::services::AppServices;

pub fn templates() -> Router {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:id", get(get_template).put(update_template).delete(delete_template))
        .route("/:id/duplicate", post(duplicate_template))
        .route("/:id/documents", post(submit_document))
}

pub fn documents() -> Router {
    Router::new()
        .route("/", get(list_documents))
        .route("/:id", get(get_document).delete(delete_document))
}

pub async fn list_templates(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_templates(caller.tenant_id(), &params.query()).await)
}

pub async fn get_template(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: DocumentTemplateId = parse_id(&id, "document template")?;
    ok(services.store.get_template(caller.tenant_id(), id).await)
}

pub async fn create_template(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Body(body): Body<TemplateInput>,
) -> ApiResult {
    caller.require("document_templates.create")?;
    created(services
        .store
        .create_template(caller.tenant_id(), body, Utc::now())
        .await)
}

pub async fn update_template(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<TemplateInput>,
) -> ApiResult {
    caller.require("document_templates.edit")?;
    let id: DocumentTemplateId = parse_id(&id, "document template")?;
    ok(services
        .store
        .update_template(caller.tenant_id(), id, body, Utc::now())
        .await)
}

pub async fn delete_template(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("document_templates.delete")?;
    let id: DocumentTemplateId = parse_id(&id, "document template")?;
    deleted(services
        .store
        .delete_template(caller.tenant_id(), id, Utc::now())
        .await)
}

pub async fn duplicate_template(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("document_templates.create")?;
    let id: DocumentTemplateId = parse_id(&id, "document template")?;
    created(services
        .store
        .duplicate_template(caller.tenant_id(), id, Utc::now())
        .await)
}

pub async fn submit_document(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
    Body(body): Body<SubmitDocument>,
) -> ApiResult {
    caller.require("documents.submit")?;
    let id: DocumentTemplateId = parse_id(&id, "document template")?;
    created(services
        .store
        .submit_document(caller.tenant_id(), caller.user_id(), id, body, Utc::now())
        .await)
}

pub async fn list_documents(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult {
    ok(services.store.list_documents(caller.tenant_id(), &params.query()).await)
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SubmittedDocumentId = parse_id(&id, "document")?;
    ok(services.store.get_document(caller.tenant_id(), id).await)
}

pub async fn delete_document(
    Extension(services): Extension<Arc<AppServices>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult {
    caller.require("documents.delete")?;
    let id: SubmittedDocumentId = parse_id(&id, "document")?;
    deleted(services
        .store
        .delete_document(caller.tenant_id(), id, Utc::now())
        .await)
}
