use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tracing::{info, instrument};

use tillstack_core::{Page, TenantId, UserId};
use tillstack_documents::{
    DocumentTemplate, DocumentTemplateId, RenderedDocument, SubmitDocument, SubmittedDocument,
    SubmittedDocumentId, TemplateInput,
};

use super::{Listing, PostgresPosStore, found, rows, soft_delete};
use crate::error::map_sqlx_error;
use crate::{DocumentStore, ListQuery, StoreError, StoreResult};

const TEMPLATE_COLUMNS: &str = "id, company_id, name, description, content, fields, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, company_id, template_id, template_name, submitted_by, data, created_at";

const TEMPLATES: Listing = Listing {
    columns: TEMPLATE_COLUMNS,
    from: "FROM document_templates WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2)",
    order: "created_at DESC, id DESC",
};

const DOCUMENTS: Listing = Listing {
    columns: DOCUMENT_COLUMNS,
    from: "FROM submitted_documents WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR template_name ILIKE $2)",
    order: "created_at DESC, id DESC",
};

impl PostgresPosStore {
    async fn insert_template(&self, template: &DocumentTemplate, operation: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO document_templates (
                id, company_id, name, description, content, fields, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(template.id.as_uuid())
        .bind(template.company_id.as_uuid())
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.content)
        .bind(Json(&template.fields))
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresPosStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_templates(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<DocumentTemplate>> {
        TEMPLATES
            .fetch(&self.pool, tenant, query, rows::template, "list_templates")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_template(&self, tenant: TenantId, id: DocumentTemplateId) -> StoreResult<DocumentTemplate> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_template", e))?;
        let row = found(row, "document template")?;
        rows::template(&row).map_err(|e| map_sqlx_error("get_template", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_template(
        &self,
        tenant: TenantId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        let template = DocumentTemplate::create(tenant, input.validated()?, now);
        self.insert_template(&template, "create_template").await?;
        Ok(template)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        let input = input.validated()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE document_templates
            SET name = $3, description = $4, content = $5, fields = $6, updated_at = $7
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.content)
        .bind(Json(&input.fields))
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_template", e))?;
        let row = found(row, "document template")?;
        rows::template(&row).map_err(|e| map_sqlx_error("update_template", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        soft_delete(&self.pool, "document_templates", tenant, id.as_uuid(), now, "document template").await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn duplicate_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        let copy = self.get_template(tenant, id).await?.duplicate(now);
        self.insert_template(&copy, "duplicate_template").await?;
        Ok(copy)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant, template_id = %template), err)]
    async fn submit_document(
        &self,
        tenant: TenantId,
        actor: UserId,
        template: DocumentTemplateId,
        input: SubmitDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<SubmittedDocument> {
        let template = self.get_template(tenant, template).await?;
        let document = SubmittedDocument::submit(&template, actor, &input, now)?;
        sqlx::query(
            r#"
            INSERT INTO submitted_documents (
                id, company_id, template_id, template_name, submitted_by, data, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(document.template_id.as_uuid())
        .bind(&document.template_name)
        .bind(actor.as_uuid())
        .bind(Json(&document.data))
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("submit_document", e))?;

        info!(document_id = %document.id, "document submitted");
        Ok(document)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_documents(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<SubmittedDocument>> {
        DOCUMENTS
            .fetch(&self.pool, tenant, query, rows::document, "list_documents")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_document(&self, tenant: TenantId, id: SubmittedDocumentId) -> StoreResult<RenderedDocument> {
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM submitted_documents \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_document", e))?;
        let row = found(row, "document")?;
        let document = rows::document(&row).map_err(|e| map_sqlx_error("get_document", e))?;

        // Documents stay readable after their template is deleted.
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates WHERE id = $1"
        ))
        .bind(document.template_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_document", e))?;
        let row = row.ok_or_else(|| StoreError::Database("document without template".to_string()))?;
        let template = rows::template(&row).map_err(|e| map_sqlx_error("get_document", e))?;
        Ok(document.rendered(&template))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_document(
        &self,
        tenant: TenantId,
        id: SubmittedDocumentId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        soft_delete(&self.pool, "submitted_documents", tenant, id.as_uuid(), now, "document").await
    }
}
