use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_core::{Page, TenantId, UserId};
use tillstack_documents::{
    DocumentTemplate, DocumentTemplateId, RenderedDocument, SubmitDocument, SubmittedDocument,
    SubmittedDocumentId, TemplateInput,
};

use super::{InMemoryPosStore, Stored, live, live_mut, live_rows};
use crate::{DocumentStore, ListQuery, StoreError, StoreResult};

#[async_trait]
impl DocumentStore for InMemoryPosStore {
    async fn list_templates(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<DocumentTemplate>> {
        self.read(|t| {
            let rows = live_rows(&t.templates, tenant)
                .into_iter()
                .filter(|d| query.accepts(|s| d.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_template(&self, tenant: TenantId, id: DocumentTemplateId) -> StoreResult<DocumentTemplate> {
        self.read(|t| live(&t.templates, tenant, &id, "document template").cloned())
    }

    async fn create_template(
        &self,
        tenant: TenantId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        let input = input.validated()?;
        self.write(|t| {
            let template = DocumentTemplate::create(tenant, input, now);
            t.templates.insert(template.id, Stored::new(template.clone()));
            Ok(template)
        })
    }

    async fn update_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        let input = input.validated()?;
        self.write(|t| {
            let row = live_mut(&mut t.templates, tenant, &id, "document template")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.templates, tenant, &id, "document template")?.deleted_at = Some(now);
            Ok(())
        })
    }

    async fn duplicate_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate> {
        self.write(|t| {
            let copy = live(&t.templates, tenant, &id, "document template")?.duplicate(now);
            t.templates.insert(copy.id, Stored::new(copy.clone()));
            Ok(copy)
        })
    }

    async fn submit_document(
        &self,
        tenant: TenantId,
        actor: UserId,
        template: DocumentTemplateId,
        input: SubmitDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<SubmittedDocument> {
        self.write(|t| {
            let template = live(&t.templates, tenant, &template, "document template")?;
            let document = SubmittedDocument::submit(template, actor, &input, now)?;
            t.documents.insert(document.id, Stored::new(document.clone()));
            Ok(document)
        })
    }

    async fn list_documents(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<SubmittedDocument>> {
        self.read(|t| {
            let rows = live_rows(&t.documents, tenant)
                .into_iter()
                .filter(|d| query.accepts(|s| s.matches(&d.template_name)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_document(&self, tenant: TenantId, id: SubmittedDocumentId) -> StoreResult<RenderedDocument> {
        self.read(|t| {
            let document = live(&t.documents, tenant, &id, "document")?.clone();
            // Documents stay readable after their template is deleted.
            let template = t
                .templates
                .get(&document.template_id)
                .ok_or_else(|| StoreError::Database("document without template".to_string()))?;
            Ok(document.rendered(&template.record))
        })
    }

    async fn delete_document(
        &self,
        tenant: TenantId,
        id: SubmittedDocumentId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.documents, tenant, &id, "document")?.deleted_at = Some(now);
            Ok(())
        })
    }
}
