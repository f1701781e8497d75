use axum::{routing::get, Router};

pub mod cash;
pub mod catalog;
pub mod common;
pub mod company;
pub mod documents;
pub mod inventory;
pub mod parties;
pub mod sales;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/company", company::router())
        .nest("/categories", catalog::categories())
        .nest("/products", catalog::products())
        .nest("/suppliers", parties::suppliers())
        .nest("/clients", parties::clients())
        .nest("/payment-methods", parties::payment_methods())
        .nest("/entries", inventory::entries())
        .nest("/product-exits", inventory::exits())
        .nest("/cash-registers", cash::registers())
        .nest("/expenses", cash::expenses())
        .nest("/sales", sales::router())
        .nest("/document-templates", documents::templates())
        .nest("/documents", documents::documents())
}
