//! Store wiring shared by every handler.

use std::sync::Arc;

use tracing::info;

use tillstack_infra::{InMemoryPosStore, PosStore, PostgresPosStore, StoreResult};

use crate::config::StoreConfig;

#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn PosStore>,
    pub backend: &'static str,
}

impl AppServices {
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryPosStore::new()),
            backend: "memory",
        }
    }

    pub fn postgres(store: PostgresPosStore) -> Self {
        Self {
            store: Arc::new(store),
            backend: "postgres",
        }
    }
}

/// Build the configured store; Postgres gets its schema applied first.
pub async fn build_services(config: &StoreConfig) -> StoreResult<AppServices> {
    match config {
        StoreConfig::InMemory => {
            info!("using in-memory stores");
            Ok(AppServices::in_memory())
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresPosStore::connect(database_url, *max_connections).await?;
            store.apply_schema().await?;
            info!(max_connections, "using Postgres stores");
            Ok(AppServices::postgres(store))
        }
    }
}
