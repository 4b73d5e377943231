//! Bookstore application library
//!
//! Domain modules (books, authors, users) plus the bootstrap that wires them to a
//! document store and the HTTP server.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use bookstore_db::{MemoryStore, MongoConfig, MongoStore, SharedStore};
use bookstore_kernel::{
    settings::{DatabaseBackend, Settings},
    InitCtx, ModuleRegistry,
};

pub mod modules;
pub mod utils;
pub mod validation;

/// Re-export commonly used types
pub use modules::*;

const APP_NAME: &str = "bookstore";

/// Open the configured document store
pub async fn connect_store(settings: &Settings) -> anyhow::Result<SharedStore> {
    let database = &settings.database;
    let store: SharedStore = match database.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        DatabaseBackend::Mongodb => {
            let config = MongoConfig {
                uri: database.uri.clone(),
                database: database.name.clone(),
                app_name: APP_NAME.to_string(),
                connect_timeout: Duration::from_millis(database.connect_timeout_ms),
                max_pool_size: database.max_pool_size,
            };
            let store = MongoStore::connect(&config)
                .await
                .with_context(|| format!("failed to connect to database '{}'", database.name))?;
            Arc::new(store)
        }
    };

    tracing::info!(store = store.kind(), database = %database.name, "document store ready");
    Ok(store)
}

/// Registry holding every bookstore module, bound to `store`
pub fn build_registry(settings: &Settings, store: &SharedStore) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, store)?;
    Ok(registry)
}

/// Fully assembled HTTP application over `store`, modules initialized and indexes in place
pub async fn build_app(settings: &Settings, store: SharedStore) -> anyhow::Result<Router> {
    let registry = build_registry(settings, &store)?;
    let ctx = InitCtx {
        settings,
        store: &store,
    };
    registry.init_all(&ctx).await?;
    registry.ensure_indexes(&store).await?;

    Ok(bookstore_http::build_router(&registry, settings))
}

/// Run the server until a shutdown signal arrives
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "bookstore bootstrap starting"
    );

    let store = connect_store(&settings).await?;
    let registry = build_registry(&settings, &store)?;
    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };

    registry.init_all(&ctx).await?;
    let indexes = registry.ensure_indexes(&store).await?;
    tracing::info!(indexes, "indexes ensured");
    registry.start_all(&ctx).await?;

    let served = bookstore_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}

/// Connect to the store and create every declared index, returning how many
pub async fn ensure_indexes(settings: &Settings) -> anyhow::Result<usize> {
    let store = connect_store(settings).await?;
    let registry = build_registry(settings, &store)?;
    registry.ensure_indexes(&store).await
}
