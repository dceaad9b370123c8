//! Tours API server
//!
//! ```text
//! TOURS_DATABASE_URI=mongodb://localhost:27017 cargo run --features mongodb_backend
//! ```
//!
//! Without a database URI, or without the `mongodb_backend` feature, tours
//! are kept in memory.

use std::sync::Arc;

use anyhow::Result;
use tours::config::AppConfig;
use tours::core::TourStore;
use tours::server::ServerBuilder;
use tours::storage::InMemoryTourStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = open_store(&config).await?;

    ServerBuilder::new()
        .with_shared_store(store)
        .with_config(&config)
        .serve(&config.server.address())
        .await
}

#[cfg(feature = "mongodb_backend")]
async fn open_store(config: &AppConfig) -> Result<Arc<dyn TourStore>> {
    use tours::storage::MongoTourStore;

    let Some(uri) = config.database.uri.as_deref() else {
        tracing::info!("No database URI configured, using in-memory store");
        return Ok(Arc::new(InMemoryTourStore::new()));
    };

    let client = mongodb::Client::with_uri_str(uri).await?;
    let store = MongoTourStore::with_collection(
        client.database(&config.database.name),
        config.database.collection.as_str(),
    );
    store.ensure_indexes().await?;
    tracing::info!(
        database = %config.database.name,
        collection = %config.database.collection,
        "MongoDB connection established"
    );

    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb_backend"))]
async fn open_store(config: &AppConfig) -> Result<Arc<dyn TourStore>> {
    if config.database.uri.is_some() {
        tracing::warn!(
            "A database URI is configured but the mongodb_backend feature is disabled; using in-memory store"
        );
    } else {
        tracing::info!("Using in-memory store");
    }
    Ok(Arc::new(InMemoryTourStore::new()))
}
