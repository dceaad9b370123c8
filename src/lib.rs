//! # Tours API
//!
//! A REST backend for a single "tours" resource, with query-string driven
//! filtering, sorting, field projection and pagination over a pluggable
//! document store.
//!
//! ## Features
//!
//! - **Query builder**: `price[gte]=500&sort=-ratingsAverage,price&fields=name,price&page=2&limit=10`
//!   becomes one storage-agnostic [`TourQuery`](core::TourQuery)
//! - **Allow-listed filters**: only known fields and `gte`/`gt`/`lte`/`lt`
//!   operators reach the store
//! - **Query decorators**: secret tours are excluded from every read
//! - **Typed errors**: `NotFound`, `Validation` and `Internal` map to
//!   404, 400 and 500
//! - **Storage backends**: in-memory, and MongoDB behind `mongodb_backend`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tours::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!
//!     ServerBuilder::new()
//!         .with_store(InMemoryTourStore::new())
//!         .with_config(&config)
//!         .serve(&config.server.address())
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        DEFAULT_DECORATORS, Difficulty, DifficultyStats, FieldValidationError, FieldValue,
        Filter, FilterOp, MonthlyPlan, NewTour, PageLimits, Projection, QueryBuilder,
        QueryDecorator, QueryParams, SortDirection, SortKey, Tour, TourError, TourPatch,
        TourQuery, TourResult, TourStore, ValidationError,
    };

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{AppState, Envelope, ServerBuilder};

    // === Storage ===
    pub use crate::storage::InMemoryTourStore;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoTourStore;

    // === External re-exports ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use uuid::Uuid;
}
