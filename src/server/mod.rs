//! HTTP server for the tours resource
//!
//! This module provides a `ServerBuilder` that registers:
//! - The `/api/v1/tours` routes backed by a [`TourStore`](crate::core::TourStore)
//! - Health check routes

pub mod builder;
pub mod handlers;
pub mod response;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::AppState;
pub use response::Envelope;
pub use router::{build_health_routes, build_tour_routes};
