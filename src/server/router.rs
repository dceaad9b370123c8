//! Router builder utilities for tour routes

use crate::server::handlers::{
    AppState, create_tour, delete_tour, get_tour, health_check, list_tours, monthly_plan,
    top_five_cheap, tour_stats, update_tour,
};
use axum::{Router, routing::get};

/// Prefix shared by every tour route
pub const TOURS_PATH: &str = "/api/v1/tours";

/// Build the tour routes
///
/// - GET    /api/v1/tours                      - List tours (filter, sort, fields, page)
/// - POST   /api/v1/tours                      - Create a tour
/// - GET    /api/v1/tours/top-5-cheap          - Five best-rated cheap tours
/// - GET    /api/v1/tours/tour-stats           - Statistics per difficulty
/// - GET    /api/v1/tours/monthly-plan/{year}  - Tour starts per month
/// - GET    /api/v1/tours/{id}                 - Get a tour
/// - PATCH  /api/v1/tours/{id}                 - Partially update a tour
/// - DELETE /api/v1/tours/{id}                 - Delete a tour
///
/// Static segments win over `{id}`, so `top-5-cheap` and `tour-stats` are
/// never parsed as identifiers.
pub fn build_tour_routes(state: AppState) -> Router {
    Router::new()
        .route(TOURS_PATH, get(list_tours).post(create_tour))
        .route(&format!("{TOURS_PATH}/top-5-cheap"), get(top_five_cheap))
        .route(&format!("{TOURS_PATH}/tour-stats"), get(tour_stats))
        .route(
            &format!("{TOURS_PATH}/monthly-plan/{{year}}"),
            get(monthly_plan),
        )
        .route(
            &format!("{TOURS_PATH}/{{id}}"),
            get(get_tour).patch(update_tour).delete(delete_tour),
        )
        .with_state(state)
}

/// Build health check routes
pub fn build_health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}
