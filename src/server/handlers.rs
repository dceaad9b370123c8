//! HTTP handlers for the tours resource
//!
//! Handlers translate requests into [`TourQuery`] values, run them once
//! against the shared [`TourStore`] and wrap the rendered records in an
//! [`Envelope`]. Extractor rejections are turned into validation errors so
//! every failure uses the same envelope.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::core::error::{TourError, TourResult, ValidationError};
use crate::core::query::{PageLimits, Projection, QueryBuilder, QueryParams, TourQuery};
use crate::core::store::{STATS_MIN_RATING, TourStore};
use crate::core::tour::{NewTour, Tour, TourPatch};
use crate::server::response::Envelope;

/// Parameters forced by the `top-5-cheap` alias
pub const TOP_FIVE_CHEAP: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,ratingsAverage,summary,difficulty"),
];

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TourStore>,
    pub limits: PageLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn TourStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }
}

fn query_params(query: Result<Query<QueryParams>, QueryRejection>) -> TourResult<QueryParams> {
    query.map(|Query(params)| params).map_err(|rejection| {
        ValidationError::InvalidQuery {
            message: rejection.body_text(),
        }
        .into()
    })
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> TourResult<Value> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ValidationError::InvalidBody {
            message: rejection.body_text(),
        }
        .into()
    })
}

/// Parse the `{id}` path segment.
///
/// A segment that is not a UUID can never name a stored tour, so it is
/// answered with 400 `INVALID_ID` rather than 404.
fn tour_id(raw: String) -> TourResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidId { value: raw }.into())
}

fn render_one(tour: &Tour) -> TourResult<Value> {
    Projection::default().render(tour)
}

/// GET /api/v1/tours
pub async fn list_tours(
    State(state): State<AppState>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> TourResult<Envelope> {
    let params = query_params(query)?;
    find_tours(&state, &params).await
}

/// GET /api/v1/tours/top-5-cheap
///
/// The alias parameters override whatever the client sent for the same
/// keys; other parameters still filter.
pub async fn top_five_cheap(
    State(state): State<AppState>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> TourResult<Envelope> {
    let mut params = query_params(query)?;
    for (key, value) in TOP_FIVE_CHEAP {
        params.set(key, value);
    }
    find_tours(&state, &params).await
}

async fn find_tours(state: &AppState, params: &QueryParams) -> TourResult<Envelope> {
    tracing::debug!(params = ?params.pairs(), "listing tours");

    let query = QueryBuilder::new(TourQuery::find(), params)
        .with_page_limits(state.limits)
        .filter()?
        .sort()
        .limit_fields()?
        .paginate()
        .build();

    let started = Instant::now();
    let tours = state.store.find(&query).await?;
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        results = tours.len(),
        "tour query finished"
    );

    let rendered = tours
        .iter()
        .map(|tour| query.projection.render(tour))
        .collect::<TourResult<Vec<_>>>()?;

    Ok(Envelope::list("tours", rendered))
}

/// GET /api/v1/tours/{id}
pub async fn get_tour(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> TourResult<Envelope> {
    let id = tour_id(raw_id)?;

    let tour = state
        .store
        .find_one(&TourQuery::by_id(id))
        .await?
        .ok_or(TourError::NotFound { id })?;

    Ok(Envelope::ok("tour", render_one(&tour)?))
}

/// POST /api/v1/tours
pub async fn create_tour(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> TourResult<Envelope> {
    let new = NewTour::from_json(json_body(body)?)?;

    let tour = state.store.insert(Tour::from_new(new)).await?;
    tracing::info!(id = %tour.id, slug = %tour.slug, "tour created");

    Ok(Envelope::created("tour", render_one(&tour)?))
}

/// PATCH /api/v1/tours/{id}
pub async fn update_tour(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> TourResult<Envelope> {
    let id = tour_id(raw_id)?;
    let patch = TourPatch::from_json(json_body(body)?)?;

    let tour = state
        .store
        .find_one_and_update(&TourQuery::by_id(id), patch)
        .await?
        .ok_or(TourError::NotFound { id })?;
    tracing::info!(id = %tour.id, revision = tour.revision, "tour updated");

    Ok(Envelope::ok("tour", render_one(&tour)?))
}

/// DELETE /api/v1/tours/{id}
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> TourResult<Response> {
    let id = tour_id(raw_id)?;

    state
        .store
        .find_one_and_delete(&TourQuery::by_id(id))
        .await?
        .ok_or(TourError::NotFound { id })?;
    tracing::info!(%id, "tour deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET /api/v1/tours/tour-stats
pub async fn tour_stats(State(state): State<AppState>) -> TourResult<Envelope> {
    let stats = state.store.stats(STATS_MIN_RATING).await?;
    Ok(Envelope::ok("stats", json!(stats)))
}

/// GET /api/v1/tours/monthly-plan/{year}
pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(raw_year): Path<String>,
) -> TourResult<Envelope> {
    let year = raw_year
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|year| (1..=9998).contains(year))
        .ok_or_else(|| ValidationError::InvalidQuery {
            message: format!("'{}' is not a valid year", raw_year),
        })?;

    let plan = state.store.monthly_plan(year).await?;
    Ok(Envelope::ok("plan", json!(plan)))
}

/// GET /health, /healthz
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tours-api"
    }))
}
