//! Storage trait for tours

use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::TourResult;
use crate::core::query::TourQuery;
use crate::core::tour::{Tour, TourPatch};

/// Minimum `ratingsAverage` for a tour to count in [`TourStore::stats`]
pub const STATS_MIN_RATING: f64 = 4.5;

/// Per-difficulty aggregate over visible tours
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: String,
    pub num_tours: u64,
    pub num_ratings: u64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Tour starts within one month of a year
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub month: u32,
    pub num_tour_starts: u64,
    pub tours: Vec<String>,
}

/// Storage backend for tours
///
/// Implementations execute an already-built [`TourQuery`]; they never
/// interpret request parameters themselves. Visibility rules live in the
/// query (see [`crate::core::decorators`]), except for the aggregations,
/// which always leave secret tours out.
#[async_trait]
pub trait TourStore: Send + Sync {
    /// All tours matching the query, sorted, skipped and limited
    async fn find(&self, query: &TourQuery) -> TourResult<Vec<Tour>>;

    /// First tour matching the query's filter
    async fn find_one(&self, query: &TourQuery) -> TourResult<Option<Tour>>;

    /// Insert a new tour. Fails with a validation error if the name is taken.
    async fn insert(&self, tour: Tour) -> TourResult<Tour>;

    /// Apply a patch to the first matching tour and return the updated record
    async fn find_one_and_update(
        &self,
        query: &TourQuery,
        patch: TourPatch,
    ) -> TourResult<Option<Tour>>;

    /// Remove the first matching tour and return it
    async fn find_one_and_delete(&self, query: &TourQuery) -> TourResult<Option<Tour>>;

    /// Per-difficulty statistics over tours rated at least `min_rating`,
    /// ordered by average price
    async fn stats(&self, min_rating: f64) -> TourResult<Vec<DifficultyStats>>;

    /// Tour starts per month of `year`, busiest month first
    async fn monthly_plan(&self, year: i32) -> TourResult<Vec<MonthlyPlan>>;
}
