//! In-memory implementation of TourStore for testing and development

use crate::core::decorators::DEFAULT_DECORATORS;
use crate::core::error::{TourError, TourResult, ValidationError};
use crate::core::query::TourQuery;
use crate::core::store::{DifficultyStats, MonthlyPlan, TourStore};
use crate::core::tour::{Tour, TourPatch};
use async_trait::async_trait;
use chrono::Datelike;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory tour store
///
/// Keeps insertion order as the natural order. Uses RwLock for thread-safe
/// access.
#[derive(Clone, Default)]
pub struct InMemoryTourStore {
    tours: Arc<RwLock<IndexMap<Uuid, Tour>>>,
}

impl InMemoryTourStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with tours
    pub fn with_tours(tours: impl IntoIterator<Item = Tour>) -> Self {
        let map = tours.into_iter().map(|tour| (tour.id, tour)).collect();
        Self {
            tours: Arc::new(RwLock::new(map)),
        }
    }

    fn read(&self) -> TourResult<std::sync::RwLockReadGuard<'_, IndexMap<Uuid, Tour>>> {
        self.tours
            .read()
            .map_err(|e| TourError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> TourResult<std::sync::RwLockWriteGuard<'_, IndexMap<Uuid, Tour>>> {
        self.tours
            .write()
            .map_err(|e| TourError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    /// Id of the first tour matching the query's filter
    fn first_match(tours: &IndexMap<Uuid, Tour>, query: &TourQuery) -> Option<Uuid> {
        tours
            .values()
            .find(|tour| query.filter.matches(tour))
            .map(|tour| tour.id)
    }

    fn visible(tours: &IndexMap<Uuid, Tour>) -> Vec<Tour> {
        TourQuery::find()
            .decorate(DEFAULT_DECORATORS)
            .apply(tours.values())
    }
}

fn duplicate_name(name: &str) -> TourError {
    ValidationError::DuplicateName {
        name: name.to_string(),
    }
    .into()
}

#[async_trait]
impl TourStore for InMemoryTourStore {
    async fn find(&self, query: &TourQuery) -> TourResult<Vec<Tour>> {
        let tours = self.read()?;
        Ok(query.apply(tours.values()))
    }

    async fn find_one(&self, query: &TourQuery) -> TourResult<Option<Tour>> {
        let tours = self.read()?;
        Ok(Self::first_match(&tours, query).and_then(|id| tours.get(&id).cloned()))
    }

    async fn insert(&self, tour: Tour) -> TourResult<Tour> {
        let mut tours = self.write()?;

        if tours.values().any(|existing| existing.name == tour.name) {
            return Err(duplicate_name(&tour.name));
        }

        tours.insert(tour.id, tour.clone());
        Ok(tour)
    }

    async fn find_one_and_update(
        &self,
        query: &TourQuery,
        patch: TourPatch,
    ) -> TourResult<Option<Tour>> {
        let mut tours = self.write()?;

        let Some(id) = Self::first_match(&tours, query) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name
            && tours
                .values()
                .any(|existing| existing.id != id && &existing.name == name)
        {
            return Err(duplicate_name(name));
        }

        let Some(tour) = tours.get_mut(&id) else {
            return Ok(None);
        };
        let merged = patch.merged(tour)?;
        *tour = merged.clone();

        Ok(Some(merged))
    }

    async fn find_one_and_delete(&self, query: &TourQuery) -> TourResult<Option<Tour>> {
        let mut tours = self.write()?;

        Ok(Self::first_match(&tours, query).and_then(|id| tours.shift_remove(&id)))
    }

    async fn stats(&self, min_rating: f64) -> TourResult<Vec<DifficultyStats>> {
        let tours = self.read()?;

        let mut groups: BTreeMap<String, Vec<Tour>> = BTreeMap::new();
        for tour in Self::visible(&tours) {
            if tour.ratings_average >= min_rating {
                groups
                    .entry(tour.difficulty.as_str().to_string())
                    .or_default()
                    .push(tour);
            }
        }

        let mut stats: Vec<DifficultyStats> = groups
            .into_iter()
            .map(|(difficulty, tours)| {
                let count = tours.len() as f64;
                let prices = tours.iter().map(|t| t.price);
                DifficultyStats {
                    difficulty,
                    num_tours: tours.len() as u64,
                    num_ratings: tours.iter().map(|t| u64::from(t.ratings_quantity)).sum(),
                    avg_rating: tours.iter().map(|t| t.ratings_average).sum::<f64>() / count,
                    avg_price: prices.clone().sum::<f64>() / count,
                    min_price: prices.clone().fold(f64::INFINITY, f64::min),
                    max_price: prices.fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();

        stats.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
        Ok(stats)
    }

    async fn monthly_plan(&self, year: i32) -> TourResult<Vec<MonthlyPlan>> {
        let tours = self.read()?;

        let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for tour in Self::visible(&tours) {
            for start in tour.start_dates.iter().filter(|d| d.year() == year) {
                months.entry(start.month()).or_default().push(tour.name.clone());
            }
        }

        let mut plan: Vec<MonthlyPlan> = months
            .into_iter()
            .map(|(month, tours)| MonthlyPlan {
                month,
                num_tour_starts: tours.len() as u64,
                tours,
            })
            .collect();

        plan.sort_by(|a, b| {
            b.num_tour_starts
                .cmp(&a.num_tour_starts)
                .then(a.month.cmp(&b.month))
        });
        Ok(plan)
    }
}
