//! Shared test harness for tour storage backends
//!
//! Provides request-body builders, a fixed catalogue of tours whose
//! aggregates are known in advance, and the macro suites run against every
//! backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! tour_store_tests!(InMemoryTourStore::new());
//! rest_integration_tests!(InMemoryTourStore::new());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod tour_store_tests;


use serde_json::{Value, json};
use tours::core::{NewTour, Tour, TourStore};

/// Minimal valid creation body
pub fn tour_body(name: &str, price: f64) -> Value {
    json!({
        "name": name,
        "duration": 5,
        "maxGroupSize": 10,
        "difficulty": "easy",
        "price": price,
        "summary": "A short summary",
        "imageCover": "tour-cover.jpg"
    })
}

/// Validate a creation body and build the tour it describes
pub fn new_tour(body: Value) -> Tour {
    Tour::from_new(NewTour::from_json(body).expect("fixture body should be valid"))
}

#[allow(clippy::too_many_arguments)]
fn catalogue_entry(
    name: &str,
    difficulty: &str,
    duration: u32,
    price: f64,
    rating: f64,
    quantity: u32,
    start_dates: &[&str],
    secret: bool,
) -> Tour {
    new_tour(json!({
        "name": name,
        "duration": duration,
        "maxGroupSize": 12,
        "difficulty": difficulty,
        "ratingsAverage": rating,
        "ratingsQuantity": quantity,
        "price": price,
        "summary": format!("{} summary", name),
        "description": "  Trimmed description  ",
        "imageCover": "tour-cover.jpg",
        "images": ["tour-1.jpg", "tour-2.jpg"],
        "startDates": start_dates,
        "secretTour": secret
    }))
}

/// Seven tours, one of them secret.
///
/// | name                | difficulty | duration | price | rating | qty | 2021 starts    |
/// |---------------------|------------|----------|-------|--------|-----|----------------|
/// | The Forest Hiker    | easy       | 5        | 397   | 4.7    | 37  | Apr, Jul, Oct  |
/// | The Sea Explorer    | medium     | 7        | 497   | 4.8    | 23  | Jun, Jul, Aug  |
/// | The Snow Adventurer | difficult  | 4        | 1297  | 4.5    | 13  | none           |
/// | The City Wanderer   | easy       | 9        | 1197  | 4.6    | 54  | Mar, May, Jun  |
/// | The Park Camper     | medium     | 10       | 1497  | 4.9    | 19  | Aug            |
/// | The Wine Taster     | easy       | 5        | 1997  | 4.4    | 30  | Jul            |
/// | The Secret Hideout  | easy       | 3        | 100   | 5.0    | 3   | Jul (secret)   |
pub fn catalogue() -> Vec<Tour> {
    vec![
        catalogue_entry(
            "The Forest Hiker",
            "easy",
            5,
            397.0,
            4.7,
            37,
            &["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z", "2021-10-05T09:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The Sea Explorer",
            "medium",
            7,
            497.0,
            4.8,
            23,
            &["2021-06-19T09:00:00Z", "2021-07-20T09:00:00Z", "2021-08-18T09:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The Snow Adventurer",
            "difficult",
            4,
            1297.0,
            4.5,
            13,
            &["2022-01-05T10:00:00Z", "2022-02-12T10:00:00Z", "2023-01-06T10:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The City Wanderer",
            "easy",
            9,
            1197.0,
            4.6,
            54,
            &["2021-03-11T10:00:00Z", "2021-05-02T10:00:00Z", "2021-06-09T10:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The Park Camper",
            "medium",
            10,
            1497.0,
            4.9,
            19,
            &["2021-08-05T10:00:00Z", "2022-03-20T10:00:00Z", "2022-08-12T10:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The Wine Taster",
            "easy",
            5,
            1997.0,
            4.4,
            30,
            &["2021-07-20T10:00:00Z"],
            false,
        ),
        catalogue_entry(
            "The Secret Hideout",
            "easy",
            3,
            100.0,
            5.0,
            3,
            &["2021-07-01T10:00:00Z"],
            true,
        ),
    ]
}

/// Name of the secret catalogue tour
pub const SECRET_TOUR: &str = "The Secret Hideout";

/// Number of catalogue tours a client can see
pub const VISIBLE_TOURS: usize = 6;

/// Insert the catalogue and return the stored tours in catalogue order
pub async fn seed<S: TourStore + ?Sized>(store: &S) -> Vec<Tour> {
    let mut stored = Vec::new();
    for tour in catalogue() {
        stored.push(store.insert(tour).await.expect("seeding should succeed"));
    }
    stored
}

/// Names from a list of tours
pub fn names(tours: &[Tour]) -> Vec<&str> {
    tours.iter().map(|t| t.name.as_str()).collect()
}

/// Names from a rendered `tours` array
pub fn json_names(tours: &Value) -> Vec<String> {
    tours
        .as_array()
        .expect("tours should be an array")
        .iter()
        .map(|t| t["name"].as_str().expect("name should be a string").to_string())
        .collect()
}
