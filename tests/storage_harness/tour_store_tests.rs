//! Macro-generated test suite for `TourStore` contract validation.
//!
//! The `tour_store_tests!` macro generates a test module that validates any
//! `TourStore` implementation against the full contract: lookups, inserts
//! with unique names, query execution (filter, sort, skip, limit), patching,
//! deletion, secret-tour visibility and both aggregations.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use tours::storage::InMemoryTourStore;
//!
//! tour_store_tests!(InMemoryTourStore::new());
//! ```

/// Generate a full `TourStore` conformance test suite.
///
/// `$factory` must evaluate to an empty store implementing
/// `TourStore + Clone + 'static`. It is re-evaluated for each test.
#[macro_export]
macro_rules! tour_store_tests {
    ($factory:expr) => {
        mod tour_store_contract_tests {
            use super::*;
            use tours::core::{
                QueryBuilder, QueryParams, TourError, TourPatch, TourQuery, TourStore,
                ValidationError,
            };
            use uuid::Uuid;

            fn build(pairs: &[(&str, &str)]) -> TourQuery {
                let params: QueryParams = pairs.iter().copied().collect();
                QueryBuilder::new(TourQuery::find(), &params)
                    .filter()
                    .unwrap()
                    .sort()
                    .limit_fields()
                    .unwrap()
                    .paginate()
                    .build()
            }

            // ==================================================================
            // Insert & lookup
            // ==================================================================

            #[tokio::test]
            async fn test_insert_and_find_one() {
                let store = $factory;
                let tour = new_tour(tour_body("The Forest Hiker", 397.0));
                let id = tour.id;

                let created = store.insert(tour.clone()).await.unwrap();
                assert_eq!(created, tour);
                assert_eq!(created.slug, "the-forest-hiker");

                let found = store.find_one(&TourQuery::by_id(id)).await.unwrap();
                assert_eq!(found, Some(tour));
            }

            #[tokio::test]
            async fn test_find_one_missing_returns_none() {
                let store = $factory;
                seed(&store).await;

                let found = store
                    .find_one(&TourQuery::by_id(Uuid::new_v4()))
                    .await
                    .unwrap();
                assert_eq!(found, None);
            }

            #[tokio::test]
            async fn test_insert_duplicate_name_rejected() {
                let store = $factory;
                store
                    .insert(new_tour(tour_body("The Forest Hiker", 397.0)))
                    .await
                    .unwrap();

                let err = store
                    .insert(new_tour(tour_body("The Forest Hiker", 497.0)))
                    .await
                    .unwrap_err();
                assert!(
                    matches!(
                        err,
                        TourError::Validation(ValidationError::DuplicateName { .. })
                    ),
                    "expected duplicate name error, got {err:?}"
                );
            }

            // ==================================================================
            // Query execution
            // ==================================================================

            #[tokio::test]
            async fn test_find_comparison_filter() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[("price[gte]", "1000"), ("sort", "price")]))
                    .await
                    .unwrap();
                assert_eq!(
                    names(&tours),
                    [
                        "The City Wanderer",
                        "The Snow Adventurer",
                        "The Park Camper",
                        "The Wine Taster"
                    ]
                );
            }

            #[tokio::test]
            async fn test_find_range_filter() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[
                        ("duration[gte]", "5"),
                        ("price[lt]", "1500"),
                        ("sort", "price"),
                    ]))
                    .await
                    .unwrap();
                assert_eq!(
                    names(&tours),
                    [
                        "The Forest Hiker",
                        "The Sea Explorer",
                        "The City Wanderer",
                        "The Park Camper"
                    ]
                );
            }

            #[tokio::test]
            async fn test_find_equality_filter() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[("difficulty", "easy"), ("sort", "price")]))
                    .await
                    .unwrap();
                assert_eq!(
                    names(&tours),
                    ["The Forest Hiker", "The City Wanderer", "The Wine Taster"]
                );
            }

            #[tokio::test]
            async fn test_find_timestamp_filter_on_array() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[("startDates[gte]", "2022-01-01"), ("sort", "price")]))
                    .await
                    .unwrap();
                assert_eq!(names(&tours), ["The Snow Adventurer", "The Park Camper"]);
            }

            #[tokio::test]
            async fn test_find_multi_key_sort() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[("sort", "difficulty,-price")]))
                    .await
                    .unwrap();
                assert_eq!(
                    names(&tours),
                    [
                        "The Snow Adventurer",
                        "The Wine Taster",
                        "The City Wanderer",
                        "The Forest Hiker",
                        "The Park Camper",
                        "The Sea Explorer"
                    ]
                );
            }

            #[tokio::test]
            async fn test_find_defaults_to_newest_first() {
                use chrono::{TimeZone, Utc};

                let store = $factory;
                let created = [
                    ("The Forest Hiker", Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap()),
                    ("The Sea Explorer", Utc.with_ymd_and_hms(2023, 3, 1, 9, 0, 0).unwrap()),
                    ("The Park Camper", Utc.with_ymd_and_hms(2022, 3, 1, 9, 0, 0).unwrap()),
                ];
                for (name, created_at) in created {
                    let mut tour = new_tour(tour_body(name, 497.0));
                    tour.created_at = created_at;
                    store.insert(tour).await.unwrap();
                }

                let tours = store.find(&build(&[])).await.unwrap();
                assert_eq!(
                    names(&tours),
                    ["The Sea Explorer", "The Park Camper", "The Forest Hiker"]
                );
            }

            #[tokio::test]
            async fn test_find_paginates() {
                let store = $factory;
                seed(&store).await;

                let tours = store
                    .find(&build(&[("sort", "price"), ("page", "2"), ("limit", "2")]))
                    .await
                    .unwrap();
                assert_eq!(names(&tours), ["The City Wanderer", "The Snow Adventurer"]);

                let past_end = store
                    .find(&build(&[("page", "9"), ("limit", "2")]))
                    .await
                    .unwrap();
                assert!(past_end.is_empty());
            }

            #[tokio::test]
            async fn test_find_excludes_secret_tours() {
                let store = $factory;
                seed(&store).await;

                let tours = store.find(&build(&[])).await.unwrap();
                assert_eq!(tours.len(), VISIBLE_TOURS);
                assert!(tours.iter().all(|t| t.name != SECRET_TOUR));

                // The undecorated query still reaches it
                let all = store.find(&TourQuery::find()).await.unwrap();
                assert_eq!(all.len(), VISIBLE_TOURS + 1);
            }

            #[tokio::test]
            async fn test_by_id_hides_secret_tour() {
                let store = $factory;
                let stored = seed(&store).await;
                let secret = stored.iter().find(|t| t.secret_tour).unwrap();

                let found = store.find_one(&TourQuery::by_id(secret.id)).await.unwrap();
                assert_eq!(found, None);
            }

            // ==================================================================
            // Update
            // ==================================================================

            #[tokio::test]
            async fn test_update_applies_patch() {
                let store = $factory;
                let stored = seed(&store).await;
                let target = &stored[0];

                let patch = TourPatch::from_json(serde_json::json!({
                    "name": "The Forest Walker",
                    "price": 450,
                    "priceDiscount": 50
                }))
                .unwrap();

                let updated = store
                    .find_one_and_update(&TourQuery::by_id(target.id), patch)
                    .await
                    .unwrap()
                    .expect("tour should be updated");

                assert_eq!(updated.id, target.id);
                assert_eq!(updated.name, "The Forest Walker");
                assert_eq!(updated.price, 450.0);
                assert_eq!(updated.price_discount, Some(50.0));
                assert_eq!(updated.revision, target.revision + 1);
                // Slug keeps the value derived at creation
                assert_eq!(updated.slug, "the-forest-hiker");
                assert_eq!(updated.duration, target.duration);

                let reloaded = store
                    .find_one(&TourQuery::by_id(target.id))
                    .await
                    .unwrap();
                assert_eq!(reloaded, Some(updated));
            }

            #[tokio::test]
            async fn test_update_missing_returns_none() {
                let store = $factory;
                seed(&store).await;

                let patch = TourPatch {
                    price: Some(10.0),
                    ..TourPatch::default()
                };
                let result = store
                    .find_one_and_update(&TourQuery::by_id(Uuid::new_v4()), patch)
                    .await
                    .unwrap();
                assert_eq!(result, None);
            }

            #[tokio::test]
            async fn test_update_secret_tour_returns_none() {
                let store = $factory;
                let stored = seed(&store).await;
                let secret = stored.iter().find(|t| t.secret_tour).unwrap();

                let patch = TourPatch {
                    price: Some(10.0),
                    ..TourPatch::default()
                };
                let result = store
                    .find_one_and_update(&TourQuery::by_id(secret.id), patch)
                    .await
                    .unwrap();
                assert_eq!(result, None);
            }

            #[tokio::test]
            async fn test_update_duplicate_name_rejected() {
                let store = $factory;
                let stored = seed(&store).await;

                let patch = TourPatch {
                    name: Some(stored[1].name.clone()),
                    ..TourPatch::default()
                };
                let err = store
                    .find_one_and_update(&TourQuery::by_id(stored[0].id), patch)
                    .await
                    .unwrap_err();
                assert!(
                    matches!(
                        err,
                        TourError::Validation(ValidationError::DuplicateName { .. })
                    ),
                    "expected duplicate name error, got {err:?}"
                );
            }

            #[tokio::test]
            async fn test_update_discount_checked_against_stored_price() {
                let store = $factory;
                let stored = seed(&store).await;
                let target = &stored[0];
                assert_eq!(target.price, 397.0);

                let patch = TourPatch::from_json(serde_json::json!({ "priceDiscount": 5000 }))
                    .unwrap();
                let err = store
                    .find_one_and_update(&TourQuery::by_id(target.id), patch)
                    .await
                    .unwrap_err();
                assert!(
                    matches!(
                        err,
                        TourError::Validation(ValidationError::FieldErrors(ref errors))
                            if errors[0].field == "priceDiscount"
                    ),
                    "expected priceDiscount error, got {err:?}"
                );

                let reloaded = store
                    .find_one(&TourQuery::by_id(target.id))
                    .await
                    .unwrap();
                assert_eq!(reloaded.as_ref(), Some(target));
            }

            #[tokio::test]
            async fn test_update_price_checked_against_stored_discount() {
                let store = $factory;
                let stored = seed(&store).await;
                let target = &stored[0];

                let discount = TourPatch::from_json(serde_json::json!({ "priceDiscount": 50 }))
                    .unwrap();
                let discounted = store
                    .find_one_and_update(&TourQuery::by_id(target.id), discount)
                    .await
                    .unwrap()
                    .expect("tour should be updated");
                assert_eq!(discounted.price_discount, Some(50.0));

                let price = TourPatch::from_json(serde_json::json!({ "price": 10 })).unwrap();
                let err = store
                    .find_one_and_update(&TourQuery::by_id(target.id), price)
                    .await
                    .unwrap_err();
                assert!(matches!(err, TourError::Validation(_)), "got {err:?}");

                let reloaded = store
                    .find_one(&TourQuery::by_id(target.id))
                    .await
                    .unwrap();
                assert_eq!(reloaded, Some(discounted));
            }

            // ==================================================================
            // Delete
            // ==================================================================

            #[tokio::test]
            async fn test_delete_returns_removed_tour() {
                let store = $factory;
                let stored = seed(&store).await;
                let target = &stored[1];

                let deleted = store
                    .find_one_and_delete(&TourQuery::by_id(target.id))
                    .await
                    .unwrap();
                assert_eq!(deleted.as_ref().map(|t| t.id), Some(target.id));

                let found = store.find_one(&TourQuery::by_id(target.id)).await.unwrap();
                assert_eq!(found, None);
                assert_eq!(
                    store.find(&build(&[])).await.unwrap().len(),
                    VISIBLE_TOURS - 1
                );
            }

            #[tokio::test]
            async fn test_delete_missing_returns_none() {
                let store = $factory;
                seed(&store).await;

                let deleted = store
                    .find_one_and_delete(&TourQuery::by_id(Uuid::new_v4()))
                    .await
                    .unwrap();
                assert_eq!(deleted, None);
                assert_eq!(store.find(&build(&[])).await.unwrap().len(), VISIBLE_TOURS);
            }

            // ==================================================================
            // Aggregations
            // ==================================================================

            #[tokio::test]
            async fn test_stats_groups_by_difficulty() {
                let store = $factory;
                seed(&store).await;

                let stats = store
                    .stats(tours::core::store::STATS_MIN_RATING)
                    .await
                    .unwrap();

                let difficulties: Vec<&str> =
                    stats.iter().map(|s| s.difficulty.as_str()).collect();
                assert_eq!(difficulties, ["easy", "medium", "difficult"]);

                // Wine Taster is rated below the threshold, the secret tour is hidden
                let easy = &stats[0];
                assert_eq!(easy.num_tours, 2);
                assert_eq!(easy.num_ratings, 91);
                assert!((easy.avg_rating - 4.65).abs() < 1e-9);
                assert!((easy.avg_price - 797.0).abs() < 1e-9);
                assert_eq!(easy.min_price, 397.0);
                assert_eq!(easy.max_price, 1197.0);

                let medium = &stats[1];
                assert_eq!(medium.num_tours, 2);
                assert_eq!(medium.num_ratings, 42);
                assert!((medium.avg_price - 997.0).abs() < 1e-9);

                let difficult = &stats[2];
                assert_eq!(difficult.num_tours, 1);
                assert_eq!(difficult.min_price, 1297.0);
                assert_eq!(difficult.max_price, 1297.0);
            }

            #[tokio::test]
            async fn test_stats_empty_store() {
                let store = $factory;
                let stats = store.stats(4.5).await.unwrap();
                assert!(stats.is_empty());
            }

            #[tokio::test]
            async fn test_monthly_plan_busiest_month_first() {
                let store = $factory;
                seed(&store).await;

                let plan = store.monthly_plan(2021).await.unwrap();

                let months: Vec<(u32, u64)> =
                    plan.iter().map(|m| (m.month, m.num_tour_starts)).collect();
                assert_eq!(
                    months,
                    [(7, 3), (6, 2), (8, 2), (3, 1), (4, 1), (5, 1), (10, 1)]
                );

                let mut july = plan[0].tours.clone();
                july.sort();
                assert_eq!(
                    july,
                    ["The Forest Hiker", "The Sea Explorer", "The Wine Taster"]
                );
            }

            #[tokio::test]
            async fn test_monthly_plan_year_without_starts() {
                let store = $factory;
                seed(&store).await;

                let plan = store.monthly_plan(2030).await.unwrap();
                assert!(plan.is_empty());
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_inserts() {
                let store = $factory;

                let handles: Vec<_> = (0..10)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store
                                .insert(new_tour(tour_body(&format!("Concurrent Tour {i}"), 100.0)))
                                .await
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.await.unwrap().unwrap();
                }

                let all = store.find(&TourQuery::find()).await.unwrap();
                assert_eq!(all.len(), 10);
            }
        }
    };
}
