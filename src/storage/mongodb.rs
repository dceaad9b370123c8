//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides [`MongoTourStore`], a [`TourStore`] backed by a single
//! collection (default `tours`) of a `mongodb::Database`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! tours-api = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Serialization strategy
//!
//! Tours are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON documents. UUIDs are stored as strings and the
//! `id` field is mapped to MongoDB's `_id` convention. Timestamps are
//! stored as fixed-width RFC 3339 strings, so string comparison and
//! sorting follow chronological order.
//!
//! # Query translation
//!
//! A [`TourQuery`] maps onto one `find` call: its predicates become a
//! `$and` of `{field: {$op: value}}` clauses, its sort keys a sort
//! document, and `skip`/`limit` the matching cursor options. Projection is
//! applied when records are rendered, so stored documents always
//! deserialize into full tours.

use crate::core::decorators::DEFAULT_DECORATORS;
use crate::core::error::{TourError, TourResult, ValidationError};
use crate::core::field::{FieldValue, FilterOp};
use crate::core::query::{Filter, SortDirection, SortKey, TourQuery};
use crate::core::store::{DifficultyStats, MonthlyPlan, TourStore};
use crate::core::tour::{REVISION_FIELD, Tour, TourPatch, timestamp};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::IndexModel;

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "tours";

/// MongoDB server error code for unique index violations
const DUPLICATE_KEY: i32 = 11000;

/// Read-check-write rounds before an update gives up on a busy tour
const UPDATE_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> TourResult<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| TourError::internal(format!("Failed to convert JSON to BSON: {}", e)))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(TourError::internal("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id` for domain convention.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

fn tour_to_document(tour: &Tour) -> TourResult<Document> {
    let json = serde_json::to_value(tour)
        .map_err(|e| TourError::internal(format!("Failed to serialize tour: {}", e)))?;
    json_to_document(json)
}

fn document_to_tour(doc: Document) -> TourResult<Tour> {
    serde_json::from_value(document_to_json(doc))
        .map_err(|e| TourError::internal(format!("Failed to deserialize tour from document: {}", e)))
}

/// Stored form of a predicate operand
fn field_value_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::String(s) => Bson::String(s.clone()),
        FieldValue::Number(n) => Bson::Double(*n),
        FieldValue::Boolean(b) => Bson::Boolean(*b),
        FieldValue::DateTime(ts) => Bson::String(timestamp::format(ts)),
        FieldValue::List(items) => Bson::Array(items.iter().map(field_value_bson).collect()),
        FieldValue::Null => Bson::Null,
    }
}

fn storage_field(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

/// Translate a filter into a MongoDB query document
fn filter_document(filter: &Filter) -> Document {
    let mut clauses: Vec<Document> = filter
        .conditions()
        .iter()
        .map(|condition| {
            let mut operand = Document::new();
            operand.insert(
                condition.op.as_operator(),
                field_value_bson(&condition.value),
            );
            let mut clause = Document::new();
            clause.insert(storage_field(&condition.field), operand);
            clause
        })
        .collect();

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    }
}

/// Translate sort keys into a MongoDB sort document
fn sort_document(keys: &[SortKey]) -> Document {
    let mut sort = Document::new();
    for key in keys {
        let direction = match key.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        sort.insert(storage_field(&key.field), direction);
    }
    sort
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn storage_error(operation: &str, err: mongodb::error::Error) -> TourError {
    TourError::internal(format!("Failed to {}: {}", operation, err))
}

/// Read a numeric aggregation output regardless of its BSON width
fn number(doc: &Document, key: &str) -> TourResult<f64> {
    match doc.get(key) {
        Some(Bson::Double(v)) => Ok(*v),
        Some(Bson::Int32(v)) => Ok(f64::from(*v)),
        Some(Bson::Int64(v)) => Ok(*v as f64),
        other => Err(TourError::internal(format!(
            "Expected a number for '{}', got {:?}",
            key, other
        ))),
    }
}

// ---------------------------------------------------------------------------
// MongoTourStore
// ---------------------------------------------------------------------------

/// Tour storage backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use tours::storage::MongoTourStore;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let store = MongoTourStore::new(client.database("natours"));
/// store.ensure_indexes().await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoTourStore {
    database: Database,
    collection_name: String,
}

impl MongoTourStore {
    /// Create a store using the default `tours` collection.
    pub fn new(database: Database) -> Self {
        Self::with_collection(database, DEFAULT_COLLECTION)
    }

    /// Create a store using a custom collection name.
    pub fn with_collection(database: Database, collection: impl Into<String>) -> Self {
        Self {
            database,
            collection_name: collection.into(),
        }
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(&self.collection_name)
    }

    /// Create indexes on the tours collection.
    ///
    /// - `name: 1` unique, enforcing one tour per name
    /// - `price: 1, ratingsAverage: -1` for the common cheap-and-good sort
    ///
    /// Idempotent; called on every startup.
    pub async fn ensure_indexes(&self) -> TourResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "price": 1, "ratingsAverage": -1 })
                .build(),
        ];

        self.collection()
            .create_indexes(indexes)
            .await
            .map_err(|e| storage_error("create indexes on tours collection", e))?;

        Ok(())
    }

    async fn collect(&self, cursor: mongodb::Cursor<Document>) -> TourResult<Vec<Document>> {
        cursor
            .try_collect()
            .await
            .map_err(|e| storage_error("collect documents", e))
    }

    fn duplicate_or(err: mongodb::error::Error, name: &str, operation: &str) -> TourError {
        if is_duplicate_key(&err) {
            ValidationError::DuplicateName {
                name: name.to_string(),
            }
            .into()
        } else {
            storage_error(operation, err)
        }
    }
}

#[async_trait]
impl TourStore for MongoTourStore {
    async fn find(&self, query: &TourQuery) -> TourResult<Vec<Tour>> {
        let collection = self.collection();
        let mut action = collection
            .find(filter_document(&query.filter))
            .skip(query.skip);

        if !query.sort.is_empty() {
            action = action.sort(sort_document(&query.sort));
        }
        if let Some(limit) = query.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let cursor = action.await.map_err(|e| storage_error("find tours", e))?;
        let docs = self.collect(cursor).await?;

        docs.into_iter().map(document_to_tour).collect()
    }

    async fn find_one(&self, query: &TourQuery) -> TourResult<Option<Tour>> {
        let doc = self
            .collection()
            .find_one(filter_document(&query.filter))
            .await
            .map_err(|e| storage_error("find tour", e))?;

        doc.map(document_to_tour).transpose()
    }

    /// Insert the document and read it back to return the stored version.
    async fn insert(&self, tour: Tour) -> TourResult<Tour> {
        let doc = tour_to_document(&tour)?;

        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| Self::duplicate_or(e, &tour.name, "create tour"))?;

        let stored = self
            .collection()
            .find_one(doc! { "_id": tour.id.to_string() })
            .await
            .map_err(|e| storage_error("read back created tour", e))?
            .ok_or_else(|| TourError::internal("Tour not found after insert"))?;

        document_to_tour(stored)
    }

    async fn find_one_and_update(
        &self,
        query: &TourQuery,
        patch: TourPatch,
    ) -> TourResult<Option<Tour>> {
        let changes = json_to_document(
            serde_json::to_value(&patch)
                .map_err(|e| TourError::internal(format!("Failed to serialize patch: {}", e)))?,
        )?;

        let mut update = doc! { "$inc": { REVISION_FIELD: 1 } };
        if !changes.is_empty() {
            update.insert("$set", changes);
        }

        // Read, merge and check, then write only if the revision is unchanged
        for _ in 0..UPDATE_ATTEMPTS {
            let Some(current) = self.find_one(query).await? else {
                return Ok(None);
            };
            patch.merged(&current)?;

            let unchanged = doc! {
                "_id": current.id.to_string(),
                REVISION_FIELD: i64::from(current.revision),
            };
            let filter = doc! { "$and": [filter_document(&query.filter), unchanged] };

            let updated = self
                .collection()
                .find_one_and_update(filter, update.clone())
                .return_document(ReturnDocument::After)
                .await
                .map_err(|e| {
                    Self::duplicate_or(e, patch.name.as_deref().unwrap_or_default(), "update tour")
                })?;

            if let Some(doc) = updated {
                return document_to_tour(doc).map(Some);
            }
            tracing::debug!(id = %current.id, "tour changed during update, retrying");
        }

        Err(TourError::internal("Tour kept changing during update"))
    }

    async fn find_one_and_delete(&self, query: &TourQuery) -> TourResult<Option<Tour>> {
        let deleted = self
            .collection()
            .find_one_and_delete(filter_document(&query.filter))
            .await
            .map_err(|e| storage_error("delete tour", e))?;

        deleted.map(document_to_tour).transpose()
    }

    async fn stats(&self, min_rating: f64) -> TourResult<Vec<DifficultyStats>> {
        let visible = TourQuery::find()
            .decorate(DEFAULT_DECORATORS)
            .and_where("ratingsAverage", FilterOp::Gte, FieldValue::Number(min_rating));

        let pipeline = vec![
            doc! { "$match": filter_document(&visible.filter) },
            doc! {
                "$group": {
                    "_id": "$difficulty",
                    "numTours": { "$sum": 1 },
                    "numRatings": { "$sum": "$ratingsQuantity" },
                    "avgRating": { "$avg": "$ratingsAverage" },
                    "avgPrice": { "$avg": "$price" },
                    "minPrice": { "$min": "$price" },
                    "maxPrice": { "$max": "$price" },
                }
            },
            doc! { "$sort": { "avgPrice": 1 } },
        ];

        let cursor = self
            .collection()
            .aggregate(pipeline)
            .await
            .map_err(|e| storage_error("aggregate tour stats", e))?;

        self.collect(cursor)
            .await?
            .into_iter()
            .map(|doc| {
                Ok(DifficultyStats {
                    difficulty: doc.get_str("_id").unwrap_or_default().to_string(),
                    num_tours: number(&doc, "numTours")? as u64,
                    num_ratings: number(&doc, "numRatings")? as u64,
                    avg_rating: number(&doc, "avgRating")?,
                    avg_price: number(&doc, "avgPrice")?,
                    min_price: number(&doc, "minPrice")?,
                    max_price: number(&doc, "maxPrice")?,
                })
            })
            .collect()
    }

    async fn monthly_plan(&self, year: i32) -> TourResult<Vec<MonthlyPlan>> {
        let bound = |y: i32| {
            Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0)
                .single()
                .map(|ts| timestamp::format(&ts))
                .ok_or_else(|| TourError::internal(format!("Year {} is out of range", y)))
        };
        let (start, end) = (bound(year)?, bound(year + 1)?);

        let visible = TourQuery::find().decorate(DEFAULT_DECORATORS);

        let pipeline = vec![
            doc! { "$match": filter_document(&visible.filter) },
            doc! { "$unwind": "$startDates" },
            doc! { "$match": { "startDates": { "$gte": start, "$lt": end } } },
            doc! {
                "$group": {
                    "_id": { "$month": { "$toDate": "$startDates" } },
                    "numTourStarts": { "$sum": 1 },
                    "tours": { "$push": "$name" },
                }
            },
            doc! { "$sort": { "numTourStarts": -1, "_id": 1 } },
        ];

        let cursor = self
            .collection()
            .aggregate(pipeline)
            .await
            .map_err(|e| storage_error("aggregate monthly plan", e))?;

        self.collect(cursor)
            .await?
            .into_iter()
            .map(|doc| {
                let tours = doc
                    .get_array("tours")
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(|n| n.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(MonthlyPlan {
                    month: number(&doc, "_id")? as u32,
                    num_tour_starts: number(&doc, "numTourStarts")? as u64,
                    tours,
                })
            })
            .collect()
    }
}
