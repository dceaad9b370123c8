//! The tour entity, its input payloads and validation rules

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{FieldValidationError, TourError, TourResult, ValidationError};
use crate::core::field::{FieldKind, FieldValue};

/// Field holding the secret flag
pub const SECRET_FIELD: &str = "secretTour";

/// Field holding the creation timestamp
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Internal revision counter, hidden by the default projection
pub const REVISION_FIELD: &str = "__v";

/// Virtual field computed from `duration` on read
pub const DURATION_WEEKS_FIELD: &str = "durationWeeks";

/// Fields clients may filter on, with the comparison builder for each
pub const FILTERABLE_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("slug", FieldKind::Text),
    ("summary", FieldKind::Text),
    ("difficulty", FieldKind::Difficulty),
    ("duration", FieldKind::Number),
    ("maxGroupSize", FieldKind::Number),
    ("ratingsAverage", FieldKind::Number),
    ("ratingsQuantity", FieldKind::Number),
    ("price", FieldKind::Number),
    ("priceDiscount", FieldKind::Number),
    ("createdAt", FieldKind::Timestamp),
    ("startDates", FieldKind::Timestamp),
];

/// Look up the comparison builder of a filterable field
pub fn filterable_kind(field: &str) -> Option<FieldKind> {
    FILTERABLE_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

/// How demanding a tour is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            other => Err(format!(
                "'{}' is not a difficulty, expected one of: easy, medium, difficult",
                other
            )),
        }
    }
}

/// A stored tour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: u32,
    pub max_group_size: u32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::list")]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub secret_tour: bool,
    #[serde(rename = "__v", default)]
    pub revision: u32,
}

impl Tour {
    /// Build a tour from a validated creation payload.
    ///
    /// Assigns the id, derives the slug and stamps `createdAt`.
    pub fn from_new(new: NewTour) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&new.name),
            name: new.name,
            duration: new.duration,
            max_group_size: new.max_group_size,
            difficulty: new.difficulty,
            ratings_average: new.ratings_average,
            ratings_quantity: new.ratings_quantity,
            price: new.price,
            price_discount: new.price_discount,
            summary: new.summary,
            description: new.description,
            image_cover: new.image_cover,
            images: new.images,
            created_at: Utc::now().trunc_subsecs(3),
            start_dates: new.start_dates,
            secret_tour: new.secret_tour,
            revision: 0,
        }
    }

    /// `duration / 7`
    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }

    /// Read a field by its API name. Unknown fields read as `Null`.
    pub fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "id" => FieldValue::String(self.id.to_string()),
            "name" => FieldValue::String(self.name.clone()),
            "slug" => FieldValue::String(self.slug.clone()),
            "duration" => FieldValue::Number(f64::from(self.duration)),
            "maxGroupSize" => FieldValue::Number(f64::from(self.max_group_size)),
            "difficulty" => FieldValue::String(self.difficulty.as_str().to_string()),
            "ratingsAverage" => FieldValue::Number(self.ratings_average),
            "ratingsQuantity" => FieldValue::Number(f64::from(self.ratings_quantity)),
            "price" => FieldValue::Number(self.price),
            "priceDiscount" => self
                .price_discount
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            "summary" => FieldValue::String(self.summary.clone()),
            "description" => self
                .description
                .clone()
                .map(FieldValue::String)
                .unwrap_or(FieldValue::Null),
            "imageCover" => FieldValue::String(self.image_cover.clone()),
            "images" => FieldValue::List(
                self.images
                    .iter()
                    .cloned()
                    .map(FieldValue::String)
                    .collect(),
            ),
            "createdAt" => FieldValue::DateTime(self.created_at),
            "startDates" => {
                FieldValue::List(self.start_dates.iter().copied().map(FieldValue::DateTime).collect())
            }
            "secretTour" => FieldValue::Boolean(self.secret_tour),
            "__v" => FieldValue::Number(f64::from(self.revision)),
            _ => FieldValue::Null,
        }
    }
}

/// Payload accepted when creating a tour
///
/// Fields not listed here are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_tour_discount"))]
pub struct NewTour {
    #[validate(length(
        min = 5,
        max = 40,
        message = "A tour name must have between 5 and 40 characters"
    ))]
    pub name: String,

    #[validate(range(min = 1, message = "A tour must last at least one day"))]
    pub duration: u32,

    #[validate(range(min = 1, message = "A tour must have a group size"))]
    pub max_group_size: u32,

    pub difficulty: Difficulty,

    #[serde(default = "default_ratings_average")]
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1.0 and 5.0"))]
    pub ratings_average: f64,

    #[serde(default)]
    pub ratings_quantity: u32,

    #[validate(range(min = 0.0, message = "A tour price cannot be negative"))]
    pub price: f64,

    #[serde(default)]
    pub price_discount: Option<f64>,

    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "A tour must have a cover image"))]
    pub image_cover: String,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default, with = "timestamp::list")]
    pub start_dates: Vec<DateTime<Utc>>,

    #[serde(default)]
    pub secret_tour: bool,
}

fn default_ratings_average() -> f64 {
    4.5
}

impl NewTour {
    /// Parse, trim and validate a creation body
    pub fn from_json(body: serde_json::Value) -> TourResult<Self> {
        let new: NewTour = serde_json::from_value(body)?;
        let new = new.trimmed();
        new.validate()?;
        Ok(new)
    }

    fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.summary = self.summary.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string());
        self
    }
}

fn validate_new_tour_discount(tour: &NewTour) -> Result<(), validator::ValidationError> {
    check_discount(tour.price_discount, Some(tour.price))
}

/// Partial update payload. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_patch_discount"))]
pub struct TourPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 5,
        max = 40,
        message = "A tour name must have between 5 and 40 characters"
    ))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "A tour must last at least one day"))]
    pub duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "A tour must have a group size"))]
    pub max_group_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1.0 and 5.0"))]
    pub ratings_average: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "A tour price cannot be negative"))]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "A tour must have a cover image"))]
    pub image_cover: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(
        default,
        with = "timestamp::option_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_dates: Option<Vec<DateTime<Utc>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_tour: Option<bool>,
}

impl TourPatch {
    /// Parse, trim and validate an update body
    pub fn from_json(body: serde_json::Value) -> TourResult<Self> {
        let patch: TourPatch = serde_json::from_value(body)?;
        let patch = patch.trimmed();
        patch.validate()?;
        Ok(patch)
    }

    fn trimmed(mut self) -> Self {
        self.name = self.name.map(|n| n.trim().to_string());
        self.summary = self.summary.map(|s| s.trim().to_string());
        self.description = self.description.map(|d| d.trim().to_string());
        self
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == TourPatch::default()
    }

    /// Apply the patch in place and bump the revision.
    ///
    /// The slug keeps the value derived at creation.
    pub fn apply_to(&self, tour: &mut Tour) {
        let patch = self.clone();
        if let Some(v) = patch.name {
            tour.name = v;
        }
        if let Some(v) = patch.duration {
            tour.duration = v;
        }
        if let Some(v) = patch.max_group_size {
            tour.max_group_size = v;
        }
        if let Some(v) = patch.difficulty {
            tour.difficulty = v;
        }
        if let Some(v) = patch.ratings_average {
            tour.ratings_average = v;
        }
        if let Some(v) = patch.ratings_quantity {
            tour.ratings_quantity = v;
        }
        if let Some(v) = patch.price {
            tour.price = v;
        }
        if let Some(v) = patch.price_discount {
            tour.price_discount = Some(v);
        }
        if let Some(v) = patch.summary {
            tour.summary = v;
        }
        if let Some(v) = patch.description {
            tour.description = Some(v);
        }
        if let Some(v) = patch.image_cover {
            tour.image_cover = v;
        }
        if let Some(v) = patch.images {
            tour.images = v;
        }
        if let Some(v) = patch.start_dates {
            tour.start_dates = v;
        }
        if let Some(v) = patch.secret_tour {
            tour.secret_tour = v;
        }
        tour.revision += 1;
    }

    /// The tour as it reads after this patch.
    ///
    /// The discount rule is checked against the merged record, so a patch
    /// carrying only `price` or only `priceDiscount` cannot break it.
    pub fn merged(&self, tour: &Tour) -> TourResult<Tour> {
        let mut merged = tour.clone();
        self.apply_to(&mut merged);
        check_discount(merged.price_discount, Some(merged.price)).map_err(discount_error)?;
        Ok(merged)
    }
}

fn discount_error(err: validator::ValidationError) -> TourError {
    TourError::Validation(ValidationError::FieldErrors(vec![FieldValidationError {
        field: err.code.to_string(),
        message: err.message.map(|m| m.to_string()).unwrap_or_default(),
    }]))
}

fn validate_patch_discount(patch: &TourPatch) -> Result<(), validator::ValidationError> {
    check_discount(patch.price_discount, patch.price)
}

/// `priceDiscount` must stay below `price` when both are known
fn check_discount(
    discount: Option<f64>,
    price: Option<f64>,
) -> Result<(), validator::ValidationError> {
    match (discount, price) {
        (Some(discount), Some(price)) if discount >= price => {
            let mut err = validator::ValidationError::new("priceDiscount");
            err.message = Some(Cow::Owned(format!(
                "Discount price ({}) should be below regular price ({})",
                discount, price
            )));
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Lower-case, hyphen-separated form of a name
///
/// `"The Forest Hiker"` → `"the-forest-hiker"`
pub fn slugify(name: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let regex = SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());

    let lowered = name.trim().to_lowercase();
    regex
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Timestamps are written as RFC 3339 with millisecond precision, so
/// their string form orders the same way as the instants themselves.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::core::field::parse_timestamp;

    /// Canonical string form of a timestamp
    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse<E: de::Error>(raw: &str) -> Result<DateTime<Utc>, E> {
        parse_timestamp(raw)
            .map(|ts| ts.trunc_subsecs(3))
            .ok_or_else(|| E::custom(format!("'{}' is not a valid date", raw)))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
    }

    pub mod list {
        use super::*;

        pub fn serialize<S: Serializer>(
            values: &[DateTime<Utc>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(format))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<DateTime<Utc>>, D::Error> {
            let raw = Vec::<String>::deserialize(deserializer)?;
            raw.iter().map(|s| parse(s)).collect()
        }
    }

    pub mod option_list {
        use super::*;

        pub fn serialize<S: Serializer>(
            values: &Option<Vec<DateTime<Utc>>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match values {
                Some(values) => serializer.collect_seq(values.iter().map(format)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<DateTime<Utc>>>, D::Error> {
            let raw = Option::<Vec<String>>::deserialize(deserializer)?;
            raw.map(|values| values.iter().map(|s| parse(s)).collect())
                .transpose()
        }
    }
}
