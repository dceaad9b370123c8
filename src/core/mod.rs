//! Core module containing the tour model, query building and storage traits

pub mod decorators;
pub mod error;
pub mod field;
pub mod query;
pub mod store;
pub mod tour;

pub use decorators::{DEFAULT_DECORATORS, QueryDecorator, exclude_secret_tours};
pub use error::{FieldValidationError, TourError, TourResult, ValidationError};
pub use field::{FieldKind, FieldValue, FilterOp};
pub use query::{
    Condition, Filter, PageLimits, Projection, QueryBuilder, QueryParams, SortDirection, SortKey,
    TourQuery,
};
pub use store::{DifficultyStats, MonthlyPlan, TourStore};
pub use tour::{Difficulty, NewTour, Tour, TourPatch};
