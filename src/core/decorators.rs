//! Query decorators
//!
//! A decorator rewrites a [`TourQuery`] before it reaches storage. Every
//! client-facing read goes through [`DEFAULT_DECORATORS`], either via
//! [`QueryBuilder::new`](crate::core::query::QueryBuilder::new) or
//! [`TourQuery::by_id`].

use crate::core::field::{FieldValue, FilterOp};
use crate::core::query::TourQuery;
use crate::core::tour::SECRET_FIELD;

/// A composable query rewrite
pub type QueryDecorator = fn(TourQuery) -> TourQuery;

/// Decorators applied to every client-facing query
pub const DEFAULT_DECORATORS: &[QueryDecorator] = &[exclude_secret_tours];

/// Hide tours flagged `secretTour`
pub fn exclude_secret_tours(query: TourQuery) -> TourQuery {
    query.and_where(SECRET_FIELD, FilterOp::Ne, FieldValue::Boolean(true))
}
