//! Field value types and typed comparison builders

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::tour::Difficulty;

/// A polymorphic field value read from a stored tour
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Compare two scalar values of the same kind.
    ///
    /// Values of different kinds are incomparable and return `None`.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Ordering used when sorting records.
    ///
    /// Missing values sort before everything else, lists sort by their first
    /// element, and values of different kinds keep their relative order.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self.sort_key(), other.sort_key()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
        }
    }

    fn sort_key(&self) -> Option<&FieldValue> {
        match self {
            FieldValue::Null => None,
            FieldValue::List(items) => items.first().and_then(FieldValue::sort_key),
            other => Some(other),
        }
    }
}

/// Comparison operators a predicate can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl FilterOp {
    /// Parse a query-string operator key (`gte`, `gt`, `lte`, `lt`).
    ///
    /// Only range operators are accepted from clients; `eq` is implied by a
    /// plain value and `ne` is reserved for server-side decorators.
    pub fn from_param(key: &str) -> Option<Self> {
        match key {
            "gte" => Some(FilterOp::Gte),
            "gt" => Some(FilterOp::Gt),
            "lte" => Some(FilterOp::Lte),
            "lt" => Some(FilterOp::Lt),
            _ => None,
        }
    }

    /// The storage-layer operator name (`$gte`, ...)
    pub fn as_operator(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Gte => "$gte",
            FilterOp::Gt => "$gt",
            FilterOp::Lte => "$lte",
            FilterOp::Lt => "$lt",
        }
    }

    /// Evaluate `left <op> right` for scalar values
    pub fn evaluate(&self, left: &FieldValue, right: &FieldValue) -> bool {
        match self {
            FilterOp::Eq => left == right,
            FilterOp::Ne => left != right,
            FilterOp::Gte => matches!(
                left.compare(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Gt => matches!(left.compare(right), Some(Ordering::Greater)),
            FilterOp::Lte => matches!(
                left.compare(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Lt => matches!(left.compare(right), Some(Ordering::Less)),
        }
    }

    /// Evaluate against a stored value with document-store array semantics.
    ///
    /// A list matches when any element matches; `ne` matches only when no
    /// element equals the operand. A missing value only satisfies `ne`.
    pub fn matches(&self, stored: &FieldValue, operand: &FieldValue) -> bool {
        match stored {
            FieldValue::List(items) => match self {
                FilterOp::Ne => items.iter().all(|item| self.evaluate(item, operand)),
                _ => items.iter().any(|item| self.evaluate(item, operand)),
            },
            FieldValue::Null => *self == FilterOp::Ne,
            value => self.evaluate(value, operand),
        }
    }
}

/// How a filterable field coerces raw query-string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
    Difficulty,
    Timestamp,
}

impl FieldKind {
    /// Whether the field accepts the given operator
    pub fn supports(&self, op: FilterOp) -> bool {
        match self {
            FieldKind::Number | FieldKind::Timestamp => true,
            FieldKind::Text | FieldKind::Difficulty => op == FilterOp::Eq,
        }
    }

    /// Coerce a raw query-string value into a typed operand
    pub fn coerce(&self, raw: &str) -> Result<FieldValue, String> {
        let raw = raw.trim();
        match self {
            FieldKind::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| format!("'{}' is not a number", raw)),
            FieldKind::Text => Ok(FieldValue::String(raw.to_string())),
            FieldKind::Difficulty => raw
                .parse::<Difficulty>()
                .map(|d| FieldValue::String(d.as_str().to_string())),
            FieldKind::Timestamp => parse_timestamp(raw)
                .map(FieldValue::DateTime)
                .ok_or_else(|| format!("'{}' is not a valid date", raw)),
        }
    }
}

/// Parse a timestamp.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD,HH:MM`
/// (both read as UTC), and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d,%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
