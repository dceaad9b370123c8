//! Query parameters, the storage-agnostic tour query and its builder
//!
//! A request's query string is turned into a [`TourQuery`] by running the
//! [`QueryBuilder`] stages in order:
//!
//! ```rust,ignore
//! let query = QueryBuilder::new(TourQuery::find(), &params)
//!     .with_page_limits(limits)
//!     .filter()?
//!     .sort()
//!     .limit_fields()?
//!     .paginate()
//!     .build();
//!
//! // GET /api/v1/tours?duration[gte]=5&difficulty=easy&sort=-price&fields=name,price&page=2&limit=10
//! ```
//!
//! Building is pure; the query is executed once against a
//! [`TourStore`](crate::core::store::TourStore).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::core::decorators::{DEFAULT_DECORATORS, QueryDecorator};
use crate::core::error::{TourResult, ValidationError};
use crate::core::field::{FieldValue, FilterOp};
use crate::core::tour::{
    CREATED_AT_FIELD, DURATION_WEEKS_FIELD, REVISION_FIELD, SECRET_FIELD, Tour, filterable_kind,
};

/// Keys that shape the result instead of filtering it
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Default page size when `limit` is absent or invalid
pub const DEFAULT_LIMIT: u64 = 100;

/// Hard cap on `limit`
pub const MAX_LIMIT: u64 = 100;

// =============================================================================
// Query parameters
// =============================================================================

/// Errors raised while structuring query-string keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParamsError {
    #[error("malformed query key '{0}'")]
    MalformedKey(String),

    #[error("query key '{0}' nests deeper than one level")]
    TooDeep(String),

    #[error("'{0}' is given both as a plain value and with operators")]
    Conflicting(String),
}

/// A structured query-string value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// `difficulty=easy`
    Plain(String),
    /// `price[gte]=500&price[lt]=1000`
    Nested(IndexMap<String, String>),
}

/// Raw query-string pairs in request order
///
/// Deserializes directly from a URL-encoded query through axum's `Query`
/// extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl QueryParams {
    /// Last plain value given for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every occurrence of `key` with a single value
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.push((key.to_string(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Group bracketed keys into nested mappings.
    ///
    /// `price[gte]=500` becomes `price → {gte: "500"}`. A repeated key keeps
    /// its last value.
    pub fn structured(&self) -> Result<IndexMap<String, ParamValue>, QueryParamsError> {
        let mut out: IndexMap<String, ParamValue> = IndexMap::new();

        for (key, value) in &self.pairs {
            let (field, op) = split_key(key)?;
            match op {
                None => match out.get(field) {
                    Some(ParamValue::Nested(_)) => {
                        return Err(QueryParamsError::Conflicting(field.to_string()));
                    }
                    _ => {
                        out.insert(field.to_string(), ParamValue::Plain(value.clone()));
                    }
                },
                Some(op) => {
                    let entry = out
                        .entry(field.to_string())
                        .or_insert_with(|| ParamValue::Nested(IndexMap::new()));
                    match entry {
                        ParamValue::Nested(ops) => {
                            ops.insert(op.to_string(), value.clone());
                        }
                        ParamValue::Plain(_) => {
                            return Err(QueryParamsError::Conflicting(field.to_string()));
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

/// `price` → (`price`, None), `price[gte]` → (`price`, Some(`gte`))
fn split_key(key: &str) -> Result<(&str, Option<&str>), QueryParamsError> {
    let malformed = || QueryParamsError::MalformedKey(key.to_string());

    let Some(open) = key.find('[') else {
        if key.is_empty() || key.contains(']') {
            return Err(malformed());
        }
        return Ok((key, None));
    };

    let field = &key[..open];
    let rest = &key[open + 1..];
    let close = rest.find(']').ok_or_else(malformed)?;
    let op = &rest[..close];
    let tail = &rest[close + 1..];

    if field.is_empty() || op.is_empty() || op.contains('[') {
        return Err(malformed());
    }
    if tail.starts_with('[') {
        return Err(QueryParamsError::TooDeep(key.to_string()));
    }
    if !tail.is_empty() {
        return Err(malformed());
    }

    Ok((field, Some(op)))
}

// =============================================================================
// Tour query
// =============================================================================

/// One predicate: `field <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluate against an in-memory tour
    pub fn matches(&self, tour: &Tour) -> bool {
        self.op.matches(&tour.field_value(&self.field), &self.value)
    }
}

/// Conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn push(&mut self, condition: Condition) {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
    }

    pub fn contains(&self, condition: &Condition) -> bool {
        self.conditions.contains(condition)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a tour satisfies every predicate
    pub fn matches(&self, tour: &Tour) -> bool {
        self.conditions.iter().all(|c| c.matches(tour))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A sort criterion; earlier keys take precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `price` → ascending, `-price` → descending
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, direction) = match raw.strip_prefix('-') {
            Some(field) => (field.trim(), SortDirection::Desc),
            None => (raw, SortDirection::Asc),
        };
        is_field_name(field).then(|| Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Which fields of a record are returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only these fields (plus the id)
    Include(Vec<String>),
    /// Everything except these fields
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Exclude(vec![REVISION_FIELD.to_string()])
    }
}

impl Projection {
    /// Render a tour as the client sees it.
    ///
    /// `secretTour` is never emitted, `createdAt` only when explicitly
    /// included, and `durationWeeks` accompanies `duration`.
    pub fn render(&self, tour: &Tour) -> TourResult<Value> {
        let Value::Object(mut full) = serde_json::to_value(tour)? else {
            return Err(crate::core::error::TourError::internal(
                "tour did not serialize to an object",
            ));
        };
        full.remove(SECRET_FIELD);
        full.insert(
            DURATION_WEEKS_FIELD.to_string(),
            serde_json::json!(tour.duration_weeks()),
        );

        let mut out = match self {
            Projection::Include(fields) => {
                let mut out = Map::new();
                if let Some(id) = full.remove("id") {
                    out.insert("id".to_string(), id);
                }
                for field in fields {
                    if let Some(value) = full.remove(field) {
                        out.insert(field.clone(), value);
                    }
                }
                out
            }
            Projection::Exclude(fields) => {
                full.remove(CREATED_AT_FIELD);
                for field in fields {
                    full.remove(field);
                }
                full
            }
        };

        if !out.contains_key("duration") {
            out.remove(DURATION_WEEKS_FIELD);
        } else if !out.contains_key(DURATION_WEEKS_FIELD) {
            out.insert(
                DURATION_WEEKS_FIELD.to_string(),
                serde_json::json!(tour.duration_weeks()),
            );
        }

        Ok(Value::Object(out))
    }
}

/// A fully specified read query, independent of any storage backend
#[derive(Debug, Clone, PartialEq)]
pub struct TourQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Default for TourQuery {
    fn default() -> Self {
        Self::find()
    }
}

impl TourQuery {
    /// Match every tour, natural order, default projection.
    ///
    /// No decorators are applied; use [`QueryBuilder::new`] or
    /// [`TourQuery::by_id`] for client-facing reads.
    pub fn find() -> Self {
        Self {
            filter: Filter::default(),
            sort: Vec::new(),
            projection: Projection::default(),
            skip: 0,
            limit: None,
        }
    }

    /// Lookup by identifier, with the default decorators applied
    pub fn by_id(id: Uuid) -> Self {
        Self::find()
            .and_where("id", FilterOp::Eq, FieldValue::String(id.to_string()))
            .decorate(DEFAULT_DECORATORS)
    }

    /// Add a predicate
    pub fn and_where(mut self, field: impl Into<String>, op: FilterOp, value: FieldValue) -> Self {
        self.filter.push(Condition::new(field, op, value));
        self
    }

    /// Run the query through each decorator in order
    pub fn decorate(self, decorators: &[QueryDecorator]) -> Self {
        decorators.iter().fold(self, |query, decorate| decorate(query))
    }

    /// Evaluate the query against an in-memory collection.
    ///
    /// Applies filter, stable multi-key sort, skip and limit.
    pub fn apply<'a, I>(&self, tours: I) -> Vec<Tour>
    where
        I: IntoIterator<Item = &'a Tour>,
    {
        let mut matched: Vec<&Tour> = tours
            .into_iter()
            .filter(|tour| self.filter.matches(tour))
            .collect();

        if !self.sort.is_empty() {
            matched.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|key| {
                        let ord = a
                            .field_value(&key.field)
                            .sort_cmp(&b.field_value(&key.field));
                        match key.direction {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        matched.into_iter().skip(skip).take(limit).cloned().collect()
    }
}

// =============================================================================
// Query builder
// =============================================================================

/// Page-size settings applied by [`QueryBuilder::paginate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Narrows a [`TourQuery`] from request parameters, one stage at a time
#[derive(Debug, Clone)]
pub struct QueryBuilder<'p> {
    query: TourQuery,
    params: &'p QueryParams,
    limits: PageLimits,
}

impl<'p> QueryBuilder<'p> {
    /// Start from `query`, with the default decorators applied
    pub fn new(query: TourQuery, params: &'p QueryParams) -> Self {
        Self {
            query: query.decorate(DEFAULT_DECORATORS),
            params,
            limits: PageLimits::default(),
        }
    }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Turn non-reserved parameters into predicates.
    ///
    /// Plain values become equality predicates; nested `gte`/`gt`/`lte`/`lt`
    /// keys become the matching comparison. Fields outside the allow-list,
    /// other operators, and values the field cannot coerce are rejected.
    pub fn filter(mut self) -> TourResult<Self> {
        let mut structured = self.params.structured()?;
        structured.retain(|key, _| !RESERVED_PARAMS.contains(&key.as_str()));

        for (field, value) in structured {
            let kind = filterable_kind(&field).ok_or_else(|| invalid_query(format!(
                "'{}' is not a filterable field",
                field
            )))?;

            let predicates: Vec<(FilterOp, String)> = match value {
                ParamValue::Plain(raw) => vec![(FilterOp::Eq, raw)],
                ParamValue::Nested(ops) => ops
                    .into_iter()
                    .map(|(op, raw)| {
                        FilterOp::from_param(&op).map(|op| (op, raw)).ok_or_else(|| {
                            invalid_query(format!("unsupported operator '{}' on '{}'", op, field))
                        })
                    })
                    .collect::<TourResult<_>>()?,
            };

            for (op, raw) in predicates {
                if !kind.supports(op) {
                    return Err(invalid_query(format!(
                        "'{}' does not support '{}' comparisons",
                        field,
                        op.as_operator().trim_start_matches('$')
                    )));
                }
                let operand = kind
                    .coerce(&raw)
                    .map_err(|reason| invalid_query(format!("{}: {}", field, reason)))?;
                self.query = self.query.and_where(field.clone(), op, operand);
            }
        }

        Ok(self)
    }

    /// Apply `sort=a,-b`, or `-createdAt` when absent
    pub fn sort(mut self) -> Self {
        let keys: Vec<SortKey> = self
            .params
            .get("sort")
            .map(|raw| raw.split(',').filter_map(SortKey::parse).collect())
            .unwrap_or_default();

        self.query.sort = if keys.is_empty() {
            vec![SortKey::desc(CREATED_AT_FIELD)]
        } else {
            keys
        };
        self
    }

    /// Apply `fields=a,b` to keep only those fields or `fields=-a,-b` to
    /// drop them. Without `fields` only the revision field is hidden.
    ///
    /// Both forms in one list are rejected, as are names that are not field
    /// names.
    pub fn limit_fields(mut self) -> TourResult<Self> {
        let Some(raw) = self.params.get("fields") else {
            self.query.projection = Projection::default();
            return Ok(self);
        };

        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (names, name) = match field.strip_prefix('-') {
                Some(name) => (&mut exclude, name.trim()),
                None => (&mut include, field),
            };
            if !is_field_name(name) {
                return Err(invalid_query(format!("'{}' is not a field name", field)));
            }
            names.push(name.to_string());
        }

        self.query.projection = match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Projection::default(),
            (false, true) => Projection::Include(include),
            (true, false) => Projection::Exclude(exclude),
            (false, false) => {
                return Err(invalid_query(
                    "fields cannot mix included and excluded names".to_string(),
                ));
            }
        };
        Ok(self)
    }

    /// Apply `page` and `limit`; `skip = (page - 1) * limit`
    pub fn paginate(mut self) -> Self {
        let page = positive_param(self.params.get("page")).unwrap_or(1);
        let limit = positive_param(self.params.get("limit"))
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit);

        self.query.skip = (page - 1).saturating_mul(limit);
        self.query.limit = Some(limit);
        self
    }

    /// Finish building
    pub fn build(self) -> TourQuery {
        self.query
    }
}

/// Positive integer, or `None` when missing, non-numeric, zero or negative
fn positive_param(raw: Option<&str>) -> Option<u64> {
    let value: f64 = raw?.trim().parse().ok()?;
    (value.is_finite() && value >= 1.0).then(|| value.trunc() as u64)
}

fn is_field_name(field: &str) -> bool {
    !field.is_empty()
        && !field.starts_with('$')
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn invalid_query(message: String) -> crate::core::error::TourError {
    ValidationError::InvalidQuery { message }.into()
}
