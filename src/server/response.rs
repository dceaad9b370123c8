//! Success envelopes
//!
//! Every successful response body has the shape
//! `{"status": "success", "results"?: n, "data": {...}}`. Failures are
//! rendered by [`TourError`](crate::core::TourError).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// A success envelope with a status code
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    data: Map<String, Value>,
}

impl Envelope {
    /// 200 with `data: {key: value}`
    pub fn ok(key: &str, value: impl Into<Value>) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), value.into());
        Self {
            code: StatusCode::OK,
            status: "success",
            results: None,
            data,
        }
    }

    /// 200 with `results` and `data: {key: [...]}`
    pub fn list(key: &str, items: Vec<Value>) -> Self {
        let results = items.len();
        Self {
            results: Some(results),
            ..Self::ok(key, items)
        }
    }

    /// 201 with `data: {key: value}`
    pub fn created(key: &str, value: impl Into<Value>) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(key, value)
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}
