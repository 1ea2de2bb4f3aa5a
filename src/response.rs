//! Shaping handler results into HTTP-style JSON responses.
//!
//! Both gateways sit behind Lambda function URLs, so every invocation must
//! produce the API Gateway v2 response shape: a numeric `statusCode`, a
//! headers map, and the JSON payload pre-serialized into the `body` string.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Headers,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct Headers {
    #[serde(rename = "Content-Type")]
    content_type: &'static str,
}

impl ApiResponse {
    /// Build a response carrying the given JSON payload.
    pub fn json(status_code: u16, payload: Value) -> Self {
        ApiResponse {
            status_code,
            headers: Headers {
                content_type: "application/json",
            },
            body: payload.to_string(),
        }
    }

    /// The stock response for a (method, path) pair that isn't in the route
    /// table. A routing miss is a normal outcome, not a fault.
    pub fn not_found() -> Self {
        Self::json(404, json!({ "error": "Not found" }))
    }
}
