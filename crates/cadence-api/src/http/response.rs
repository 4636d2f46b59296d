//! Envelope response format for all API responses.
//!
//! Every response is wrapped in a consistent envelope:
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": [],
//!   "_links": { "self": "..." }
//! }
//! ```

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

/// Envelope response wrapping all API data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,

    pub meta: ApiMeta,

    /// Error list (empty on success).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,

    #[serde(rename = "_links", skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, String>,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    pub request_id: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
}

/// Request id and start time, taken when a handler begins.
pub struct RequestTimer {
    request_id: String,
    start: Instant,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish<T: Serialize>(self, data: T) -> ApiResponse<T> {
        let elapsed = self.start.elapsed().as_millis() as u64;
        ApiResponse::success(data, self.request_id, elapsed)
    }
}

impl ApiMeta {
    fn now(request_id: String, response_time_ms: u64) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::now(request_id, response_time_ms),
            errors: Vec::new(),
            links: HashMap::new(),
        }
    }

    /// Add a HATEOAS link.
    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(rel.to_string(), href.to_string());
        self
    }
}

impl ApiResponse<()> {
    /// Create an error response (no data).
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            data: None,
            meta: ApiMeta::now(String::new(), 0),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            }],
            links: HashMap::new(),
        }
    }
}
