//! Per-operation request handling.
//!
//! A [`MockResponder`] owns the declared responses of one path and method. For
//! each request it selects a response, applies any requested latency, and
//! renders the response's JSON example.

use crate::config::ServerConfig;
use crate::openapi::{Example, MethodResponseTable};
use crate::selector::{self, Selection};
use crate::template::{self, RenderContext};
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Explicit response key requested by the client.
pub const MOCK_RESPONSE_HEADER: HeaderName = HeaderName::from_static("x-mock-response");
/// Artificial latency in milliseconds.
pub const MOCK_LATENCY_HEADER: HeaderName = HeaderName::from_static("x-mock-latency");
/// Repeat count for `JSONArray` templates.
pub const MOCK_COUNT_HEADER: HeaderName = HeaderName::from_static("x-mock-count");
/// Description of the selected response.
pub const MOCK_DESCRIPTION_HEADER: HeaderName = HeaderName::from_static("x-mock-description");

const DEFAULT_ITEM_COUNT: i64 = 1;

/// Mock handler for one operation.
#[derive(Debug, Clone)]
pub struct MockResponder {
    path: String,
    method: Method,
    responses: MethodResponseTable,
    max_latency: Duration,
    max_item_count: i64,
}

impl MockResponder {
    pub fn new(
        path: impl Into<String>,
        method: Method,
        responses: MethodResponseTable,
        config: &ServerConfig,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            responses,
            max_latency: config.max_latency,
            max_item_count: config.max_item_count,
        }
    }

    /// Handle a request with the given path parameters and headers.
    pub async fn respond(&self, params: HashMap<String, String>, headers: &HeaderMap) -> Response {
        let requested = header_str(headers, &MOCK_RESPONSE_HEADER);

        let Selection { status, response } = match selector::select(&self.responses, requested) {
            Ok(selection) => selection,
            Err(e) => {
                debug!(
                    method = %self.method,
                    path = %self.path,
                    requested = ?requested,
                    available = ?selector::selectable_keys(&self.responses),
                    error = %e,
                    "Response selection failed"
                );
                return e.into_response();
            }
        };

        let latency = self.requested_latency(headers);
        if !latency.is_zero() {
            debug!(path = %self.path, latency_ms = latency.as_millis() as u64, "Applying latency");
            tokio::time::sleep(latency).await;
        }

        let status = match StatusCode::from_u16(status) {
            Ok(status) => status,
            Err(e) => {
                error!(status, error = %e, "Declared status code is not usable");
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        };

        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            MOCK_DESCRIPTION_HEADER,
            description_header(&response.description),
        );

        let Some(example) = response.json_example() else {
            debug!(method = %self.method, path = %self.path, %status, "Responding without body");
            return (status, response_headers).into_response();
        };

        response_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let ctx = RenderContext::new(params, self.requested_count(headers))
            .with_item_limit(self.max_item_count);
        let rendered = match example {
            Example::Template(source) => template::render(source, &ctx),
            Example::Structured(value) => template::render_json(value, &ctx),
        };
        let body = match rendered {
            Ok(body) => Body::from(body),
            Err(e) => {
                error!(
                    method = %self.method,
                    path = %self.path,
                    %status,
                    error = %e,
                    "Failed to render response example"
                );
                Body::empty()
            }
        };

        debug!(method = %self.method, path = %self.path, %status, "Responding with rendered example");
        (status, response_headers, body).into_response()
    }

    /// Requested latency, zero when absent or invalid, capped at the configured maximum.
    fn requested_latency(&self, headers: &HeaderMap) -> Duration {
        let Some(raw) = header_str(headers, &MOCK_LATENCY_HEADER) else {
            return Duration::ZERO;
        };
        let Ok(ms) = raw.parse::<u64>() else {
            debug!(value = raw, "Ignoring invalid latency header");
            return Duration::ZERO;
        };

        let latency = Duration::from_millis(ms);
        if latency > self.max_latency {
            warn!(
                requested_ms = ms,
                max_ms = self.max_latency.as_millis() as u64,
                "Requested latency capped"
            );
            return self.max_latency;
        }
        latency
    }

    /// Requested item count: 1 when absent or invalid, 0 when negative, capped
    /// at the configured maximum.
    fn requested_count(&self, headers: &HeaderMap) -> i64 {
        let count = header_str(headers, &MOCK_COUNT_HEADER)
            .and_then(|raw| raw.parse::<i64>().ok())
            .map_or(DEFAULT_ITEM_COUNT, |count| count.max(0));

        if count > self.max_item_count {
            warn!(requested = count, max = self.max_item_count, "Requested item count capped");
            return self.max_item_count;
        }
        count
    }
}

/// A non-empty, valid UTF-8 header value.
fn header_str<'h>(headers: &'h HeaderMap, name: &HeaderName) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Build a header value from free text, replacing control characters such as
/// line breaks with spaces.
fn description_header(description: &str) -> HeaderValue {
    let bytes: Vec<u8> = description
        .trim()
        .bytes()
        .map(|b| if (b < 0x20 && b != b'\t') || b == 0x7f { b' ' } else { b })
        .collect();
    HeaderValue::from_bytes(&bytes).unwrap_or_else(|_| HeaderValue::from_static(""))
}
