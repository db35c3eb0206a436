//! Access logging middleware.
//!
//! Every request gets a [`RequestContext`] holding its start instant. Once the
//! inner service has produced a response, the context is turned into a
//! [`RequestLogEntry`] and emitted as exactly one log line whose level follows
//! the status class:
//!
//! | status        | level | message                          |
//! |---------------|-------|----------------------------------|
//! | 200..400      | INFO  | `Request completed successfully` |
//! | 400..500      | WARN  | `Client error in request`        |
//! | anything else | ERROR | `Server error in request`        |

use std::{collections::BTreeMap, net::SocketAddr, time::Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Query, Request, State},
    http::{header::HOST, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::{api::json::is_json_content_type, error::AppError, AppState};

/// Target of access log events
pub const ACCESS_LOG_TARGET: &str = "bookshelf_server::access";

/// Per-request state owned by the middleware for the lifetime of one request
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    started_at: Instant,
}

impl RequestContext {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Milliseconds since [`start`](Self::start), rounded to 2 decimals
    pub fn elapsed_ms(&self) -> f64 {
        round_2(self.started_at.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Log severity derived from a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn for_status(status: StatusCode) -> Self {
        match status.as_u16() {
            200..=399 => Severity::Info,
            400..=499 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Severity::Info => "Request completed successfully",
            Severity::Warning => "Client error in request",
            Severity::Error => "Server error in request",
        }
    }
}

/// Request metadata known before the handler runs
#[derive(Debug, Clone, PartialEq)]
struct RequestMetadata {
    method: Method,
    path: String,
    client_ip: Option<String>,
    host: Option<String>,
    query_params: BTreeMap<String, String>,
}

impl RequestMetadata {
    fn capture(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            client_ip: client_ip(parts),
            host: request_host(parts),
            query_params: query_params(parts),
        }
    }
}

/// One access log record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestLogEntry {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub client_ip: Option<String>,
    pub host: Option<String>,
    pub query_params: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestLogEntry {
    fn compose(
        context: &RequestContext,
        metadata: RequestMetadata,
        status: StatusCode,
        body: Option<Value>,
    ) -> Self {
        Self {
            method: metadata.method.to_string(),
            path: metadata.path,
            status_code: status.as_u16(),
            duration_ms: context.elapsed_ms(),
            client_ip: metadata.client_ip,
            host: metadata.host,
            query_params: metadata.query_params,
            body,
        }
    }

    pub fn severity(&self) -> Severity {
        StatusCode::from_u16(self.status_code)
            .map(Severity::for_status)
            .unwrap_or(Severity::Error)
    }

    /// Emit the entry as a single log line
    pub fn emit(&self) {
        let fields = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        let status_code = self.status_code;
        let duration_ms = self.duration_ms;

        match self.severity() {
            Severity::Info => tracing::info!(
                target: ACCESS_LOG_TARGET,
                status_code,
                duration_ms,
                "{}: {}",
                Severity::Info.message(),
                fields
            ),
            Severity::Warning => tracing::warn!(
                target: ACCESS_LOG_TARGET,
                status_code,
                duration_ms,
                "{}: {}",
                Severity::Warning.message(),
                fields
            ),
            Severity::Error => tracing::error!(
                target: ACCESS_LOG_TARGET,
                status_code,
                duration_ms,
                "{}: {}",
                Severity::Error.message(),
                fields
            ),
        }
    }
}

/// Time the request, run the inner service and log the outcome.
///
/// The body is buffered so it can be both logged and handed on to the
/// handler. A body that cannot be read is an unexpected failure and never
/// reaches the handler.
pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let context = RequestContext::start();
    let (parts, body) = request.into_parts();
    let metadata = RequestMetadata::capture(&parts);

    let (response, logged_body) =
        match axum::body::to_bytes(body, state.config.server.max_body_bytes).await {
            Ok(bytes) => {
                let logged_body = loggable_body(&parts, &bytes);
                let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
                (response, logged_body)
            }
            Err(err) => (AppError::Body(err).into_response(), None),
        };

    RequestLogEntry::compose(&context, metadata, response.status(), logged_body).emit();
    response
}

/// Parsed JSON body of a POST/PUT request with a JSON content type
fn loggable_body(parts: &Parts, bytes: &Bytes) -> Option<Value> {
    let logged_method = parts.method == Method::POST || parts.method == Method::PUT;
    if !logged_method || !is_json_content_type(&parts.headers) {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// `X-Forwarded-For` verbatim when present, else the peer address
fn client_ip(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

fn request_host(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .map(strip_port)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Hostname without its port; bracketed IPv6 literals lose their brackets
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// Query string as a map; the first value wins for a repeated key
fn query_params(parts: &Parts) -> BTreeMap<String, String> {
    let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) else {
        return BTreeMap::new();
    };

    let mut params = BTreeMap::new();
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    params
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
