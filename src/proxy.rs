//! Pass-through to sibling services that took over part of the API.
//!
//! Requests keep their method, query string, body and headers. Redirects are
//! never followed so the client sees exactly what the upstream returned.

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("{0} timeout")]
    Timeout(String),

    #[error("{0}")]
    Body(String),

    #[error("{0}")]
    Upstream(String),
}

const REQUEST_SKIP: [HeaderName; 3] = [header::HOST, header::CONNECTION, header::CONTENT_LENGTH];

const RESPONSE_SKIP: [HeaderName; 4] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Forwards requests to one upstream service.
#[derive(Clone)]
pub struct ServiceProxy {
    name: String,
    base_url: String,
    upstream_prefix: String,
    max_body_bytes: usize,
    client: reqwest::Client,
}

/// Upstream response, already read into memory.
#[derive(Debug)]
pub struct Forwarded {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ServiceProxy {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        upstream_prefix: &str,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build proxy HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            upstream_prefix: upstream_prefix.trim_end_matches('/').to_string(),
            max_body_bytes,
            client,
        }
    }

    /// `{base}{prefix}/{path}`, keeping the trailing slash for the bare prefix.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!(
            "{}{}/{}",
            self.base_url,
            self.upstream_prefix,
            path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    #[instrument(skip(self, request), fields(service = %self.name, method = %request.method()))]
    pub async fn forward(&self, path: &str, request: Request) -> Result<Forwarded, ProxyError> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(path, parts.uri.query());

        let mut headers = parts.headers;
        for name in &REQUEST_SKIP {
            headers.remove(name);
        }

        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ProxyError::Body(format!("Failed to read request body: {}", e)))?;

        let mut upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers);
        if !body.is_empty() {
            upstream = upstream.body(body);
        }

        let response = upstream.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in &RESPONSE_SKIP {
            headers.remove(name);
        }
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        Ok(Forwarded {
            status,
            headers,
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> ProxyError {
        if err.is_timeout() {
            warn!(service = %self.name, "Upstream timed out");
            ProxyError::Timeout(self.name.clone())
        } else if err.is_connect() {
            warn!(service = %self.name, error = %err, "Upstream unreachable");
            ProxyError::Unavailable(self.name.clone())
        } else {
            ProxyError::Upstream(err.to_string())
        }
    }
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Path below `prefix`, without leading slashes.
pub fn relative_path<'a>(full: &'a str, prefix: &str) -> &'a str {
    full.strip_prefix(prefix)
        .unwrap_or(full)
        .trim_start_matches('/')
}
