//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Rewrite the request target onto a backend address
//! - Prepare headers for forwarding (Host, hop-by-hop, X-Forwarded-For)
//!
//! # Design Decisions
//! - Method, path and body are never altered, only re-targeted
//! - The backend path prefix is joined in front of the inbound path
//! - Backend and inbound query strings are concatenated with '&'

use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Request, Uri};
use std::net::IpAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::{Position, Url};

use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 for every request that arrives without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the request ID attached to a request, if any.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Host and optional port of `base`, as sent in the Host header.
pub fn authority(base: &Url) -> &str {
    &base[Position::BeforeHost..Position::AfterPort]
}

/// Build the backend URL for an inbound request target.
pub fn upstream_url(base: &Url, inbound: &Uri) -> Url {
    let mut url = base.clone();
    url.set_path(&join_path(base.path(), inbound.path()));

    let query = match (base.query(), inbound.query()) {
        (Some(b), Some(i)) if !b.is_empty() && !i.is_empty() => Some(format!("{}&{}", b, i)),
        (Some(b), Some(i)) => Some(format!("{}{}", b, i)),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };
    url.set_query(query.as_deref());
    url
}

/// Headers for the backend: inbound headers with Host rewritten, hop-by-hop
/// headers removed and the caller appended to X-Forwarded-For.
pub fn upstream_headers(
    inbound: &HeaderMap,
    base: &Url,
    client: Option<IpAddr>,
) -> Result<HeaderMap, header::InvalidHeaderValue> {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);

    headers.insert(header::HOST, HeaderValue::from_str(authority(base))?);
    if let Some(ip) = client {
        append_forwarded_for(&mut headers, ip);
    }
    Ok(headers)
}

/// Join two paths with exactly one slash between them.
fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", prefix, &path[1..]),
        (false, false) => format!("{}/{}", prefix, path),
        _ => format!("{}{}", prefix, path),
    }
}
