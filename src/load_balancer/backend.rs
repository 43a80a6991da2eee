//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its absolute URL
//! - Own a pooled forwarding client, built once and reused per request
//! - Rewrite and forward one request, stream the response back
//! - Expose liveness (always alive; selection is health-blind)

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::request::{upstream_headers, upstream_url};
use crate::http::response::relay;
use crate::load_balancer::{Backend, ConfigurationError, ForwardError};

/// Settings for the per-backend forwarding client.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamOptions {
    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
    /// Deadline for the whole exchange. `None` leaves it to the caller.
    pub request_timeout: Option<Duration>,
}

impl Default for UpstreamOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
        }
    }
}

impl From<&TimeoutConfig> for UpstreamOptions {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_secs),
            request_timeout: (config.request_secs > 0)
                .then(|| Duration::from_secs(config.request_secs)),
        }
    }
}

/// A backend reached over HTTP or HTTPS.
#[derive(Debug)]
pub struct ProxyBackend {
    /// The address exactly as configured.
    address: String,
    /// Parsed target: scheme, authority and optional path prefix.
    url: Url,
    /// Pooled client bound to this backend.
    client: reqwest::Client,
}

impl ProxyBackend {
    /// Create a backend from an absolute `http://` or `https://` URL.
    pub fn new(address: &str, options: &UpstreamOptions) -> Result<Self, ConfigurationError> {
        let url = parse_address(address)?;

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            address: address.to_string(),
            url,
            client: builder.build()?,
        })
    }

    /// The parsed backend URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Parse and check a configured backend address.
pub fn parse_address(address: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[async_trait]
impl Backend for ProxyBackend {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (parts, body) = request.into_parts();
        let target = upstream_url(&self.url, &parts.uri);
        let headers = upstream_headers(&parts.headers, &self.url, client_ip).map_err(|e| {
            ForwardError::InvalidRequest {
                backend: self.address.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(backend = %self.address, method = %parts.method, target = %target, "Forwarding request");

        let mut upstream = self.client.request(parts.method, target).headers(headers);
        if body.size_hint().exact() != Some(0) {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = upstream
            .send()
            .await
            .map_err(|e| ForwardError::from_client(&self.address, e))?;

        tracing::debug!(backend = %self.address, status = %response.status(), "Backend responded");
        Ok(relay(response))
    }
}
