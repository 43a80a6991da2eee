//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay backend status, headers and body to the client
//! - Map forwarding errors to gateway status codes
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - Hop-by-hop headers stripped on the way back
//! - Backend timeouts result in 504 Gateway Timeout, everything else 502

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::load_balancer::ForwardError;
use crate::security::headers::strip_hop_by_hop;

/// Convert a backend response into a streaming response for the client.
pub fn relay(upstream: reqwest::Response) -> Response<Body> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

impl ForwardError {
    /// Status code reported to the client for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::GATEWAY_TIMEOUT => "Upstream request timed out",
            _ => "Upstream request failed",
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_error_into_response() {
        let err = ForwardError::Timeout {
            backend: "http://127.0.0.1:9".into(),
        };
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

        let err = ForwardError::InvalidRequest {
            backend: "http://127.0.0.1:9".into(),
            reason: "bad header".into(),
        };
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Upstream request failed");
    }
}
