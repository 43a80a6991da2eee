//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (any method, any path)
//!     → dispatcher.rs (owns the fixed backend list)
//!     → round_robin.rs (atomic cursor picks the next index)
//!     → backend.rs (rewrite host/scheme, forward, stream the reply back)
//!     → Response or ForwardError
//! ```
//!
//! # Design Decisions
//! - Backend set is fixed at startup; no dynamic membership
//! - Selection is health-blind: `is_alive` is exposed but not consulted
//! - No retries: a failed forward is a failed request
//! - Backends are trait objects so tests can substitute mocks

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod round_robin;

pub use backend::ProxyBackend;
pub use dispatcher::Dispatcher;
pub use error::{ConfigurationError, ForwardError};

/// A forwarding target.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// The configured address of this backend.
    fn address(&self) -> &str;

    /// Whether the backend is currently considered alive.
    fn is_alive(&self) -> bool;

    /// Relay one request to the backend and return its response.
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}
