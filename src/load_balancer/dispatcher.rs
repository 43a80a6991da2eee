//! Request dispatcher.
//!
//! # Responsibilities
//! - Own the fixed, ordered backend list
//! - Pick one backend per request in round-robin order
//! - Delegate forwarding and record per-backend outcomes

use axum::body::Body;
use axum::http::{Request, Response};
use std::sync::Arc;
use std::time::Instant;

use crate::config::LbConfig;
use crate::load_balancer::backend::{ProxyBackend, UpstreamOptions};
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::{Backend, ConfigurationError, ForwardError};
use crate::observability::metrics;

/// Owns the backend set and the rotation cursor.
#[derive(Debug)]
pub struct Dispatcher {
    listen_port: u16,
    backends: Vec<Arc<dyn Backend>>,
    cursor: RoundRobin,
}

impl Dispatcher {
    /// Create a dispatcher over a non-empty backend list.
    pub fn new(listen_port: u16, backends: Vec<Arc<dyn Backend>>) -> Result<Self, ConfigurationError> {
        if backends.is_empty() {
            return Err(ConfigurationError::NoBackends);
        }
        Ok(Self {
            listen_port,
            backends,
            cursor: RoundRobin::new(),
        })
    }

    /// Build HTTP backends for every configured address, in order.
    pub fn from_config(config: &LbConfig) -> Result<Self, ConfigurationError> {
        let options = UpstreamOptions::from(&config.timeouts);
        let backends = config
            .backends
            .iter()
            .map(|address| {
                ProxyBackend::new(address, &options).map(|b| Arc::new(b) as Arc<dyn Backend>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(config.listener.port, backends)
    }

    /// Next backend in list order, wrapping after the last one.
    ///
    /// Liveness is not consulted.
    pub fn select_next(&self) -> Arc<dyn Backend> {
        let index = self.cursor.next_index(self.backends.len());
        let backend = self.backends[index].clone();
        tracing::debug!(index, backend = %backend.address(), "Selected backend");
        backend
    }

    /// Forward `request` to the next backend.
    pub async fn dispatch(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let start = Instant::now();
        let backend = self.select_next();

        match backend.forward(request).await {
            Ok(response) => {
                metrics::record_request(backend.address(), response.status().as_u16(), start);
                Ok(response)
            }
            Err(e) => {
                tracing::error!(backend = %backend.address(), error = %e, "Upstream error");
                metrics::record_forward_error(backend.address(), start);
                Err(e)
            }
        }
    }

    /// Port the HTTP engine serves this dispatcher on.
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// The backends in selection order.
    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }
}
