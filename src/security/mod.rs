//! Proxy hygiene.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → headers.rs (strip hop-by-hop, append X-Forwarded-For)
//!     → forwarded to backend
//!
//! Backend response headers
//!     → headers.rs (strip hop-by-hop)
//!     → relayed to client
//! ```

pub mod headers;
