//! Embeddable reverse-proxy request handler.
//!
//! # Architecture
//! ```text
//!                        ┌──────────────────────── Proxy ─────────────────────────┐
//!   InboundRequest ──▶   │ resolver ─▶ headers ─▶ agent pool ─▶ client (timeout,   │ ──▶ ProxyReply
//!   (axum adapter or     │ (target)    (pipeline)  (per origin)   redirects, abort) │     or ProxyError
//!    host-built)         │                    on_request hook ──┘   on_response hook│
//!                        └────────────────────────────────────────────────────────┘
//! ```
//!
//! A host builds one [`Proxy`], asks it for a [`ProxyHandler`] per route
//! (validating the route's [`ProxyOptions`]) and feeds requests to
//! [`ProxyHandler::handle`], or mounts it with [`http::server::proxy_route`].

// Core
pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod proxy;
pub mod resolver;

// Cross-cutting concerns
pub mod observability;
pub mod resilience;

pub use config::{ConfigError, ProxyOptions, ProxySettings, RouteSettings};
pub use error::{ProxyError, Result};
pub use http::{InboundBody, InboundRequest, ProxyReply, ServerInfo};
pub use proxy::{Proxy, ProxyHandler};
