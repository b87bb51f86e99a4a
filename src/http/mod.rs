//! HTTP surface shared with the host.
//!
//! # Data Flow
//! ```text
//! host request (axum or otherwise)
//!     → request.rs (InboundRequest, ServerInfo)
//!     → [proxy handler]
//!     → response.rs (ProxyReply → axum Response)
//! server.rs mounts a handler on an axum route
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundBody, InboundRequest, ServerInfo};
pub use response::ProxyReply;
pub use server::proxy_route;
