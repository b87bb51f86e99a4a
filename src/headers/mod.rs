//! Outbound header pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest headers + resolver headers + settings
//!     → pipeline.rs (ordered transformation steps)
//!         - cookies.rs (host cookie filter, may reject the request)
//!         - forwarded.rs (X-Forwarded-* synthesis)
//!     → HeaderMap for the upstream request
//! ```
//!
//! # Design Decisions
//! - Only the cookie step can fail; it fails the request with 400
//! - Equal inputs always produce equal headers

pub mod cookies;
pub mod forwarded;
pub mod pipeline;

pub use cookies::{CookieFilter, LocalStates};
pub use pipeline::build_outbound_headers;
