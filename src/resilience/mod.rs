//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call (including redirects, up to response headers):
//!     → timeouts.rs (hard deadline, UpstreamTimeout on expiry)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - No retries; failures go to the response hook or the client
//! - The body stream is not covered once headers have arrived

pub mod timeouts;
