//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy handler, agent pool:
//!     → logging.rs (tracing subscriber setup for hosts and tests)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - The crate emits `tracing` events; installing a subscriber is the host's call
//! - No exporter is installed; metric updates are no-ops without a recorder
//! - Request ID flows through log fields when the host sets `x-request-id`

pub mod logging;
pub mod metrics;
