//! Metrics collection.
//!
//! # Metrics
//! - `proxy_upstream_requests_total` (counter): upstream calls by outcome
//! - `proxy_downstream_response_seconds` (histogram): dispatch to settle, by outcome
//! - `proxy_agents_created_total` (counter): agents created by trust mode
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the host picks the exporter
//! - Outcome labels stay low-cardinality (no URIs, no hosts)

use std::time::Duration;

use crate::error::ProxyError;

/// Outcome label of an upstream call.
pub fn outcome_label(result: Result<(), &ProxyError>) -> &'static str {
    match result {
        Ok(()) => "success",
        Err(ProxyError::UpstreamTimeout(_)) => "timeout",
        Err(ProxyError::UpstreamUnreachable(_)) => "unreachable",
        Err(_) => "error",
    }
}

pub fn record_upstream(outcome: &'static str) {
    metrics::counter!("proxy_upstream_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_downstream_time(outcome: &'static str, elapsed: Duration) {
    metrics::histogram!("proxy_downstream_response_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn record_agent_created(trust: &'static str) {
    metrics::counter!("proxy_agents_created_total", "trust" => trust).increment(1);
}
