//! Error types for the proxy handler.
//!
//! # Responsibilities
//! - Classify every failure the handler can produce
//! - Map each kind to a reply status code
//! - Render errors as JSON replies for the host
//!
//! # Design Decisions
//! - Configuration errors surface at setup, never per request
//! - Upstream timeouts are distinct from other gateway failures (504 vs 502)
//! - Nothing here is retried; recovery belongs to the `on_response` hook

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

/// Failure kinds produced while proxying a request.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to resolve upstream: {0}")]
    Resolution(String),

    #[error("invalid cookie header: {0}")]
    CookieFilter(String),

    #[error("upstream request timed out after {0} ms")]
    UpstreamTimeout(u64),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),
}

/// Coarse error classification, useful for hooks and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    CookieFilter,
    UpstreamTimeout,
    UpstreamUnreachable,
    UpstreamProtocol,
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Configuration(_) => ErrorKind::Configuration,
            ProxyError::Resolution(_) => ErrorKind::Resolution,
            ProxyError::CookieFilter(_) => ErrorKind::CookieFilter,
            ProxyError::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            ProxyError::UpstreamUnreachable(_) => ErrorKind::UpstreamUnreachable,
            ProxyError::UpstreamProtocol(_) => ErrorKind::UpstreamProtocol,
        }
    }

    /// True for failures that happened while talking to the upstream.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UpstreamTimeout | ErrorKind::UpstreamUnreachable | ErrorKind::UpstreamProtocol
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Resolution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::CookieFilter(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "CONFIGURATION_ERROR",
            ProxyError::Resolution(_) => "RESOLUTION_ERROR",
            ProxyError::CookieFilter(_) => "COOKIE_FILTER_ERROR",
            ProxyError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            ProxyError::UpstreamUnreachable(_) => "UPSTREAM_UNREACHABLE",
            ProxyError::UpstreamProtocol(_) => "UPSTREAM_PROTOCOL_ERROR",
        }
    }

    /// Classify a hyper-util client failure.
    pub(crate) fn from_client(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            ProxyError::UpstreamUnreachable(err.to_string())
        } else {
            ProxyError::UpstreamProtocol(err.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details of local failures stay in the logs.
        let message = match self.kind() {
            ErrorKind::Configuration | ErrorKind::Resolution => {
                tracing::error!(error = %self, "Proxy failed before dispatch");
                "An internal server error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": message,
                "status": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
