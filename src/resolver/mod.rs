//! Upstream target resolution.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → UriResolver::resolve
//!         - fixed.rs (protocol://host:port + path + query)
//!         - template.rs ({placeholder} substitution)
//!         - custom (caller-supplied, may contribute headers)
//!     → ResolvedTarget { uri, extra_headers }
//! ```
//!
//! # Design Decisions
//! - The strategy is chosen once, when the handler is configured
//! - Only custom resolvers add headers; built-ins always return none
//! - A failed resolution ends the request before any upstream call

pub mod fixed;
pub mod template;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::Result;
use crate::http::request::InboundRequest;

/// Where a request goes, plus headers the resolver wants merged in.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTarget {
    pub uri: String,
    pub extra_headers: HeaderMap,
}

impl ResolvedTarget {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extra_headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers = headers;
        self
    }
}

/// Maps an inbound request to its upstream target.
#[async_trait]
pub trait UriResolver: Send + Sync {
    async fn resolve(&self, request: &InboundRequest) -> Result<ResolvedTarget>;
}

/// Resolver backed by a closure.
pub struct FnResolver<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> UriResolver for FnResolver<F, Fut>
where
    F: Fn(&InboundRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResolvedTarget>> + Send + 'static,
{
    async fn resolve(&self, request: &InboundRequest) -> Result<ResolvedTarget> {
        (self.f)(request).await
    }
}

/// Build a custom resolver from a closure.
///
/// The closure reads what it needs from the request and returns a future
/// that owns its data.
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn UriResolver>
where
    F: Fn(&InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResolvedTarget>> + Send + 'static,
{
    Arc::new(FnResolver { f, _fut: PhantomData })
}
