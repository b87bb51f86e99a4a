//! Hooks around the upstream call.
//!
//! # Responsibilities
//! - `OutboundRequestHook`: observe the outbound request, optionally abort it
//! - `UpstreamResponseHook`: turn the upstream outcome into the final reply
//!
//! # Design Decisions
//! - Hooks get their bind context explicitly through `HookContext`
//! - The response hook sees failures too and its result is final
//! - Neither hook runs when resolution or cookie filtering fails

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::schema::RouteSettings;
use crate::config::settings::ProxySettings;
use crate::error::Result;
use crate::http::request::InboundRequest;
use crate::http::response::ProxyReply;

/// Handle to a request that is about to go upstream.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
    method: Method,
    uri: Url,
    headers: HeaderMap,
    cancel: CancellationToken,
}

impl InFlightRequest {
    pub(crate) fn new(method: Method, uri: Url, headers: HeaderMap, cancel: CancellationToken) -> Self {
        Self {
            method,
            uri,
            headers,
            cancel,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Abort the upstream call. The connection is dropped and the request
    /// settles as an upstream failure.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when the call is aborted; can be moved into tasks.
    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Called once the outbound request exists, before it is sent.
pub trait OutboundRequestHook: Send + Sync {
    fn on_request(&self, request: &InFlightRequest);
}

impl<F> OutboundRequestHook for F
where
    F: Fn(&InFlightRequest) + Send + Sync,
{
    fn on_request(&self, request: &InFlightRequest) {
        self(request)
    }
}

/// What a response hook gets besides the outcome.
pub struct HookContext<'a> {
    pub request: &'a InboundRequest,
    pub route: &'a RouteSettings,
    pub settings: &'a ProxySettings,
    /// Cache lifetime derived from the upstream, when enabled.
    pub ttl: Option<Duration>,
}

impl HookContext<'_> {
    /// The route's bind context, if it holds a `T`.
    pub fn bind<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.route.bind.as_ref().and_then(|bind| bind.downcast_ref::<T>())
    }
}

/// Replaces the default response mapping.
#[async_trait]
pub trait UpstreamResponseHook: Send + Sync {
    async fn on_response(&self, outcome: Result<Response<Body>>, ctx: HookContext<'_>) -> Result<ProxyReply>;
}

struct FnResponseHook<F>(F);

#[async_trait]
impl<F> UpstreamResponseHook for FnResponseHook<F>
where
    F: Fn(Result<Response<Body>>, HookContext<'_>) -> Result<ProxyReply> + Send + Sync,
{
    async fn on_response(&self, outcome: Result<Response<Body>>, ctx: HookContext<'_>) -> Result<ProxyReply> {
        (self.0)(outcome, ctx)
    }
}

/// Response hook from a synchronous closure.
pub fn response_hook<F>(f: F) -> Arc<dyn UpstreamResponseHook>
where
    F: Fn(Result<Response<Body>>, HookContext<'_>) -> Result<ProxyReply> + Send + Sync + 'static,
{
    Arc::new(FnResponseHook(f))
}
