//! Host integration.
//!
//! # Data Flow
//! ```text
//! Proxy (defaults, agent pool, cookie filter, client)
//!     → handler(route, options)  validate + compile once per route
//!     → ProxyHandler::handle(request) per request
//!     → hooks.rs around the upstream call
//! ```
//!
//! # Design Decisions
//! - One `Proxy` per host; its agent pool is shared by every handler it builds
//! - Options are validated when the handler is built, not per request

pub mod handler;
pub mod hooks;

use std::fmt;
use std::sync::Arc;

use crate::agent::AgentPool;
use crate::client::{HttpClient, WireClient};
use crate::config::schema::{ProxyOptions, RouteSettings};
use crate::config::settings::ProxySettings;
use crate::config::ConfigError;
use crate::error::Result;
use crate::headers::{CookieFilter, LocalStates};
use crate::http::request::InboundRequest;
use crate::http::response::ProxyReply;

pub use handler::ProxyHandler;
pub use hooks::{response_hook, HookContext, InFlightRequest, OutboundRequestHook, UpstreamResponseHook};

/// Proxy integration for one host server.
#[derive(Clone)]
pub struct Proxy {
    defaults: ProxyOptions,
    pool: Arc<AgentPool>,
    cookies: Arc<dyn CookieFilter>,
    client: Arc<dyn HttpClient>,
}

impl Proxy {
    pub fn new() -> Self {
        Self {
            defaults: ProxyOptions::default(),
            pool: Arc::new(AgentPool::new()),
            cookies: Arc::new(LocalStates::new()),
            client: Arc::new(WireClient::new()),
        }
    }

    /// Host-level defaults layered under every route's options.
    pub fn with_defaults(mut self, defaults: ProxyOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_pool(mut self, pool: Arc<AgentPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_cookie_filter(mut self, cookies: Arc<dyn CookieFilter>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = client;
        self
    }

    pub fn pool(&self) -> &Arc<AgentPool> {
        &self.pool
    }

    pub fn defaults(&self) -> &ProxyOptions {
        &self.defaults
    }

    /// Validate `options` for `route` and build its handler.
    pub fn handler(&self, route: &RouteSettings, options: ProxyOptions) -> std::result::Result<ProxyHandler, ConfigError> {
        let settings = ProxySettings::compile(options, &self.defaults, route)?;
        tracing::debug!(route = %route.path, settings = ?settings, "Proxy handler configured");
        Ok(ProxyHandler::new(
            settings,
            route.clone(),
            Arc::clone(&self.pool),
            Arc::clone(&self.cookies),
            Arc::clone(&self.client),
        ))
    }

    /// One-shot proxying from inside another handler.
    pub async fn proxy(&self, request: InboundRequest, route: &RouteSettings, options: ProxyOptions) -> Result<ProxyReply> {
        let handler = self.handler(route, options)?;
        handler.handle(request).await
    }
}

impl Default for Proxy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("defaults", &self.defaults)
            .field("agents", &self.pool.len())
            .finish_non_exhaustive()
    }
}
