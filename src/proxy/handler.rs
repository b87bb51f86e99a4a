//! Per-route proxy handler.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → resolve target (UriResolver)
//!     → build headers (header pipeline, cookie filter)
//!     → select agent, take body, on_request hook
//!     → upstream call raced against timeout and abort
//!     → timing, TTL from Cache-Control
//!     → on_response hook, or ProxyReply::from_upstream
//! ```
//!
//! # Design Decisions
//! - Resolution and cookie failures return before any hook runs
//! - Dropping the handle future drops the upstream connection
//! - The response hook's result is final, error or not

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::agent::{AgentPool, AgentSelector, PoolSelector};
use crate::client::{HttpClient, OutboundBody, OutboundRequest};
use crate::config::schema::RouteSettings;
use crate::config::settings::ProxySettings;
use crate::error::{ProxyError, Result};
use crate::headers::{build_outbound_headers, CookieFilter};
use crate::http::request::{InboundBody, InboundRequest};
use crate::http::response::ProxyReply;
use crate::observability::metrics;
use crate::proxy::hooks::{HookContext, InFlightRequest};
use crate::resilience::timeouts::with_timeout;

/// A configured proxy for one route.
pub struct ProxyHandler {
    settings: Arc<ProxySettings>,
    route: RouteSettings,
    pool: Arc<AgentPool>,
    cookies: Arc<dyn CookieFilter>,
    client: Arc<dyn HttpClient>,
}

impl ProxyHandler {
    pub(crate) fn new(
        settings: ProxySettings,
        route: RouteSettings,
        pool: Arc<AgentPool>,
        cookies: Arc<dyn CookieFilter>,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            route,
            pool,
            cookies,
            client,
        }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn route(&self) -> &RouteSettings {
        &self.route
    }

    /// Proxy one request and produce the reply.
    pub async fn handle(&self, request: InboundRequest) -> Result<ProxyReply> {
        let settings = self.settings.as_ref();

        let target = settings.resolver.resolve(&request).await?;
        let uri = parse_target(&target.uri)?;

        let headers =
            build_outbound_headers(&request, &target.extra_headers, settings, self.cookies.as_ref()).await?;

        let agents: Arc<dyn AgentSelector> =
            Arc::new(PoolSelector::new(Arc::clone(&self.pool), Arc::clone(&self.settings)));
        let agent = agents.select(&uri)?;

        let body = match request.take_body() {
            InboundBody::Empty => OutboundBody::Empty,
            InboundBody::Bytes(bytes) => OutboundBody::Buffered(bytes),
            InboundBody::Stream(stream) => OutboundBody::Streaming(stream),
        };

        let abort = match &request.disconnect {
            Some(disconnect) => disconnect.child_token(),
            None => CancellationToken::new(),
        };

        let outbound = OutboundRequest {
            method: request.method.clone(),
            uri: uri.clone(),
            headers,
            body,
            redirects: settings.redirects,
            agent,
            agents: Some(agents),
            tls: settings.tls.clone(),
            reject_unauthorized: settings.reject_unauthorized,
        };

        if let Some(hook) = &settings.on_request {
            let in_flight = InFlightRequest::new(
                outbound.method.clone(),
                uri.clone(),
                outbound.headers.clone(),
                abort.clone(),
            );
            hook.on_request(&in_flight);
        }

        tracing::debug!(
            request_id = %request.request_id(),
            method = %request.method,
            path = %request.path,
            upstream = %uri,
            "Proxying request"
        );

        let client = settings.http_client.as_ref().unwrap_or(&self.client);
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = abort.cancelled() => Err(ProxyError::UpstreamUnreachable("upstream request aborted".into())),
            result = with_timeout(settings.timeout, client.request(outbound)) => result,
        };
        let elapsed = started.elapsed();

        let label = metrics::outcome_label(outcome.as_ref().map(|_| ()));
        metrics::record_upstream(label);
        if settings.downstream_response_time {
            metrics::record_downstream_time(label, elapsed);
            match &outcome {
                Ok(_) => tracing::info!(
                    request_id = %request.request_id(),
                    downstream_response_time_ms = elapsed.as_millis() as u64,
                    "Upstream responded"
                ),
                Err(e) => tracing::info!(
                    request_id = %request.request_id(),
                    downstream_response_time_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Upstream failed"
                ),
            }
        }

        match &outcome {
            Ok(response) => tracing::debug!(
                request_id = %request.request_id(),
                status = %response.status(),
                "Upstream response received"
            ),
            Err(e) => tracing::warn!(
                request_id = %request.request_id(),
                upstream = %uri,
                error = %e,
                "Upstream error"
            ),
        }

        let ttl = match &outcome {
            Ok(response) if settings.upstream_ttl() => response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| client.parse_cache_control(v))
                .and_then(|cc| cc.max_age())
                .map(|secs| Duration::from_secs(secs.max(0) as u64)),
            _ => None,
        };

        if let Some(hook) = &settings.on_response {
            let ctx = HookContext {
                request: &request,
                route: &self.route,
                settings,
                ttl,
            };
            return hook.on_response(outcome, ctx).await;
        }

        let response = outcome?;
        Ok(ProxyReply::from_upstream(response, ttl, settings.pass_through))
    }
}

impl fmt::Debug for ProxyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandler")
            .field("route", &self.route)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn parse_target(raw: &str) -> Result<Url> {
    let uri = Url::parse(raw).map_err(|e| ProxyError::Resolution(format!("invalid upstream uri '{}': {}", raw, e)))?;
    match uri.scheme() {
        "http" | "https" if uri.has_host() => Ok(uri),
        scheme => Err(ProxyError::Resolution(format!(
            "unsupported upstream uri '{}' (scheme '{}')",
            raw, scheme
        ))),
    }
}
