//! Upstream connection agents.
//!
//! # Data Flow
//! ```text
//! (destination, scheme, reject_unauthorized, tls params)
//!     → pool.rs (AgentPool::acquire, create-once per AgentKey)
//!     → Agent (pooled hyper-util client + capacity semaphore)
//!     → tls.rs (rustls client config for the trust mode)
//! ```
//!
//! # Design Decisions
//! - One agent per (destination, trust mode, TLS profile); agents live as
//!   long as their pool
//! - Capacity is fixed at creation; a permit is held until the response
//!   body is dropped
//! - `max_sockets = false` bypasses the pool with a non-reusing client
//! - Redirect hops to another origin pick their own agent via `AgentSelector`

pub mod pool;
pub mod tls;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::Semaphore;
use url::Url;

use crate::agent::tls::{build_client_config, TlsParams};
use crate::config::schema::MaxSockets;
use crate::config::ConfigError;
use crate::error::{ProxyError, Result};

pub use pool::{AgentPool, PoolSelector};

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// How an agent treats upstream certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustMode {
    Plain,
    TlsVerified,
    TlsInsecure,
}

impl TrustMode {
    pub fn for_scheme(scheme: &str, reject_unauthorized: bool) -> Self {
        match (scheme, reject_unauthorized) {
            ("https", true) => TrustMode::TlsVerified,
            ("https", false) => TrustMode::TlsInsecure,
            _ => TrustMode::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustMode::Plain => "plain",
            TrustMode::TlsVerified => "tls_verified",
            TrustMode::TlsInsecure => "tls_insecure",
        }
    }
}

/// Pool key: upstream origin, trust mode and TLS profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentKey {
    pub destination: String,
    pub trust: TrustMode,
    pub tls: Option<TlsParams>,
}

/// Picks the agent for an upstream URI.
pub trait AgentSelector: Send + Sync + fmt::Debug {
    /// `None` means a one-shot, non-reusing connection.
    fn select(&self, uri: &Url) -> Result<Option<Arc<Agent>>>;
}

/// A reusable upstream client with a fixed capacity.
pub struct Agent {
    client: UpstreamClient,
    permits: Option<Arc<Semaphore>>,
    max_sockets: MaxSockets,
    trust: TrustMode,
}

impl Agent {
    /// Pooled agent. `MaxSockets::Limit(n)` bounds concurrent requests to `n`.
    pub fn new(trust: TrustMode, max_sockets: MaxSockets, tls: Option<&TlsParams>) -> Result<Self> {
        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_idle_timeout(Duration::from_secs(90));
        if let MaxSockets::Limit(n) = max_sockets {
            builder.pool_max_idle_per_host(n.get());
        }

        let client = builder.build(connector(trust, tls)?);
        let permits = match max_sockets {
            MaxSockets::Limit(n) => Some(Arc::new(Semaphore::new(n.get()))),
            _ => None,
        };

        Ok(Self {
            client,
            permits,
            max_sockets,
            trust,
        })
    }

    /// Agent that never keeps a connection for reuse.
    pub fn unpooled(trust: TrustMode, tls: Option<&TlsParams>) -> Result<Self> {
        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_max_idle_per_host(0);
        let client = builder.build(connector(trust, tls)?);

        Ok(Self {
            client,
            permits: None,
            max_sockets: MaxSockets::Disabled,
            trust,
        })
    }

    pub fn trust(&self) -> TrustMode {
        self.trust
    }

    pub fn max_sockets(&self) -> MaxSockets {
        self.max_sockets
    }

    /// Free request slots; `None` when unbounded.
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|s| s.available_permits())
    }

    /// Send one request, waiting for capacity first.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let permit = match &self.permits {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| ProxyError::UpstreamUnreachable("agent closed".into()))?,
            ),
            None => None,
        };

        let response = self.client.request(request).await.map_err(ProxyError::from_client)?;
        let (parts, body) = response.into_parts();

        let body = match permit {
            // Slot is released when the body is dropped.
            Some(permit) => Body::new(body.map_frame(move |frame| {
                let _held = &permit;
                frame
            })),
            None => Body::new(body),
        };
        Ok(Response::from_parts(parts, body))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("trust", &self.trust)
            .field("max_sockets", &self.max_sockets)
            .field("available", &self.available())
            .finish()
    }
}

fn connector(trust: TrustMode, tls: Option<&TlsParams>) -> Result<HttpsConnector<HttpConnector>> {
    let config = build_client_config(tls, trust != TrustMode::TlsInsecure)
        .map_err(|e| ProxyError::Configuration(ConfigError::Tls(e.to_string())))?;

    let mut http = HttpConnector::new();
    // The https connector decides the scheme.
    http.enforce_http(false);
    http.set_nodelay(true);

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http))
}
