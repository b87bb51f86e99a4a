//! Outbound HTTP client.
//!
//! # Data Flow
//! ```text
//! OutboundRequest (method, uri, headers, body, redirects, agents, tls)
//!     → HttpClient::request
//!         - wire.rs (hyper-util over the agent, redirect loop)
//!         - redirect.rs (which statuses, where to, with what method)
//!     → Response<Body> (streamed)
//! cache_control.rs parses the upstream Cache-Control for TTLs
//! ```
//!
//! # Design Decisions
//! - The client is a trait so hosts and tests can substitute it
//! - A streamed body is buffered only when redirects may replay it

pub mod cache_control;
pub mod redirect;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};
use bytes::Bytes;
use url::Url;

use crate::agent::tls::TlsParams;
use crate::agent::{Agent, AgentSelector};
use crate::config::schema::Redirects;
use crate::error::Result;

pub use cache_control::CacheControl;
pub use wire::WireClient;

/// Body of an outbound request.
#[derive(Debug, Default)]
pub enum OutboundBody {
    #[default]
    Empty,
    Buffered(Bytes),
    Streaming(Body),
}

impl OutboundBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, OutboundBody::Empty)
    }

    /// Body for one send. A stream can only be sent once; later calls get
    /// an empty body.
    pub fn take_for_send(&mut self) -> Body {
        match self {
            OutboundBody::Empty => Body::empty(),
            OutboundBody::Buffered(bytes) => Body::from(bytes.clone()),
            OutboundBody::Streaming(_) => match std::mem::take(self) {
                OutboundBody::Streaming(body) => body,
                _ => Body::empty(),
            },
        }
    }
}

/// A request ready to go upstream.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Url,
    pub headers: HeaderMap,
    pub body: OutboundBody,
    pub redirects: Redirects,
    /// `None` means a one-shot, non-reusing connection.
    pub agent: Option<Arc<Agent>>,
    /// Agents for redirect hops that leave the first origin.
    pub agents: Option<Arc<dyn AgentSelector>>,
    pub tls: Option<TlsParams>,
    pub reject_unauthorized: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Url) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: OutboundBody::Empty,
            redirects: Redirects::Disabled,
            agent: None,
            agents: None,
            tls: None,
            reject_unauthorized: true,
        }
    }
}

/// Performs upstream requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `request`, following redirects as configured. Resolves once
    /// response headers arrive; the body streams afterwards.
    async fn request(&self, request: OutboundRequest) -> Result<Response<Body>>;

    fn parse_cache_control(&self, field: &str) -> Option<CacheControl> {
        CacheControl::parse(field)
    }
}
