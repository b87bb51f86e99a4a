//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn an upstream response into a reply for the client
//! - Apply the pass-through header policy
//! - Express the computed TTL as a `Cache-Control` header
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Hop-by-hop headers are stripped when passing headers through
//! - A reply without a TTL is marked `no-cache` unless upstream said otherwise

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode},
    response::IntoResponse,
};

/// Headers that describe a single connection and never cross the proxy.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub(crate) fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Reply produced by the proxy (or a hook) for the host to send.
#[derive(Debug)]
pub struct ProxyReply {
    status: StatusCode,
    upstream_headers: HeaderMap,
    headers: HeaderMap,
    body: Body,
    ttl: Option<Duration>,
    pass_through: bool,
}

impl ProxyReply {
    /// Empty reply with `status`.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            upstream_headers: HeaderMap::new(),
            headers: HeaderMap::new(),
            body: Body::empty(),
            ttl: None,
            pass_through: false,
        }
    }

    /// Wrap an upstream response, keeping its status and streaming its body.
    pub fn from_upstream(response: Response<Body>, ttl: Option<Duration>, pass_through: bool) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            upstream_headers: parts.headers,
            headers: HeaderMap::new(),
            body,
            ttl,
            pass_through,
        }
    }

    pub fn code(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a reply header; always sent, regardless of pass-through.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = pass_through;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn ttl_value(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    /// Headers received from the upstream, before the pass-through policy.
    pub fn upstream_headers(&self) -> &HeaderMap {
        &self.upstream_headers
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

impl IntoResponse for ProxyReply {
    fn into_response(self) -> axum::response::Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if self.pass_through {
            for (name, value) in self.upstream_headers.iter() {
                if !is_hop_by_hop(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        match self.ttl {
            Some(ttl) => {
                let value = format!("max-age={}, must-revalidate", ttl.as_secs());
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(header::CACHE_CONTROL, value);
                }
            }
            None => {
                if !headers.contains_key(header::CACHE_CONTROL) {
                    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                }
            }
        }

        response
    }
}
