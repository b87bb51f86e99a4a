//! Inbound request model.
//!
//! # Responsibilities
//! - Carry the per-request facts the proxy needs from the host
//! - Stay independent of the host framework's request type
//! - Convert from an axum request for the bundled adapter
//!
//! # Design Decisions
//! - The body is owned and taken exactly once, at dispatch
//! - Disconnect is signalled with a cancellation token; hosts that drop the
//!   handler future on disconnect need not set one

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use axum::{
    body::{Body, HttpBody},
    extract::ConnectInfo,
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method},
};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// The host server's own identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// `http` or `https`, without a colon.
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl ServerInfo {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }

    /// `protocol://host:port` of the host server.
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new("http", "localhost", 80)
    }
}

/// Request payload as delivered by the host.
#[derive(Debug, Default)]
pub enum InboundBody {
    #[default]
    Empty,
    /// Raw bytes the host already buffered.
    Bytes(Bytes),
    /// Unconsumed stream.
    Stream(Body),
}

impl InboundBody {
    pub fn is_present(&self) -> bool {
        match self {
            InboundBody::Empty => false,
            InboundBody::Bytes(bytes) => !bytes.is_empty(),
            InboundBody::Stream(_) => true,
        }
    }
}

/// A request received by the host and handed to the proxy.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub params: BTreeMap<String, String>,
    /// Remote peer; `None` for injected requests.
    pub remote_addr: Option<SocketAddr>,
    pub server: ServerInfo,
    // Behind a lock so the request can be shared by reference while the
    // payload waits to be taken.
    body: Mutex<InboundBody>,
    has_body: bool,
    /// Cancelled by the host when the client connection goes away.
    pub disconnect: Option<CancellationToken>,
}

impl InboundRequest {
    /// Build a request for `path_and_query`, e.g. `/profile?x=1`.
    pub fn new(method: Method, path_and_query: &str, server: ServerInfo) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            params: BTreeMap::new(),
            remote_addr: None,
            server,
            body: Mutex::new(InboundBody::Empty),
            has_body: false,
            disconnect: None,
        }
    }

    /// Build from axum request parts, reading the peer from `ConnectInfo`.
    pub fn from_parts(parts: Parts, body: Body, server: ServerInfo) -> Self {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let has_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() != "0")
            .unwrap_or(false);
        let body = if body.is_end_stream() && !has_length {
            InboundBody::Empty
        } else {
            InboundBody::Stream(body)
        };

        let mut request = Self::new(parts.method, "/", server);
        request.path = parts.uri.path().to_string();
        request.query = parts.uri.query().map(str::to_string);
        request.headers = parts.headers;
        request.remote_addr = remote_addr;
        let mut request = request.with_body(body);

        if !request.headers.contains_key(header::HOST) {
            // HTTP/2 carries the host in the URI authority.
            if let Some(value) = parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            {
                request.headers.insert(header::HOST, value);
            }
        }
        request
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_remote(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_body(mut self, body: InboundBody) -> Self {
        self.has_body = body.is_present();
        self.body = Mutex::new(body);
        self
    }

    /// True when the request arrived with a payload, even after it was taken.
    pub fn has_body(&self) -> bool {
        self.has_body
    }

    /// Take the payload; later calls get `InboundBody::Empty`.
    pub fn take_body(&self) -> InboundBody {
        match self.body.lock() {
            Ok(mut body) => std::mem::take(&mut *body),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn with_disconnect(mut self, token: CancellationToken) -> Self {
        self.disconnect = Some(token);
        self
    }

    /// `?query` or an empty string.
    pub fn search(&self) -> String {
        match &self.query {
            Some(query) => format!("?{}", query),
            None => String::new(),
        }
    }

    /// Host the client addressed, from the `Host` header.
    pub fn host(&self) -> Option<&str> {
        self.headers.get(header::HOST).and_then(|v| v.to_str().ok())
    }

    /// Correlation id for logs.
    pub fn request_id(&self) -> &str {
        self.headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_new_splits_query() {
        let request = InboundRequest::new(Method::GET, "/profile?x=1", ServerInfo::default());
        assert_eq!(request.path, "/profile");
        assert_eq!(request.query.as_deref(), Some("x=1"));
        assert_eq!(request.search(), "?x=1");

        let bare = InboundRequest::new(Method::GET, "/profile", ServerInfo::default());
        assert_eq!(bare.search(), "");
    }

    #[test]
    fn test_from_parts_reads_connect_info() {
        let addr: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let mut http = Request::builder()
            .method("POST")
            .uri("/upload?kind=raw")
            .header("host", "proxy.local:8080")
            .header("content-length", "4")
            .body(Body::from("test"))
            .unwrap();
        http.extensions_mut().insert(ConnectInfo(addr));

        let (parts, body) = http.into_parts();
        let request = InboundRequest::from_parts(parts, body, ServerInfo::default());
        assert_eq!(request.remote_addr, Some(addr));
        assert_eq!(request.path, "/upload");
        assert_eq!(request.query.as_deref(), Some("kind=raw"));
        assert_eq!(request.host(), Some("proxy.local:8080"));
        assert!(request.has_body());
        assert!(request.take_body().is_present());
        assert!(!request.take_body().is_present());
        assert!(request.has_body());
    }

    #[test]
    fn test_from_parts_empty_body() {
        let http = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (parts, body) = http.into_parts();
        let request = InboundRequest::from_parts(parts, body, ServerInfo::default());
        assert!(!request.has_body());
        assert!(request.remote_addr.is_none());
    }
}
