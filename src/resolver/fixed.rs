//! Static `protocol://host:port` target.

use async_trait::async_trait;

use crate::config::schema::Protocol;
use crate::error::Result;
use crate::http::request::InboundRequest;
use crate::resolver::{ResolvedTarget, UriResolver};

/// Forwards every request to the same origin, keeping path and query.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    base: String,
}

impl StaticResolver {
    /// Protocol defaults to http; port defaults to the protocol's well-known port.
    pub fn new(protocol: Option<Protocol>, host: &str, port: Option<u16>) -> Self {
        let protocol = protocol.unwrap_or(Protocol::Http);
        let port = port.unwrap_or_else(|| protocol.default_port());

        // Bare IPv6 literals need brackets in a URL.
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        Self {
            base: format!("{}//{}:{}", protocol.as_str(), host, port),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl UriResolver for StaticResolver {
    async fn resolve(&self, request: &InboundRequest) -> Result<ResolvedTarget> {
        Ok(ResolvedTarget::new(format!(
            "{}{}{}",
            self.base,
            request.path,
            request.search()
        )))
    }
}
