//! Configuration schema definitions.
//!
//! `ProxyOptions` mirrors what a host writes into a route's proxy block.
//! Every field is optional so plugin-level defaults can sit underneath
//! per-route options. Callbacks and overrides that cannot come from a file
//! are skipped by serde and set in code.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;
use serde::Deserialize;

use crate::agent::Agent;
use crate::client::HttpClient;
use crate::proxy::hooks::{OutboundRequestHook, UpstreamResponseHook};
use crate::resolver::UriResolver;

/// Default upstream timeout: three minutes.
pub const DEFAULT_TIMEOUT_MS: u64 = 3 * 60 * 1000;

/// Options for one proxy handler.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyOptions {
    /// Upstream host for the static target mode.
    pub host: Option<String>,

    /// Upstream port (defaults to 80 for http, 443 for https).
    pub port: Option<u16>,

    /// Upstream protocol for the static target mode.
    pub protocol: Option<Protocol>,

    /// Literal upstream URI or a `{placeholder}` template.
    pub uri: Option<String>,

    /// Copy inbound headers to the upstream and upstream headers to the reply.
    pub pass_through: Option<bool>,

    /// Forward cookies that are defined locally by the host.
    pub local_state_pass_through: Option<bool>,

    /// Keep `Accept-Encoding` when passing headers through (default true).
    pub accept_encoding: Option<bool>,

    /// Verify upstream TLS certificates (default true).
    pub reject_unauthorized: Option<bool>,

    /// Add `X-Forwarded-*` headers.
    pub xforward: Option<bool>,

    /// Redirect-following policy.
    pub redirects: Option<Redirects>,

    /// Upstream timeout in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Cache lifetime source for replies.
    pub ttl: Option<TtlMode>,

    /// Connection limit per pooled agent.
    pub max_sockets: Option<MaxSockets>,

    /// TLS protocol restriction, OpenSSL method naming (e.g. `TLSv1_2_method`).
    pub secure_protocol: Option<String>,

    /// Colon-separated TLS cipher suite list.
    pub ciphers: Option<String>,

    /// Emit the upstream round-trip time as an observability event.
    pub downstream_response_time: Option<bool>,

    #[serde(skip)]
    pub map_uri: Option<Arc<dyn UriResolver>>,

    #[serde(skip)]
    pub on_request: Option<Arc<dyn OutboundRequestHook>>,

    #[serde(skip)]
    pub on_response: Option<Arc<dyn UpstreamResponseHook>>,

    #[serde(skip)]
    pub agent: Option<Arc<Agent>>,

    #[serde(skip)]
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl ProxyOptions {
    /// Static target at `host:port` over plain HTTP.
    pub fn to_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    /// Literal URI or template target.
    pub fn to_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    /// Custom resolver target.
    pub fn with_resolver(resolver: Arc<dyn UriResolver>) -> Self {
        Self {
            map_uri: Some(resolver),
            ..Default::default()
        }
    }

    pub fn on_request(mut self, hook: Arc<dyn OutboundRequestHook>) -> Self {
        self.on_request = Some(hook);
        self
    }

    pub fn on_response(mut self, hook: Arc<dyn UpstreamResponseHook>) -> Self {
        self.on_response = Some(hook);
        self
    }

    pub fn with_agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Fill every unset field from `defaults`.
    pub fn layered_over(self, defaults: &ProxyOptions) -> ProxyOptions {
        ProxyOptions {
            host: self.host.or_else(|| defaults.host.clone()),
            port: self.port.or(defaults.port),
            protocol: self.protocol.or(defaults.protocol),
            uri: self.uri.or_else(|| defaults.uri.clone()),
            pass_through: self.pass_through.or(defaults.pass_through),
            local_state_pass_through: self
                .local_state_pass_through
                .or(defaults.local_state_pass_through),
            accept_encoding: self.accept_encoding.or(defaults.accept_encoding),
            reject_unauthorized: self.reject_unauthorized.or(defaults.reject_unauthorized),
            xforward: self.xforward.or(defaults.xforward),
            redirects: self.redirects.or(defaults.redirects),
            timeout_ms: self.timeout_ms.or(defaults.timeout_ms),
            ttl: self.ttl.or(defaults.ttl),
            max_sockets: self.max_sockets.or(defaults.max_sockets),
            secure_protocol: self.secure_protocol.or_else(|| defaults.secure_protocol.clone()),
            ciphers: self.ciphers.or_else(|| defaults.ciphers.clone()),
            downstream_response_time: self
                .downstream_response_time
                .or(defaults.downstream_response_time),
            map_uri: self.map_uri.or_else(|| defaults.map_uri.clone()),
            on_request: self.on_request.or_else(|| defaults.on_request.clone()),
            on_response: self.on_response.or_else(|| defaults.on_response.clone()),
            // The agent is replaced wholesale, never merged.
            agent: self.agent.or_else(|| defaults.agent.clone()),
            http_client: self.http_client.or_else(|| defaults.http_client.clone()),
        }
    }
}

impl fmt::Debug for ProxyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("uri", &self.uri)
            .field("pass_through", &self.pass_through)
            .field("local_state_pass_through", &self.local_state_pass_through)
            .field("accept_encoding", &self.accept_encoding)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("xforward", &self.xforward)
            .field("redirects", &self.redirects)
            .field("timeout_ms", &self.timeout_ms)
            .field("ttl", &self.ttl)
            .field("max_sockets", &self.max_sockets)
            .field("secure_protocol", &self.secure_protocol)
            .field("ciphers", &self.ciphers)
            .field("downstream_response_time", &self.downstream_response_time)
            .field("map_uri", &self.map_uri.is_some())
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("agent", &self.agent.is_some())
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}

/// Upstream protocol. Accepts `http`, `https`, `http:` and `https:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Protocol with its trailing colon, as used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http:",
            Protocol::Https => "https:",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix(':').unwrap_or(s) {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol '{}', expected http or https", other)),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Redirect-following policy: `false` or a maximum number of hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FlagOrCount")]
pub enum Redirects {
    Disabled,
    Limit(u32),
}

impl Default for Redirects {
    fn default() -> Self {
        Redirects::Disabled
    }
}

/// Per-agent connection limit: `false` disables pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "FlagOrCount")]
pub enum MaxSockets {
    Disabled,
    Unbounded,
    Limit(NonZeroUsize),
}

impl Default for MaxSockets {
    fn default() -> Self {
        MaxSockets::Unbounded
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagOrCount {
    Flag(bool),
    Count(u64),
}

impl TryFrom<FlagOrCount> for Redirects {
    type Error = String;

    fn try_from(value: FlagOrCount) -> Result<Self, Self::Error> {
        match value {
            FlagOrCount::Flag(false) => Ok(Redirects::Disabled),
            FlagOrCount::Flag(true) => Err("redirects must be false or a non-negative integer".into()),
            FlagOrCount::Count(n) => u32::try_from(n)
                .map(Redirects::Limit)
                .map_err(|_| format!("redirects limit {} is too large", n)),
        }
    }
}

impl TryFrom<FlagOrCount> for MaxSockets {
    type Error = String;

    fn try_from(value: FlagOrCount) -> Result<Self, Self::Error> {
        match value {
            FlagOrCount::Flag(false) => Ok(MaxSockets::Disabled),
            FlagOrCount::Flag(true) => Err("max_sockets must be false or a positive integer".into()),
            FlagOrCount::Count(n) => usize::try_from(n)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(MaxSockets::Limit)
                .ok_or_else(|| "max_sockets must be a positive integer".to_string()),
        }
    }
}

/// Source of the reply cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlMode {
    /// Derive the TTL from the upstream `Cache-Control: max-age`.
    Upstream,
}

/// Opaque value made available to hooks as their bind context.
pub type BindContext = Arc<dyn Any + Send + Sync>;

/// Host facts about the route a proxy handler is mounted on.
#[derive(Clone, Default)]
pub struct RouteSettings {
    /// Route path, used in configuration error messages.
    pub path: String,

    /// How the host delivers the request payload. `None` means raw passthrough.
    pub payload: Option<PayloadSettings>,

    /// Context handed to hooks.
    pub bind: Option<BindContext>,
}

impl RouteSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_payload(mut self, payload: PayloadSettings) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_bind<T: Any + Send + Sync>(mut self, bind: T) -> Self {
        self.bind = Some(Arc::new(bind));
        self
    }
}

impl fmt::Debug for RouteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSettings")
            .field("path", &self.path)
            .field("payload", &self.payload)
            .field("bind", &self.bind.is_some())
            .finish()
    }
}

/// Route payload handling as configured on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PayloadSettings {
    pub output: PayloadOutput,
    pub parse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadOutput {
    Data,
    Stream,
    File,
}

/// Payload settings a proxied route should use for `method`.
///
/// Every method that may carry a body gets an unparsed stream; GET and HEAD
/// need nothing.
pub fn handler_defaults(method: &Method) -> Option<PayloadSettings> {
    if method == Method::GET || method == Method::HEAD {
        return None;
    }
    Some(PayloadSettings {
        output: PayloadOutput::Stream,
        parse: false,
    })
}
