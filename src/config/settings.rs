//! Compiled handler settings.
//!
//! `ProxySettings` is what a handler actually runs with: route options
//! layered over the host defaults, validated, with the resolver chosen and
//! TLS parameters checked. It is immutable once built.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::tls::TlsParams;
use crate::agent::Agent;
use crate::client::HttpClient;
use crate::config::loader::ConfigError;
use crate::config::schema::{
    MaxSockets, ProxyOptions, Redirects, RouteSettings, TtlMode, DEFAULT_TIMEOUT_MS,
};
use crate::config::validation::{validate_options, validate_route};
use crate::proxy::hooks::{OutboundRequestHook, UpstreamResponseHook};
use crate::resolver::{fixed::StaticResolver, template::TemplateResolver, UriResolver};

/// Validated, immutable settings of one proxy handler.
#[derive(Clone)]
pub struct ProxySettings {
    pub(crate) resolver: Arc<dyn UriResolver>,
    pub pass_through: bool,
    pub local_state_pass_through: bool,
    /// Only meaningful with `pass_through`; `Some(false)` strips `Accept-Encoding`.
    pub accept_encoding: Option<bool>,
    pub reject_unauthorized: bool,
    pub xforward: bool,
    pub redirects: Redirects,
    /// `None` when `timeout_ms = 0`: no deadline.
    pub timeout: Option<Duration>,
    pub ttl: Option<TtlMode>,
    pub max_sockets: MaxSockets,
    pub tls: Option<TlsParams>,
    pub downstream_response_time: bool,
    pub(crate) on_request: Option<Arc<dyn OutboundRequestHook>>,
    pub(crate) on_response: Option<Arc<dyn UpstreamResponseHook>>,
    pub(crate) agent: Option<Arc<Agent>>,
    pub(crate) http_client: Option<Arc<dyn HttpClient>>,
}

impl ProxySettings {
    /// Validate `options` for `route` and compile them over `defaults`.
    ///
    /// Validation runs on the route options alone; defaults only fill gaps.
    pub fn compile(
        options: ProxyOptions,
        defaults: &ProxyOptions,
        route: &RouteSettings,
    ) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        if let Err(mut e) = validate_options(&options) {
            errors.append(&mut e);
        }
        if let Err(mut e) = validate_route(route) {
            errors.append(&mut e);
        }

        let resolver: Option<Arc<dyn UriResolver>> = match (&options.map_uri, &options.uri, &options.host) {
            (Some(custom), _, _) => Some(Arc::clone(custom)),
            (None, Some(uri), _) => Some(Arc::new(TemplateResolver::new(uri.clone()))),
            (None, None, Some(host)) => Some(Arc::new(StaticResolver::new(
                options.protocol,
                host,
                options.port,
            ))),
            _ => None,
        };

        let merged = options.layered_over(defaults);

        let tls = match TlsParams::from_options(merged.ciphers.as_deref(), merged.secure_protocol.as_deref()) {
            Ok(tls) => tls,
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let resolver = match resolver {
            Some(resolver) if errors.is_empty() => resolver,
            _ => {
                return Err(ConfigError::Validation {
                    route: route.path.clone(),
                    errors,
                })
            }
        };

        Ok(Self {
            resolver,
            pass_through: merged.pass_through.unwrap_or(false),
            local_state_pass_through: merged.local_state_pass_through.unwrap_or(false),
            accept_encoding: merged.accept_encoding,
            reject_unauthorized: merged.reject_unauthorized.unwrap_or(true),
            xforward: merged.xforward.unwrap_or(false),
            redirects: merged.redirects.unwrap_or_default(),
            timeout: match merged.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS) {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            ttl: merged.ttl,
            max_sockets: merged.max_sockets.unwrap_or_default(),
            tls,
            downstream_response_time: merged.downstream_response_time.unwrap_or(false),
            on_request: merged.on_request,
            on_response: merged.on_response,
            agent: merged.agent,
            http_client: merged.http_client,
        })
    }

    pub fn upstream_ttl(&self) -> bool {
        self.ttl == Some(TtlMode::Upstream)
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("pass_through", &self.pass_through)
            .field("local_state_pass_through", &self.local_state_pass_through)
            .field("accept_encoding", &self.accept_encoding)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("xforward", &self.xforward)
            .field("redirects", &self.redirects)
            .field("timeout", &self.timeout)
            .field("ttl", &self.ttl)
            .field("max_sockets", &self.max_sockets)
            .field("tls", &self.tls)
            .field("downstream_response_time", &self.downstream_response_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PayloadOutput, PayloadSettings};
    use crate::config::validation::ValidationError;

    #[test]
    fn test_compile_applies_defaults() {
        let settings = ProxySettings::compile(
            ProxyOptions::to_host("localhost", 9000),
            &ProxyOptions::default(),
            &RouteSettings::new("/"),
        )
        .unwrap();
        assert!(!settings.pass_through);
        assert!(settings.reject_unauthorized);
        assert_eq!(settings.redirects, Redirects::Disabled);
        assert_eq!(settings.timeout, Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)));
        assert_eq!(settings.max_sockets, MaxSockets::Unbounded);
        assert!(settings.tls.is_none());
    }

    #[test]
    fn test_compile_uses_plugin_defaults() {
        let defaults = ProxyOptions {
            xforward: Some(true),
            timeout_ms: Some(25),
            ..Default::default()
        };
        let settings = ProxySettings::compile(
            ProxyOptions::to_host("localhost", 9000),
            &defaults,
            &RouteSettings::new("/"),
        )
        .unwrap();
        assert!(settings.xforward);
        assert_eq!(settings.timeout, Some(Duration::from_millis(25)));
    }

    #[test]
    fn test_zero_timeout_means_no_deadline() {
        let options = ProxyOptions {
            timeout_ms: Some(0),
            ..ProxyOptions::to_host("localhost", 9000)
        };
        let settings = ProxySettings::compile(options, &ProxyOptions::default(), &RouteSettings::new("/")).unwrap();
        assert_eq!(settings.timeout, None);
    }

    #[test]
    fn test_compile_collects_route_and_option_errors() {
        let route = RouteSettings::new("/upload").with_payload(PayloadSettings {
            output: PayloadOutput::Data,
            parse: true,
        });
        let err = ProxySettings::compile(ProxyOptions::default(), &ProxyOptions::default(), &route).unwrap_err();
        let errors = err.validation_errors();
        assert!(errors.contains(&ValidationError::MissingTarget));
        assert!(errors.contains(&ValidationError::ParsedPayload));
        assert!(err.to_string().contains("/upload"));
    }

    #[test]
    fn test_compile_rejects_unknown_tls_protocol() {
        let options = ProxyOptions {
            secure_protocol: Some("SSLv3_method".into()),
            ..ProxyOptions::to_host("localhost", 443)
        };
        let err = ProxySettings::compile(options, &ProxyOptions::default(), &RouteSettings::new("/")).unwrap_err();
        assert!(matches!(err.validation_errors(), [ValidationError::Tls(_)]));
    }
}
