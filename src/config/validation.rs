//! Configuration validation.
//!
//! # Responsibilities
//! - Enforce exactly one target-selection mode
//! - Reject option combinations that contradict each other
//! - Reject routes whose payload the host already parsed
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure functions over the options; nothing is built here

use thiserror::Error;

use crate::config::schema::{PayloadOutput, ProxyOptions, RouteSettings};

/// A single semantic problem with a proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("one of host, uri or map_uri is required")]
    MissingTarget,

    #[error("only one of host, uri or map_uri may be set (found {})", .0.join(", "))]
    ConflictingTargets(Vec<&'static str>),

    #[error("{option} is not allowed together with {with}")]
    Forbidden {
        option: &'static str,
        with: &'static str,
    },

    #[error("accept_encoding requires pass_through")]
    AcceptEncodingWithoutPassThrough,

    #[error("invalid TLS settings: {0}")]
    Tls(String),

    #[error("cannot proxy if payload is parsed or if output is not stream or data")]
    ParsedPayload,
}

/// Validate route-level proxy options.
pub fn validate_options(options: &ProxyOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut targets = Vec::new();
    if options.host.is_some() {
        targets.push("host");
    }
    if options.uri.is_some() {
        targets.push("uri");
    }
    if options.map_uri.is_some() {
        targets.push("map_uri");
    }
    match targets.len() {
        0 => errors.push(ValidationError::MissingTarget),
        1 => {}
        _ => errors.push(ValidationError::ConflictingTargets(targets)),
    }

    for (with, set) in [("map_uri", options.map_uri.is_some()), ("uri", options.uri.is_some())] {
        if !set {
            continue;
        }
        if options.port.is_some() {
            errors.push(ValidationError::Forbidden { option: "port", with });
        }
        if options.protocol.is_some() {
            errors.push(ValidationError::Forbidden { option: "protocol", with });
        }
    }

    if options.accept_encoding.is_some() && options.pass_through != Some(true) {
        errors.push(ValidationError::AcceptEncodingWithoutPassThrough);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the host route a proxy handler is mounted on.
pub fn validate_route(route: &RouteSettings) -> Result<(), Vec<ValidationError>> {
    match route.payload {
        Some(payload)
            if payload.parse
                || !matches!(payload.output, PayloadOutput::Data | PayloadOutput::Stream) =>
        {
            Err(vec![ValidationError::ParsedPayload])
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PayloadSettings, Protocol};
    use crate::resolver;
    use crate::resolver::ResolvedTarget;

    #[test]
    fn test_requires_a_target() {
        let errors = validate_options(&ProxyOptions::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingTarget]);
    }

    #[test]
    fn test_rejects_multiple_targets() {
        let options = ProxyOptions {
            uri: Some("http://localhost".into()),
            ..ProxyOptions::to_host("localhost", 80)
        };
        let errors = validate_options(&options).unwrap_err();
        assert!(errors.contains(&ValidationError::ConflictingTargets(vec!["host", "uri"])));
    }

    #[test]
    fn test_resolver_forbids_port_and_protocol() {
        let options = ProxyOptions {
            port: Some(80),
            protocol: Some(Protocol::Http),
            ..ProxyOptions::with_resolver(resolver::from_fn(|_req| async {
                Ok(ResolvedTarget::new("http://localhost"))
            }))
        };
        let errors = validate_options(&options).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::Forbidden { option: "port", with: "map_uri" }));
    }

    #[test]
    fn test_accept_encoding_needs_pass_through() {
        let options = ProxyOptions {
            accept_encoding: Some(false),
            ..ProxyOptions::to_host("localhost", 80)
        };
        assert_eq!(
            validate_options(&options).unwrap_err(),
            vec![ValidationError::AcceptEncodingWithoutPassThrough]
        );

        let options = ProxyOptions {
            accept_encoding: Some(false),
            pass_through: Some(true),
            ..ProxyOptions::to_host("localhost", 80)
        };
        assert!(validate_options(&options).is_ok());
    }

    #[test]
    fn test_route_payload_rules() {
        let parsed = RouteSettings::new("/").with_payload(PayloadSettings {
            output: PayloadOutput::Data,
            parse: true,
        });
        assert!(validate_route(&parsed).is_err());

        let file = RouteSettings::new("/").with_payload(PayloadSettings {
            output: PayloadOutput::File,
            parse: false,
        });
        assert!(validate_route(&file).is_err());

        let data = RouteSettings::new("/").with_payload(PayloadSettings {
            output: PayloadOutput::Data,
            parse: false,
        });
        assert!(validate_route(&data).is_ok());
        assert!(validate_route(&RouteSettings::new("/")).is_ok());
    }
}
