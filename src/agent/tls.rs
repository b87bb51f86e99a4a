//! Client-side TLS for upstream connections.
//!
//! # Responsibilities
//! - Validate cipher and protocol names at configuration time
//! - Build rustls client configs for verified and insecure trust modes
//!
//! # Design Decisions
//! - Cipher names may be IANA (`TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256`) or
//!   OpenSSL style (`ECDHE-RSA-AES128-GCM-SHA256`), separated by `:`
//! - Only suites the ring provider implements can be selected
//! - Insecure mode still checks handshake signatures, only the chain is skipped

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CipherSuite, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme, SupportedProtocolVersion};

use crate::config::validation::ValidationError;

/// Custom TLS connection parameters of a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TlsParams {
    pub ciphers: Option<String>,
    pub secure_protocol: Option<String>,
}

impl TlsParams {
    /// Validate the raw option strings. `Ok(None)` when neither is set.
    pub fn from_options(
        ciphers: Option<&str>,
        secure_protocol: Option<&str>,
    ) -> Result<Option<Self>, ValidationError> {
        if ciphers.is_none() && secure_protocol.is_none() {
            return Ok(None);
        }

        let params = Self {
            ciphers: ciphers.map(str::to_string),
            secure_protocol: secure_protocol.map(str::to_string),
        };
        // Building once surfaces unknown names and impossible combinations.
        params.client_config(true)?;
        Ok(Some(params))
    }

    /// Build a client config for these parameters.
    pub fn client_config(&self, verify: bool) -> Result<ClientConfig, ValidationError> {
        build_client_config(Some(self), verify)
    }
}

/// Build a rustls client config; `verify = false` accepts any certificate.
pub fn build_client_config(params: Option<&TlsParams>, verify: bool) -> Result<ClientConfig, ValidationError> {
    let mut provider = ring::default_provider();
    let mut versions: &[&'static SupportedProtocolVersion] = rustls::ALL_VERSIONS;

    if let Some(params) = params {
        if let Some(list) = &params.ciphers {
            let wanted = parse_cipher_list(list)?;
            provider.cipher_suites.retain(|suite| wanted.contains(&suite.suite()));
            if provider.cipher_suites.is_empty() {
                return Err(ValidationError::Tls(format!("no supported cipher suites in '{}'", list)));
            }
        }
        if let Some(name) = &params.secure_protocol {
            versions = protocol_versions(name)?;
        }
    }

    let algorithms = provider.signature_verification_algorithms;
    let builder = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(versions)
        .map_err(|e| ValidationError::Tls(e.to_string()))?;

    let config = if verify {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert { algorithms }))
            .with_no_client_auth()
    };
    Ok(config)
}

fn protocol_versions(name: &str) -> Result<&'static [&'static SupportedProtocolVersion], ValidationError> {
    static TLS12_ONLY: [&SupportedProtocolVersion; 1] = [&rustls::version::TLS12];
    static TLS13_ONLY: [&SupportedProtocolVersion; 1] = [&rustls::version::TLS13];

    match name {
        "TLSv1_2_method" | "TLSv1_2_client_method" | "TLSv1.2" => Ok(&TLS12_ONLY),
        "TLSv1_3_method" | "TLSv1_3_client_method" | "TLSv1.3" => Ok(&TLS13_ONLY),
        "TLS_method" | "TLS_client_method" | "SSLv23_method" | "SSLv23_client_method" => {
            Ok(rustls::ALL_VERSIONS)
        }
        other => Err(ValidationError::Tls(format!("unsupported secure protocol '{}'", other))),
    }
}

fn parse_cipher_list(list: &str) -> Result<Vec<CipherSuite>, ValidationError> {
    let mut suites = Vec::new();
    for name in list.split([':', ',']).map(str::trim).filter(|n| !n.is_empty()) {
        // OpenSSL exclusions (`!RC4`, `-aNULL`) name nothing rustls offers.
        if name.starts_with(['!', '-', '+']) {
            continue;
        }
        match cipher_suite(name) {
            Some(suite) => suites.push(suite),
            None => return Err(ValidationError::Tls(format!("unsupported cipher '{}'", name))),
        }
    }
    Ok(suites)
}

fn cipher_suite(name: &str) -> Option<CipherSuite> {
    let suite = match name {
        "TLS_AES_128_GCM_SHA256" | "TLS13_AES_128_GCM_SHA256" => CipherSuite::TLS13_AES_128_GCM_SHA256,
        "TLS_AES_256_GCM_SHA384" | "TLS13_AES_256_GCM_SHA384" => CipherSuite::TLS13_AES_256_GCM_SHA384,
        "TLS_CHACHA20_POLY1305_SHA256" | "TLS13_CHACHA20_POLY1305_SHA256" => {
            CipherSuite::TLS13_CHACHA20_POLY1305_SHA256
        }
        "ECDHE-ECDSA-AES128-GCM-SHA256" | "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256" => {
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
        }
        "ECDHE-ECDSA-AES256-GCM-SHA384" | "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384" => {
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
        }
        "ECDHE-ECDSA-CHACHA20-POLY1305" | "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256" => {
            CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
        }
        "ECDHE-RSA-AES128-GCM-SHA256" | "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256" => {
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        }
        "ECDHE-RSA-AES256-GCM-SHA384" | "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384" => {
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
        }
        "ECDHE-RSA-CHACHA20-POLY1305" | "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256" => {
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
        }
        _ => return None,
    };
    Some(suite)
}

/// Verifier for `reject_unauthorized = false`.
#[derive(Debug)]
struct AcceptAnyCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_params_is_none() {
        assert_eq!(TlsParams::from_options(None, None).unwrap(), None);
    }

    #[test]
    fn test_accepts_openssl_and_iana_names() {
        let params = TlsParams::from_options(
            Some("ECDHE-RSA-AES128-GCM-SHA256:TLS_AES_128_GCM_SHA256"),
            Some("TLS_method"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(params.secure_protocol.as_deref(), Some("TLS_method"));
    }

    #[test]
    fn test_tls12_with_tls12_suite() {
        let params = TlsParams::from_options(Some("ECDHE-RSA-AES256-GCM-SHA384"), Some("TLSv1_2_method"));
        assert!(params.is_ok());
    }

    #[test]
    fn test_rejects_unsupported_cipher() {
        let err = TlsParams::from_options(Some("ECDHE-RSA-AES128-SHA256"), Some("TLSv1_2_method")).unwrap_err();
        assert!(matches!(err, ValidationError::Tls(msg) if msg.contains("ECDHE-RSA-AES128-SHA256")));
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        assert!(TlsParams::from_options(None, Some("SSLv3_method")).is_err());
    }

    #[test]
    fn test_rejects_suites_without_matching_version() {
        // A TLS 1.3-only suite cannot be negotiated over TLS 1.2.
        let err = TlsParams::from_options(Some("TLS_AES_128_GCM_SHA256"), Some("TLSv1_2_method")).unwrap_err();
        assert!(matches!(err, ValidationError::Tls(_)));
    }

    #[test]
    fn test_exclusions_are_ignored() {
        let params = TlsParams::from_options(Some("ECDHE-RSA-AES128-GCM-SHA256:!RC4:!aNULL"), None);
        assert!(params.is_ok());
    }

    #[test]
    fn test_insecure_config_builds() {
        assert!(build_client_config(None, false).is_ok());
        assert!(build_client_config(None, true).is_ok());
    }
}
