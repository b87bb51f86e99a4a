//! `X-Forwarded-*` synthesis.
//!
//! `X-Forwarded-For` is always comma-appended. Port, proto and host are
//! only set when nothing upstream-bound already carries them.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PORT: HeaderName = HeaderName::from_static("x-forwarded-port");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Append `address` to an existing `X-Forwarded-For` chain.
///
/// Works on raw bytes so an obs-text chain survives unchanged.
pub fn append_forwarded_for(existing: Option<&[u8]>, address: &str) -> Vec<u8> {
    match existing {
        Some(chain) if !chain.is_empty() => {
            let mut joined = Vec::with_capacity(chain.len() + 1 + address.len());
            joined.extend_from_slice(chain);
            joined.push(b',');
            joined.extend_from_slice(address.as_bytes());
            joined
        }
        _ => address.as_bytes().to_vec(),
    }
}

/// Add forwarding headers for a client at `remote`.
pub fn apply(headers: &mut HeaderMap, remote: SocketAddr, protocol: &str, host: Option<&str>) {
    let existing = headers.get(&X_FORWARDED_FOR).map(HeaderValue::as_bytes);
    let chain = append_forwarded_for(existing, &remote.ip().to_string());
    if let Ok(value) = HeaderValue::from_bytes(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    set_if_absent(headers, X_FORWARDED_PORT, &remote.port().to_string());
    set_if_absent(headers, X_FORWARDED_PROTO, protocol);
    if let Some(host) = host {
        set_if_absent(headers, X_FORWARDED_HOST, host);
    }
}

fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if headers.contains_key(&name) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
