//! Redirect following rules.
//!
//! 301, 302, 307 and 308 keep the method and body; 303 switches to `GET`
//! without a body. `Location` is resolved against the current URI, so
//! relative and protocol-relative values work.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

use crate::error::{ProxyError, Result};

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Where the next hop goes and whether it still carries the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub uri: Url,
    pub method: Method,
    pub keep_body: bool,
}

/// Work out the hop for a redirect response.
pub fn next_hop(current: &Url, method: &Method, status: StatusCode, location: Option<&HeaderValue>) -> Result<RedirectHop> {
    let location = location
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProxyError::UpstreamProtocol("received redirect without location".into()))?;

    let uri = current
        .join(location)
        .map_err(|e| ProxyError::UpstreamProtocol(format!("invalid redirect location '{}': {}", location, e)))?;

    if uri.scheme() != "http" && uri.scheme() != "https" {
        return Err(ProxyError::UpstreamProtocol(format!(
            "unsupported redirect scheme '{}'",
            uri.scheme()
        )));
    }

    if status == StatusCode::SEE_OTHER {
        return Ok(RedirectHop {
            uri,
            method: Method::GET,
            keep_body: false,
        });
    }

    Ok(RedirectHop {
        uri,
        method: method.clone(),
        keep_body: true,
    })
}

/// Drop headers that describe a body that is no longer sent.
pub fn strip_body_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::TRANSFER_ENCODING);
}
