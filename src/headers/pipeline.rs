//! Outbound header construction.
//!
//! Steps run in a fixed order:
//! 1. pass-through copy (minus `Host` and `Content-Length`)
//! 2. `Accept-Encoding` removal
//! 3. cookie filtering
//! 4. resolver headers (override)
//! 5. `X-Forwarded-*`
//! 6. `Content-Type` copy
//! 7. `Transfer-Encoding: chunked` for DELETE with a body
//!
//! TLS parameters travel on the request, never as headers.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::config::settings::ProxySettings;
use crate::error::{ProxyError, Result};
use crate::headers::cookies::CookieFilter;
use crate::headers::forwarded;
use crate::http::request::InboundRequest;

/// Build the headers of the upstream request.
pub async fn build_outbound_headers(
    inbound: &InboundRequest,
    extra: &HeaderMap,
    settings: &ProxySettings,
    cookies: &dyn CookieFilter,
) -> Result<HeaderMap> {
    let mut headers = if settings.pass_through {
        copy_collapsed(&inbound.headers)
    } else {
        HeaderMap::new()
    };

    if settings.pass_through && settings.accept_encoding == Some(false) {
        headers.remove(header::ACCEPT_ENCODING);
    }

    if settings.pass_through {
        if let Some(cookie) = headers.remove(header::COOKIE) {
            let raw = latin1_decode(cookie.as_bytes());
            let filtered = cookies.filter(&raw, settings.local_state_pass_through).await?;
            if !filtered.is_empty() {
                headers.insert(header::COOKIE, latin1_header(&filtered)?);
            }
        }
    }

    for name in extra.keys() {
        headers.remove(name);
        for value in extra.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    if settings.xforward {
        if let Some(remote) = inbound.remote_addr {
            forwarded::apply(&mut headers, remote, &inbound.server.protocol, inbound.host());
        }
    }

    if let Some(content_type) = inbound.headers.get(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }

    if !headers.contains_key(header::TRANSFER_ENCODING)
        && inbound.has_body()
        && inbound.method == Method::DELETE
    {
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    }

    Ok(headers)
}

/// Each header byte becomes the char with the same code point.
fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn latin1_header(value: &str) -> Result<HeaderValue> {
    let bytes: Option<Vec<u8>> = value.chars().map(|c| u8::try_from(c).ok()).collect();
    bytes
        .and_then(|bytes| HeaderValue::from_bytes(&bytes).ok())
        .ok_or_else(|| ProxyError::CookieFilter("filtered cookie is not a valid header value".into()))
}

/// Copy request headers, joining repeated fields into one value.
fn copy_collapsed(source: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(source.keys_len());
    for name in source.keys() {
        if name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        let mut values = source.get_all(name).iter();
        let Some(first) = values.next() else { continue };
        let rest: Vec<&HeaderValue> = values.collect();
        if rest.is_empty() {
            out.insert(name.clone(), first.clone());
            continue;
        }

        let separator: &[u8] = if name == header::COOKIE { b"; " } else { b", " };
        let mut joined = first.as_bytes().to_vec();
        for value in rest {
            joined.extend_from_slice(separator);
            joined.extend_from_slice(value.as_bytes());
        }
        match HeaderValue::from_bytes(&joined) {
            Ok(value) => {
                out.insert(name.clone(), value);
            }
            Err(_) => append_all(&mut out, name, source),
        }
    }
    out
}

fn append_all(out: &mut HeaderMap, name: &HeaderName, source: &HeaderMap) {
    for value in source.get_all(name) {
        out.append(name.clone(), value.clone());
    }
}
