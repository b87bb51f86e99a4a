//! hyper-util backed client.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, Uri};
use http_body_util::BodyExt;
use url::Url;

use crate::agent::tls::TlsParams;
use crate::agent::{Agent, AgentSelector, TrustMode};
use crate::client::redirect::{is_redirect, next_hop, strip_body_headers};
use crate::client::{HttpClient, OutboundBody, OutboundRequest};
use crate::config::schema::Redirects;
use crate::error::{ProxyError, Result};

/// Default client: sends through the request's agent and follows redirects.
///
/// A hop to another origin gets that origin's agent from the request's
/// selector, or a one-shot agent with the hop's trust mode.
#[derive(Debug, Clone, Default)]
pub struct WireClient;

impl WireClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HttpClient for WireClient {
    async fn request(&self, request: OutboundRequest) -> Result<Response<Body>> {
        let OutboundRequest {
            mut method,
            mut uri,
            mut headers,
            mut body,
            redirects,
            agent,
            agents,
            tls,
            reject_unauthorized,
        } = request;

        let mut agent = match agent {
            Some(agent) => agent,
            None => Arc::new(Agent::unpooled(
                TrustMode::for_scheme(uri.scheme(), reject_unauthorized),
                tls.as_ref(),
            )?),
        };

        let mut remaining = match redirects {
            Redirects::Disabled => None,
            Redirects::Limit(n) => Some(n),
        };

        // A redirect may need to replay the payload.
        if remaining.is_some() {
            if let OutboundBody::Streaming(stream) = body {
                let bytes = stream
                    .collect()
                    .await
                    .map_err(|e| ProxyError::UpstreamProtocol(format!("failed to read request payload: {}", e)))?
                    .to_bytes();
                body = OutboundBody::Buffered(bytes);
            }
        }

        loop {
            let target: Uri = uri
                .as_str()
                .parse()
                .map_err(|e| ProxyError::Resolution(format!("invalid upstream uri '{}': {}", uri, e)))?;

            let mut builder = Request::builder().method(method.clone()).uri(target);
            if let Some(h) = builder.headers_mut() {
                h.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            let outbound = builder
                .body(body.take_for_send())
                .map_err(|e| ProxyError::UpstreamProtocol(e.to_string()))?;

            let response = agent.send(outbound).await?;
            let status = response.status();

            let Some(left) = remaining else {
                return Ok(response);
            };
            if !is_redirect(status) {
                return Ok(response);
            }
            if left == 0 {
                return Err(ProxyError::UpstreamProtocol("maximum redirections reached".into()));
            }
            remaining = Some(left - 1);

            let hop = next_hop(&uri, &method, status, response.headers().get(header::LOCATION))?;
            tracing::debug!(status = %status, from = %uri, to = %hop.uri, "Following upstream redirect");

            if !hop.keep_body {
                body = OutboundBody::Empty;
                strip_body_headers(&mut headers);
            }
            if hop.uri.origin() != uri.origin() {
                agent = agent_for(agents.as_deref(), &hop.uri, tls.as_ref(), reject_unauthorized)?;
            }
            method = hop.method;
            uri = hop.uri;
        }
    }
}

fn agent_for(
    selector: Option<&dyn AgentSelector>,
    uri: &Url,
    tls: Option<&TlsParams>,
    reject_unauthorized: bool,
) -> Result<Arc<Agent>> {
    if let Some(agent) = selector.map(|s| s.select(uri)).transpose()?.flatten() {
        return Ok(agent);
    }
    let trust = TrustMode::for_scheme(uri.scheme(), reject_unauthorized);
    Ok(Arc::new(Agent::unpooled(trust, tls)?))
}
