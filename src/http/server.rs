//! axum adapter.
//!
//! # Responsibilities
//! - Mount a `ProxyHandler` on an axum route
//! - Convert the axum request (peer, path params, body) into an `InboundRequest`
//! - Render the reply or the error as an axum response
//!
//! Hosts that want the peer address must serve with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::RawPathParams,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
    RequestPartsExt,
};

use crate::http::request::{InboundRequest, ServerInfo};
use crate::proxy::ProxyHandler;

/// Route that proxies every method through `handler`.
pub fn proxy_route<S>(handler: Arc<ProxyHandler>, server: ServerInfo) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    any(move |request: Request<Body>| {
        let handler = Arc::clone(&handler);
        let server = server.clone();
        async move { dispatch(&handler, server, request).await }
    })
}

async fn dispatch(handler: &ProxyHandler, server: ServerInfo, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    // Routes without parameters have nothing to extract.
    let params: BTreeMap<String, String> = match parts.extract::<RawPathParams>().await {
        Ok(raw) => raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        Err(_) => BTreeMap::new(),
    };

    let inbound = InboundRequest::from_parts(parts, body, server).with_params(params);
    match handler.handle(inbound).await {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}
