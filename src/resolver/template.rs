//! URI template target.
//!
//! Placeholders: `{protocol}`, `{host}`, `{port}` (the host server's own
//! identity), `{path}`, `{query}` and `{<param>}` for each route parameter.
//! Unknown placeholders are left untouched.

use async_trait::async_trait;

use crate::error::Result;
use crate::http::request::InboundRequest;
use crate::resolver::{ResolvedTarget, UriResolver};

#[derive(Debug, Clone)]
pub struct TemplateResolver {
    template: String,
    literal: bool,
}

impl TemplateResolver {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let literal = !template.contains('{');
        Self { template, literal }
    }

    fn render(&self, request: &InboundRequest) -> String {
        let mut out = String::with_capacity(self.template.len() + request.path.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };

            let name = &after[..close];
            match lookup(request, name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn lookup(request: &InboundRequest, name: &str) -> Option<String> {
    match name {
        "protocol" => Some(request.server.protocol.clone()),
        "host" => Some(request.server.host.clone()),
        "port" => Some(request.server.port.to_string()),
        "path" => Some(request.path.clone()),
        "query" => Some(request.search()),
        param => request.params.get(param).cloned(),
    }
}

#[async_trait]
impl UriResolver for TemplateResolver {
    async fn resolve(&self, request: &InboundRequest) -> Result<ResolvedTarget> {
        if self.literal {
            return Ok(ResolvedTarget::new(self.template.clone()));
        }
        Ok(ResolvedTarget::new(self.render(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ServerInfo;
    use axum::http::Method;

    fn request(path: &str) -> InboundRequest {
        InboundRequest::new(Method::GET, path, ServerInfo::new("http", "localhost", 9000))
    }

    #[tokio::test]
    async fn test_route_params_and_server_identity() {
        let resolver = TemplateResolver::new("{protocol}://{host}:{port}/go/{id}");
        let target = resolver.resolve(&request("/go/7").with_param("id", "7")).await.unwrap();
        assert_eq!(target.uri, "http://localhost:9000/go/7");
    }

    #[tokio::test]
    async fn test_path_and_query() {
        let resolver = TemplateResolver::new("https://upstream.example{path}{query}");
        let target = resolver.resolve(&request("/a/b?c=d")).await.unwrap();
        assert_eq!(target.uri, "https://upstream.example/a/b?c=d");

        let target = resolver.resolve(&request("/a/b")).await.unwrap();
        assert_eq!(target.uri, "https://upstream.example/a/b");
    }

    #[tokio::test]
    async fn test_literal_template_is_verbatim() {
        let uri = "https://some.upstream.service.com/that/has?what=you&want=todo";
        let resolver = TemplateResolver::new(uri);
        let target = resolver.resolve(&request("/ignored")).await.unwrap();
        assert_eq!(target.uri, uri);
    }

    #[tokio::test]
    async fn test_repeated_and_unknown_placeholders() {
        let resolver = TemplateResolver::new("http://{host}/{id}/{id}/{missing}/{unterminated");
        let target = resolver.resolve(&request("/").with_param("id", "x")).await.unwrap();
        assert_eq!(target.uri, "http://localhost/x/x/{missing}/{unterminated");
    }
}
