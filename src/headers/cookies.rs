//! Cookie filtering for passed-through requests.
//!
//! # Responsibilities
//! - Define the host's cookie-filtering capability (`CookieFilter`)
//! - Provide `LocalStates`, a registry of cookies the host owns
//!
//! # Design Decisions
//! - Cookies the host does not define always go upstream
//! - A defined cookie's own pass-through flag beats the route fallback
//! - With nothing defined the header is forwarded untouched
//! - A header that is not `name=value` pairs is a client error

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{ProxyError, Result};

/// Host capability that decides which cookies go upstream.
#[async_trait]
pub trait CookieFilter: Send + Sync {
    /// Filter a `Cookie` header. `include_local` is the fallback for
    /// locally-defined cookies without their own setting. An empty result
    /// means no cookie is forwarded.
    ///
    /// `header` holds one char per header byte (Latin-1), and the result
    /// is encoded back the same way.
    async fn filter(&self, header: &str, include_local: bool) -> Result<String>;
}

/// Cookies defined by the host, each with an optional pass-through override.
#[derive(Debug, Clone, Default)]
pub struct LocalStates {
    definitions: BTreeMap<String, Option<bool>>,
}

impl LocalStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a cookie that follows the route fallback.
    pub fn define(mut self, name: impl Into<String>) -> Self {
        self.definitions.insert(name.into(), None);
        self
    }

    /// Define a cookie with its own pass-through setting.
    pub fn define_with_pass_through(mut self, name: impl Into<String>, pass_through: bool) -> Self {
        self.definitions.insert(name.into(), Some(pass_through));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Synchronous core of the filter.
    pub fn pass_through(&self, header: &str, fallback: bool) -> Result<String> {
        if self.definitions.is_empty() {
            return Ok(header.to_string());
        }

        let mut kept = Vec::new();
        for (name, value) in parse_pairs(header)? {
            let pass = match self.definitions.get(name) {
                Some(own) => own.unwrap_or(fallback),
                None => true,
            };
            if pass {
                kept.push(format!("{}={}", name, value));
            }
        }
        Ok(kept.join(";"))
    }
}

#[async_trait]
impl CookieFilter for LocalStates {
    async fn filter(&self, header: &str, include_local: bool) -> Result<String> {
        self.pass_through(header, include_local)
    }
}

/// Split a `Cookie` header into `(name, value)` pairs.
fn parse_pairs(header: &str) -> Result<Vec<(&str, &str)>> {
    let mut pairs = Vec::new();
    for segment in header.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((name, value)) = segment.split_once('=') else {
            return Err(ProxyError::CookieFilter(format!("malformed cookie segment '{}'", segment)));
        };
        let name = name.trim();
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '"') {
            return Err(ProxyError::CookieFilter(format!("invalid cookie name in '{}'", segment)));
        }
        pairs.push((name, value.trim()));
    }
    Ok(pairs)
}
