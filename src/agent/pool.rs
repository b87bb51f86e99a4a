//! Agent pool.
//!
//! # Responsibilities
//! - Hand out the agent for an upstream destination
//! - Create each agent exactly once, even under concurrent first use
//!
//! # Design Decisions
//! - Owned by the host integration and shared via `Arc`, never global
//! - Agents are never evicted; the pool lives as long as its owner

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};

use url::Url;

use crate::agent::{Agent, AgentKey, AgentSelector, TrustMode};
use crate::config::schema::MaxSockets;
use crate::config::settings::ProxySettings;
use crate::error::Result;
use crate::observability::metrics;

#[derive(Debug, Default)]
pub struct AgentPool {
    agents: DashMap<AgentKey, Arc<Agent>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent for `destination` (an upstream origin).
    ///
    /// Returns the route's explicit agent if one is set, and `None` when
    /// pooling is disabled.
    pub fn acquire(
        &self,
        scheme: &str,
        settings: &ProxySettings,
        destination: &str,
    ) -> Result<Option<Arc<Agent>>> {
        if let Some(agent) = &settings.agent {
            return Ok(Some(Arc::clone(agent)));
        }
        if settings.max_sockets == MaxSockets::Disabled {
            return Ok(None);
        }

        let trust = TrustMode::for_scheme(scheme, settings.reject_unauthorized);
        let key = AgentKey {
            destination: destination.to_string(),
            trust,
            tls: settings.tls.clone(),
        };

        if let Some(agent) = self.agents.get(&key) {
            return Ok(Some(Arc::clone(agent.value())));
        }

        match self.agents.entry(key) {
            Entry::Occupied(entry) => Ok(Some(Arc::clone(entry.get()))),
            Entry::Vacant(entry) => {
                let agent = Arc::new(Agent::new(trust, settings.max_sockets, settings.tls.as_ref())?);
                tracing::info!(
                    destination = %destination,
                    trust = trust.as_str(),
                    max_sockets = ?settings.max_sockets,
                    "Created upstream agent"
                );
                metrics::record_agent_created(trust.as_str());
                entry.insert(Arc::clone(&agent));
                Ok(Some(agent))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Selects agents from a shared pool under one handler's settings.
#[derive(Debug, Clone)]
pub struct PoolSelector {
    pool: Arc<AgentPool>,
    settings: Arc<ProxySettings>,
}

impl PoolSelector {
    pub fn new(pool: Arc<AgentPool>, settings: Arc<ProxySettings>) -> Self {
        Self { pool, settings }
    }
}

impl AgentSelector for PoolSelector {
    fn select(&self, uri: &Url) -> Result<Option<Arc<Agent>>> {
        let destination = uri.origin().ascii_serialization();
        self.pool.acquire(uri.scheme(), &self.settings, &destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProxyOptions, RouteSettings};
    use tokio::sync::Barrier;

    fn settings(options: ProxyOptions) -> ProxySettings {
        ProxySettings::compile(options, &ProxyOptions::default(), &RouteSettings::new("/")).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_creates_one_agent() {
        let pool = Arc::new(AgentPool::new());
        let settings = Arc::new(settings(ProxyOptions::to_host("localhost", 9000)));
        let barrier = Arc::new(Barrier::new(32));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let pool = Arc::clone(&pool);
            let settings = Arc::clone(&settings);
            let barrier = Arc::clone(&barrier);
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                pool.acquire("http", &settings, "http://localhost:9000")
                    .unwrap()
                    .unwrap()
            }));
        }

        let mut agents = Vec::new();
        for task in tasks {
            agents.push(task.await.unwrap());
        }

        assert_eq!(pool.len(), 1);
        assert!(agents.iter().all(|a| Arc::ptr_eq(a, &agents[0])));
    }

    #[tokio::test]
    async fn test_keys_separate_trust_modes_and_destinations() {
        let pool = AgentPool::new();
        let verified = settings(ProxyOptions::to_host("example.com", 443));
        let insecure = settings(ProxyOptions {
            reject_unauthorized: Some(false),
            ..ProxyOptions::to_host("example.com", 443)
        });

        let a = pool.acquire("https", &verified, "https://example.com").unwrap().unwrap();
        let b = pool.acquire("https", &insecure, "https://example.com").unwrap().unwrap();
        let c = pool.acquire("http", &verified, "http://example.com").unwrap().unwrap();
        let d = pool.acquire("https", &verified, "https://example.com").unwrap().unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(a.trust(), TrustMode::TlsVerified);
        assert_eq!(b.trust(), TrustMode::TlsInsecure);
        assert_eq!(c.trust(), TrustMode::Plain);
        assert!(Arc::ptr_eq(&a, &d));
    }

    #[tokio::test]
    async fn test_disabled_pooling_returns_none() {
        let pool = AgentPool::new();
        let settings = settings(ProxyOptions {
            max_sockets: Some(MaxSockets::Disabled),
            ..ProxyOptions::to_host("localhost", 9000)
        });
        assert!(pool.acquire("http", &settings, "http://localhost:9000").unwrap().is_none());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_selector_keys_by_origin_and_scheme() {
        let pool = Arc::new(AgentPool::new());
        let selector = PoolSelector::new(
            Arc::clone(&pool),
            Arc::new(settings(ProxyOptions {
                reject_unauthorized: Some(false),
                ..ProxyOptions::to_host("localhost", 9000)
            })),
        );

        let plain = selector.select(&Url::parse("http://localhost:9000/a").unwrap()).unwrap().unwrap();
        let again = selector.select(&Url::parse("http://localhost:9000/b?c=d").unwrap()).unwrap().unwrap();
        let secure = selector.select(&Url::parse("https://localhost:9443/a").unwrap()).unwrap().unwrap();

        assert!(Arc::ptr_eq(&plain, &again));
        assert_eq!(plain.trust(), TrustMode::Plain);
        assert_eq!(secure.trust(), TrustMode::TlsInsecure);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_agent_wins() {
        let pool = AgentPool::new();
        let agent = Arc::new(Agent::unpooled(TrustMode::Plain, None).unwrap());
        let settings = settings(ProxyOptions::to_host("localhost", 9000).with_agent(Arc::clone(&agent)));

        let acquired = pool.acquire("http", &settings, "http://localhost:9000").unwrap().unwrap();
        assert!(Arc::ptr_eq(&acquired, &agent));
        assert!(pool.is_empty());
    }
}
