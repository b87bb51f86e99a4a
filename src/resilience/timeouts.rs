//! Upstream deadlines.
//!
//! The deadline covers connecting, sending, any redirect hops and waiting
//! for response headers. On expiry the wrapped future is dropped, which
//! closes the upstream connection, and the call settles as
//! `UpstreamTimeout` (rendered as 504). A `None` limit never expires.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProxyError, Result};

/// Run `fut` with a hard deadline.
pub async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::UpstreamTimeout(limit.as_millis() as u64)),
    }
}
