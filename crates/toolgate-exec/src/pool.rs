//! Connection pool with injected lifetime policy.
//!
//! Connections are keyed by server id and reused across calls. The
//! idle-timeout policy is injected through [`PoolConfig`] and staleness
//! is collected by an explicit [`ConnectionPool::sweep_stale`] call -
//! there is no background task, so tests construct a pool with a short
//! timeout and drive the sweep themselves.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use toolgate_core::ServerId;

use crate::error::ExecResult;

/// Lifetime policy for pooled connections.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// How long an unused connection stays eligible for reuse.
    pub idle_timeout: Duration,
}

impl PoolConfig {
    /// Policy with the given idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }
}

impl Default for PoolConfig {
    /// Five minutes of idle tolerance.
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

struct PoolEntry<C> {
    conn: Arc<C>,
    last_used: Instant,
}

/// Connections keyed by server id.
///
/// Reuse refreshes the idle clock. When two callers race to connect to
/// the same server, the first insertion wins and the loser's fresh
/// connection is dropped.
pub struct ConnectionPool<C> {
    entries: Mutex<HashMap<ServerId, PoolEntry<C>>>,
    config: PoolConfig,
}

impl<C> ConnectionPool<C> {
    /// An empty pool with the given policy.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The pooled connection for `id`, if one is live. Refreshes the
    /// idle clock.
    pub async fn get(&self, id: &ServerId) -> Option<Arc<C>> {
        let mut entries = self.entries.lock().await;
        entries.get_mut(id).map(|entry| {
            entry.last_used = Instant::now();
            Arc::clone(&entry.conn)
        })
    }

    /// The pooled connection for `id`, connecting with `connect` on a
    /// miss.
    ///
    /// `connect` runs without the pool lock held, so a slow dial does
    /// not stall other servers' lookups; if another caller connected in
    /// the meantime, their connection is kept and this one is dropped.
    ///
    /// # Errors
    ///
    /// Propagates the error `connect` reports.
    pub async fn get_or_connect<F, Fut>(&self, id: &ServerId, connect: F) -> ExecResult<Arc<C>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecResult<C>>,
    {
        if let Some(conn) = self.get(id).await {
            return Ok(conn);
        }

        let fresh = Arc::new(connect().await?);

        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get_mut(id) {
            existing.last_used = Instant::now();
            return Ok(Arc::clone(&existing.conn));
        }
        entries.insert(
            *id,
            PoolEntry {
                conn: Arc::clone(&fresh),
                last_used: Instant::now(),
            },
        );
        tracing::debug!(server = %id, "pooled new connection");
        Ok(fresh)
    }

    /// Drop the pooled connection for `id`, returning it if present.
    pub async fn remove(&self, id: &ServerId) -> Option<Arc<C>> {
        let mut entries = self.entries.lock().await;
        entries.remove(id).map(|entry| entry.conn)
    }

    /// Drop every connection idle longer than the configured timeout.
    /// Returns how many were dropped.
    pub async fn sweep_stale(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let idle_timeout = self.config.idle_timeout;
        entries.retain(|_, entry| entry.last_used.elapsed() < idle_timeout);
        let swept = before.saturating_sub(entries.len());
        if swept > 0 {
            tracing::debug!(swept, "swept stale connections");
        }
        swept
    }

    /// Number of live pooled connections.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the pool is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<C> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle_timeout", &self.config.idle_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeConn(usize);

    #[tokio::test]
    async fn test_connect_once_then_reuse() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let id = ServerId::new();
        let dials = AtomicUsize::new(0);

        for _ in 0..3 {
            let conn = pool
                .get_or_connect(&id, || async {
                    Ok(FakeConn(dials.fetch_add(1, Ordering::SeqCst)))
                })
                .await
                .unwrap();
            assert_eq!(conn.0, 0);
        }
        assert_eq!(dials.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_connections() {
        let pool = ConnectionPool::new(PoolConfig::with_idle_timeout(Duration::from_millis(20)));
        let id = ServerId::new();
        pool.get_or_connect(&id, || async { Ok(FakeConn(0)) })
            .await
            .unwrap();

        // Not yet stale.
        assert_eq!(pool.sweep_stale().await, 0);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(pool.sweep_stale().await, 1);
        assert!(pool.is_empty().await);

        // Next use reconnects.
        let conn = pool
            .get_or_connect(&id, || async { Ok(FakeConn(7)) })
            .await
            .unwrap();
        assert_eq!(conn.0, 7);
    }

    #[tokio::test]
    async fn test_use_refreshes_idle_clock() {
        let pool = ConnectionPool::new(PoolConfig::with_idle_timeout(Duration::from_millis(50)));
        let id = ServerId::new();
        pool.get_or_connect(&id, || async { Ok(FakeConn(0)) })
            .await
            .unwrap();

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert!(pool.get(&id).await.is_some());
        }
        // Kept alive by use despite total elapsed time past the timeout.
        assert_eq!(pool.sweep_stale().await, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let id = ServerId::new();
        pool.get_or_connect(&id, || async { Ok(FakeConn(0)) })
            .await
            .unwrap();

        assert!(pool.remove(&id).await.is_some());
        assert!(pool.remove(&id).await.is_none());
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_pool_empty() {
        let pool: ConnectionPool<FakeConn> = ConnectionPool::new(PoolConfig::default());
        let id = ServerId::new();
        let result = pool
            .get_or_connect(&id, || async {
                Err(crate::ExecError::Connect {
                    server: id,
                    message: "refused".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert!(pool.is_empty().await);
    }
}
