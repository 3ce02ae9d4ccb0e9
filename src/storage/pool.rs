//! Bounded pool of SQLite connections
//!
//! At most `size` connections are checked out at once. A caller that finds
//! the pool exhausted waits up to the acquire timeout, then fails with
//! [`Error::PoolTimeout`]. Connections go back to the idle list when the
//! guard drops.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::SqliteStore;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub size: usize,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 10,
            busy_timeout: Duration::from_millis(5000),
            acquire_timeout: Duration::from_secs(20),
        }
    }
}

struct PoolInner {
    path: PathBuf,
    options: PoolOptions,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<SqliteStore>>,
}

impl PoolInner {
    fn idle(&self) -> std::sync::MutexGuard<'_, Vec<SqliteStore>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared handle to the connection pool; cheap to clone
#[derive(Clone)]
pub struct StorePool {
    inner: Arc<PoolInner>,
}

impl StorePool {
    /// Open the pool, creating the database and schema up front
    pub fn open(path: &Path, options: PoolOptions) -> Result<Self> {
        let first = SqliteStore::open_with_timeout(path, options.busy_timeout)?;
        let size = options.size.max(1);
        tracing::info!(path = %path.display(), size, "Opened store pool");

        Ok(Self {
            inner: Arc::new(PoolInner {
                path: path.to_path_buf(),
                permits: Arc::new(Semaphore::new(size)),
                idle: Mutex::new(vec![first]),
                options: PoolOptions { size, ..options },
            }),
        })
    }

    /// Check out a connection, waiting while the pool is exhausted
    pub async fn acquire(&self) -> Result<PooledStore> {
        let permit = tokio::time::timeout(
            self.inner.options.acquire_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| Error::PoolTimeout)?
        .map_err(|_| Error::PoolClosed)?;

        let reused = self.inner.idle().pop();
        let store = match reused {
            Some(store) => store,
            None => {
                tracing::debug!("Opening new pooled connection");
                SqliteStore::open_with_timeout(&self.inner.path, self.inner.options.busy_timeout)?
            }
        };

        Ok(PooledStore {
            store: Some(store),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Run blocking store work on a pooled connection
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.acquire().await?;
        tokio::task::spawn_blocking(move || f(&mut conn))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
    }

    /// Stop handing out connections and drop the idle ones.
    ///
    /// Checked-out connections are closed when their guards drop.
    pub fn close(&self) -> usize {
        self.inner.permits.close();
        let drained: Vec<SqliteStore> = self.inner.idle().drain(..).collect();
        tracing::info!(closed = drained.len(), "Drained store pool");
        drained.len()
    }

    pub fn size(&self) -> usize {
        self.inner.options.size
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }
}

/// A checked-out connection; returns to the pool on drop
pub struct PooledStore {
    store: Option<SqliteStore>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledStore {
    type Target = SqliteStore;

    fn deref(&self) -> &SqliteStore {
        self.store.as_ref().expect("pooled store present until drop")
    }
}

impl DerefMut for PooledStore {
    fn deref_mut(&mut self) -> &mut SqliteStore {
        self.store.as_mut().expect("pooled store present until drop")
    }
}

impl Drop for PooledStore {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            if !self.pool.permits.is_closed() {
                self.pool.idle().push(store);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voter::NewVoter;

    fn options(size: usize) -> PoolOptions {
        PoolOptions {
            size,
            acquire_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let pool = StorePool::open(&dir.path().join("pool.db"), options(1)).unwrap();

        let held = pool.acquire().await.unwrap();
        assert!(matches!(pool.acquire().await, Err(Error::PoolTimeout)));

        drop(held);
        assert_eq!(pool.idle_count(), 1);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_connections_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = StorePool::open(&dir.path().join("pool.db"), options(2)).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let id = a.insert_voter(&NewVoter::new("Anbu", 1)).unwrap();
        assert_eq!(b.get_voter(id).unwrap().unwrap().name, "Anbu");
        drop((a, b));
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_run_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let pool = StorePool::open(&dir.path().join("pool.db"), options(2)).unwrap();

        let id = pool
            .run(|store| store.insert_voter(&NewVoter::new("Bala", 4)))
            .await
            .unwrap();
        assert!(id > 0);

        assert_eq!(pool.close(), 1);
        assert!(matches!(pool.acquire().await, Err(Error::PoolClosed)));
    }
}
