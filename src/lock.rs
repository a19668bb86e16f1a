//! Process-wide named locks.
//!
//! Every zone transaction holds a named lock from fetch to store. The guard
//! releases the lock when dropped, on every exit path.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::error::{Result, ZoneError};
use crate::metrics::{self, Timer};

static GLOBAL: OnceLock<NamedLocks> = OnceLock::new();

/// Registry of async mutexes keyed by name.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct NamedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NamedLocks {
    /// Create a registry independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by everything in this process.
    pub fn global() -> &'static NamedLocks {
        GLOBAL.get_or_init(NamedLocks::new)
    }

    /// Acquire the lock called `name`, waiting at most `timeout` if given.
    pub async fn acquire(&self, name: &str, timeout: Option<Duration>) -> Result<NamedLockGuard> {
        let mutex = {
            let mut locks = self.inner.lock();
            locks.entry(name.to_string()).or_default().clone()
        };

        let timer = Timer::start();
        let guard = match timeout {
            Some(limit) => tokio::time::timeout(limit, mutex.lock_owned())
                .await
                .map_err(|_| ZoneError::LockTimeout {
                    name: name.to_string(),
                    waited: limit,
                })?,
            None => mutex.lock_owned().await,
        };

        let waited = timer.elapsed();
        metrics::record_lock_wait(waited);
        debug!(lock = name, waited_ms = waited.as_millis() as u64, "acquired lock");

        Ok(NamedLockGuard {
            name: name.to_string(),
            timer: Timer::start(),
            _guard: guard,
        })
    }

    /// Whether the named lock is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        let locks = self.inner.lock();
        locks
            .get(name)
            .map(|mutex| mutex.try_lock().is_err())
            .unwrap_or(false)
    }
}

/// Holds a named lock until dropped.
#[derive(Debug)]
pub struct NamedLockGuard {
    name: String,
    timer: Timer,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        debug!(
            lock = %self.name,
            held_ms = self.timer.elapsed().as_millis() as u64,
            "released lock"
        );
    }
}
