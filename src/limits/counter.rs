//! Per-path access counts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;

/// How `AccessCounter::hit` performs its read-modify-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    /// Increment under the map's shard lock. No update is ever lost.
    Synchronized,
    /// Read the count, wait `delay`, then store the read value plus one.
    ///
    /// Concurrent hits on the same path overwrite each other. This mode
    /// exists to observe lost updates and must stay racy.
    Unsynchronized { delay: Duration },
}

#[derive(Debug)]
pub struct AccessCounter {
    hits: DashMap<PathBuf, u64>,
    mode: CounterMode,
}

impl AccessCounter {
    pub fn new(mode: CounterMode) -> Self {
        Self {
            hits: DashMap::new(),
            mode,
        }
    }

    pub fn synchronized() -> Self {
        Self::new(CounterMode::Synchronized)
    }

    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    pub async fn hit(&self, path: &Path) {
        match self.mode {
            CounterMode::Synchronized => {
                *self.hits.entry(path.to_path_buf()).or_insert(0) += 1;
            }
            CounterMode::Unsynchronized { delay } => {
                let seen = self.count(path);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.hits.insert(path.to_path_buf(), seen + 1);
            }
        }
    }

    /// Current count for `path`, 0 if it was never hit.
    pub fn count(&self, path: &Path) -> u64 {
        self.hits.get(path).map(|v| *v).unwrap_or(0)
    }

    /// Number of distinct paths seen so far.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl Default for AccessCounter {
    fn default() -> Self {
        Self::synchronized()
    }
}
