//! Modification-time invalidated cache of the mapping table.
//!
//! Every lookup stats the source. When the modification time is strictly
//! newer than the one the current table was built from, a replacement table
//! is parsed off to the side and swapped in with [`ArcSwap`], so readers only
//! ever see a complete table. Rebuilds are serialized by a mutex; a task that
//! waited on it re-checks the snapshot first, so callers that saw the same
//! stale time rebuild once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use super::source::MappingSource;
use super::table::MappingTable;
use crate::AuthResult;
use crate::error::AuthError;

/// The table together with the modification time it was built from.
#[derive(Debug, Default)]
struct Snapshot {
    /// `None` until the first successful load.
    mtime: Option<SystemTime>,
    table: Arc<MappingTable>,
}

impl Snapshot {
    fn is_stale(&self, observed: SystemTime) -> bool {
        self.mtime.is_none_or(|loaded| observed > loaded)
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingCacheStats {
    /// Modification time checks performed.
    pub stat_calls: u64,
    /// Successful table rebuilds.
    pub reloads: u64,
    /// Mappings in the current table.
    pub entries: usize,
    /// Malformed lines skipped in the current table.
    pub skipped_lines: usize,
    /// Modification time of the current table.
    pub last_loaded_mtime: Option<SystemTime>,
}

/// Process-lifetime cache of a [`MappingSource`].
pub struct MappingCache {
    source: Arc<dyn MappingSource>,
    current: ArcSwap<Snapshot>,
    reload_lock: Mutex<()>,
    stat_calls: AtomicU64,
    reloads: AtomicU64,
}

impl MappingCache {
    /// Creates an empty cache; the first lookup loads the source.
    #[must_use]
    pub fn new(source: Arc<dyn MappingSource>) -> Self {
        Self {
            source,
            current: ArcSwap::from_pointee(Snapshot::default()),
            reload_lock: Mutex::new(()),
            stat_calls: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
        }
    }

    /// Location of the underlying source.
    #[must_use]
    pub fn location(&self) -> String {
        self.source.location()
    }

    /// Returns the current table, rebuilding it first if the source changed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Mapping`] if the source cannot be stat'ed or read.
    /// The previous table stays in place and the next call tries again.
    pub async fn table(&self) -> AuthResult<Arc<MappingTable>> {
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        let observed = self
            .source
            .modified()
            .await
            .map_err(|e| AuthError::mapping(self.source.location(), e.to_string()))?;

        {
            let snapshot = self.current.load();
            if !snapshot.is_stale(observed) {
                return Ok(Arc::clone(&snapshot.table));
            }
        }

        self.reload(observed).await
    }

    async fn reload(&self, observed: SystemTime) -> AuthResult<Arc<MappingTable>> {
        let _guard = self.reload_lock.lock().await;

        let snapshot = self.current.load_full();
        if !snapshot.is_stale(observed) {
            return Ok(Arc::clone(&snapshot.table));
        }

        let contents = self
            .source
            .read()
            .await
            .map_err(|e| AuthError::mapping(self.source.location(), e.to_string()))?;
        let table = Arc::new(MappingTable::parse(&contents));

        self.current.store(Arc::new(Snapshot {
            mtime: Some(observed),
            table: Arc::clone(&table),
        }));
        self.reloads.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            source = %self.source.location(),
            entries = table.len(),
            skipped = table.skipped_lines(),
            "Loaded username mapping"
        );

        Ok(table)
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn stats(&self) -> MappingCacheStats {
        let snapshot = self.current.load();
        MappingCacheStats {
            stat_calls: self.stat_calls.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            entries: snapshot.table.len(),
            skipped_lines: snapshot.table.skipped_lines(),
            last_loaded_mtime: snapshot.mtime,
        }
    }
}

impl std::fmt::Debug for MappingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingCache")
            .field("source", &self.source.location())
            .field("stats", &self.stats())
            .finish()
    }
}
