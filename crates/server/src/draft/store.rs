//! Per-visitor draft cache.
//!
//! Drafts are served from memory and mirrored to one JSON file per visitor
//! so an unpublished list survives restarts. Edits arrive in bursts (every
//! button press re-submits the whole form), so disk writes are debounced:
//! [`DraftStore::run_flusher`] waits for the first change, lets the burst
//! settle, then writes everything that is dirty.
//!
//! Clean entries that have sat idle are dropped from memory and reloaded
//! from disk on demand; cache files nobody has touched for a long time are
//! removed when the flusher starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Draft;

/// Cache directory name; bump the suffix when the on-disk shape changes.
pub const CACHE_NAMESPACE: &str = "top10albums-v3";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// How long a clean draft stays in memory after its last use.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Cache files older than this are deleted.
pub const DEFAULT_FILE_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Period of the flusher's housekeeping pass (eviction and retrying failed writes).
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    draft: Draft,
    dirty: bool,
    /// Bumped on every save so a flush only marks clean what it wrote
    generation: u64,
    touched: Instant,
}

#[derive(Clone)]
pub struct DraftStore {
    dir: PathBuf,
    debounce: Duration,
    idle_ttl: Duration,
    file_retention: Duration,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    wake: Arc<Notify>,
}

impl DraftStore {
    pub fn new(root: &Path, debounce: Duration) -> Result<Self> {
        let dir = root.join(CACHE_NAMESPACE);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create draft cache: {}", dir.display()))?;

        Ok(Self {
            dir,
            debounce,
            idle_ttl: DEFAULT_IDLE_TTL,
            file_retention: DEFAULT_FILE_RETENTION,
            entries: Arc::new(RwLock::new(HashMap::new())),
            wake: Arc::new(Notify::new()),
        })
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn with_file_retention(mut self, retention: Duration) -> Self {
        self.file_retention = retention;
        self
    }

    /// Only visitor ids we issued (UUIDs) are mapped to files.
    fn path_for(&self, visitor: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(visitor).ok()?;
        Some(self.dir.join(format!("{}.json", id.hyphenated())))
    }

    /// The visitor's draft, or an empty one.
    pub fn load(&self, visitor: &str) -> Draft {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(entry) = entries.get_mut(visitor) {
                entry.touched = Instant::now();
                return entry.draft.clone();
            }
        }

        let draft = self.read_from_disk(visitor).unwrap_or_default();
        if let Ok(mut entries) = self.entries.write() {
            entries.entry(visitor.to_string()).or_insert(Entry {
                draft: draft.clone(),
                dirty: false,
                generation: 0,
                touched: Instant::now(),
            });
        }
        draft
    }

    fn read_from_disk(&self, visitor: &str) -> Option<Draft> {
        let path = self.path_for(visitor)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read cached draft");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(draft) => Some(draft),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable cached draft");
                None
            }
        }
    }

    /// Replace the visitor's draft. The change is visible immediately and
    /// reaches disk on the next flush.
    pub fn save(&self, visitor: &str, draft: Draft) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire draft lock: {}", e))?;
        let now = Instant::now();
        match entries.get_mut(visitor) {
            Some(entry) => {
                entry.draft = draft;
                entry.dirty = true;
                entry.generation = entry.generation.wrapping_add(1);
                entry.touched = now;
            }
            None => {
                entries.insert(
                    visitor.to_string(),
                    Entry {
                        draft,
                        dirty: true,
                        generation: 0,
                        touched: now,
                    },
                );
            }
        }
        drop(entries);

        self.wake.notify_one();
        Ok(())
    }

    /// Number of drafts currently held in memory.
    pub fn cached(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Write every dirty draft now, then drop idle clean drafts from memory.
    /// Returns how many were written.
    ///
    /// A draft whose write fails stays dirty and is retried by the next
    /// flush; the rest of the batch is still written and the first error is
    /// returned at the end.
    pub fn flush(&self) -> Result<usize> {
        let pending: Vec<(String, PathBuf, Draft, u64)> = {
            let mut entries = self
                .entries
                .write()
                .map_err(|e| anyhow::anyhow!("Failed to acquire draft lock: {}", e))?;
            let mut pending = Vec::new();
            for (visitor, entry) in entries.iter_mut().filter(|(_, entry)| entry.dirty) {
                match self.path_for(visitor) {
                    Some(path) => {
                        pending.push((visitor.clone(), path, entry.draft.clone(), entry.generation))
                    }
                    // memory only
                    None => entry.dirty = false,
                }
            }
            pending
        };

        let mut written = Vec::with_capacity(pending.len());
        let mut first_err = None;
        if !pending.is_empty() {
            if let Err(err) = std::fs::create_dir_all(&self.dir)
                .with_context(|| format!("failed to create draft cache: {}", self.dir.display()))
            {
                first_err = Some(err);
            }
        }
        for (visitor, path, draft, generation) in pending {
            match write_draft(&path, &draft) {
                Ok(()) => written.push((visitor, generation)),
                Err(err) => {
                    tracing::warn!(%visitor, error = %err, "failed to write draft");
                    first_err.get_or_insert(err);
                }
            }
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire draft lock: {}", e))?;
        for (visitor, generation) in &written {
            if let Some(entry) = entries.get_mut(visitor) {
                if entry.generation == *generation {
                    entry.dirty = false;
                }
            }
        }
        let before = entries.len();
        entries.retain(|_, entry| entry.dirty || entry.touched.elapsed() < self.idle_ttl);
        let evicted = before - entries.len();
        drop(entries);

        if !written.is_empty() || evicted > 0 {
            tracing::debug!(written = written.len(), evicted, "flushed drafts");
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(written.len()),
        }
    }

    /// Delete cache files last written longer ago than the retention period.
    /// Returns how many were removed.
    pub fn prune_files(&self) -> Result<usize> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read draft cache: {}", self.dir.display())
                });
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            let Ok(modified) = std::fs::metadata(&path).and_then(|meta| meta.modified()) else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age < self.file_retention {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to remove stale draft")
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "pruned stale drafts");
        }
        Ok(removed)
    }

    async fn flush_blocking(&self) -> Result<usize> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.flush()).await?
    }

    /// Background writer. Runs until `shutdown` fires, then flushes once more.
    ///
    /// Besides the debounced flush after each burst of edits, a periodic
    /// sweep evicts idle drafts and retries writes that failed.
    pub async fn run_flusher(self, shutdown: CancellationToken) -> Result<()> {
        let store = self.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || store.prune_files()).await? {
            tracing::warn!(error = %err, "failed to prune draft cache");
        }

        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.tick().await;

        loop {
            tokio::select! {
                _ = self.wake.notified() => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.debounce) => {}
                        _ = shutdown.cancelled() => {}
                    }
                    if let Err(err) = self.flush_blocking().await {
                        tracing::error!(error = %err, "failed to flush drafts");
                    }
                }
                _ = sweep.tick() => {
                    if let Err(err) = self.flush_blocking().await {
                        tracing::error!(error = %err, "failed to flush drafts");
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        self.flush_blocking().await?;
        Ok(())
    }
}

fn write_draft(path: &Path, draft: &Draft) -> Result<()> {
    let json = serde_json::to_string(draft)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("failed to write draft: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace draft: {}", path.display()))?;
    Ok(())
}
