//! Content-addressed disk memo with TTL and clock injection.
//!
//! One JSON file per entry at `<dir>/<key>.json`, written atomically via
//! temp-file + rename (tolerable under concurrent writers because entries
//! within the TTL are content-addressed and semantically equivalent — last
//! writer wins).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Injectable clock. Core logic never reads `SystemTime::now()` directly,
/// so tests can substitute a fixed or advancing clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the OS wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Serialize)]
struct CacheKeyInput<'a, Q> {
    adapter: &'a str,
    query: &'a Q,
    version: &'a str,
}

/// An entry read back from the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ClearResult {
    pub cleared: usize,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    #[serde(rename = "totalBytes")]
    pub total_bytes: u64,
}

pub struct CacheOptions {
    pub max_age_hours: u64,
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age_hours: 168,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Content-addressed disk cache. Constructed with `Cache::new`, which
/// auto-creates `dir`.
pub struct Cache {
    dir: PathBuf,
    max_age_hours: u64,
    clock: Arc<dyn Clock>,
}

impl Cache {
    /// # Errors
    /// Returns an error if `dir` cannot be created.
    pub fn new(dir: impl Into<PathBuf>, opts: CacheOptions) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_age_hours: opts.max_age_hours,
            clock: opts.clock,
        })
    }

    /// `hashObject({adapter, query, version})` — deterministic, varies with
    /// any of the three inputs.
    #[must_use]
    pub fn cache_key<Q: Serialize>(adapter: &str, query: &Q, version: &str) -> String {
        coe_hashids::hash_object(&CacheKeyInput {
            adapter,
            query,
            version,
        })
        .expect("cache key inputs are always serializable")
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Returns `None` if the file is absent, unparseable, or expired.
    /// Corrupted JSON never panics or propagates an error — it is treated as
    /// a miss.
    pub fn get<Q: Serialize, T: DeserializeOwned>(
        &self,
        adapter: &str,
        query: &Q,
        version: &str,
    ) -> Option<CacheEntry<T>> {
        let key = Self::cache_key(adapter, query, version);
        let path = self.entry_path(&key);
        let raw = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&raw).ok()?;

        let expires_at = entry.created_at + chrono::Duration::hours(self.max_age_hours as i64);
        if expires_at <= self.clock.now() {
            return None;
        }
        Some(entry)
    }

    /// Writes `{key, createdAt: now(), data}` atomically.
    ///
    /// # Errors
    /// Propagates I/O errors writing the temp file or renaming it into place.
    pub fn set<Q: Serialize, T: Serialize>(
        &self,
        adapter: &str,
        query: &Q,
        version: &str,
        data: &T,
    ) -> std::io::Result<()> {
        let key = Self::cache_key(adapter, query, version);
        let entry = CacheEntry {
            key: key.clone(),
            created_at: self.clock.now(),
            data,
        };
        let body = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = self.entry_path(&key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|e| std::io::Error::new(e.error.kind(), e.error))?;
        Ok(())
    }

    /// Removes matching entries; best-effort per entry — a single removal
    /// failure doesn't abort the sweep, it's just excluded from `cleared`.
    #[must_use]
    pub fn clear(&self, expired_only: bool) -> ClearResult {
        let mut cleared = 0usize;
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return ClearResult { cleared };
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if expired_only && !self.is_expired(&path) {
                continue;
            }
            if fs::remove_file(&path).is_ok() {
                cleared += 1;
            }
        }
        ClearResult { cleared }
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Ok(raw) = fs::read_to_string(path) else {
            return false;
        };
        #[derive(Deserialize)]
        struct CreatedOnly {
            #[serde(rename = "createdAt")]
            created_at: DateTime<Utc>,
        }
        let Ok(parsed) = serde_json::from_str::<CreatedOnly>(&raw) else {
            return false;
        };
        let expires_at = parsed.created_at + chrono::Duration::hours(self.max_age_hours as i64);
        expires_at <= self.clock.now()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return stats;
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                stats.entries += 1;
                stats.total_bytes += meta.len();
            }
        }
        stats
    }
}

/// A clock that can be advanced manually, for TTL-expiry tests.
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
