//! Expiring on-disk content cache.
//!
//! One JSON record per URL, keyed by a hash of the URL string. This is a
//! best-effort acceleration layer, not a consistency-critical store:
//! concurrent writers racing on the same key is last-write-wins, and
//! expired records are treated as absent without being purged until an
//! explicit clear.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CacheResult;

/// What kind of content a cache record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    ts: i64,
    content: String,
    kind: ContentKind,
}

/// File-backed content cache with time-based expiry.
pub struct ContentCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ContentCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Stable key for a URL. Collision-acceptable, not security-sensitive.
    pub fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    /// Cached content for a URL, treating expired records as absent.
    pub fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Utc::now().timestamp())
    }

    fn get_at(&self, url: &str, now: i64) -> Option<String> {
        let path = self.path_for(url);
        let raw = fs::read_to_string(&path).ok()?;
        let record: CacheRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(url, error = %e, "discarding corrupt cache record");
                return None;
            }
        };

        let age = now.saturating_sub(record.ts);
        if age < 0 || age as u64 >= self.ttl.as_secs() {
            debug!(url, age, "cache record expired");
            return None;
        }
        Some(record.content)
    }

    /// Store content for a URL, overwriting any prior record wholesale.
    pub fn set(&self, url: &str, content: &str, kind: ContentKind) -> CacheResult<()> {
        self.set_at(url, content, kind, Utc::now().timestamp())
    }

    fn set_at(&self, url: &str, content: &str, kind: ContentKind, ts: i64) -> CacheResult<()> {
        fs::create_dir_all(&self.dir)?;
        let record = CacheRecord {
            ts,
            content: content.to_string(),
            kind,
        };
        fs::write(self.path_for(url), serde_json::to_string(&record)?)?;
        Ok(())
    }

    /// Remove one entry, or every entry when `url` is `None`.
    /// Returns the number of records removed.
    pub fn clear(&self, url: Option<&str>) -> CacheResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        match url {
            Some(url) => {
                let path = self.path_for(url);
                if path.exists() {
                    fs::remove_file(path)?;
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            None => {
                let mut count = 0;
                for entry in fs::read_dir(&self.dir)? {
                    let path = entry?.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        fs::remove_file(path)?;
                        count += 1;
                    }
                }
                Ok(count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_cache(ttl_secs: u64) -> ContentCache {
        let dir = std::env::temp_dir().join(format!("sourcing-cache-{}", Uuid::new_v4()));
        ContentCache::new(dir, Duration::from_secs(ttl_secs))
    }

    #[test]
    fn get_is_idempotent_within_ttl() {
        let cache = temp_cache(60);
        cache
            .set("https://example.com/pipeline", "page text", ContentKind::Text)
            .unwrap();

        let first = cache.get("https://example.com/pipeline");
        let second = cache.get("https://example.com/pipeline");
        assert_eq!(first.as_deref(), Some("page text"));
        assert_eq!(first, second);
    }

    #[test]
    fn ttl_boundary() {
        let cache = temp_cache(2);
        let written_at = 1_000_000;
        cache
            .set_at("https://example.com", "content", ContentKind::Text, written_at)
            .unwrap();

        assert_eq!(
            cache.get_at("https://example.com", written_at + 1).as_deref(),
            Some("content")
        );
        assert_eq!(cache.get_at("https://example.com", written_at + 3), None);
    }

    #[test]
    fn record_with_future_timestamp_is_a_miss() {
        let cache = temp_cache(60);
        cache
            .set_at("https://example.com", "content", ContentKind::Text, 2_000)
            .unwrap();
        // Clock skew: record claims to be from the future.
        assert_eq!(cache.get_at("https://example.com", 1_000), None);
    }

    #[test]
    fn set_overwrites_wholesale() {
        let cache = temp_cache(60);
        cache.set("https://example.com", "old", ContentKind::Text).unwrap();
        cache.set("https://example.com", "new", ContentKind::Html).unwrap();
        assert_eq!(cache.get("https://example.com").as_deref(), Some("new"));
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let cache = temp_cache(60);
        assert_eq!(cache.get("https://never-stored.example"), None);
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let cache = temp_cache(60);
        cache.set("https://example.com", "content", ContentKind::Text).unwrap();
        let path = cache.path_for("https://example.com");
        fs::write(&path, "{not valid json").unwrap();
        assert_eq!(cache.get("https://example.com"), None);
    }

    #[test]
    fn clear_single_and_all() {
        let cache = temp_cache(60);
        cache.set("https://a.example", "a", ContentKind::Text).unwrap();
        cache.set("https://b.example", "b", ContentKind::Text).unwrap();
        cache.set("https://c.example", "c", ContentKind::Text).unwrap();

        assert_eq!(cache.clear(Some("https://a.example")).unwrap(), 1);
        assert_eq!(cache.clear(Some("https://a.example")).unwrap(), 0);
        assert_eq!(cache.clear(None).unwrap(), 2);
        assert_eq!(cache.get("https://b.example"), None);
    }

    #[test]
    fn clear_on_missing_dir_is_zero() {
        let cache = temp_cache(60);
        assert_eq!(cache.clear(None).unwrap(), 0);
    }

    #[test]
    fn keys_are_stable_and_distinct() {
        let a = ContentCache::key("https://a.example");
        let b = ContentCache::key("https://b.example");
        assert_eq!(a, ContentCache::key("https://a.example"));
        assert_ne!(a, b);
    }
}
