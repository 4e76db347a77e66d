/* src/cli/compiler/src/cache.rs */

// Content cache for one build or dev session. A speed layer only: a cache
// that never hits must produce the same output, just slower.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use serde::Serialize;

use crate::hash::sha256_hex;

pub const DEFAULT_MAX_SIZE: usize = 5000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// How often the owner should call [`ContentCache::cleanup_expired`].
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Entry<V> {
  value: V,
  inserted_at: Instant,
  last_accessed: Instant,
  ttl: Duration,
}

#[derive(Debug)]
struct FileEntry {
  content: Arc<[u8]>,
  modified: SystemTime,
  len: u64,
  read_at: Instant,
}

#[derive(Debug, Default)]
struct Counters {
  hits: AtomicU64,
  misses: AtomicU64,
  sets: AtomicU64,
  evictions: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
  pub hits: u64,
  pub misses: u64,
  pub sets: u64,
  pub evictions: u64,
  /// hits / (hits + misses), 0 when nothing was requested
  pub hit_rate: f64,
  pub size: usize,
  pub file_cache_size: usize,
}

/// TTL + LRU keyed store plus an mtime-validated file cache.
/// Safe to share across threads.
#[derive(Debug)]
pub struct ContentCache<V = String> {
  store: DashMap<String, Entry<V>>,
  files: DashMap<PathBuf, FileEntry>,
  counters: Counters,
  max_size: usize,
  default_ttl: Duration,
}

impl<V: Clone> Default for ContentCache<V> {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
  }
}

impl<V: Clone> ContentCache<V> {
  pub fn new(max_size: usize, default_ttl: Duration) -> Self {
    Self {
      store: DashMap::new(),
      files: DashMap::new(),
      counters: Counters::default(),
      max_size,
      default_ttl,
    }
  }

  /// A cache that stores nothing; every lookup misses.
  pub fn disabled() -> Self {
    Self::new(0, Duration::ZERO)
  }

  pub fn is_disabled(&self) -> bool {
    self.max_size == 0
  }

  pub fn get(&self, key: &str) -> Option<V> {
    self.get_with_ttl(key, None)
  }

  /// Lookup; `ttl` overrides the entry's own TTL for this check.
  pub fn get_with_ttl(&self, key: &str, ttl: Option<Duration>) -> Option<V> {
    let seen = {
      let Some(mut entry) = self.store.get_mut(key) else {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        return None;
      };
      if entry.inserted_at.elapsed() <= ttl.unwrap_or(entry.ttl) {
        entry.last_accessed = Instant::now();
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        return Some(entry.value.clone());
      }
      entry.inserted_at
    };
    self.expire(key, seen);
    self.counters.misses.fetch_add(1, Ordering::Relaxed);
    None
  }

  /// Remove `key` only if it is still the entry inserted at `seen`; a
  /// concurrent `set` between the check and the removal survives.
  fn expire(&self, key: &str, seen: Instant) -> bool {
    let removed = self.store.remove_if(key, |_, e| e.inserted_at == seen).is_some();
    if removed {
      self.counters.evictions.fetch_add(1, Ordering::Relaxed);
    }
    removed
  }

  pub fn set(&self, key: impl Into<String>, value: V) {
    self.set_with_ttl(key, value, None);
  }

  pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
    if self.is_disabled() {
      return;
    }
    let now = Instant::now();
    let entry =
      Entry { value, inserted_at: now, last_accessed: now, ttl: ttl.unwrap_or(self.default_ttl) };
    self.store.insert(key.into(), entry);
    self.counters.sets.fetch_add(1, Ordering::Relaxed);
    if self.store.len() > self.max_size {
      self.evict_lru();
    }
  }

  pub fn mget<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Vec<Option<V>> {
    keys.into_iter().map(|k| self.get(k)).collect()
  }

  pub fn mset<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, V)>) {
    for (k, v) in entries {
      self.set(k, v);
    }
  }

  pub fn delete(&self, key: &str) -> bool {
    self.store.remove(key).is_some()
  }

  /// Drop the least recently accessed fifth of the store.
  fn evict_lru(&self) {
    let count = (self.max_size / 5).max(1);
    let mut by_age: Vec<(String, Instant)> =
      self.store.iter().map(|e| (e.key().clone(), e.value().last_accessed)).collect();
    by_age.sort_by_key(|(_, at)| *at);
    for (key, _) in by_age.into_iter().take(count) {
      if self.store.remove(&key).is_some() {
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
      }
    }
  }

  /// Purge entries older than their TTL, plus cached files that were
  /// deleted or changed on disk. Returns how many were removed.
  pub fn cleanup_expired(&self) -> usize {
    let before = self.store.len() + self.files.len();
    self.store.retain(|_, e| e.inserted_at.elapsed() <= e.ttl);
    self.files.retain(|path, e| {
      std::fs::metadata(path)
        .ok()
        .is_some_and(|m| m.len() == e.len && m.modified().ok() == Some(e.modified))
    });
    let removed = before.saturating_sub(self.store.len() + self.files.len());
    self.counters.evictions.fetch_add(removed as u64, Ordering::Relaxed);
    removed
  }

  /// Drop the least recently read fifth of the file cache.
  fn evict_files(&self) {
    let count = (self.max_size / 5).max(1);
    let mut by_age: Vec<(PathBuf, Instant)> =
      self.files.iter().map(|e| (e.key().clone(), e.value().read_at)).collect();
    by_age.sort_by_key(|(_, at)| *at);
    for (path, _) in by_age.into_iter().take(count) {
      if self.files.remove(&path).is_some() {
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
      }
    }
  }

  /// File bytes, re-read whenever the modification time or size differs
  /// from the cached one. `None` when the file does not exist or cannot be read.
  pub fn get_file(&self, path: &Path) -> Option<Arc<[u8]>> {
    let meta = std::fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    let len = meta.len();
    if let Some(mut hit) = self.files.get_mut(path)
      && hit.modified == modified
      && hit.len == len
    {
      hit.read_at = Instant::now();
      self.counters.hits.fetch_add(1, Ordering::Relaxed);
      return Some(Arc::clone(&hit.content));
    }
    self.counters.misses.fetch_add(1, Ordering::Relaxed);
    let content: Arc<[u8]> = std::fs::read(path).ok()?.into();
    if !self.is_disabled() {
      let entry = FileEntry { content: Arc::clone(&content), modified, len, read_at: Instant::now() };
      self.files.insert(path.to_path_buf(), entry);
      if self.files.len() > self.max_size {
        self.evict_files();
      }
    }
    Some(content)
  }

  pub fn clear(&self) {
    self.store.clear();
    self.files.clear();
  }

  /// End-of-session teardown: drop everything and reset counters.
  pub fn dispose(&self) {
    self.clear();
    for c in [
      &self.counters.hits,
      &self.counters.misses,
      &self.counters.sets,
      &self.counters.evictions,
    ] {
      c.store(0, Ordering::Relaxed);
    }
  }

  pub fn stats(&self) -> CacheStats {
    let hits = self.counters.hits.load(Ordering::Relaxed);
    let misses = self.counters.misses.load(Ordering::Relaxed);
    let total = hits + misses;
    CacheStats {
      hits,
      misses,
      sets: self.counters.sets.load(Ordering::Relaxed),
      evictions: self.counters.evictions.load(Ordering::Relaxed),
      hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
      size: self.store.len(),
      file_cache_size: self.files.len(),
    }
  }
}

fn content_key(namespace: &str, source: &str, fingerprint: &str) -> String {
  format!("{namespace}:{}", sha256_hex(&[source, fingerprint]))
}

impl ContentCache<String> {
  /// Transform output keyed by source text plus an options fingerprint.
  pub fn get_transformed(&self, source: &str, fingerprint: &str) -> Option<String> {
    self.get(&content_key("transform", source, fingerprint))
  }

  pub fn set_transformed(&self, source: &str, fingerprint: &str, output: String) {
    self.set(content_key("transform", source, fingerprint), output);
  }

  pub fn get_css(&self, css: &str, fingerprint: &str) -> Option<String> {
    self.get(&content_key("css", css, fingerprint))
  }

  pub fn set_css(&self, css: &str, fingerprint: &str, output: String) {
    self.set(content_key("css", css, fingerprint), output);
  }
}

#[cfg(test)]
mod tests {
  use std::fs::File;

  use super::*;
  use tempfile::TempDir;

  #[test]
  fn set_then_get_returns_value() {
    let cache: ContentCache = ContentCache::default();
    cache.set("k", "v".to_string());
    assert_eq!(cache.get("k").as_deref(), Some("v"));
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.sets), (1, 0, 1));
  }

  #[test]
  fn missing_key_counts_a_miss() {
    let cache: ContentCache = ContentCache::default();
    assert!(cache.get("nope").is_none());
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hit_rate, 0.0);
  }

  #[test]
  fn entries_expire_after_ttl() {
    let cache: ContentCache = ContentCache::new(10, Duration::from_millis(20));
    cache.set("k", "v".to_string());
    std::thread::sleep(Duration::from_millis(50));
    assert!(cache.get("k").is_none());
    assert_eq!(cache.stats().evictions, 1);
  }

  #[test]
  fn ttl_override_on_read() {
    let cache: ContentCache = ContentCache::default();
    cache.set("k", "v".to_string());
    std::thread::sleep(Duration::from_millis(10));
    assert!(cache.get_with_ttl("k", Some(Duration::from_millis(1))).is_none());
  }

  #[test]
  fn cleanup_purges_expired_only() {
    let cache: ContentCache = ContentCache::default();
    cache.set_with_ttl("short", "a".to_string(), Some(Duration::from_millis(5)));
    cache.set("long", "b".to_string());
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.cleanup_expired(), 1);
    assert_eq!(cache.get("long").as_deref(), Some("b"));
  }

  #[test]
  fn expiry_spares_an_entry_set_after_the_check() {
    let cache: ContentCache = ContentCache::new(10, Duration::from_millis(5));
    cache.set("k", "old".to_string());
    let seen = cache.store.get("k").unwrap().inserted_at;
    std::thread::sleep(Duration::from_millis(10));
    cache.set_with_ttl("k", "new".to_string(), Some(DEFAULT_TTL));
    assert!(!cache.expire("k", seen));
    assert_eq!(cache.get("k").as_deref(), Some("new"));
    assert_eq!(cache.stats().evictions, 0);
  }

  #[test]
  fn cleanup_sweeps_deleted_files() {
    let dir = TempDir::new().unwrap();
    let kept = dir.path().join("kept.txt");
    let gone = dir.path().join("gone.txt");
    std::fs::write(&kept, "a").unwrap();
    std::fs::write(&gone, "b").unwrap();
    let cache: ContentCache = ContentCache::default();
    assert!(cache.get_file(&kept).is_some());
    assert!(cache.get_file(&gone).is_some());
    std::fs::remove_file(&gone).unwrap();
    assert_eq!(cache.cleanup_expired(), 1);
    assert_eq!(cache.stats().file_cache_size, 1);
  }

  #[test]
  fn file_cache_is_bounded() {
    let dir = TempDir::new().unwrap();
    let cache: ContentCache = ContentCache::new(5, DEFAULT_TTL);
    for i in 0..6 {
      let path = dir.path().join(format!("{i}.txt"));
      std::fs::write(&path, i.to_string()).unwrap();
      assert!(cache.get_file(&path).is_some());
      std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(cache.stats().file_cache_size, 5);
    // 0.txt was read first, so it went.
    let misses = cache.stats().misses;
    assert!(cache.get_file(&dir.path().join("0.txt")).is_some());
    assert_eq!(cache.stats().misses, misses + 1);
  }

  #[test]
  fn overflow_evicts_least_recently_accessed() {
    let cache: ContentCache = ContentCache::new(5, DEFAULT_TTL);
    for i in 0..5 {
      cache.set(format!("k{i}"), i.to_string());
      std::thread::sleep(Duration::from_millis(2));
    }
    // Touch k0 so k1 becomes the oldest.
    assert!(cache.get("k0").is_some());
    cache.set("k5", "5".to_string());
    assert_eq!(cache.stats().size, 5);
    assert!(cache.get("k1").is_none());
    assert!(cache.get("k0").is_some());
    assert_eq!(cache.stats().evictions, 1);
  }

  #[test]
  fn batch_operations() {
    let cache: ContentCache = ContentCache::default();
    cache.mset([("a", "1".to_string()), ("b", "2".to_string())]);
    let got = cache.mget(["a", "x", "b"]);
    assert_eq!(got, vec![Some("1".to_string()), None, Some("2".to_string())]);
  }

  #[test]
  fn transformed_lookup_depends_on_fingerprint() {
    let cache: ContentCache = ContentCache::default();
    cache.set_transformed("src", "jsx", "out".to_string());
    assert_eq!(cache.get_transformed("src", "jsx").as_deref(), Some("out"));
    assert!(cache.get_transformed("src", "tsx").is_none());
    assert!(cache.get_css("src", "jsx").is_none());
  }

  #[test]
  fn file_cache_follows_mtime() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "one").unwrap();
    let cache: ContentCache = ContentCache::default();
    assert_eq!(&*cache.get_file(&path).unwrap(), b"one");
    assert_eq!(&*cache.get_file(&path).unwrap(), b"one");
    assert_eq!(cache.stats().hits, 1);

    std::fs::write(&path, "two").unwrap();
    let later = SystemTime::now() + Duration::from_secs(5);
    File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();
    assert_eq!(&*cache.get_file(&path).unwrap(), b"two");
  }

  #[test]
  fn missing_file_is_none() {
    let dir = TempDir::new().unwrap();
    let cache: ContentCache = ContentCache::default();
    assert!(cache.get_file(&dir.path().join("missing")).is_none());
  }

  #[test]
  fn disabled_cache_never_hits() {
    let cache: ContentCache = ContentCache::disabled();
    cache.set("k", "v".to_string());
    assert!(cache.get("k").is_none());
    assert_eq!(cache.stats().size, 0);
  }

  #[test]
  fn dispose_resets_everything() {
    let cache: ContentCache = ContentCache::default();
    cache.set("k", "v".to_string());
    let _ = cache.get("k");
    cache.dispose();
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.sets, stats.size), (0, 0, 0));
  }
}
