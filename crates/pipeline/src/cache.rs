//! Content-Addressed Audio Cache
//!
//! Maps a digest of (text, voice) to synthesized MP3 bytes. Entries expire a
//! fixed TTL after insertion regardless of reads (not LRU); pinned entries
//! never expire. Expiry is checked lazily on every read, and a background
//! sweep removes expired entries to bound memory.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Length of the hex cache key
const KEY_LEN: usize = 32;

/// Time source for TTL decisions
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("phone_agent_cache_hits_total").increment(1);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("phone_agent_cache_misses_total").increment(1);
    }

    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    audio: Bytes,
    inserted_at: Instant,
    pinned: bool,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        !self.pinned && now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Shared, concurrently accessed audio store
pub struct AudioCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    pub stats: CacheStats,
}

impl AudioCache {
    /// Create a cache on the wall clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            stats: CacheStats::default(),
        }
    }

    /// Deterministic key for (text, voice): the first 32 hex digits of
    /// SHA-256 over the text followed by the voice.
    pub fn key_for(text: &str, voice: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(voice.as_bytes());
        let digest = hasher.finalize();

        let mut key = String::with_capacity(KEY_LEN);
        for byte in digest.iter().take(KEY_LEN / 2) {
            let _ = write!(key, "{:02x}", byte);
        }
        key
    }

    /// Store audio under `key_for(text, voice)`, replacing any existing entry.
    /// Returns the key.
    pub fn put(&self, text: &str, voice: &str, audio: Bytes) -> String {
        self.insert(text, voice, audio, false)
    }

    /// Store audio that never expires
    pub fn put_pinned(&self, text: &str, voice: &str, audio: Bytes) -> String {
        self.insert(text, voice, audio, true)
    }

    fn insert(&self, text: &str, voice: &str, audio: Bytes, pinned: bool) -> String {
        let key = Self::key_for(text, voice);
        tracing::debug!(key = %key, bytes = audio.len(), pinned, "Caching audio");
        self.entries.insert(
            key.clone(),
            CacheEntry {
                audio,
                inserted_at: self.clock.now(),
                pinned,
            },
        );
        self.stats.record_insert();
        key
    }

    /// Look up audio by key. Expired entries read as absent.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let found = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.audio.clone());

        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    /// Whether a live entry exists, without touching statistics
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map_or(false, |entry| !entry.is_expired(now, self.ttl))
    }

    /// Exempt an existing live entry from expiry. Returns false if absent.
    pub fn pin(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now, self.ttl) => {
                entry.pinned = true;
                true
            }
            _ => false,
        }
    }

    /// Remove every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.stats.record_evictions(removed as u64);
        }
        removed
    }

    /// Number of stored entries (including expired ones not yet swept)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pinned_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.pinned).count()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Spawn the background expiry sweep.
    ///
    /// Send `true` on the returned channel to stop it.
    pub fn start_sweep_task(self: &Arc<Self>, interval: Duration) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            tracing::info!(
                                "Audio cache sweep: removed {} expired entries ({} remaining)",
                                removed,
                                cache.len()
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Audio cache sweep task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_secs: u64) -> (AudioCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = AudioCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = AudioCache::key_for("One moment please.", "sage");
        let b = AudioCache::key_for("One moment please.", "sage");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_depends_on_voice() {
        assert_ne!(
            AudioCache::key_for("Great question.", "sage"),
            AudioCache::key_for("Great question.", "nova")
        );
    }

    #[test]
    fn test_key_matches_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(
            AudioCache::key_for("ab", "c"),
            "ba7816bf8f01cfea414140de5dae2223"
        );
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let (cache, clock) = cache_with_clock(3600);
        let audio = Bytes::from_static(b"\xff\xfb\x90mp3-frame");
        let key = cache.put("hello", "sage", audio.clone());

        assert_eq!(key, AudioCache::key_for("hello", "sage"));
        clock.advance(Duration::from_secs(3599));
        assert_eq!(cache.get(&key), Some(audio));
    }

    #[test]
    fn test_expired_entry_reads_absent() {
        let (cache, clock) = cache_with_clock(3600);
        let key = cache.put("hello", "sage", Bytes::from_static(b"mp3"));

        clock.advance(Duration::from_secs(3600));
        assert_eq!(cache.get(&key), None);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_reads_do_not_extend_ttl() {
        let (cache, clock) = cache_with_clock(10);
        let key = cache.put("hello", "sage", Bytes::from_static(b"mp3"));

        for _ in 0..9 {
            clock.advance(Duration::from_secs(1));
            assert!(cache.get(&key).is_some());
        }
        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_pinned_entries_survive_ttl() {
        let (cache, clock) = cache_with_clock(60);
        let key = cache.put_pinned("One moment please.", "sage", Bytes::from_static(b"mp3"));

        clock.advance(Duration::from_secs(10 * 3600));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.pinned_count(), 1);
    }

    #[test]
    fn test_reinsert_overwrites_and_resets_age() {
        let (cache, clock) = cache_with_clock(100);
        let key = cache.put("hello", "sage", Bytes::from_static(b"old"));
        clock.advance(Duration::from_secs(90));
        cache.put("hello", "sage", Bytes::from_static(b"new"));
        clock.advance(Duration::from_secs(50));

        assert_eq!(cache.get(&key), Some(Bytes::from_static(b"new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_pin_existing_entry() {
        let (cache, clock) = cache_with_clock(10);
        let key = cache.put("hello", "sage", Bytes::from_static(b"mp3"));
        assert!(cache.pin(&key));
        assert!(!cache.pin("missing"));

        clock.advance(Duration::from_secs(100));
        assert!(cache.contains(&key));
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("a", "sage", Bytes::from_static(b"1"));
        cache.put_pinned("b", "sage", Bytes::from_static(b"2"));
        clock.advance(Duration::from_secs(5));
        cache.put("c", "sage", Bytes::from_static(b"3"));
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats.evictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stats_hit_rate() {
        let (cache, _clock) = cache_with_clock(10);
        let key = cache.put("a", "sage", Bytes::from_static(b"1"));
        cache.get(&key);
        cache.get(&key);
        cache.get("unknown");
        cache.get("unknown2");
        assert_eq!(cache.stats.hit_rate(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_purges_and_stops() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(AudioCache::with_clock(Duration::from_secs(1), clock.clone()));
        cache.put("a", "sage", Bytes::from_static(b"1"));
        clock.advance(Duration::from_secs(2));

        let shutdown = cache.start_sweep_task(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.is_empty());

        shutdown.send(true).unwrap();
    }
}
