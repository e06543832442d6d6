//! The semantic response cache (component E): embedding-similarity lookup
//! with TTL and configurable eviction.

use crate::config::{CacheConfig, EvictionPolicy};
use crate::entry::{self, normalize, CacheEntry};
use gateway_core::{GatewayError, GatewayResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

/// Point-in-time counters for `Stats`.
#[derive(Debug, Default)]
pub struct CacheStatsRaw {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Snapshot returned by `Stats`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Live entry count at the time of the snapshot.
    pub entries: usize,
    /// Cumulative lookup hits.
    pub hits: u64,
    /// Cumulative lookup misses.
    pub misses: u64,
    /// Cumulative evictions (capacity- or TTL-driven).
    pub evictions: u64,
}

/// Outcome of a `Lookup` call.
#[derive(Debug, Clone)]
pub enum LookupResult<T> {
    /// A prior entry scored at or above the similarity threshold.
    Hit {
        /// The cached response.
        response: T,
        /// The score that won admission, in the same higher-is-better space
        /// across every configured metric (see `entry::score`).
        score: f32,
    },
    /// No entry scored high enough, or the store was empty.
    Miss,
}

/// Embedding-similarity response cache. Readers run concurrently; `Put`,
/// `Invalidate`, and `Clear` take the writer half of the lock.
pub struct SemanticCache<T> {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    stats: CacheStatsRaw,
}

impl<T: Clone + Send + Sync> SemanticCache<T> {
    /// Build an empty cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStatsRaw::default(),
        }
    }

    /// Validate an embedding against the configured dimension, normalizing
    /// it in place when `normalize_embeddings` is set.
    fn prepare_embedding(&self, mut embedding: Vec<f32>) -> GatewayResult<Vec<f32>> {
        if embedding.len() != self.config.embedding_dimension {
            return Err(GatewayError::invalid_request(
                format!(
                    "embedding has dimension {}, expected {}",
                    embedding.len(),
                    self.config.embedding_dimension
                ),
                Some("query_embedding"),
            ));
        }
        if self.config.normalize_embeddings {
            normalize(&mut embedding);
        }
        Ok(embedding)
    }

    /// Store a response under `fingerprint`, keyed by its embedding.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if `embedding` does not match the
    /// configured dimension.
    pub async fn put(
        &self,
        fingerprint: impl Into<String>,
        embedding: Vec<f32>,
        response: T,
    ) -> GatewayResult<()> {
        let embedding = self.prepare_embedding(embedding)?;
        let fingerprint = fingerprint.into();
        let now = Instant::now();
        let mut guard = self.entries.write().await;

        if guard.len() >= self.config.max_entries {
            self.evict_locked(&mut guard, now);
        }

        guard.insert(
            fingerprint.clone(),
            CacheEntry::new(fingerprint, embedding, response, now),
        );
        Ok(())
    }

    /// Find the best-scoring live entry for `embedding`, if any clears the
    /// configured similarity threshold.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if `embedding` does not match the
    /// configured dimension.
    pub async fn lookup(&self, embedding: Vec<f32>) -> GatewayResult<LookupResult<T>> {
        let embedding = self.prepare_embedding(embedding)?;
        let now = Instant::now();

        // Try the read path first so concurrent lookups never block each
        // other; a hit still needs to bump access metadata, which promotes
        // to the writer half below.
        let best = {
            let guard = self.entries.read().await;
            best_candidate(&guard, &embedding, &self.config, now)
        };

        let Some((key, score)) = best else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(LookupResult::Miss);
        };

        let mut guard = self.entries.write().await;
        let Some(entry) = guard.get_mut(&key) else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(LookupResult::Miss);
        };
        if entry.is_expired(now, self.config.ttl) {
            guard.remove(&key);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(LookupResult::Miss);
        }
        entry.touch(now);
        let response = entry.response.clone();
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        Ok(LookupResult::Hit { response, score })
    }

    /// Remove a single entry by its fingerprint key. No-op if absent.
    pub async fn invalidate(&self, fingerprint: &str) {
        self.entries.write().await.remove(fingerprint);
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Snapshot the current counters and live entry count.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Remove every TTL-expired entry, irrespective of capacity. Intended
    /// to be driven by a periodic background sweep.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, e| !e.is_expired(now, self.config.ttl));
        let removed = before - guard.len();
        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    fn evict_locked(&self, guard: &mut HashMap<String, CacheEntry<T>>, now: Instant) {
        let removed = match self.config.eviction_policy {
            EvictionPolicy::Lru => evict_one_lru(guard),
            EvictionPolicy::TtlOnly => {
                let expired = evict_all_expired(guard, now, self.config.ttl);
                if expired > 0 {
                    expired
                } else {
                    evict_one_lru(guard)
                }
            }
            EvictionPolicy::LruWithTtl => {
                let expired = evict_all_expired(guard, now, self.config.ttl);
                if guard.len() >= self.config.max_entries {
                    expired + evict_one_lru(guard)
                } else {
                    expired
                }
            }
            EvictionPolicy::Relevance => evict_one_lowest_relevance(guard, now, self.config.decay_factor),
        };
        if removed > 0 {
            debug!(removed, "evicted cache entries");
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
    }
}

fn best_candidate<T>(
    map: &HashMap<String, CacheEntry<T>>,
    query: &[f32],
    config: &CacheConfig,
    now: Instant,
) -> Option<(String, f32)> {
    map.iter()
        .filter(|(_, e)| !e.is_expired(now, config.ttl))
        .map(|(k, e)| (k.clone(), entry::score(config.similarity_metric, query, &e.embedding)))
        .filter(|(_, score)| *score >= config.similarity_threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn evict_one_lru<T>(map: &mut HashMap<String, CacheEntry<T>>) -> usize {
    let oldest = map
        .iter()
        .min_by_key(|(_, e)| e.last_access_at)
        .map(|(k, _)| k.clone());
    match oldest {
        Some(key) => {
            map.remove(&key);
            1
        }
        None => 0,
    }
}

fn evict_all_expired<T>(
    map: &mut HashMap<String, CacheEntry<T>>,
    now: Instant,
    ttl: std::time::Duration,
) -> usize {
    let before = map.len();
    map.retain(|_, e| !e.is_expired(now, ttl));
    before - map.len()
}

fn evict_one_lowest_relevance<T>(
    map: &mut HashMap<String, CacheEntry<T>>,
    now: Instant,
    decay_factor: f32,
) -> usize {
    let lowest = map
        .iter()
        .min_by(|(_, a), (_, b)| {
            a.relevance_score(now, decay_factor)
                .total_cmp(&b.relevance_score(now, decay_factor))
        })
        .map(|(k, _)| k.clone());
    match lowest {
        Some(key) => {
            map.remove(&key);
            1
        }
        None => 0,
    }
}
