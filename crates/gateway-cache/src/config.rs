//! Semantic cache configuration.

use std::time::Duration;

/// Similarity metric used by `Lookup` to rank candidate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Cosine similarity; higher is better.
    #[default]
    Cosine,
    /// Raw dot product; higher is better.
    InnerProduct,
    /// Euclidean distance; lower is better.
    L2Distance,
}

/// Eviction policy applied when a `Put` would exceed `max_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Drop the entry with the oldest `last_access_at`.
    Lru,
    /// Drop TTL-expired entries; fall back to `Lru` if still over capacity.
    TtlOnly,
    /// Drop TTL-expired entries first, then `Lru`.
    #[default]
    LruWithTtl,
    /// Drop the entry with the lowest `access_count * decay_factor^age`.
    Relevance,
}

/// Semantic cache configuration. All fields default per the data model.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum live entries before eviction kicks in.
    pub max_entries: usize,
    /// Minimum similarity score for a `Lookup` to count as a hit.
    pub similarity_threshold: f32,
    /// Metric used to rank candidates.
    pub similarity_metric: SimilarityMetric,
    /// Time-to-live applied to every inserted entry.
    pub ttl: Duration,
    /// Eviction policy used when over capacity.
    pub eviction_policy: EvictionPolicy,
    /// Required embedding dimension `D`; `Put`/`Lookup` reject mismatches.
    pub embedding_dimension: usize,
    /// Whether embeddings are L2-normalized before storage/comparison.
    pub normalize_embeddings: bool,
    /// Decay factor `γ ∈ (0,1]` used by the `relevance` eviction policy.
    pub decay_factor: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            similarity_threshold: 0.85,
            similarity_metric: SimilarityMetric::default(),
            ttl: Duration::from_secs(24 * 60 * 60),
            eviction_policy: EvictionPolicy::default(),
            embedding_dimension: 1_536,
            normalize_embeddings: true,
            decay_factor: 0.95,
        }
    }
}
