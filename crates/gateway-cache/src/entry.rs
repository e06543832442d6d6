//! Cache entry bookkeeping: fingerprint, embedding, and access metadata.

use std::time::Instant;

/// A single cached response plus the metadata eviction and lookup need.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub(crate) fingerprint: String,
    pub(crate) embedding: Vec<f32>,
    pub(crate) response: T,
    pub(crate) inserted_at: Instant,
    pub(crate) last_access_at: Instant,
    pub(crate) access_count: u64,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(fingerprint: String, embedding: Vec<f32>, response: T, now: Instant) -> Self {
        Self {
            fingerprint,
            embedding,
            response,
            inserted_at: now,
            last_access_at: now,
            access_count: 0,
        }
    }

    pub(crate) fn is_expired(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.duration_since(self.inserted_at) >= ttl
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_access_at = now;
        self.access_count += 1;
    }

    pub(crate) fn relevance_score(&self, now: Instant, decay_factor: f32) -> f64 {
        let age_secs = now.duration_since(self.inserted_at).as_secs_f64();
        let decay = f64::from(decay_factor).powf(age_secs);
        self.access_count as f64 * decay
    }
}

/// L2-normalize a vector in place. A zero vector is left unchanged.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute a similarity *score* for `metric` where higher is always better,
/// regardless of whether the underlying metric is itself higher-is-better
/// (cosine, inner product) or lower-is-better (L2 distance). This lets
/// `Lookup` apply a single "score >= threshold, take argmax" rule across
/// every metric.
pub(crate) fn score(metric: super::config::SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
    use super::config::SimilarityMetric::{Cosine, InnerProduct, L2Distance};

    match metric {
        Cosine => cosine_similarity(a, b),
        InnerProduct => dot(a, b),
        L2Distance => {
            let dist = l2_distance(a, b);
            1.0 / (1.0 + dist)
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_cosine_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_cosine_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn l2_distance_score_decreases_as_distance_grows() {
        let a = vec![0.0, 0.0];
        let near = vec![0.1, 0.0];
        let far = vec![5.0, 0.0];
        let score_near = score(super::super::config::SimilarityMetric::L2Distance, &a, &near);
        let score_far = score(super::super::config::SimilarityMetric::L2Distance, &a, &far);
        assert!(score_near > score_far);
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
