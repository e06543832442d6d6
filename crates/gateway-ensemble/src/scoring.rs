//! Composite scoring and content-normalization for ensemble selection.

use gateway_core::{FinishReason, LLMResponse, DEFAULT_CONFIDENCE};

const CONFIDENCE_WEIGHT: f32 = 0.4;
const LENGTH_WEIGHT: f32 = 0.2;
const LATENCY_WEIGHT: f32 = 0.2;
const FINISH_WEIGHT: f32 = 0.2;
const LENGTH_NORMALIZER: f32 = 512.0;

/// A response plus its computed composite score, ready for selection.
#[derive(Debug, Clone)]
pub struct ScoredResponse {
    /// The raw provider response.
    pub response: LLMResponse,
    /// `0.4*confidence + 0.2*length + 0.2*latency + 0.2*finish`.
    pub composite: f32,
}

/// Score `response` against a fan-out with the given per-task deadline.
#[must_use]
pub fn score(response: &LLMResponse, timeout_ms: u64) -> f32 {
    let length_score = (response.content.len() as f32 / LENGTH_NORMALIZER).min(1.0);
    let latency_score = if timeout_ms == 0 {
        0.0
    } else {
        (1.0 - response.latency_ms as f32 / timeout_ms as f32).clamp(0.0, 1.0)
    };
    let finish_score = if response.finish_reason == FinishReason::Stop {
        1.0
    } else {
        0.5
    };
    let confidence = if response.confidence > 0.0 {
        response.confidence
    } else {
        DEFAULT_CONFIDENCE
    };

    CONFIDENCE_WEIGHT * confidence
        + LENGTH_WEIGHT * length_score
        + LATENCY_WEIGHT * latency_score
        + FINISH_WEIGHT * finish_score
}

/// Normalize `content` into a majority-vote bucket key: lowercase,
/// whitespace-collapsed, truncated to 200 chars.
#[must_use]
pub fn bucket_key(content: &str) -> String {
    let collapsed = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.chars().take(200).collect()
}

/// The fixed tie-break order: higher composite, then lower latency, then
/// lexicographic provider id. Returns `true` if `a` should be preferred
/// over `b`.
#[must_use]
pub fn beats(a: &ScoredResponse, b: &ScoredResponse) -> bool {
    match a.composite.total_cmp(&b.composite) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            match a.response.latency_ms.cmp(&b.response.latency_ms) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => {
                    a.response.provider_name.as_str() < b.response.provider_name.as_str()
                }
            }
        }
    }
}

/// Pick the argmax of `responses` under the fixed tie-break rule. Panics
/// on an empty slice; callers must only invoke this on a non-empty set.
#[must_use]
pub fn argmax(responses: &[ScoredResponse]) -> &ScoredResponse {
    let mut best = &responses[0];
    for candidate in &responses[1..] {
        if beats(candidate, best) {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{ProviderId, RequestId, Usage};

    fn response(provider: &str, content: &str, confidence: f32, latency_ms: u64) -> LLMResponse {
        LLMResponse {
            id: RequestId::generate(),
            request_id: RequestId::generate(),
            provider_name: ProviderId::from(provider),
            content: content.to_string(),
            confidence,
            latency_ms,
            usage: Usage::default(),
            reasoning: None,
            finish_reason: FinishReason::Stop,
        }
    }

    #[test]
    fn missing_confidence_falls_back_to_default() {
        let r = response("p1", "hello", 0.0, 100);
        let s = score(&r, 1000);
        // confidence term should use DEFAULT_CONFIDENCE (0.5), not 0.0
        assert!(s > CONFIDENCE_WEIGHT * 0.1);
    }

    #[test]
    fn argmax_picks_highest_composite() {
        let a = ScoredResponse {
            response: response("p1", "short", 0.5, 100),
            composite: 0.5,
        };
        let b = ScoredResponse {
            response: response("p2", "longer response here", 0.9, 50),
            composite: 0.9,
        };
        let winner = argmax(&[a, b]);
        assert_eq!(winner.response.provider_name.as_str(), "p2");
    }

    #[test]
    fn tie_break_prefers_lower_latency_then_lexicographic_id() {
        let a = ScoredResponse {
            response: response("zeta", "x", 0.5, 200),
            composite: 0.8,
        };
        let b = ScoredResponse {
            response: response("alpha", "y", 0.5, 100),
            composite: 0.8,
        };
        assert!(beats(&b, &a));

        let c = ScoredResponse {
            response: response("alpha", "x", 0.5, 100),
            composite: 0.8,
        };
        let d = ScoredResponse {
            response: response("beta", "y", 0.5, 100),
            composite: 0.8,
        };
        assert!(beats(&c, &d));
    }

    #[test]
    fn bucket_key_normalizes_whitespace_and_case() {
        let a = bucket_key("Hello   World\n\tFoo");
        let b = bucket_key("hello world foo");
        assert_eq!(a, b);
    }
}
