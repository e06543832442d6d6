//! Explicitly-constructed provider registry.
//!
//! The original design behind this gateway kept one process-wide registry.
//! Here a `ProviderRegistry` is just a value: build one, hand it to the
//! facade, and tests can build their own independent instance with no
//! shared global state.

use gateway_core::{GatewayError, GatewayResult, Provider, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable set of providers, keyed by id and ordered by registration
/// priority.
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    ordered_ids: Vec<ProviderId>,
}

impl ProviderRegistry {
    /// Build a registry from an already-assembled provider set. Order is
    /// preserved from `providers` for `ordered_ids`.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut map = HashMap::with_capacity(providers.len());
        let mut ordered_ids = Vec::with_capacity(providers.len());
        for provider in providers {
            let id = provider.id().clone();
            ordered_ids.push(id.clone());
            map.insert(id, provider);
        }
        Self {
            providers: map,
            ordered_ids,
        }
    }

    /// Look up a provider by id.
    ///
    /// # Errors
    /// Returns `NotFound` if no provider with that id is registered.
    pub fn get(&self, id: &ProviderId) -> GatewayResult<Arc<dyn Provider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("unknown provider: {id}")))
    }

    /// All registered provider ids, in registration order.
    #[must_use]
    pub fn ids(&self) -> &[ProviderId] {
        &self.ordered_ids
    }

    /// Resolve a list of ids into live provider handles, in the same
    /// order, skipping any id that is not registered.
    #[must_use]
    pub fn resolve(&self, ids: &[ProviderId]) -> Vec<Arc<dyn Provider>> {
        ids.iter().filter_map(|id| self.providers.get(id).cloned()).collect()
    }

    /// All providers supporting `model`, in registration order.
    #[must_use]
    pub fn supporting_model(&self, model: &str) -> Vec<Arc<dyn Provider>> {
        self.ordered_ids
            .iter()
            .filter_map(|id| self.providers.get(id))
            .filter(|p| p.describe().supported_models.contains(model))
            .cloned()
            .collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    /// True if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use gateway_core::ProviderCapabilities;
    use std::collections::HashSet;

    fn provider(id: &str, models: &[&str]) -> Arc<dyn Provider> {
        Arc::new(MockProvider::new(
            gateway_core::ProviderDescriptor {
                id: ProviderId::from(id),
                display_name: id.to_string(),
                supported_models: models.iter().map(|m| m.to_string()).collect(),
                capabilities: ProviderCapabilities {
                    capabilities: HashSet::new(),
                    max_tokens: 4096,
                    max_concurrent: 10,
                },
                priority: 0,
            },
            "mock response",
        ))
    }

    #[test]
    fn get_returns_not_found_for_unknown_id() {
        let registry = ProviderRegistry::new(vec![provider("p1", &["gpt-4"])]);
        let err = registry.get(&ProviderId::from("missing")).unwrap_err();
        assert_eq!(err.kind(), "not-found");
    }

    #[test]
    fn supporting_model_filters_by_descriptor() {
        let registry = ProviderRegistry::new(vec![
            provider("p1", &["gpt-4"]),
            provider("p2", &["claude-3"]),
        ]);
        let matches = registry.supporting_model("gpt-4");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id().as_str(), "p1");
    }

    #[test]
    fn resolve_preserves_order_and_skips_unknown() {
        let registry = ProviderRegistry::new(vec![
            provider("p1", &["gpt-4"]),
            provider("p2", &["gpt-4"]),
        ]);
        let resolved = registry.resolve(&[
            ProviderId::from("p2"),
            ProviderId::from("ghost"),
            ProviderId::from("p1"),
        ]);
        let ids: Vec<&str> = resolved.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }
}
