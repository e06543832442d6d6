//! The assembled configuration tree, built by [`crate::loader::load_config`].

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Top-level gateway configuration: the merged result of defaults, an
/// optional config file, and environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// HTTP server bind settings.
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerSettings,

    /// Providers to register, in priority order.
    #[serde(default)]
    #[validate(nested)]
    pub providers: Vec<ProviderSettings>,

    /// Background health prober settings.
    #[serde(default)]
    #[validate(nested)]
    pub health: HealthSettings,

    /// Semantic cache settings.
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheSettings,

    /// Auth stub: acknowledged but not enforced beyond the bearer-token
    /// check named in the non-goals.
    #[serde(default)]
    pub security: SecurityStub,

    /// External cache-backing stub: recognized so deployments can set it
    /// without the gateway refusing to start, not wired to any cache
    /// implementation.
    #[serde(default)]
    pub external_cache: ExternalCacheStub,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            providers: Vec::new(),
            health: HealthSettings::default(),
            cache: CacheSettings::default(),
            security: SecurityStub::default(),
            external_cache: ExternalCacheStub::default(),
        }
    }
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// One provider registration, built from either the config file or a
/// `<PROVIDER>_API_KEY` / `<PROVIDER>_BASE_URL` / `<PROVIDER>_MODEL` env
/// triplet.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderSettings {
    /// Stable provider id (also the env-var prefix, upper-cased).
    #[validate(length(min = 1))]
    pub id: String,

    /// Whether this provider is registered at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the upstream OpenAI-compatible endpoint. May be empty
    /// for a provider that is registered but not yet configured; such a
    /// provider is skipped at registration time rather than rejected here.
    #[serde(default)]
    pub base_url: String,

    /// Name of the environment variable holding the API key, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// API key read directly from the config file. An `api_key_env`
    /// lookup, if present, takes precedence over this at load time.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Default model for requests that omit one.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Priority rank; lower sorts first.
    #[serde(default)]
    pub priority: u32,

    /// Per-call timeout.
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Build the `gateway-core` adapter config this entry describes, or
    /// `None` if it has no API key (the provider is then skipped at
    /// registration rather than failing startup).
    #[must_use]
    pub fn to_provider_config(&self) -> Option<gateway_core::ProviderConfig> {
        Some(gateway_core::ProviderConfig {
            id: gateway_core::ProviderId::from(self.id.as_str()),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            default_model: self.default_model.clone(),
            timeout: self.timeout,
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Background health prober settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HealthSettings {
    /// Interval between background probe sweeps.
    #[serde(default = "default_check_interval", with = "humantime_serde")]
    pub check_interval: Duration,

    /// Per-probe timeout.
    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub check_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            check_timeout: default_check_timeout(),
        }
    }
}

fn default_check_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Semantic cache settings, mirrored into `gateway_cache::CacheConfig` at
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheSettings {
    /// Maximum number of cached entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Minimum similarity score for a cache hit.
    #[serde(default = "default_similarity_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,

    /// Entry time-to-live.
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            similarity_threshold: default_similarity_threshold(),
            ttl: default_cache_ttl(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

/// `JWT_SECRET` is recognized and threaded through so deployments can set
/// it without error, but request authentication beyond the bearer-token
/// stub is out of scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityStub {
    /// Shared secret for the bearer-token stub, if configured.
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<SecretString>,
}

/// `REDIS_HOST` / `REDIS_PORT` are recognized so an operator can point at
/// an external cache without the gateway refusing to start, but no
/// Redis-backed cache is implemented; the in-process `SemanticCache`
/// always backs lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalCacheStub {
    /// Redis host, unused.
    #[serde(default)]
    pub redis_host: Option<String>,

    /// Redis port, unused.
    #[serde(default)]
    pub redis_port: Option<u16>,
}
