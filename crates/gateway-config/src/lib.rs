//! # Gateway Config
//!
//! Layered configuration loading for the LLM Inference Gateway: defaults,
//! an optional YAML/TOML file, then environment variables, in that
//! override order. Also provides an `ArcSwap`-backed handle for picking
//! up provider-credential changes without a restart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod loader;
mod model;
mod reload;

pub use error::ConfigError;
pub use loader::load_config;
pub use model::{
    CacheSettings, ExternalCacheStub, GatewayConfig, HealthSettings, ProviderSettings,
    SecurityStub, ServerSettings,
};
pub use reload::ConfigHandle;
