//! Layered configuration loading: defaults, overridden by an optional
//! config file, overridden by environment variables.

use crate::error::ConfigError;
use crate::model::{GatewayConfig, ProviderSettings};
use secrecy::SecretString;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use validator::Validate;

const CONFIG_FILE_ENV: &str = "GATEWAY_CONFIG_FILE";
const PROVIDERS_ENV: &str = "GATEWAY_PROVIDERS";

/// Load the gateway's configuration: start from defaults, merge in an
/// optional config file (YAML or TOML, selected by `GATEWAY_CONFIG_FILE`
/// or the first of `gateway.yaml` / `gateway.toml` that exists), then
/// apply environment overrides on top, and finally validate the result.
///
/// # Errors
/// Returns [`ConfigError`] if a named config file cannot be read or
/// parsed, if an environment variable holds a value of the wrong shape,
/// or if the merged configuration fails validation.
pub async fn load_config() -> Result<GatewayConfig, ConfigError> {
    let mut config = match locate_config_file().await? {
        Some(path) => load_file(&path).await?,
        None => {
            debug!("no config file found, starting from defaults");
            GatewayConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;

    config
        .validate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    info!(
        providers = config.providers.len(),
        port = config.server.port,
        "configuration loaded"
    );
    Ok(config)
}

async fn locate_config_file() -> Result<Option<PathBuf>, ConfigError> {
    if let Ok(path) = env::var(CONFIG_FILE_ENV) {
        return Ok(Some(PathBuf::from(path)));
    }
    for candidate in ["gateway.yaml", "gateway.yml", "gateway.toml"] {
        if tokio::fs::metadata(candidate).await.is_ok() {
            return Ok(Some(PathBuf::from(candidate)));
        }
    }
    Ok(None)
}

async fn load_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let contents =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => "toml",
        _ => "yaml",
    };

    let parsed = if format == "toml" {
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            format,
            source: e.into(),
        })
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            format,
            source: e.into(),
        })
    };

    let config = parsed?;
    debug!(path = %path.display(), format, "loaded config file");
    Ok(config)
}

/// Overlay environment variables onto an already-loaded (or default)
/// configuration, in the teacher's "env wins" layering order.
fn apply_env_overrides(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    if let Ok(host) = env::var("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = env::var("GATEWAY_PORT") {
        config.server.port = parse_env("GATEWAY_PORT", &port)?;
    }

    if let Ok(interval) = env::var("HEALTH_CHECK_INTERVAL") {
        config.health.check_interval = parse_duration("HEALTH_CHECK_INTERVAL", &interval)?;
    }
    if let Ok(timeout) = env::var("HEALTH_CHECK_TIMEOUT") {
        config.health.check_timeout = parse_duration("HEALTH_CHECK_TIMEOUT", &timeout)?;
    }

    if let Ok(max_entries) = env::var("CACHE_MAX_ENTRIES") {
        config.cache.max_entries = parse_env("CACHE_MAX_ENTRIES", &max_entries)?;
    }
    if let Ok(threshold) = env::var("CACHE_SIMILARITY_THRESHOLD") {
        config.cache.similarity_threshold = parse_env("CACHE_SIMILARITY_THRESHOLD", &threshold)?;
    }
    if let Ok(ttl) = env::var("CACHE_TTL") {
        config.cache.ttl = parse_duration("CACHE_TTL", &ttl)?;
    }

    if let Ok(secret) = env::var("JWT_SECRET") {
        config.security.jwt_secret = Some(SecretString::from(secret));
    }
    if let Ok(host) = env::var("REDIS_HOST") {
        config.external_cache.redis_host = Some(host);
    }
    if let Ok(port) = env::var("REDIS_PORT") {
        config.external_cache.redis_port = Some(parse_env("REDIS_PORT", &port)?);
    }

    apply_provider_env_overrides(config)?;
    Ok(())
}

/// `GATEWAY_PROVIDERS` names a comma-separated list of provider ids; for
/// each, `<ID>_API_KEY` / `<ID>_BASE_URL` / `<ID>_MODEL` are read and
/// merged into (or appended to) `config.providers`. This generalizes the
/// teacher's per-vendor `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` checks to
/// an arbitrary provider set, since every adapter here speaks the same
/// OpenAI-compatible wire shape.
fn apply_provider_env_overrides(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    let Ok(names) = env::var(PROVIDERS_ENV) else {
        return Ok(());
    };

    for raw_id in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let prefix = raw_id.to_uppercase();
        let api_key = env::var(format!("{prefix}_API_KEY")).ok();
        let base_url = env::var(format!("{prefix}_BASE_URL")).ok();
        let default_model = env::var(format!("{prefix}_MODEL")).ok();

        if api_key.is_none() {
            warn!(provider = raw_id, "no {prefix}_API_KEY set; provider will be skipped at registration");
        }

        match config.providers.iter_mut().find(|p| p.id == raw_id) {
            Some(existing) => {
                if let Some(key) = api_key {
                    existing.api_key = Some(SecretString::from(key));
                }
                if let Some(url) = base_url {
                    existing.base_url = url;
                }
                if default_model.is_some() {
                    existing.default_model = default_model;
                }
            }
            None => {
                config.providers.push(ProviderSettings {
                    id: raw_id.to_string(),
                    enabled: true,
                    base_url: base_url.unwrap_or_default(),
                    api_key_env: Some(format!("{prefix}_API_KEY")),
                    api_key: api_key.map(SecretString::from),
                    default_model,
                    priority: config.providers.len() as u32,
                    timeout: Duration::from_secs(60),
                });
            }
        }
    }
    Ok(())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    raw.parse().map_err(|_| ConfigError::InvalidEnvValue {
        name: name.to_string(),
        reason: format!("{raw:?} is not a valid value"),
    })
}

fn parse_duration(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidEnvValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
