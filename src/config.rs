use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration structure loaded from promptgate.toml and environment
/// variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// System-level configuration for the catalog, telemetry, and export
/// behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    /// External catalog file; the embedded catalog is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// Bound on in-flight telemetry events.
    pub telemetry_buffer: usize,
    /// Per-event telemetry emission retries before the event is dropped.
    pub telemetry_retries: u32,
    /// Retries for the artifact persistence step of an export.
    pub export_retries: u32,
    pub export_retry_delay_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            telemetry_buffer: 256,
            telemetry_retries: 2,
            export_retries: 2,
            export_retry_delay_ms: 200,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_bind: SocketAddr,
    pub bearer_token: Option<String>,
    pub log_level: String,
    pub http_request_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:8990"
                .parse()
                .expect("default bind address should parse"),
            bearer_token: None,
            log_level: "promptgate=info,tower_http=info".to_string(),
            http_request_timeout_ms: 10_000,
        }
    }
}

impl RuntimeConfig {
    fn load_from_env() -> Self {
        let mut runtime = Self::default();

        if let Ok(bind) = std::env::var("PG_HTTP_BIND") {
            match bind.parse::<SocketAddr>() {
                Ok(addr) => runtime.http_bind = addr,
                Err(_) => {
                    tracing::warn!("PG_HTTP_BIND '{}' is not a socket address, using default", bind)
                }
            }
        }
        if let Ok(token) = std::env::var("PG_BEARER_TOKEN") {
            if !token.is_empty() {
                runtime.bearer_token = Some(token);
            }
        }
        if let Ok(level) = std::env::var("PG_LOG") {
            runtime.log_level = level;
        }
        if let Some(timeout) = std::env::var("PG_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            runtime.http_request_timeout_ms = timeout.clamp(100, 120_000);
        }

        runtime
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses the PROMPTGATE_CONFIG environment variable or defaults to
    /// "promptgate.toml".
    pub fn load() -> anyhow::Result<Self> {
        // .env first so the file path itself can come from there
        if let Ok(env_path) = std::env::var("PG_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path =
            std::env::var("PROMPTGATE_CONFIG").unwrap_or_else(|_| "promptgate.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Apply env overrides (env-first)
        if let Ok(catalog) = std::env::var("PG_CATALOG") {
            config.system.catalog_path = Some(PathBuf::from(catalog));
        }
        if let Some(buffer) = std::env::var("PG_TELEMETRY_BUFFER")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.system.telemetry_buffer = buffer;
        }
        if let Some(retries) = std::env::var("PG_EXPORT_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.system.export_retries = retries;
        }

        config.runtime = RuntimeConfig::load_from_env();

        // Validate and clamp
        if config.system.telemetry_buffer == 0 {
            config.system.telemetry_buffer = 1;
        }
        if config.system.telemetry_retries > 10 {
            tracing::warn!(
                "telemetry_retries {} exceeds max 10, clamping to 10",
                config.system.telemetry_retries
            );
            config.system.telemetry_retries = 10;
        }
        if config.system.export_retries > 5 {
            tracing::warn!(
                "export_retries {} exceeds max 5, clamping to 5",
                config.system.export_retries
            );
            config.system.export_retries = 5;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.system.catalog_path.is_none());
        assert!(config.system.telemetry_buffer > 0);
        assert!(config.system.export_retries <= 5);
        assert_eq!(config.runtime.http_bind.port(), 8990);
    }

    #[test]
    fn system_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(
            back.system.telemetry_buffer,
            config.system.telemetry_buffer
        );
    }
}
