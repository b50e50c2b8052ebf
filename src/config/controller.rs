//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BW_API_URL, DEFAULT_BW_IDENTITY_API_URL, DEFAULT_BW_STATE_PATH, DEFAULT_METRICS_PORT,
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_SERVER_POLL_INTERVAL_MS,
    DEFAULT_SERVER_STARTUP_TIMEOUT_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
    MIN_REFRESH_INTERVAL_SECS,
};
use std::path::PathBuf;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Bitwarden Secrets Manager API base URL (`BW_API_URL`)
    pub api_url: String,
    /// Bitwarden identity base URL (`BW_IDENTITY_API_URL`)
    pub identity_api_url: String,
    /// Directory for cached client state (`BW_SECRETS_MANAGER_STATE_PATH`)
    /// An empty value disables state caching
    pub state_path: Option<PathBuf>,
    /// Requeue delay after every reconciliation (`BW_SECRETS_MANAGER_REFRESH_INTERVAL`)
    /// Clamped to `MIN_REFRESH_INTERVAL_SECS`
    pub refresh_interval_secs: u64,
    /// Watch stream restart delay (`WATCH_RESTART_DELAY_SECS`)
    pub watch_restart_delay_secs: u64,
    /// HTTP port for metrics and health checks (`METRICS_PORT`)
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to bind (`SERVER_STARTUP_TIMEOUT_SECS`)
    pub server_startup_timeout_secs: u64,
    /// Readiness poll interval while waiting for the HTTP server (`SERVER_POLL_INTERVAL_MS`)
    pub server_poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BW_API_URL.to_string(),
            identity_api_url: DEFAULT_BW_IDENTITY_API_URL.to_string(),
            state_path: Some(PathBuf::from(DEFAULT_BW_STATE_PATH)),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let refresh_interval_secs = var_or_default(
            &lookup,
            "BW_SECRETS_MANAGER_REFRESH_INTERVAL",
            DEFAULT_REFRESH_INTERVAL_SECS,
        )
        .max(MIN_REFRESH_INTERVAL_SECS);

        let state_path = lookup("BW_SECRETS_MANAGER_STATE_PATH")
            .unwrap_or_else(|| DEFAULT_BW_STATE_PATH.to_string());
        let state_path = if state_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(state_path))
        };

        Self {
            api_url: trim_url(
                lookup("BW_API_URL").unwrap_or_else(|| DEFAULT_BW_API_URL.to_string()),
            ),
            identity_api_url: trim_url(
                lookup("BW_IDENTITY_API_URL")
                    .unwrap_or_else(|| DEFAULT_BW_IDENTITY_API_URL.to_string()),
            ),
            state_path,
            refresh_interval_secs,
            watch_restart_delay_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            metrics_port: var_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            server_startup_timeout_secs: var_or_default(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            server_poll_interval_ms: var_or_default(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }

    /// Get refresh interval duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get server startup timeout duration
    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    /// Get server readiness poll interval duration
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }
}

/// Read a variable through `lookup` or return the default value
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ControllerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_refresh_interval_is_clamped_to_minimum() {
        let config = config_from(&[("BW_SECRETS_MANAGER_REFRESH_INTERVAL", "30")]);
        assert_eq!(config.refresh_interval_secs, MIN_REFRESH_INTERVAL_SECS);

        let config = config_from(&[("BW_SECRETS_MANAGER_REFRESH_INTERVAL", "600")]);
        assert_eq!(config.refresh_interval_secs, 600);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("BW_SECRETS_MANAGER_REFRESH_INTERVAL", "five minutes"),
            ("METRICS_PORT", "not-a-port"),
        ]);
        assert_eq!(config.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_urls_are_trimmed() {
        let config = config_from(&[
            ("BW_API_URL", "https://vault.example.com/api/"),
            ("BW_IDENTITY_API_URL", " https://vault.example.com/identity// "),
        ]);
        assert_eq!(config.api_url, "https://vault.example.com/api");
        assert_eq!(config.identity_api_url, "https://vault.example.com/identity");
    }

    #[test]
    fn test_empty_state_path_disables_state() {
        let config = config_from(&[("BW_SECRETS_MANAGER_STATE_PATH", "")]);
        assert_eq!(config.state_path, None);

        let config = config_from(&[("BW_SECRETS_MANAGER_STATE_PATH", "/tmp/bw")]);
        assert_eq!(config.state_path, Some(PathBuf::from("/tmp/bw")));
    }
}
