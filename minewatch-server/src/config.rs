//! Monitor configuration
//!
//! Loaded once at startup: yaml file (`$MINEWATCH_CONFIG` or `minewatch.yaml`),
//! then `MINEWATCH_*` environment overrides. A missing file means defaults,
//! an invalid one is logged and replaced by defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "MINEWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "minewatch.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Game server address, used for both the metrics scrape and the probe.
    pub remote_host: String,
    pub metrics_port: u16,
    pub game_port: u16,
    pub fetch_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub listen_port: u16,
    /// Dashboard assets served on every path the API does not claim.
    pub static_dir: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            remote_host: "127.0.0.1".into(),
            metrics_port: 25585,
            game_port: 25565,
            fetch_timeout_ms: 5000,
            probe_timeout_ms: 3000,
            listen_port: 3333,
            static_dir: "public".into(),
        }
    }
}

impl MonitorConfig {
    pub fn metrics_url(&self) -> String {
        format!("http://{}:{}/metrics", self.remote_host, self.metrics_port)
    }

    pub fn game_addr(&self) -> String {
        format!("{}:{}", self.remote_host, self.game_port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.listen_port))
    }

    /// Parse a yaml document. An empty document yields the defaults.
    pub fn from_yaml(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(txt)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let txt = fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml(&txt)
    }

    /// Apply `MINEWATCH_*` overrides through a lookup function so tests do
    /// not have to touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MINEWATCH_REMOTE_HOST") {
            self.remote_host = host;
        }
        if let Some(dir) = lookup("MINEWATCH_STATIC_DIR") {
            self.static_dir = dir;
        }
        override_parsed(&lookup, "MINEWATCH_METRICS_PORT", &mut self.metrics_port);
        override_parsed(&lookup, "MINEWATCH_GAME_PORT", &mut self.game_port);
        override_parsed(&lookup, "MINEWATCH_FETCH_TIMEOUT_MS", &mut self.fetch_timeout_ms);
        override_parsed(&lookup, "MINEWATCH_PROBE_TIMEOUT_MS", &mut self.probe_timeout_ms);
        override_parsed(&lookup, "MINEWATCH_LISTEN_PORT", &mut self.listen_port);
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!("ignoring {key}={raw:?}: not a valid value"),
    }
}

/// Load the configuration the way the binary does at startup.
pub async fn load_config() -> MonitorConfig {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut cfg = if Path::new(&path).exists() {
        match MonitorConfig::from_file(&path).await {
            Ok(cfg) => {
                info!("loaded config from {path}");
                cfg
            }
            Err(e) => {
                warn!("invalid config {path}: {e}, using defaults");
                MonitorConfig::default()
            }
        }
    } else {
        info!("no {path} found, using default config");
        MonitorConfig::default()
    };

    cfg.apply_overrides(|key| std::env::var(key).ok());
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.metrics_port, 25585);
        assert_eq!(cfg.game_port, 25565);
        assert_eq!(cfg.listen_port, 3333);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.probe_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.metrics_url(), "http://127.0.0.1:25585/metrics");
        assert_eq!(cfg.game_addr(), "127.0.0.1:25565");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = MonitorConfig::from_yaml(
            "remoteHost: 10.0.0.7\nmetricsPort: 9225\nfetchTimeoutMs: 1500\n",
        )
        .unwrap();

        assert_eq!(cfg.remote_host, "10.0.0.7");
        assert_eq!(cfg.metrics_port, 9225);
        assert_eq!(cfg.fetch_timeout_ms, 1500);
        assert_eq!(cfg.game_port, 25565);
        assert_eq!(cfg.static_dir, "public");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(MonitorConfig::from_yaml("  \n").unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(MonitorConfig::from_yaml("metricsPort: [not, a, port]").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MINEWATCH_REMOTE_HOST", "mc.example.net"),
            ("MINEWATCH_GAME_PORT", "25570"),
            ("MINEWATCH_LISTEN_PORT", "not-a-port"),
        ]);
        let mut cfg = MonitorConfig::default();
        cfg.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.remote_host, "mc.example.net");
        assert_eq!(cfg.game_port, 25570);
        // unparseable values are ignored
        assert_eq!(cfg.listen_port, 3333);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let err = MonitorConfig::from_file("/nonexistent/minewatch.yaml").await;
        assert!(matches!(err, Err(ConfigError::Io(_))));
    }
}
