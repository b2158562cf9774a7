use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "CHATWIDGET_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const DEFAULT_LOG_FILE: &str = "chatwidget.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    /// Base URL of the assistant; requests go to `<endpoint>/chat`
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Seconds between connectivity probes
    pub probe_interval_secs: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            log_file: None,
            probe_interval_secs: 5,
        }
    }
}

impl WidgetConfig {
    /// Load from a JSON file. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: WidgetConfig = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`)
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn endpoint_url(&self) -> Result<url::Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = url::Url::parse(self.endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme '{}'", other))),
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}

/// `<config_dir>/chatwidget/config.json`, when the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chatwidget").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WidgetConfig::load(&dir.path().join("config.json")).unwrap().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"endpoint": "https://atendimento.example.com/api"}"#).unwrap();

        let config = WidgetConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.endpoint, "https://atendimento.example.com/api");
        assert_eq!(config.probe_interval_secs, 5);
        assert_eq!(config.log_file(), PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(WidgetConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides_endpoint() {
        let config = WidgetConfig::default().apply_env(|key| {
            (key == ENDPOINT_ENV).then(|| "http://10.0.0.2:8080".to_string())
        });
        assert_eq!(config.endpoint, "http://10.0.0.2:8080");

        let untouched = WidgetConfig::default().apply_env(|_| Some("  ".to_string()));
        assert_eq!(untouched.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(WidgetConfig::default().endpoint_url().is_ok());

        for bad in ["/chat", "ftp://host", "not a url"] {
            let config = WidgetConfig { endpoint: bad.to_string(), ..WidgetConfig::default() };
            assert!(
                matches!(config.endpoint_url(), Err(ConfigError::InvalidEndpoint { .. })),
                "expected {} to be rejected",
                bad
            );
        }
    }
}
