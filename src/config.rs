use crate::{location::Coordinates, policy::SkinType};
use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{env, fs::File, io::ErrorKind, path::Path, time::Duration};

/// App configuration, loaded once at startup
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credential for the UV provider, sent as `x-access-token`
    pub openuv_api_key: Option<String>,
    pub uv_api_url: String,
    /// Fixed position. When set, the IP lookup is skipped entirely
    pub location: Option<Coordinates>,
    pub location_api_url: String,
    /// Initial skin type selection
    pub skin_type: SkinType,
    pub request_timeout_secs: u64,
}

impl Config {
    const PATH: &'static str = "./config.json";
    const API_KEY_VAR: &'static str = "OPENUV_API_KEY";

    /// Load config from the default path. A missing file is not an error, but
    /// a malformed one is
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_file(Self::PATH)?;
        config.apply_env(env::var(Self::API_KEY_VAR).ok());
        Ok(config)
    }

    fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading config from `{}`", path.display());
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No config file at `{}`, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Error opening config file {}", path.display())
                })
            }
        };
        serde_json::from_reader(file).with_context(|| {
            format!("Error parsing config file {}", path.display())
        })
    }

    /// The environment wins over the file, but only if it holds something
    fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            info!("Using UV API key from ${}", Self::API_KEY_VAR);
            self.openuv_api_key = Some(key);
        }
    }

    /// API key, with blank values treated as absent
    pub fn api_key(&self) -> Option<&str> {
        self.openuv_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openuv_api_key: None,
            uv_api_url: "https://api.openuv.io/api/v1/uv".into(),
            location: None,
            location_api_url: "http://ip-api.com/json".into(),
            skin_type: SkinType::default(),
            request_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            Config::load_file("./definitely/not/here/config.json").unwrap();
        assert_eq!(config.skin_type, SkinType::Dark);
        assert_eq!(config.uv_api_url, "https://api.openuv.io/api/v1/uv");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "openuv_api_key": "abc123",
                "skin_type": "light",
                "location": {"latitude": 42.36, "longitude": -71.06}
            }"#,
        )
        .unwrap();
        assert_eq!(config.api_key(), Some("abc123"));
        assert_eq!(config.skin_type, SkinType::Light);
        assert_eq!(
            config.location,
            Some(Coordinates {
                latitude: 42.36,
                longitude: -71.06
            })
        );
        assert_eq!(config.location_api_url, "http://ip-api.com/json");
    }

    #[test]
    fn test_malformed_file() {
        let path = env::temp_dir()
            .join(format!("sunscreen-config-{}.json", std::process::id()));
        File::create(&path)
            .unwrap()
            .write_all(b"{\"skin_type\": \"purple\"}")
            .unwrap();
        let err = Config::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Error parsing config file"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_env_override() {
        let mut config = Config {
            openuv_api_key: Some("from-file".into()),
            ..Config::default()
        };
        config.apply_env(Some("   ".into()));
        assert_eq!(config.api_key(), Some("from-file"));
        config.apply_env(None);
        assert_eq!(config.api_key(), Some("from-file"));
        config.apply_env(Some("from-env".into()));
        assert_eq!(config.api_key(), Some("from-env"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let config = Config {
            openuv_api_key: Some("  ".into()),
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);
    }
}
