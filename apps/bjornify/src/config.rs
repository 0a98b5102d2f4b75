//! Bot configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! The environment names match the ones spotipy reads, so an existing
//! deployment keeps working unchanged.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bjornify_core::ClientCredentials;
use serde::Deserialize;

/// Default location of the spotipy token cache inside the container.
pub const DEFAULT_TOKEN_CACHE: &str = "/app/secrets/spotipy_token.cache";

/// Bot configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Spotify application client id.
    /// Override: `SPOTIPY_CLIENT_ID`
    pub client_id: Option<String>,

    /// Spotify application client secret.
    /// Override: `SPOTIPY_CLIENT_SECRET`
    pub client_secret: Option<String>,

    /// spotipy-format token cache holding the refresh token.
    /// Override: `BJORNIFY_TOKEN_CACHE`
    pub token_cache: PathBuf,

    /// Device to start playback on when nothing is playing.
    /// Override: `BJORNIFY_PREFERRED_DEVICE`
    pub preferred_device: String,

    /// Sonos service type of the household's Spotify account.
    pub sonos_spotify_service_type: u32,

    /// Enable SSDP multicast discovery.
    pub discovery_ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    pub discovery_ssdp_broadcast: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        let core = bjornify_core::Config::default();
        Self {
            client_id: None,
            client_secret: None,
            token_cache: PathBuf::from(DEFAULT_TOKEN_CACHE),
            preferred_device: core.preferred_device,
            sonos_spotify_service_type: core.sonos_spotify_service_type,
            discovery_ssdp_multicast: core.discovery_ssdp_multicast,
            discovery_ssdp_broadcast: core.discovery_ssdp_broadcast,
        }
    }
}

impl BotConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from `lookup` (the process environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = non_empty("SPOTIPY_CLIENT_ID") {
            self.client_id = Some(val);
        }
        if let Some(val) = non_empty("SPOTIPY_CLIENT_SECRET") {
            self.client_secret = Some(val);
        }
        if let Some(val) = non_empty("BJORNIFY_TOKEN_CACHE") {
            self.token_cache = PathBuf::from(val);
        }
        if let Some(val) = non_empty("BJORNIFY_PREFERRED_DEVICE") {
            self.preferred_device = val;
        }
    }

    /// Returns the Spotify client credentials.
    ///
    /// # Errors
    /// Fails if either the client id or the secret is missing.
    pub fn client_credentials(&self) -> Result<ClientCredentials> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            bail!("Spotify client id and secret are required (set SPOTIPY_CLIENT_ID and SPOTIPY_CLIENT_SECRET)");
        };
        Ok(ClientCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        })
    }

    /// Converts to bjornify-core's Config type.
    pub fn to_core_config(&self) -> bjornify_core::Config {
        bjornify_core::Config {
            preferred_device: self.preferred_device.clone(),
            sonos_spotify_service_type: self.sonos_spotify_service_type,
            discovery_ssdp_multicast: self.discovery_ssdp_multicast,
            discovery_ssdp_broadcast: self.discovery_ssdp_broadcast,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn loads_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bjornify.yaml");
        std::fs::write(&path, "preferred_device: Kitchen\nsonos_spotify_service_type: 3079\n")
            .unwrap();

        let mut config: BotConfig =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_overrides(|_| None);

        assert_eq!(config.preferred_device, "Kitchen");
        assert_eq!(config.sonos_spotify_service_type, 3079);
        assert_eq!(config.token_cache, PathBuf::from(DEFAULT_TOKEN_CACHE));
        assert!(config.discovery_ssdp_broadcast);
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("SPOTIPY_CLIENT_ID", "env-id"),
            ("SPOTIPY_CLIENT_SECRET", "env-secret"),
            ("BJORNIFY_TOKEN_CACHE", "/tmp/token.cache"),
            ("BJORNIFY_PREFERRED_DEVICE", ""),
        ]
        .into_iter()
        .collect();

        let mut config = BotConfig {
            client_id: Some("file-id".into()),
            ..BotConfig::default()
        };
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.token_cache, PathBuf::from("/tmp/token.cache"));
        // Empty values do not override.
        assert_eq!(config.preferred_device, "Everywhere");

        let credentials = config.client_credentials().unwrap();
        assert_eq!(credentials.client_secret, "env-secret");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let config = BotConfig {
            client_id: Some("id".into()),
            ..BotConfig::default()
        };
        assert!(config.client_credentials().is_err());
    }

    #[test]
    fn core_config_carries_bot_settings() {
        let config = BotConfig {
            preferred_device: "Office".into(),
            discovery_ssdp_multicast: false,
            ..BotConfig::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.preferred_device, "Office");
        assert!(!core.discovery_ssdp_multicast);
        assert!(core.validate().is_ok());
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = BotConfig::load(None).unwrap();
        assert_eq!(config.sonos_spotify_service_type, 2311);
    }
}
