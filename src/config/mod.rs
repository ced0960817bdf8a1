// src/config/mod.rs - Engine configuration loaded from YAML with env overrides

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tokio::fs;
use url::Url;

use crate::color::{ColorNormalizer, DEFAULT_BACKGROUND, DEFAULT_MIN_CONTRAST};
use crate::types::Rgb;

/// Validation failures for a loaded configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint '{field}' is not a valid url ({value}): {source}")]
    InvalidEndpoint {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("min_contrast must be between 1 and 21, got {0}")]
    InvalidContrast(f64),

    #[error("request_timeout_seconds must be greater than zero")]
    InvalidTimeout,
}

/// Top-level configuration file (`chatline.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub identity: IdentitySettings,
    pub appearance: AppearanceSettings,
    pub endpoints: EndpointSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Login used for self-mention detection; empty disables it
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub background: Rgb,
    pub min_contrast: f64,
    /// Used when a message arrives without a color
    pub default_user_color: Rgb,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            min_contrast: DEFAULT_MIN_CONTRAST,
            default_user_color: Rgb(180, 180, 180),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub badges_api: String,
    pub emotes_api: String,
    pub emote_cdn: String,
    pub twitch_emote_cdn: String,
    pub request_timeout_seconds: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            badges_api: "https://badges.twitch.tv/v1/badges".to_string(),
            emotes_api: "https://api.betterttv.net/3/cached".to_string(),
            emote_cdn: "https://cdn.betterttv.net/emote".to_string(),
            twitch_emote_cdn: "https://static-cdn.jtvnw.net/emoticons/v2".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl EngineConfig {
    pub const FILE_NAME: &'static str = "chatline.yaml";

    /// Load `<config_dir>/chatline.yaml`, writing the defaults first if it does not exist
    pub async fn load_or_create<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .with_context(|| format!("Failed to create config directory {}", config_dir.display()))?;
            info!("Created configuration directory: {}", config_dir.display());
        }

        let config_path = config_dir.join(Self::FILE_NAME);
        if !config_path.exists() {
            let config = Self::default();
            config.save(&config_path).await?;
            info!("Created default configuration: {}", config_path.display());
            return Ok(config);
        }

        Self::load(&config_path).await
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), content)
            .await
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Apply `TWITCH_USERNAME` and `CHATLINE_MIN_CONTRAST` from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("TWITCH_USERNAME") {
            let username = username.trim().to_string();
            info!("Using login '{}' from environment", username);
            self.identity.username = username;
        }

        if let Some(raw) = lookup("CHATLINE_MIN_CONTRAST") {
            match raw.trim().parse::<f64>() {
                Ok(value) => self.appearance.min_contrast = value,
                Err(e) => warn!("Ignoring CHATLINE_MIN_CONTRAST='{}': {}", raw, e),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoints = [
            ("badges_api", &self.endpoints.badges_api),
            ("emotes_api", &self.endpoints.emotes_api),
            ("emote_cdn", &self.endpoints.emote_cdn),
            ("twitch_emote_cdn", &self.endpoints.twitch_emote_cdn),
        ];
        for (field, value) in endpoints {
            Url::parse(value).map_err(|source| ConfigError::InvalidEndpoint {
                field,
                value: value.clone(),
                source,
            })?;
        }

        let contrast = self.appearance.min_contrast;
        if !(1.0..=21.0).contains(&contrast) {
            return Err(ConfigError::InvalidContrast(contrast));
        }

        if self.endpoints.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    pub fn color_normalizer(&self) -> ColorNormalizer {
        ColorNormalizer::new(self.appearance.background, self.appearance.min_contrast)
    }
}
