//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// WebSocket endpoint frames are pushed to.
    pub endpoint: String,

    /// Default capture settings.
    pub capture: CaptureDefaults,

    /// Milliseconds between capture cycles.
    pub interval_ms: u64,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDefaults {
    /// Camera device path (e.g., "/dev/video0").
    pub device: String,

    /// Capture width in pixels.
    pub width: u32,

    /// Capture height in pixels.
    pub height: u32,

    /// JPEG quality [1, 100]. Fixed for the life of a session.
    pub quality: u8,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".to_string(),
            capture: CaptureDefaults::default(),
            interval_ms: 2000,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            quality: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framecast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_streaming_contract() {
        let config = AppConfig::default();
        assert_eq!(config.interval_ms, 2000);
        assert_eq!(config.capture.quality, 30);
        assert!(config.endpoint.starts_with("ws://"));
    }

    #[test]
    fn test_config_parses_partial_override() {
        let json = r#"{
            "endpoint": "ws://192.168.178.25:8000",
            "capture": { "device": "/dev/video2", "width": 1280, "height": 720, "quality": 50 },
            "interval_ms": 500,
            "logging": { "level": "debug", "json": true }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint, "ws://192.168.178.25:8000");
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.interval_ms, 500);
        assert!(config.logging.json);
    }
}
