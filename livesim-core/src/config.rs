use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Rendition ladder served by this origin. Fixed after startup.
    pub catalog: Vec<RenditionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            catalog: default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base address embedded in playlist URLs. Empty means derive
    /// `http://{host}:{port}`.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` for development, `json` for production.
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// One rendition definition in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenditionConfig {
    pub width: u32,
    pub height: u32,
    pub codecs: String,
    /// Frames per second; must be greater than zero.
    pub framerate: u32,
    /// Bits per second.
    pub bitrate: u64,
    /// Target segment duration in milliseconds.
    pub nominal_duration: i64,
    /// Reserved duration-jitter bound in milliseconds (not applied).
    pub variance: i64,
    /// Sliding DVR window length in milliseconds.
    pub window: i64,
}

fn default_catalog() -> Vec<RenditionConfig> {
    vec![
        RenditionConfig {
            width: 1920,
            height: 1080,
            codecs: "avc1.640028,mp4a.40.2".to_string(),
            framerate: 60,
            bitrate: 6_000_000,
            nominal_duration: 2000,
            variance: 500,
            window: 30_000,
        },
        RenditionConfig {
            width: 1280,
            height: 720,
            codecs: "avc1.64001f,mp4a.40.2".to_string(),
            framerate: 30,
            bitrate: 3_000_000,
            nominal_duration: 2000,
            variance: 500,
            window: 30_000,
        },
        RenditionConfig {
            width: 854,
            height: 480,
            codecs: "avc1.64001e,mp4a.40.2".to_string(),
            framerate: 30,
            bitrate: 1_500_000,
            nominal_duration: 2000,
            variance: 500,
            window: 30_000,
        },
    ]
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (LIVESIM_SERVER_HOST, etc.)
        builder = builder.add_source(
            Environment::with_prefix("LIVESIM")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Validate the configuration, collecting every error at once so a
    /// misconfigured deployment fails fast with the full picture.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.catalog.is_empty() {
            errors.push("catalog must contain at least one rendition".to_string());
        }

        for (id, rendition) in self.catalog.iter().enumerate() {
            if rendition.framerate == 0 {
                errors.push(format!("rendition {id}: framerate must be greater than zero"));
            }
            if rendition.bitrate == 0 {
                errors.push(format!("rendition {id}: bitrate must be greater than zero"));
            }
            if rendition.nominal_duration <= 0 {
                errors.push(format!(
                    "rendition {id}: nominal_duration must be greater than zero"
                ));
            }
            if rendition.window < rendition.nominal_duration {
                errors.push(format!(
                    "rendition {id}: window ({} ms) must cover at least one nominal segment ({} ms)",
                    rendition.window, rendition.nominal_duration
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Listen address for the HTTP server
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base address for absolute URLs embedded in playlists
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.server.public_base_url.is_empty() {
            format!("http://{}:{}", self.server.host, self.server.port)
        } else {
            self.server.public_base_url.trim_end_matches('/').to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.catalog.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_framerate() {
        let mut config = Config::default();
        config.catalog[0].framerate = 0;
        let errors = config.validate().expect_err("must fail");
        assert!(errors.iter().any(|e| e.contains("framerate")));
    }

    #[test]
    fn test_validate_rejects_empty_catalog() {
        let config = Config {
            catalog: Vec::new(),
            ..Config::default()
        };
        let errors = config.validate().expect_err("must fail");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_validate_collects_multiple_errors() {
        let mut config = Config::default();
        config.catalog[0].framerate = 0;
        config.catalog[1].bitrate = 0;
        config.catalog[2].window = 100;
        let errors = config.validate().expect_err("must fail");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_base_url_derived_from_listen_address() {
        let config = Config::default();
        assert_eq!(config.base_url(), "http://0.0.0.0:8080");
        assert_eq!(config.http_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_base_url_prefers_public_address() {
        let mut config = Config::default();
        config.server.public_base_url = "https://origin.example.com/".to_string();
        assert_eq!(config.base_url(), "https://origin.example.com");
    }
}
