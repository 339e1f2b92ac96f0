//! API configuration.

use std::fmt;

use thiserror::Error;
use url::Url;

use vgif_jobs::JobsConfig;

/// Default upload cap: 512 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY must be set to a non-empty value")]
    MissingApiKey,

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// API server configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Shared secret expected in `X-API-Key`
    pub api_key: String,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max upload request body size
    pub max_upload_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Base for absolute download URLs
    pub public_base_url: Option<Url>,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Job pipeline settings
    pub jobs: JobsConfig,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .field("cors_origins", &self.cors_origins)
            .field("max_upload_size", &self.max_upload_size)
            .field("environment", &self.environment)
            .field("public_base_url", &self.public_base_url)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("jobs", &self.jobs)
            .finish()
    }
}

impl ApiConfig {
    /// Config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: api_key.into(),
            cors_origins: vec!["*".to_string()],
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            environment: "development".to_string(),
            public_base_url: None,
            metrics_enabled: true,
            jobs: JobsConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let defaults = Self::new(api_key);

        let port = match lookup("API_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("API_PORT", e.to_string()))?,
            None => defaults.port,
        };

        let max_upload_size = match lookup("MAX_UPLOAD_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ConfigError::invalid("MAX_UPLOAD_SIZE", "expected a positive byte count"))?,
            None => defaults.max_upload_size,
        };

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_base_url(&raw))
            .transpose()?;

        Ok(Self {
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_upload_size,
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            public_base_url,
            metrics_enabled: lookup("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            jobs: JobsConfig::from_lookup(&lookup),
            api_key: defaults.api_key,
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::invalid("PUBLIC_BASE_URL", e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::invalid(
            "PUBLIC_BASE_URL",
            "expected an absolute http(s) URL",
        )),
    }
}
