use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Configuration for the form analysis client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging settings
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Origin the `/api/analyze` and `/api/health` routes live under
    pub origin: String,

    /// Whole-request timeout in seconds. Unset means wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5000".to_string(),
            request_timeout_secs: None,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load configuration from file, falling back to the environment.
    ///
    /// A config file that exists but does not parse is an error rather than
    /// being silently replaced by defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&["form-analyzer.toml", "config/form-analyzer.toml"])?;
        config.apply_env();
        Ok(config)
    }

    /// First readable file among `paths`, or defaults when none exists
    pub fn load_from<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        for path in paths {
            let path = path.as_ref();
            if let Ok(config_str) = std::fs::read_to_string(path) {
                let config = toml::from_str::<Config>(&config_str)
                    .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
                tracing::info!("Loaded configuration from: {}", path.display());
                return Ok(config);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(origin) = std::env::var("FORM_ANALYZER_BACKEND_ORIGIN") {
            self.backend.origin = origin;
        }

        if let Ok(timeout) = std::env::var("FORM_ANALYZER_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.backend.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!("Ignoring invalid FORM_ANALYZER_TIMEOUT_SECS: {}", timeout),
            }
        }

        if let Ok(log_level) = std::env::var("FORM_ANALYZER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        BackendOrigin::parse(&self.backend.origin)?;

        if self.backend.request_timeout_secs == Some(0) {
            return Err(anyhow!("request_timeout_secs must be greater than 0 when set"));
        }

        Ok(())
    }

    pub fn origin(&self) -> Result<BackendOrigin> {
        BackendOrigin::parse(&self.backend.origin)
    }
}

/// Scheme, host and port of the analysis backend, without a trailing slash.
///
/// Server-relative paths such as `/api/analyze` or an `overlay_url` are
/// appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOrigin(String);

impl BackendOrigin {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let parsed = url::Url::parse(trimmed)
            .map_err(|e| anyhow!("Invalid backend origin '{}': {}", raw, e))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("Backend origin must be http or https, got '{}'", parsed.scheme()));
        }
        if parsed.host_str().is_none() {
            return Err(anyhow!("Backend origin '{}' has no host", raw));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// `{origin}{path}`; a missing leading slash is added
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.backend.origin = origin.into();
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.config.backend.request_timeout_secs = Some(secs);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.output.log_level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
