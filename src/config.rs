//! Configuration for the sendr CLI.
//!
//! Loaded from an explicit path, `.sendr.yml` in the current directory, or
//! `~/.config/sendr/sendr.yml`, falling back to defaults. Credentials are
//! never stored in the file; the config only names the environment variables
//! that hold them.

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sendr::SendrError;
use sendr::channel::panda::Credentials;
use sendr::channel::webdriver::WebDriverConfig;
use sendr::runner::{Pacing, SequenceMode};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub pacing: PacingConfig,
    pub channel: ChannelConfig,
    pub credentials: CredentialsConfig,

    /// Mutation cadence on resume; see `SequenceMode`
    #[serde(rename = "sequence-mode")]
    pub sequence_mode: SequenceMode,
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .sendr.yml in current directory
    /// 3. ~/.config/sendr/sendr.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".sendr.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .sendr.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .sendr.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sendr").join("sendr.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pacing.max_ms < self.pacing.min_ms {
            bail!("pacing.max-ms must be >= pacing.min-ms");
        }
        if self.channel.http_timeout_ms == 0 {
            bail!("channel.http-timeout-ms must be > 0");
        }
        Ok(())
    }
}

/// Input and output file locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Recipients CSV
    pub recipients: PathBuf,

    /// Base message text file
    pub message: PathBuf,

    /// Status snapshot the dashboard polls
    pub status: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            recipients: PathBuf::from("recipients_preview.csv"),
            message: PathBuf::from("message.txt"),
            status: PathBuf::from("send_status.json"),
        }
    }
}

/// Randomized inter-attempt delay range.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    #[serde(rename = "min-ms")]
    pub min_ms: u64,

    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 200,
            max_ms: 2_000,
        }
    }
}

impl PacingConfig {
    pub fn to_pacing(&self) -> Pacing {
        Pacing {
            min_ms: self.min_ms,
            max_ms: self.max_ms,
        }
    }
}

/// Delivery channel settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// WebDriver endpoint
    #[serde(rename = "driver-url")]
    pub driver_url: String,

    /// Run the browser without a visible window
    pub headless: bool,

    #[serde(rename = "http-timeout-ms")]
    pub http_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            driver_url: "http://localhost:9515".to_string(),
            headless: false,
            http_timeout_ms: 30_000,
        }
    }
}

impl ChannelConfig {
    pub fn to_webdriver_config(&self, headless_override: bool) -> WebDriverConfig {
        WebDriverConfig {
            server_url: self.driver_url.clone(),
            headless: self.headless || headless_override,
            http_timeout: Duration::from_millis(self.http_timeout_ms),
        }
    }
}

/// Names of the environment variables holding login credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    #[serde(rename = "id-env")]
    pub id_env: String,

    #[serde(rename = "secret-env")]
    pub secret_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            id_env: "PANDA_ID".to_string(),
            secret_env: "PANDA_PW".to_string(),
        }
    }
}

impl CredentialsConfig {
    /// Resolve credentials from the environment. Missing or empty values are
    /// fatal preconditions.
    pub fn resolve(&self) -> Result<Credentials> {
        let id = std::env::var(&self.id_env).unwrap_or_default();
        let secret = std::env::var(&self.secret_env).unwrap_or_default();
        if id.is_empty() || secret.is_empty() {
            return Err(SendrError::Credentials(format!(
                "set {} and {}",
                self.id_env, self.secret_env
            ))
            .into());
        }
        Ok(Credentials { id, secret })
    }
}
