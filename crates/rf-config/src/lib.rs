//! # rf-config
//!
//! Layered settings for Rusty-Forum. Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. environment variables such as `RUSTY_FORUM__DATABASE__URL`
//!
//! A `.env` file is loaded into the environment before step 4 is read.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "RUSTY_FORUM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Connection string, e.g. `sqlite://rusty_forum.db` or `sqlite::memory:`
    url: SecretString,
    pub max_connections: u32,
    pub create_if_missing: bool,
}

impl DatabaseSettings {
    pub fn url(&self) -> &str {
        self.url.expose_secret()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the human readable format
    pub json: bool,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("database.url", "sqlite://rusty_forum.db")?
        .set_default("database.max_connections", 8_i64)?
        .set_default("database.create_if_missing", true)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?)
}

impl Settings {
    /// Reads every source in priority order.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let builder = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        Self::finish(builder)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Self::finish(defaults()?.add_source(File::from_str(raw, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.database.url().trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        Ok(())
    }
}
