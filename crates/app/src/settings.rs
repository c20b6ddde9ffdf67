use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://quiz.sqlite3";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub capacity: usize,
}

/// Runtime settings: `config/<APP_ENV>.toml`, then `QUIZ__*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when a source cannot be parsed or a value has the
    /// wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        Self::from_builder(
            config::Config::builder()
                .add_source(File::with_name(&format!("config/{env}")).required(false))
                .add_source(Environment::with_prefix("QUIZ").separator("__")),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("api.base_url", DEFAULT_API_BASE_URL)?
            .set_default("api.timeout_secs", 10_i64)?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("cache.capacity", 64_i64)?
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
