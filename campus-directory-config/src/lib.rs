use core::fmt::{Debug, Display};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "campus-directory.toml";
pub const ENV_PREFIX: &str = "CAMPUS_";

/// Argon2 cost parameters. The defaults are the ones recommended by the argon2 crate.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImportConfig {
    /// Password given to faculty that the import creates. Faculty without it are skipped.
    pub initial_faculty_password: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Overrides the default tracing filter, `RUST_LOG` still wins.
    #[serde(default)]
    pub log_filter: Option<String>,
    #[serde(default)]
    pub password_hashing: PasswordHashingConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// `campus-directory.toml` overridden by `CAMPUS_` variables, nested keys split on `__`.
#[must_use]
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}
