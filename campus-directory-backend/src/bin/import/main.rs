//! Seeds the directory database from a JSON seed file.
//!
//! ```text
//! import <seed.json>
//! ```

use core::fmt::{Debug, Display};
use std::path::PathBuf;

use campus_directory_backend::{
    import, Argon2Hasher, DirectoryError, DirectoryService, Password, Seed,
};
use campus_directory_config::{get_config, ConfigError};
use campus_directory_database::{get_database_connection, DatabaseError, PgStore};
use campus_directory_telemetry::{setup_telemetry, TryInitError};
use tracing::info;

#[derive(thiserror::Error)]
enum ImportError {
    #[error("usage: import <seed.json>")]
    Usage,
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TryInitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid password hashing parameters: {0}")]
    Hashing(argon2::Error),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Directory(#[from] DirectoryError),
}

impl Debug for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[tokio::main]
async fn main() -> Result<(), ImportError> {
    let config = get_config()?;
    setup_telemetry(config.log_filter.as_deref())?;

    let seed_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(ImportError::Usage)?;
    let seed: Seed = serde_json::from_slice(&tokio::fs::read(&seed_path).await?)?;
    info!(path = %seed_path.display(), "read seed file");

    let hasher =
        Argon2Hasher::from_config(&config.password_hashing).map_err(ImportError::Hashing)?;
    let pool = get_database_connection(&config.database_url)?;
    let service = DirectoryService::new(PgStore::new(pool), hasher);

    let initial_password = config
        .import
        .initial_faculty_password
        .map(Password::new);
    let report = import(&service, seed, initial_password.as_ref()).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
