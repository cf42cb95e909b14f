pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod store;

use diesel_async::pooled_connection::deadpool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
pub use error::DatabaseError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::DirectoryStore;
use tracing::info;

pub type Pool = deadpool::Pool<AsyncPgConnection>;

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub fn get_database_connection(database_url: &str) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(config).build()?;
    info!("created database pool");
    Ok(pool)
}

pub fn get_database_connection_from_env() -> Result<Pool, DatabaseError> {
    let database_url = std::env::var("DATABASE_URL")?;
    get_database_connection(&database_url)
}
