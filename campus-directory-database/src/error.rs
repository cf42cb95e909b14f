use std::env::VarError;

use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool;
use thiserror::Error;

use crate::models::{Relation, UniqueField};

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database url not set in env variable DATABASE_URL")]
    DatabaseEnvUrl(#[from] VarError),
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database query failed {0}")]
    Database(diesel::result::Error),
    #[error("unique constraint on {0} violated")]
    UniqueViolation(UniqueField),
    #[error("reference {0} violated")]
    ForeignKeyViolation(Relation),
}

// constraint violations are classified so the caller can tell them apart from real failures
impl From<diesel::result::Error> for DatabaseError {
    fn from(error: diesel::result::Error) -> Self {
        if let diesel::result::Error::DatabaseError(kind, info) = &error {
            match (kind, info.constraint_name()) {
                (DatabaseErrorKind::UniqueViolation, Some(constraint)) => {
                    if let Some(field) = UniqueField::from_constraint(constraint) {
                        return Self::UniqueViolation(field);
                    }
                }
                (DatabaseErrorKind::ForeignKeyViolation, Some(constraint)) => {
                    if let Some(relation) = Relation::from_constraint(constraint) {
                        return Self::ForeignKeyViolation(relation);
                    }
                }
                _ => {}
            }
        }
        Self::Database(error)
    }
}

impl DatabaseError {
    /// Whether the store rejected the operation because of a constraint rather than failing.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation(_) | Self::ForeignKeyViolation(_)
        )
    }
}
