use campus_directory_database::models::{Dependents, EntityKind, Relation, UniqueField};
use campus_directory_database::DatabaseError;
use serde::Serialize;

/// Coarse classification of a [`DirectoryError`], stable for callers to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidFormat,
    MissingField,
    DuplicateKey,
    NotFound,
    ReferencedEntity,
    StorageFailure,
}

#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    #[error("{field} is not valid: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("a record with this {0} already exists")]
    DuplicateKey(UniqueField),
    #[error("{entity} {handle} not found")]
    NotFound { entity: EntityKind, handle: String },
    #[error("referenced {} does not exist", .0.referenced())]
    MissingReference(Relation),
    #[error("{entity} is still referenced by {dependents}")]
    ReferencedEntity {
        entity: EntityKind,
        dependents: Dependents,
    },
    #[error("password hashing failed: {0}")]
    Hashing(#[from] argon2::password_hash::Error),
    #[error("storage failure: {0}")]
    StorageFailure(DatabaseError),
}

impl DirectoryError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::DuplicateKey(_) => ErrorKind::DuplicateKey,
            Self::NotFound { .. } | Self::MissingReference(_) => ErrorKind::NotFound,
            Self::ReferencedEntity { .. } => ErrorKind::ReferencedEntity,
            Self::Hashing(_) | Self::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn not_found(entity: EntityKind, handle: impl ToString) -> Self {
        Self::NotFound {
            entity,
            handle: handle.to_string(),
        }
    }
}

// constraint violations reported by the store are input errors, everything else is a failure
impl From<DatabaseError> for DirectoryError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniqueViolation(field) => Self::DuplicateKey(field),
            DatabaseError::ForeignKeyViolation(relation) => Self::MissingReference(relation),
            error => Self::StorageFailure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_constraint_violations_become_input_errors() {
        let error = DirectoryError::from(DatabaseError::UniqueViolation(UniqueField::FacultyId));
        assert_eq!(error.kind(), ErrorKind::DuplicateKey);
        assert_eq!(error.to_string(), "a record with this facultyId already exists");

        let error =
            DirectoryError::from(DatabaseError::ForeignKeyViolation(Relation::ClassDepartment));
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.to_string(), "referenced department does not exist");
    }

    #[test]
    fn other_store_errors_are_storage_failures() {
        let error = DirectoryError::from(DatabaseError::DatabaseEnvUrl(
            std::env::VarError::NotPresent,
        ));
        assert_eq!(error.kind(), ErrorKind::StorageFailure);
    }
}
