use campus_directory_database::models::{DependencyTarget, Dependents, EntityKind, FacultyKey};
use campus_directory_database::DirectoryStore;
use serde::Serialize;

use crate::error::DirectoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTarget<'a> {
    /// Departments are referenced by name.
    Department(&'a str),
    Class,
    Faculty(FacultyKey),
}

impl DeletionTarget<'_> {
    #[must_use]
    pub const fn entity(&self) -> EntityKind {
        match self {
            Self::Department(_) => EntityKind::Department,
            Self::Class => EntityKind::Class,
            Self::Faculty(_) => EntityKind::Faculty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletionCheck {
    pub entity: EntityKind,
    pub dependents: Dependents,
}

impl DeletionCheck {
    #[must_use]
    pub const fn allowed(&self) -> bool {
        self.dependents.is_empty()
    }

    pub fn into_result(self) -> Result<(), DirectoryError> {
        if self.allowed() {
            Ok(())
        } else {
            Err(DirectoryError::ReferencedEntity {
                entity: self.entity,
                dependents: self.dependents,
            })
        }
    }
}

/// Counts the records that would be left dangling by deleting `target`.
///
/// Classes are never referenced. Departments are referenced by classes and faculty, faculty by
/// classes and students.
pub async fn can_delete<S: DirectoryStore + ?Sized>(
    store: &S,
    target: DeletionTarget<'_>,
) -> Result<DeletionCheck, DirectoryError> {
    let dependents = match target {
        DeletionTarget::Class => Dependents::default(),
        DeletionTarget::Department(name) => {
            store.dependents(DependencyTarget::Department(name)).await?
        }
        DeletionTarget::Faculty(key) => store.dependents(DependencyTarget::Faculty(key)).await?,
    };
    Ok(DeletionCheck {
        entity: target.entity(),
        dependents,
    })
}

pub async fn ensure_deletable<S: DirectoryStore + ?Sized>(
    store: &S,
    target: DeletionTarget<'_>,
) -> Result<(), DirectoryError> {
    can_delete(store, target).await?.into_result()
}
