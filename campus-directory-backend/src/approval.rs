use core::fmt::{self, Display};

use campus_directory_database::models::{EntityKind, Student, StudentKey};
use campus_directory_database::DirectoryStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assignment::resolve_student;
use crate::error::DirectoryError;

/// Students start out pending. Either state can move to the other at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalState {
    #[default]
    Pending,
    Approved,
}

impl ApprovalState {
    #[must_use]
    pub const fn from_decision(approve: bool) -> Self {
        if approve {
            Self::Approved
        } else {
            Self::Pending
        }
    }

    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<&Student> for ApprovalState {
    fn from(student: &Student) -> Self {
        Self::from_decision(student.is_approved)
    }
}

impl Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        })
    }
}

#[tracing::instrument(skip(store))]
pub async fn set_approval<S: DirectoryStore + ?Sized>(
    store: &S,
    key: StudentKey,
    approve: bool,
) -> Result<Student, DirectoryError> {
    let student = store
        .set_student_approval(key, approve)
        .await?
        .ok_or_else(|| DirectoryError::not_found(EntityKind::Student, key))?;
    info!(state = %ApprovalState::from(&student), "student approval updated");
    Ok(student)
}

/// Same as [`set_approval`], addressed by `studentId`.
pub async fn approve<S: DirectoryStore + ?Sized>(
    store: &S,
    student_id: &str,
    approve: bool,
) -> Result<Student, DirectoryError> {
    let student = resolve_student(store, student_id).await?;
    set_approval(store, student.id, approve).await
}

#[cfg(test)]
mod tests {
    use campus_directory_database::models::{NewStudent, PasswordHash};
    use campus_directory_database::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn approval_is_reversible_and_idempotent() {
        let store = MemoryStore::new();
        let student = store
            .insert_student(NewStudent {
                student_id: "S1".to_owned(),
                password_hash: PasswordHash::new("hash".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(ApprovalState::from(&student), ApprovalState::Pending);

        for decision in [true, true, false, false, true] {
            let student = approve(&store, "S1", decision).await.unwrap();
            assert_eq!(student.is_approved, decision);
        }
    }

    #[tokio::test]
    async fn unknown_students_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            set_approval(&store, StudentKey(42), true).await,
            Err(DirectoryError::NotFound {
                entity: EntityKind::Student,
                ..
            })
        ));
        assert!(approve(&store, "nobody", true).await.is_err());
    }
}
