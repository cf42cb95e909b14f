use campus_directory_database::models::{Class, EntityKind, Faculty, Student};
use campus_directory_database::DirectoryStore;
use serde::Deserialize;
use tracing::debug;

use crate::error::DirectoryError;
use crate::validate::{require, validate_semester};

/// Names a class by its `classId`, and by semester when the id alone is ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassHandle {
    pub class_id: String,
    #[serde(default)]
    pub semester: Option<i32>,
}

impl ClassHandle {
    #[must_use]
    pub fn new(class_id: impl Into<String>, semester: i32) -> Self {
        Self {
            class_id: class_id.into(),
            semester: Some(semester),
        }
    }
}

impl From<&str> for ClassHandle {
    fn from(class_id: &str) -> Self {
        Self {
            class_id: class_id.to_owned(),
            semester: None,
        }
    }
}

pub async fn resolve_faculty<S: DirectoryStore + ?Sized>(
    store: &S,
    faculty_id: &str,
) -> Result<Faculty, DirectoryError> {
    let faculty_id = require("facultyId", faculty_id)?;
    store
        .faculty_by_handle(faculty_id)
        .await?
        .ok_or_else(|| DirectoryError::not_found(EntityKind::Faculty, faculty_id))
}

pub async fn resolve_student<S: DirectoryStore + ?Sized>(
    store: &S,
    student_id: &str,
) -> Result<Student, DirectoryError> {
    let student_id = require("studentId", student_id)?;
    store
        .student_by_handle(student_id)
        .await?
        .ok_or_else(|| DirectoryError::not_found(EntityKind::Student, student_id))
}

/// A bare `classId` resolves only while a single semester uses it.
pub async fn resolve_class<S: DirectoryStore + ?Sized>(
    store: &S,
    handle: &ClassHandle,
) -> Result<Class, DirectoryError> {
    let class_id = require("classId", &handle.class_id)?;
    let mut candidates = store.classes_by_class_id(class_id).await?;
    match handle.semester {
        Some(semester) => {
            validate_semester(semester)?;
            candidates
                .into_iter()
                .find(|class| class.semester == semester)
                .ok_or_else(|| {
                    DirectoryError::not_found(
                        EntityKind::Class,
                        format!("{class_id} (semester {semester})"),
                    )
                })
        }
        None if candidates.len() > 1 => Err(DirectoryError::MissingField("semester")),
        None => candidates
            .pop()
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Class, class_id)),
    }
}

/// Points the class at the faculty member. Assigning the current faculty again is a no-op, and
/// the faculty's department does not have to match the class's.
#[tracing::instrument(skip(store))]
pub async fn assign_faculty_to_class<S: DirectoryStore + ?Sized>(
    store: &S,
    faculty_id: &str,
    class: &ClassHandle,
) -> Result<Class, DirectoryError> {
    let faculty = resolve_faculty(store, faculty_id).await?;
    let class = resolve_class(store, class).await?;
    if class.faculty_id == Some(faculty.id) {
        debug!(class = %class.id, "faculty already assigned");
        return Ok(class);
    }
    store
        .set_class_faculty(class.id, Some(faculty.id))
        .await?
        .ok_or_else(|| DirectoryError::not_found(EntityKind::Class, &class.class_id))
}

#[tracing::instrument(skip(store))]
pub async fn assign_student_to_faculty<S: DirectoryStore + ?Sized>(
    store: &S,
    student_id: &str,
    faculty_id: &str,
) -> Result<Student, DirectoryError> {
    let student = resolve_student(store, student_id).await?;
    let faculty = resolve_faculty(store, faculty_id).await?;
    if student.assigned_faculty == Some(faculty.id) {
        debug!(student = %student.id, "faculty already assigned");
        return Ok(student);
    }
    store
        .set_student_faculty(student.id, Some(faculty.id))
        .await?
        .ok_or_else(|| DirectoryError::not_found(EntityKind::Student, &student.student_id))
}

#[cfg(test)]
mod tests {
    use campus_directory_database::models::{
        NewClass, NewDepartment, NewFaculty, NewStudent, PasswordHash,
    };
    use campus_directory_database::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    async fn seeded() -> (MemoryStore, Faculty) {
        let store = MemoryStore::new();
        store
            .insert_department(NewDepartment {
                department_id: "01".to_owned(),
                name: "DCS".to_owned(),
            })
            .await
            .unwrap();
        for semester in [3, 4] {
            store
                .insert_class(NewClass {
                    term_year: "2025-26".to_owned(),
                    department: "DCS".to_owned(),
                    semester,
                    class_name: "Shared".to_owned(),
                    class_id: "SHARED".to_owned(),
                    faculty_id: None,
                })
                .await
                .unwrap();
        }
        store
            .insert_class(NewClass {
                term_year: "2025-26".to_owned(),
                department: "DCS".to_owned(),
                semester: 4,
                class_name: "4DCS1".to_owned(),
                class_id: "4DCS1".to_owned(),
                faculty_id: None,
            })
            .await
            .unwrap();
        let faculty = store
            .insert_faculty(NewFaculty {
                faculty_id: "A".to_owned(),
                name: "Ada".to_owned(),
                department: "DCS".to_owned(),
                password_hash: PasswordHash::new("hash".to_owned()),
            })
            .await
            .unwrap();
        (store, faculty)
    }

    #[tokio::test]
    async fn assignment_is_idempotent() {
        let (store, faculty) = seeded().await;
        let first = assign_faculty_to_class(&store, "A", &"4DCS1".into())
            .await
            .unwrap();
        let second = assign_faculty_to_class(&store, "A", &"4DCS1".into())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.faculty_id, Some(faculty.id));
    }

    #[tokio::test]
    async fn missing_sides_are_named() {
        let (store, _) = seeded().await;
        assert!(matches!(
            assign_faculty_to_class(&store, "Z", &"4DCS1".into()).await,
            Err(DirectoryError::NotFound {
                entity: EntityKind::Faculty,
                ..
            })
        ));
        assert!(matches!(
            assign_faculty_to_class(&store, "A", &"9XX9".into()).await,
            Err(DirectoryError::NotFound {
                entity: EntityKind::Class,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn ambiguous_class_id_needs_a_semester() {
        let (store, faculty) = seeded().await;
        assert!(matches!(
            assign_faculty_to_class(&store, "A", &"SHARED".into()).await,
            Err(DirectoryError::MissingField("semester"))
        ));
        let class = assign_faculty_to_class(&store, "A", &ClassHandle::new("SHARED", 3))
            .await
            .unwrap();
        assert_eq!((class.semester, class.faculty_id), (3, Some(faculty.id)));
        assert_eq!(
            assign_faculty_to_class(&store, "A", &ClassHandle::new("SHARED", 7))
                .await
                .map_err(|error| error.kind()),
            Err(ErrorKind::NotFound)
        );
    }

    #[tokio::test]
    async fn students_follow_faculty() {
        let (store, faculty) = seeded().await;
        store
            .insert_student(NewStudent {
                student_id: "S1".to_owned(),
                password_hash: PasswordHash::new("hash".to_owned()),
            })
            .await
            .unwrap();
        let student = assign_student_to_faculty(&store, "S1", "A").await.unwrap();
        assert_eq!(student.assigned_faculty, Some(faculty.id));
        assert_eq!(
            assign_student_to_faculty(&store, "S2", "A")
                .await
                .map_err(|error| error.kind()),
            Err(ErrorKind::NotFound)
        );
    }
}
