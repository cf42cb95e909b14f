use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::models::{
    Class, ClassChanges, ClassKey, Department, DepartmentChanges, DepartmentKey, DependencyTarget,
    Dependents, DirectoryStats, Faculty, FacultyChanges, FacultyKey, NewClass, NewDepartment,
    NewFaculty, NewStudent, Student, StudentKey, UniqueKey,
};

/// Persistence for the directory.
///
/// Every method is a single atomic operation. Implementations enforce the uniqueness and
/// reference rules themselves and report violations as
/// [`DatabaseError::UniqueViolation`] and [`DatabaseError::ForeignKeyViolation`], so a check done
/// by the caller beforehand is only advisory.
///
/// Updates only write the columns named in their changes, so a concurrent write to another
/// column of the same record is kept. Updates and deletes return `None`/`false` when the record
/// does not exist.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn list_departments(&self) -> Result<Vec<Department>, DatabaseError>;

    async fn department(&self, key: DepartmentKey) -> Result<Option<Department>, DatabaseError>;

    /// Case-insensitive lookup.
    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, DatabaseError>;

    async fn insert_department(
        &self,
        department: NewDepartment,
    ) -> Result<Department, DatabaseError>;

    /// Classes and faculty referencing the old name follow a rename.
    async fn update_department(
        &self,
        key: DepartmentKey,
        changes: &DepartmentChanges,
    ) -> Result<Option<Department>, DatabaseError>;

    async fn delete_department(&self, key: DepartmentKey) -> Result<bool, DatabaseError>;

    async fn list_classes(&self) -> Result<Vec<Class>, DatabaseError>;

    async fn class(&self, key: ClassKey) -> Result<Option<Class>, DatabaseError>;

    /// All classes sharing a `classId`, one per semester at most.
    async fn classes_by_class_id(&self, class_id: &str) -> Result<Vec<Class>, DatabaseError>;

    async fn insert_class(&self, class: NewClass) -> Result<Class, DatabaseError>;

    async fn update_class(
        &self,
        key: ClassKey,
        changes: &ClassChanges,
    ) -> Result<Option<Class>, DatabaseError>;

    /// Only touches the faculty reference so concurrent edits of other fields are kept.
    async fn set_class_faculty(
        &self,
        key: ClassKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Class>, DatabaseError>;

    async fn delete_class(&self, key: ClassKey) -> Result<bool, DatabaseError>;

    async fn list_faculty(&self) -> Result<Vec<Faculty>, DatabaseError>;

    async fn faculty(&self, key: FacultyKey) -> Result<Option<Faculty>, DatabaseError>;

    async fn faculty_by_handle(&self, faculty_id: &str) -> Result<Option<Faculty>, DatabaseError>;

    async fn insert_faculty(&self, faculty: NewFaculty) -> Result<Faculty, DatabaseError>;

    async fn update_faculty(
        &self,
        key: FacultyKey,
        changes: &FacultyChanges,
    ) -> Result<Option<Faculty>, DatabaseError>;

    async fn delete_faculty(&self, key: FacultyKey) -> Result<bool, DatabaseError>;

    async fn list_students(&self) -> Result<Vec<Student>, DatabaseError>;

    async fn student(&self, key: StudentKey) -> Result<Option<Student>, DatabaseError>;

    async fn student_by_handle(&self, student_id: &str)
        -> Result<Option<Student>, DatabaseError>;

    async fn insert_student(&self, student: NewStudent) -> Result<Student, DatabaseError>;

    async fn set_student_approval(
        &self,
        key: StudentKey,
        approved: bool,
    ) -> Result<Option<Student>, DatabaseError>;

    async fn set_student_faculty(
        &self,
        key: StudentKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Student>, DatabaseError>;

    async fn students_of_faculty(&self, key: FacultyKey) -> Result<Vec<Student>, DatabaseError>;

    /// Raw key of the record currently holding `key`, if any.
    async fn holder_of(&self, key: UniqueKey<'_>) -> Result<Option<i32>, DatabaseError>;

    async fn dependents(&self, target: DependencyTarget<'_>) -> Result<Dependents, DatabaseError>;

    async fn stats(&self) -> Result<DirectoryStats, DatabaseError>;
}
