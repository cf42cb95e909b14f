use campus_directory_database::models::{
    Class, ClassChanges, ClassKey, Department, DepartmentChanges, DepartmentKey, DirectoryStats,
    EntityKind, Faculty, FacultyChanges, FacultyKey, NewClass, NewDepartment, NewFaculty,
    NewStudent, PasswordHash, Student, StudentKey, UniqueKey,
};
use campus_directory_database::{DatabaseError, DirectoryStore};
use serde::Serialize;
use tracing::info;

use crate::approval;
use crate::assignment::{self, resolve_faculty, ClassHandle};
use crate::error::DirectoryError;
use crate::integrity::{can_delete, ensure_deletable, DeletionTarget};
use crate::password::{Argon2Hasher, CredentialHasher, Password};
use crate::requests::{
    non_blank, ClassPatch, CreateClass, CreateDepartment, CreateFaculty, DepartmentPatch,
    FacultyPatch, RegisterStudent,
};
use crate::uniqueness::ensure_unique;
use crate::validate::{require, validate_class_identity, validate_department_id};

/// A class together with the faculty member assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub faculty: Option<Faculty>,
}

/// Create, read, update and delete for the whole directory.
///
/// Holds no state besides the store and the hasher, so cloning it is as cheap as cloning those.
/// Every write runs the validators and guards first and then a single store operation. The
/// store re-checks uniqueness and references, so losing a race still yields a proper error.
/// Updates only send the fields present in the patch.
#[derive(Clone)]
pub struct DirectoryService<S, H = Argon2Hasher> {
    store: S,
    hasher: H,
}

impl<S: DirectoryStore, H: CredentialHasher> DirectoryService<S, H> {
    pub const fn new(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, DirectoryError> {
        Ok(self.store.list_departments().await?)
    }

    pub async fn department(&self, key: DepartmentKey) -> Result<Department, DirectoryError> {
        self.store
            .department(key)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Department, key))
    }

    #[tracing::instrument(skip_all, fields(department_id = %request.department_id))]
    pub async fn create_department(
        &self,
        request: CreateDepartment,
    ) -> Result<Department, DirectoryError> {
        validate_department_id(&request.department_id)?;
        let name = require("name", &request.name)?;
        ensure_unique(
            &self.store,
            UniqueKey::DepartmentId(&request.department_id),
            None,
        )
        .await?;
        ensure_unique(&self.store, UniqueKey::DepartmentName(name), None).await?;

        let department = self
            .store
            .insert_department(NewDepartment {
                department_id: request.department_id.clone(),
                name: name.to_owned(),
            })
            .await?;
        info!(id = %department.id, "created department");
        Ok(department)
    }

    /// A rename is carried over to the classes and faculty of the department.
    #[tracing::instrument(skip_all, fields(department = %key))]
    pub async fn update_department(
        &self,
        key: DepartmentKey,
        patch: DepartmentPatch,
    ) -> Result<Department, DirectoryError> {
        self.department(key).await?;
        let exclude = Some(key.get());
        let mut changes = DepartmentChanges::default();

        if let Some(department_id) = patch.department_id {
            validate_department_id(&department_id)?;
            ensure_unique(
                &self.store,
                UniqueKey::DepartmentId(&department_id),
                exclude,
            )
            .await?;
            changes.department_id = Some(department_id);
        }
        if let Some(name) = &patch.name {
            let name = require("name", name)?;
            ensure_unique(&self.store, UniqueKey::DepartmentName(name), exclude).await?;
            changes.name = Some(name.to_owned());
        }

        let department = self
            .store
            .update_department(key, &changes)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Department, key))?;
        info!("updated department");
        Ok(department)
    }

    /// Rejected while classes or faculty still belong to the department.
    #[tracing::instrument(skip_all, fields(department = %key))]
    pub async fn delete_department(
        &self,
        key: DepartmentKey,
    ) -> Result<Department, DirectoryError> {
        let department = self.department(key).await?;
        let target = DeletionTarget::Department(&department.name);
        ensure_deletable(&self.store, target).await?;
        match self.store.delete_department(key).await {
            Ok(true) => {
                info!("deleted department");
                Ok(department)
            }
            Ok(false) => Err(DirectoryError::not_found(EntityKind::Department, key)),
            Err(error) => Err(self.deletion_failure(target, error).await),
        }
    }

    pub async fn list_classes(&self) -> Result<Vec<Class>, DirectoryError> {
        Ok(self.store.list_classes().await?)
    }

    pub async fn class(&self, key: ClassKey) -> Result<Class, DirectoryError> {
        self.store
            .class(key)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Class, key))
    }

    pub async fn class_detail(&self, key: ClassKey) -> Result<ClassDetail, DirectoryError> {
        let class = self.class(key).await?;
        let faculty = match class.faculty_id {
            Some(faculty) => self.store.faculty(faculty).await?,
            None => None,
        };
        Ok(ClassDetail { class, faculty })
    }

    #[tracing::instrument(
        skip_all,
        fields(class_id = %request.class_id, semester = request.semester)
    )]
    pub async fn create_class(&self, request: CreateClass) -> Result<Class, DirectoryError> {
        let department = require("department", &request.department)?;
        let class_name = require("className", &request.class_name)?;
        let class_id = require("classId", &request.class_id)?;
        let term_year = require("termYear", &request.term_year)?;
        validate_class_identity(class_id, request.semester)?;

        let department = self.resolve_department(department).await?;
        let faculty_id = match non_blank(request.faculty_id.as_deref()) {
            Some(handle) => Some(resolve_faculty(&self.store, handle).await?.id),
            None => None,
        };
        ensure_unique(
            &self.store,
            UniqueKey::ClassIdentity {
                class_id,
                semester: request.semester,
            },
            None,
        )
        .await?;

        let class = self
            .store
            .insert_class(NewClass {
                term_year: term_year.to_owned(),
                department: department.name,
                semester: request.semester,
                class_name: class_name.to_owned(),
                class_id: class_id.to_owned(),
                faculty_id,
            })
            .await?;
        info!(id = %class.id, "created class");
        Ok(class)
    }

    /// The identity check combines the patch with the stored class, the store repeats it
    /// against the row it actually updates.
    #[tracing::instrument(skip_all, fields(class = %key))]
    pub async fn update_class(
        &self,
        key: ClassKey,
        patch: ClassPatch,
    ) -> Result<Class, DirectoryError> {
        let current = self.class(key).await?;
        let mut changes = ClassChanges::default();

        if let Some(department) = &patch.department {
            let department = require("department", department)?;
            changes.department = Some(self.resolve_department(department).await?.name);
        }
        if let Some(class_name) = &patch.class_name {
            changes.class_name = Some(require("className", class_name)?.to_owned());
        }
        if let Some(term_year) = &patch.term_year {
            changes.term_year = Some(require("termYear", term_year)?.to_owned());
        }
        if patch.class_id.is_some() || patch.semester.is_some() {
            let class_id = match &patch.class_id {
                Some(class_id) => require("classId", class_id)?,
                None => current.class_id.as_str(),
            };
            let semester = patch.semester.unwrap_or(current.semester);
            validate_class_identity(class_id, semester)?;
            ensure_unique(
                &self.store,
                UniqueKey::ClassIdentity { class_id, semester },
                Some(key.get()),
            )
            .await?;
            changes.class_id = patch.class_id.as_ref().map(|_| class_id.to_owned());
            changes.semester = patch.semester;
        }
        if let Some(faculty) = &patch.faculty_id {
            changes.faculty_id = Some(match non_blank(faculty.as_deref()) {
                Some(handle) => Some(resolve_faculty(&self.store, handle).await?.id),
                None => None,
            });
        }

        let class = self
            .store
            .update_class(key, &changes)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Class, key))?;
        info!("updated class");
        Ok(class)
    }

    #[tracing::instrument(skip_all, fields(class = %key))]
    pub async fn delete_class(&self, key: ClassKey) -> Result<Class, DirectoryError> {
        let class = self.class(key).await?;
        ensure_deletable(&self.store, DeletionTarget::Class).await?;
        if self.store.delete_class(key).await? {
            info!("deleted class");
            Ok(class)
        } else {
            Err(DirectoryError::not_found(EntityKind::Class, key))
        }
    }

    pub async fn list_faculty(&self) -> Result<Vec<Faculty>, DirectoryError> {
        Ok(self.store.list_faculty().await?)
    }

    pub async fn faculty(&self, key: FacultyKey) -> Result<Faculty, DirectoryError> {
        self.store
            .faculty(key)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Faculty, key))
    }

    pub async fn faculty_by_handle(&self, faculty_id: &str) -> Result<Faculty, DirectoryError> {
        resolve_faculty(&self.store, faculty_id).await
    }

    #[tracing::instrument(skip_all, fields(faculty_id = %request.faculty_id))]
    pub async fn create_faculty(&self, request: CreateFaculty) -> Result<Faculty, DirectoryError> {
        let faculty_id = require("facultyId", &request.faculty_id)?;
        let name = require("name", &request.name)?;
        let department = require("department", &request.department)?;
        let password_hash = self.hash_password(&request.password)?;

        ensure_unique(&self.store, UniqueKey::FacultyId(faculty_id), None).await?;
        let department = self.resolve_department(department).await?;

        let faculty = self
            .store
            .insert_faculty(NewFaculty {
                faculty_id: faculty_id.to_owned(),
                name: name.to_owned(),
                department: department.name,
                password_hash,
            })
            .await?;
        info!(id = %faculty.id, "created faculty");
        Ok(faculty)
    }

    #[tracing::instrument(skip_all, fields(faculty = %key))]
    pub async fn update_faculty(
        &self,
        key: FacultyKey,
        patch: FacultyPatch,
    ) -> Result<Faculty, DirectoryError> {
        self.faculty(key).await?;
        let mut changes = FacultyChanges::default();

        if let Some(name) = &patch.name {
            changes.name = Some(require("name", name)?.to_owned());
        }
        if let Some(department) = &patch.department {
            let department = require("department", department)?;
            changes.department = Some(self.resolve_department(department).await?.name);
        }
        changes.password_hash = patch
            .password
            .as_ref()
            .map(|password| self.hash_password(password))
            .transpose()?;

        let faculty = self
            .store
            .update_faculty(key, &changes)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Faculty, key))?;
        info!(
            password_changed = changes.password_hash.is_some(),
            "updated faculty"
        );
        Ok(faculty)
    }

    /// Rejected while classes or students are still assigned to the faculty member.
    #[tracing::instrument(skip_all, fields(faculty = %key))]
    pub async fn delete_faculty(&self, key: FacultyKey) -> Result<Faculty, DirectoryError> {
        let faculty = self.faculty(key).await?;
        let target = DeletionTarget::Faculty(key);
        ensure_deletable(&self.store, target).await?;
        match self.store.delete_faculty(key).await {
            Ok(true) => {
                info!("deleted faculty");
                Ok(faculty)
            }
            Ok(false) => Err(DirectoryError::not_found(EntityKind::Faculty, key)),
            Err(error) => Err(self.deletion_failure(target, error).await),
        }
    }

    /// Approved students assigned to the faculty member.
    pub async fn approved_students(
        &self,
        faculty_id: &str,
    ) -> Result<Vec<Student>, DirectoryError> {
        let faculty = resolve_faculty(&self.store, faculty_id).await?;
        let mut students = self.store.students_of_faculty(faculty.id).await?;
        students.retain(|student| student.is_approved);
        Ok(students)
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, DirectoryError> {
        Ok(self.store.list_students().await?)
    }

    pub async fn student(&self, key: StudentKey) -> Result<Student, DirectoryError> {
        self.store
            .student(key)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Student, key))
    }

    /// New students are pending until approved.
    #[tracing::instrument(skip_all, fields(student_id = %request.student_id))]
    pub async fn register_student(
        &self,
        request: RegisterStudent,
    ) -> Result<Student, DirectoryError> {
        let student_id = require("studentId", &request.student_id)?;
        let password_hash = self.hash_password(&request.password)?;
        ensure_unique(&self.store, UniqueKey::StudentId(student_id), None).await?;

        let student = self
            .store
            .insert_student(NewStudent {
                student_id: student_id.to_owned(),
                password_hash,
            })
            .await?;
        info!(id = %student.id, "registered student");
        Ok(student)
    }

    pub async fn set_approval(
        &self,
        key: StudentKey,
        approve: bool,
    ) -> Result<Student, DirectoryError> {
        approval::set_approval(&self.store, key, approve).await
    }

    pub async fn approve(
        &self,
        student_id: &str,
        approve: bool,
    ) -> Result<Student, DirectoryError> {
        approval::approve(&self.store, student_id, approve).await
    }

    pub async fn assign_student(
        &self,
        student_id: &str,
        faculty_id: &str,
    ) -> Result<Student, DirectoryError> {
        assignment::assign_student_to_faculty(&self.store, student_id, faculty_id).await
    }

    pub async fn assign(
        &self,
        faculty_id: &str,
        class: &ClassHandle,
    ) -> Result<Class, DirectoryError> {
        assignment::assign_faculty_to_class(&self.store, faculty_id, class).await
    }

    pub async fn stats(&self) -> Result<DirectoryStats, DirectoryError> {
        Ok(self.store.stats().await?)
    }

    /// Case-insensitive, returns the department with its stored spelling.
    async fn resolve_department(&self, name: &str) -> Result<Department, DirectoryError> {
        self.store
            .department_by_name(name)
            .await?
            .ok_or_else(|| DirectoryError::not_found(EntityKind::Department, name))
    }

    fn hash_password(&self, password: &Password) -> Result<PasswordHash, DirectoryError> {
        if password.is_blank() {
            return Err(DirectoryError::MissingField("password"));
        }
        Ok(self.hasher.hash(password)?)
    }

    // a reference added after the check makes the store refuse the delete
    async fn deletion_failure(
        &self,
        target: DeletionTarget<'_>,
        error: DatabaseError,
    ) -> DirectoryError {
        if !matches!(error, DatabaseError::ForeignKeyViolation(_)) {
            return error.into();
        }
        match can_delete(&self.store, target).await {
            Ok(check) => DirectoryError::ReferencedEntity {
                entity: check.entity,
                dependents: check.dependents,
            },
            Err(error) => error,
        }
    }
}
