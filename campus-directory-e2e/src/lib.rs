//! Fixtures shared by the end-to-end scenarios.

use campus_directory_backend::requests::{CreateClass, CreateDepartment, CreateFaculty};
use campus_directory_backend::{Argon2Hasher, DirectoryError, DirectoryService, Password, Seed};
use campus_directory_config::PasswordHashingConfig;
use campus_directory_database::models::{Class, Department, Faculty};
use campus_directory_database::{DirectoryStore, MemoryStore};

pub type MemoryService = DirectoryService<MemoryStore>;

/// The smallest parameters argon2 accepts. Only for tests.
#[must_use]
pub fn cheap_hashing() -> PasswordHashingConfig {
    PasswordHashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

/// # Panics
///
/// When argon2 rejects [`cheap_hashing`], which would be a bug in the fixture.
pub fn service_with<S: DirectoryStore>(store: S) -> DirectoryService<S> {
    let hasher = Argon2Hasher::from_config(&cheap_hashing())
        .expect("cheap hashing parameters are within argon2 limits");
    DirectoryService::new(store, hasher)
}

#[must_use]
pub fn memory_service() -> MemoryService {
    service_with(MemoryStore::new())
}

pub async fn department<S: DirectoryStore>(
    service: &DirectoryService<S>,
    department_id: &str,
    name: &str,
) -> Result<Department, DirectoryError> {
    service
        .create_department(CreateDepartment {
            department_id: department_id.to_owned(),
            name: name.to_owned(),
        })
        .await
}

pub async fn faculty<S: DirectoryStore>(
    service: &DirectoryService<S>,
    faculty_id: &str,
    department: &str,
) -> Result<Faculty, DirectoryError> {
    named_faculty(service, faculty_id, &format!("Faculty {faculty_id}"), department).await
}

pub async fn named_faculty<S: DirectoryStore>(
    service: &DirectoryService<S>,
    faculty_id: &str,
    name: &str,
    department: &str,
) -> Result<Faculty, DirectoryError> {
    service
        .create_faculty(CreateFaculty {
            faculty_id: faculty_id.to_owned(),
            name: name.to_owned(),
            department: department.to_owned(),
            password: Password::from("secret"),
        })
        .await
}

pub async fn class<S: DirectoryStore>(
    service: &DirectoryService<S>,
    department: &str,
    class_id: &str,
    semester: i32,
) -> Result<Class, DirectoryError> {
    service
        .create_class(CreateClass {
            department: department.to_owned(),
            class_name: class_id.to_owned(),
            class_id: class_id.to_owned(),
            term_year: "2025-26".to_owned(),
            semester,
            faculty_id: None,
        })
        .await
}

/// The seed file shipped with the backend.
pub fn bundled_seed() -> Result<Seed, serde_json::Error> {
    serde_json::from_str(include_str!(
        "../../campus-directory-backend/seed/directory.json"
    ))
}
