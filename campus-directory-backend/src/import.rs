//! Bulk seeding from a JSON seed file. Running the same seed twice changes nothing the second
//! time.

use campus_directory_database::models::UniqueKey;
use campus_directory_database::DirectoryStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DirectoryError;
use crate::password::{CredentialHasher, Password};
use crate::requests::{CreateClass, CreateDepartment, CreateFaculty, FacultyPatch};
use crate::service::DirectoryService;
use crate::uniqueness::is_taken;
use crate::validate::require;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub departments: Vec<CreateDepartment>,
    pub faculty: Vec<SeedFaculty>,
    pub classes: Vec<CreateClass>,
    pub class_grid: Option<ClassGrid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFaculty {
    pub faculty_id: String,
    pub name: String,
    pub department: String,
    /// Falls back to the configured initial password.
    #[serde(default)]
    pub password: Option<Password>,
}

/// The same set of classes for every department and semester.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGrid {
    pub term_year: String,
    pub departments: Vec<String>,
    pub semesters: Vec<i32>,
    pub classes_per_semester: u32,
}

impl ClassGrid {
    /// Classes are named `{semester}{department}{n}`, with `n` counting from 1.
    #[must_use]
    pub fn classes(&self) -> Vec<CreateClass> {
        let mut classes = Vec::new();
        for department in &self.departments {
            for semester in &self.semesters {
                for number in 1..=self.classes_per_semester {
                    let class_name = format!("{semester}{department}{number}");
                    classes.push(CreateClass {
                        department: department.clone(),
                        class_id: class_name.clone(),
                        class_name,
                        term_year: self.term_year.clone(),
                        semester: *semester,
                        faculty_id: None,
                    });
                }
            }
        }
        classes
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub departments: Tally,
    pub faculty: Tally,
    pub classes: Tally,
}

/// Departments and classes that already exist are skipped. Existing faculty get their name and
/// department refreshed but keep their password.
#[tracing::instrument(skip_all)]
pub async fn import<S: DirectoryStore, H: CredentialHasher>(
    service: &DirectoryService<S, H>,
    seed: Seed,
    initial_password: Option<&Password>,
) -> Result<ImportReport, DirectoryError> {
    let mut report = ImportReport::default();
    let store = service.store();

    for department in seed.departments {
        let exists =
            is_taken(store, UniqueKey::DepartmentId(&department.department_id), None).await?
                || is_taken(store, UniqueKey::DepartmentName(&department.name), None).await?;
        if exists {
            report.departments.skipped += 1;
            continue;
        }
        service.create_department(department).await?;
        report.departments.created += 1;
    }

    for faculty in seed.faculty {
        let faculty_id = require("facultyId", &faculty.faculty_id)?;
        match store.faculty_by_handle(faculty_id).await? {
            Some(existing) => {
                let name = require("name", &faculty.name)?;
                let department = store
                    .department_by_name(&faculty.department)
                    .await?
                    .map(|department| department.name);
                let same_department = department.as_deref() == Some(existing.department.as_str());
                if existing.name == name && same_department {
                    report.faculty.skipped += 1;
                    continue;
                }
                service
                    .update_faculty(
                        existing.id,
                        FacultyPatch {
                            name: Some(faculty.name),
                            department: Some(faculty.department),
                            password: None,
                        },
                    )
                    .await?;
                report.faculty.updated += 1;
            }
            None => {
                let Some(password) = faculty.password.as_ref().or(initial_password) else {
                    warn!(faculty_id, "no password for new faculty, skipping");
                    report.faculty.skipped += 1;
                    continue;
                };
                service
                    .create_faculty(CreateFaculty {
                        faculty_id: faculty.faculty_id.clone(),
                        name: faculty.name,
                        department: faculty.department,
                        password: password.clone(),
                    })
                    .await?;
                report.faculty.created += 1;
            }
        }
    }

    let grid = seed.class_grid.as_ref().map(ClassGrid::classes);
    for class in seed.classes.into_iter().chain(grid.into_iter().flatten()) {
        let identity = UniqueKey::ClassIdentity {
            class_id: class.class_id.trim(),
            semester: class.semester,
        };
        if is_taken(store, identity, None).await? {
            report.classes.skipped += 1;
            continue;
        }
        service.create_class(class).await?;
        report.classes.created += 1;
    }

    info!(?report, "import finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use campus_directory_database::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::password::cheap_hasher;

    fn seed() -> Seed {
        serde_json::from_value(serde_json::json!({
            "departments": [
                { "departmentId": "00", "name": "DIT" },
                { "departmentId": "01", "name": "DCS" }
            ],
            "faculty": [
                { "facultyId": "DCSHOD", "name": "Head", "department": "DCS" },
                {
                    "facultyId": "DIT001",
                    "name": "Lecturer",
                    "department": "dit",
                    "password": "own"
                }
            ],
            "classes": [
                {
                    "department": "DCS",
                    "className": "Elective",
                    "classId": "EL1",
                    "termYear": "2025-26",
                    "semester": 5
                }
            ],
            "classGrid": {
                "termYear": "2025-26",
                "departments": ["DIT", "DCS"],
                "semesters": [1, 2],
                "classesPerSemester": 2
            }
        }))
        .unwrap()
    }

    #[test]
    fn grid_names_classes_by_semester_department_and_number() {
        let grid = ClassGrid {
            term_year: "2025-26".to_owned(),
            departments: vec!["DCS".to_owned()],
            semesters: vec![4],
            classes_per_semester: 2,
        };
        let names: Vec<_> = grid
            .classes()
            .into_iter()
            .map(|class| (class.class_id, class.semester))
            .collect();
        assert_eq!(
            names,
            [("4DCS1".to_owned(), 4), ("4DCS2".to_owned(), 4)]
        );
    }

    #[tokio::test]
    async fn import_is_idempotent() {
        let service = DirectoryService::new(MemoryStore::new(), cheap_hasher());
        let initial = Password::from("welcome");

        let first = import(&service, seed(), Some(&initial)).await.unwrap();
        assert_eq!(
            first,
            ImportReport {
                departments: Tally {
                    created: 2,
                    ..Tally::default()
                },
                faculty: Tally {
                    created: 2,
                    ..Tally::default()
                },
                classes: Tally {
                    created: 9,
                    ..Tally::default()
                },
            }
        );

        let second = import(&service, seed(), Some(&initial)).await.unwrap();
        assert_eq!(
            second,
            ImportReport {
                departments: Tally {
                    skipped: 2,
                    ..Tally::default()
                },
                faculty: Tally {
                    skipped: 2,
                    ..Tally::default()
                },
                classes: Tally {
                    skipped: 9,
                    ..Tally::default()
                },
            }
        );
        assert_eq!(service.list_classes().await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn existing_faculty_keep_their_password() {
        let service = DirectoryService::new(MemoryStore::new(), cheap_hasher());
        import(&service, seed(), Some(&Password::from("welcome")))
            .await
            .unwrap();
        let before = service
            .store()
            .stored_password_hash(campus_directory_database::models::EntityKind::Faculty, "DCSHOD")
            .await
            .unwrap();

        let mut renamed = seed();
        renamed.faculty[0].name = "New Head".to_owned();
        let report = import(&service, renamed, Some(&Password::from("other")))
            .await
            .unwrap();
        assert_eq!(report.faculty.updated, 1);
        assert_eq!(service.faculty_by_handle("DCSHOD").await.unwrap().name, "New Head");

        let after = service
            .store()
            .stored_password_hash(campus_directory_database::models::EntityKind::Faculty, "DCSHOD")
            .await
            .unwrap();
        assert_eq!(before, after);
        assert!(service
            .hasher()
            .verify(&Password::from("welcome"), &after)
            .unwrap());
    }

    #[tokio::test]
    async fn new_faculty_without_password_are_skipped() {
        let service = DirectoryService::new(MemoryStore::new(), cheap_hasher());
        let report = import(&service, seed(), None).await.unwrap();
        assert_eq!(
            report.faculty,
            Tally {
                created: 1,
                updated: 0,
                skipped: 1,
            }
        );
    }
}
