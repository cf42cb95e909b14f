use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::models::{
    name_key, Class, ClassChanges, ClassKey, Department, DepartmentChanges, DepartmentKey,
    DependencyTarget, Dependents, DirectoryStats, EntityKind, Faculty, FacultyChanges, FacultyKey,
    NewClass, NewDepartment, NewFaculty, NewStudent, PasswordHash, Relation, Student, StudentKey,
    UniqueKey,
};
use crate::store::DirectoryStore;

#[derive(Default)]
struct Tables {
    last_key: i32,
    departments: BTreeMap<i32, Department>,
    classes: BTreeMap<i32, Class>,
    faculty: BTreeMap<i32, (Faculty, PasswordHash)>,
    students: BTreeMap<i32, (Student, PasswordHash)>,
}

impl Tables {
    fn next_key(&mut self) -> i32 {
        self.last_key += 1;
        self.last_key
    }

    fn holder_of(&self, key: UniqueKey<'_>) -> Option<i32> {
        match key {
            UniqueKey::DepartmentId(department_id) => self
                .departments
                .values()
                .find(|department| department.department_id == department_id)
                .map(|department| department.id.get()),
            UniqueKey::DepartmentName(name) => {
                let key = name_key(name);
                self.departments
                    .values()
                    .find(|department| name_key(&department.name) == key)
                    .map(|department| department.id.get())
            }
            UniqueKey::ClassIdentity { class_id, semester } => self
                .classes
                .values()
                .find(|class| class.class_id == class_id && class.semester == semester)
                .map(|class| class.id.get()),
            UniqueKey::FacultyId(faculty_id) => self
                .faculty
                .values()
                .find(|(faculty, _)| faculty.faculty_id == faculty_id)
                .map(|(faculty, _)| faculty.id.get()),
            UniqueKey::StudentId(student_id) => self
                .students
                .values()
                .find(|(student, _)| student.student_id == student_id)
                .map(|(student, _)| student.id.get()),
        }
    }

    fn check_unique(&self, key: UniqueKey<'_>, exclude: Option<i32>) -> Result<(), DatabaseError> {
        match self.holder_of(key) {
            Some(holder) if Some(holder) != exclude => {
                Err(DatabaseError::UniqueViolation(key.field()))
            }
            _ => Ok(()),
        }
    }

    /// Foreign keys point at the exact stored name.
    fn check_department(&self, name: &str, relation: Relation) -> Result<(), DatabaseError> {
        if self
            .departments
            .values()
            .any(|department| department.name == name)
        {
            Ok(())
        } else {
            Err(DatabaseError::ForeignKeyViolation(relation))
        }
    }

    fn check_faculty(
        &self,
        faculty: Option<FacultyKey>,
        relation: Relation,
    ) -> Result<(), DatabaseError> {
        match faculty {
            Some(key) if !self.faculty.contains_key(&key.get()) => {
                Err(DatabaseError::ForeignKeyViolation(relation))
            }
            _ => Ok(()),
        }
    }

    fn check_new_class(&self, class: &NewClass) -> Result<(), DatabaseError> {
        self.check_unique(
            UniqueKey::ClassIdentity {
                class_id: &class.class_id,
                semester: class.semester,
            },
            None,
        )?;
        self.check_department(&class.department, Relation::ClassDepartment)?;
        self.check_faculty(class.faculty_id, Relation::ClassFaculty)
    }

    fn dependents(&self, target: DependencyTarget<'_>) -> Dependents {
        match target {
            DependencyTarget::Department(name) => Dependents {
                classes: count(self.classes.values(), |class| class.department == name),
                faculty: count(self.faculty.values(), |(faculty, _)| {
                    faculty.department == name
                }),
                students: 0,
            },
            DependencyTarget::Faculty(key) => Dependents {
                classes: count(self.classes.values(), |class| class.faculty_id == Some(key)),
                faculty: 0,
                students: count(self.students.values(), |(student, _)| {
                    student.assigned_faculty == Some(key)
                }),
            },
        }
    }
}

fn count<'a, T: 'a>(rows: impl Iterator<Item = &'a T>, matches: impl Fn(&T) -> bool) -> u64 {
    rows.filter(|row| matches(row)).count() as u64
}

/// A [`DirectoryStore`] kept in process memory.
///
/// Writes take one lock for the whole directory, so every operation is atomic and enforces the
/// same constraints as the database schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored hash for a faculty or student handle. Only meant for tests and tooling.
    pub async fn stored_password_hash(
        &self,
        kind: EntityKind,
        handle: &str,
    ) -> Option<PasswordHash> {
        let tables = self.tables.read().await;
        match kind {
            EntityKind::Faculty => tables
                .faculty
                .values()
                .find(|(faculty, _)| faculty.faculty_id == handle)
                .map(|(_, hash)| hash.clone()),
            EntityKind::Student => tables
                .students
                .values()
                .find(|(student, _)| student.student_id == handle)
                .map(|(_, hash)| hash.clone()),
            EntityKind::Department | EntityKind::Class => None,
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_departments(&self) -> Result<Vec<Department>, DatabaseError> {
        Ok(self.tables.read().await.departments.values().cloned().collect())
    }

    async fn department(&self, key: DepartmentKey) -> Result<Option<Department>, DatabaseError> {
        Ok(self.tables.read().await.departments.get(&key.get()).cloned())
    }

    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .holder_of(UniqueKey::DepartmentName(name))
            .and_then(|key| tables.departments.get(&key).cloned()))
    }

    async fn insert_department(
        &self,
        department: NewDepartment,
    ) -> Result<Department, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(UniqueKey::DepartmentId(&department.department_id), None)?;
        tables.check_unique(UniqueKey::DepartmentName(&department.name), None)?;
        let key = tables.next_key();
        let department = Department {
            id: DepartmentKey(key),
            department_id: department.department_id,
            name: department.name,
        };
        tables.departments.insert(key, department.clone());
        Ok(department)
    }

    async fn update_department(
        &self,
        key: DepartmentKey,
        changes: &DepartmentChanges,
    ) -> Result<Option<Department>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(mut department) = tables.departments.get(&key.get()).cloned() else {
            return Ok(None);
        };
        if let Some(department_id) = &changes.department_id {
            tables.check_unique(UniqueKey::DepartmentId(department_id), Some(key.get()))?;
            department.department_id.clone_from(department_id);
        }
        if let Some(name) = &changes.name {
            tables.check_unique(UniqueKey::DepartmentName(name), Some(key.get()))?;
            let previous_name = std::mem::replace(&mut department.name, name.clone());
            for class in tables.classes.values_mut() {
                if class.department == previous_name {
                    class.department.clone_from(name);
                }
            }
            for (faculty, _) in tables.faculty.values_mut() {
                if faculty.department == previous_name {
                    faculty.department.clone_from(name);
                }
            }
        }
        tables.departments.insert(key.get(), department.clone());
        Ok(Some(department))
    }

    async fn delete_department(&self, key: DepartmentKey) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(name) = tables
            .departments
            .get(&key.get())
            .map(|department| department.name.clone())
        else {
            return Ok(false);
        };
        let dependents = tables.dependents(DependencyTarget::Department(&name));
        if dependents.classes > 0 {
            return Err(DatabaseError::ForeignKeyViolation(Relation::ClassDepartment));
        }
        if dependents.faculty > 0 {
            return Err(DatabaseError::ForeignKeyViolation(
                Relation::FacultyDepartment,
            ));
        }
        Ok(tables.departments.remove(&key.get()).is_some())
    }

    async fn list_classes(&self) -> Result<Vec<Class>, DatabaseError> {
        Ok(self.tables.read().await.classes.values().cloned().collect())
    }

    async fn class(&self, key: ClassKey) -> Result<Option<Class>, DatabaseError> {
        Ok(self.tables.read().await.classes.get(&key.get()).cloned())
    }

    async fn classes_by_class_id(&self, class_id: &str) -> Result<Vec<Class>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .classes
            .values()
            .filter(|class| class.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn insert_class(&self, class: NewClass) -> Result<Class, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_new_class(&class)?;
        let key = tables.next_key();
        let class = Class {
            id: ClassKey(key),
            term_year: class.term_year,
            department: class.department,
            semester: class.semester,
            class_name: class.class_name,
            class_id: class.class_id,
            faculty_id: class.faculty_id,
        };
        tables.classes.insert(key, class.clone());
        Ok(class)
    }

    async fn update_class(
        &self,
        key: ClassKey,
        changes: &ClassChanges,
    ) -> Result<Option<Class>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(mut class) = tables.classes.get(&key.get()).cloned() else {
            return Ok(None);
        };
        if let Some(term_year) = &changes.term_year {
            class.term_year.clone_from(term_year);
        }
        if let Some(department) = &changes.department {
            tables.check_department(department, Relation::ClassDepartment)?;
            class.department.clone_from(department);
        }
        if let Some(class_name) = &changes.class_name {
            class.class_name.clone_from(class_name);
        }
        if changes.class_id.is_some() || changes.semester.is_some() {
            if let Some(class_id) = &changes.class_id {
                class.class_id.clone_from(class_id);
            }
            class.semester = changes.semester.unwrap_or(class.semester);
            tables.check_unique(
                UniqueKey::ClassIdentity {
                    class_id: &class.class_id,
                    semester: class.semester,
                },
                Some(key.get()),
            )?;
        }
        if let Some(faculty) = changes.faculty_id {
            tables.check_faculty(faculty, Relation::ClassFaculty)?;
            class.faculty_id = faculty;
        }
        tables.classes.insert(key.get(), class.clone());
        Ok(Some(class))
    }

    async fn set_class_faculty(
        &self,
        key: ClassKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Class>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.classes.contains_key(&key.get()) {
            return Ok(None);
        }
        tables.check_faculty(faculty, Relation::ClassFaculty)?;
        Ok(tables.classes.get_mut(&key.get()).map(|class| {
            class.faculty_id = faculty;
            class.clone()
        }))
    }

    async fn delete_class(&self, key: ClassKey) -> Result<bool, DatabaseError> {
        Ok(self
            .tables
            .write()
            .await
            .classes
            .remove(&key.get())
            .is_some())
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .faculty
            .values()
            .map(|(faculty, _)| faculty.clone())
            .collect())
    }

    async fn faculty(&self, key: FacultyKey) -> Result<Option<Faculty>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .faculty
            .get(&key.get())
            .map(|(faculty, _)| faculty.clone()))
    }

    async fn faculty_by_handle(&self, faculty_id: &str) -> Result<Option<Faculty>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .faculty
            .values()
            .find(|(faculty, _)| faculty.faculty_id == faculty_id)
            .map(|(faculty, _)| faculty.clone()))
    }

    async fn insert_faculty(&self, faculty: NewFaculty) -> Result<Faculty, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(UniqueKey::FacultyId(&faculty.faculty_id), None)?;
        tables.check_department(&faculty.department, Relation::FacultyDepartment)?;
        let key = tables.next_key();
        let record = Faculty {
            id: FacultyKey(key),
            faculty_id: faculty.faculty_id,
            name: faculty.name,
            department: faculty.department,
        };
        tables
            .faculty
            .insert(key, (record.clone(), faculty.password_hash));
        Ok(record)
    }

    async fn update_faculty(
        &self,
        key: FacultyKey,
        changes: &FacultyChanges,
    ) -> Result<Option<Faculty>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.faculty.contains_key(&key.get()) {
            return Ok(None);
        }
        if let Some(department) = &changes.department {
            tables.check_department(department, Relation::FacultyDepartment)?;
        }
        Ok(tables.faculty.get_mut(&key.get()).map(|(record, hash)| {
            if let Some(name) = &changes.name {
                record.name.clone_from(name);
            }
            if let Some(department) = &changes.department {
                record.department.clone_from(department);
            }
            if let Some(password_hash) = &changes.password_hash {
                hash.clone_from(password_hash);
            }
            record.clone()
        }))
    }

    async fn delete_faculty(&self, key: FacultyKey) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.faculty.contains_key(&key.get()) {
            return Ok(false);
        }
        let dependents = tables.dependents(DependencyTarget::Faculty(key));
        if dependents.classes > 0 {
            return Err(DatabaseError::ForeignKeyViolation(Relation::ClassFaculty));
        }
        if dependents.students > 0 {
            return Err(DatabaseError::ForeignKeyViolation(Relation::StudentFaculty));
        }
        Ok(tables.faculty.remove(&key.get()).is_some())
    }

    async fn list_students(&self) -> Result<Vec<Student>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .values()
            .map(|(student, _)| student.clone())
            .collect())
    }

    async fn student(&self, key: StudentKey) -> Result<Option<Student>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .get(&key.get())
            .map(|(student, _)| student.clone()))
    }

    async fn student_by_handle(
        &self,
        student_id: &str,
    ) -> Result<Option<Student>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .values()
            .find(|(student, _)| student.student_id == student_id)
            .map(|(student, _)| student.clone()))
    }

    async fn insert_student(&self, student: NewStudent) -> Result<Student, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(UniqueKey::StudentId(&student.student_id), None)?;
        let key = tables.next_key();
        let record = Student {
            id: StudentKey(key),
            student_id: student.student_id,
            is_approved: false,
            assigned_faculty: None,
        };
        tables
            .students
            .insert(key, (record.clone(), student.password_hash));
        Ok(record)
    }

    async fn set_student_approval(
        &self,
        key: StudentKey,
        approved: bool,
    ) -> Result<Option<Student>, DatabaseError> {
        Ok(self
            .tables
            .write()
            .await
            .students
            .get_mut(&key.get())
            .map(|(student, _)| {
                student.is_approved = approved;
                student.clone()
            }))
    }

    async fn set_student_faculty(
        &self,
        key: StudentKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Student>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&key.get()) {
            return Ok(None);
        }
        tables.check_faculty(faculty, Relation::StudentFaculty)?;
        Ok(tables.students.get_mut(&key.get()).map(|(student, _)| {
            student.assigned_faculty = faculty;
            student.clone()
        }))
    }

    async fn students_of_faculty(&self, key: FacultyKey) -> Result<Vec<Student>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .values()
            .filter(|(student, _)| student.assigned_faculty == Some(key))
            .map(|(student, _)| student.clone())
            .collect())
    }

    async fn holder_of(&self, key: UniqueKey<'_>) -> Result<Option<i32>, DatabaseError> {
        Ok(self.tables.read().await.holder_of(key))
    }

    async fn dependents(&self, target: DependencyTarget<'_>) -> Result<Dependents, DatabaseError> {
        Ok(self.tables.read().await.dependents(target))
    }

    async fn stats(&self) -> Result<DirectoryStats, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(DirectoryStats {
            total_students: tables.students.len() as u64,
            total_faculty: tables.faculty.len() as u64,
            pending_approvals: tables
                .students
                .values()
                .filter(|(student, _)| !student.is_approved)
                .count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn department(department_id: &str, name: &str) -> NewDepartment {
        NewDepartment {
            department_id: department_id.to_owned(),
            name: name.to_owned(),
        }
    }

    fn class(department: &str, class_id: &str, semester: i32) -> NewClass {
        NewClass {
            term_year: "2025-26".to_owned(),
            department: department.to_owned(),
            semester,
            class_name: class_id.to_owned(),
            class_id: class_id.to_owned(),
            faculty_id: None,
        }
    }

    fn faculty(faculty_id: &str, department: &str) -> NewFaculty {
        NewFaculty {
            faculty_id: faculty_id.to_owned(),
            name: faculty_id.to_owned(),
            department: department.to_owned(),
            password_hash: PasswordHash::new("hash".to_owned()),
        }
    }

    #[tokio::test]
    async fn unique_indexes_are_enforced() {
        let store = MemoryStore::new();
        store.insert_department(department("01", "DCS")).await.unwrap();
        assert!(matches!(
            store.insert_department(department("02", "dcs")).await,
            Err(DatabaseError::UniqueViolation(
                crate::models::UniqueField::DepartmentName
            ))
        ));
        assert!(matches!(
            store.insert_department(department("01", "DIT")).await,
            Err(DatabaseError::UniqueViolation(
                crate::models::UniqueField::DepartmentId
            ))
        ));

        store.insert_class(class("DCS", "1DCS1", 1)).await.unwrap();
        store.insert_class(class("DCS", "1DCS1", 2)).await.unwrap();
        assert!(matches!(
            store.insert_class(class("DCS", "1DCS1", 1)).await,
            Err(DatabaseError::UniqueViolation(
                crate::models::UniqueField::ClassIdentity
            ))
        ));
    }

    #[tokio::test]
    async fn references_must_exist() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert_class(class("ZZ", "1ZZ1", 1)).await,
            Err(DatabaseError::ForeignKeyViolation(Relation::ClassDepartment))
        ));
        assert!(matches!(
            store.insert_faculty(faculty("ZZ001", "ZZ")).await,
            Err(DatabaseError::ForeignKeyViolation(
                Relation::FacultyDepartment
            ))
        ));
    }

    #[tokio::test]
    async fn rename_cascades_and_delete_restricts() {
        let store = MemoryStore::new();
        let dcs = store.insert_department(department("01", "DCS")).await.unwrap();
        store.insert_class(class("DCS", "1DCS1", 1)).await.unwrap();
        let member = store.insert_faculty(faculty("DCS001", "DCS")).await.unwrap();

        let renamed = store
            .update_department(
                dcs.id,
                &DepartmentChanges {
                    name: Some("CSE".to_owned()),
                    ..DepartmentChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.department_id, "01");
        let classes = store.list_classes().await.unwrap();
        assert_eq!(classes[0].department, "CSE");
        let member = store.faculty(member.id).await.unwrap().unwrap();
        assert_eq!(member.department, "CSE");

        assert!(matches!(
            store.delete_department(dcs.id).await,
            Err(DatabaseError::ForeignKeyViolation(Relation::ClassDepartment))
        ));
        assert_eq!(
            store.dependents(DependencyTarget::Department("CSE")).await.unwrap(),
            Dependents {
                classes: 1,
                faculty: 1,
                students: 0,
            }
        );
    }

    #[tokio::test]
    async fn faculty_delete_restricts_while_assigned() {
        let store = MemoryStore::new();
        store.insert_department(department("01", "DCS")).await.unwrap();
        let member = store.insert_faculty(faculty("DCS001", "DCS")).await.unwrap();
        let class = store.insert_class(class("DCS", "1DCS1", 1)).await.unwrap();
        store
            .set_class_faculty(class.id, Some(member.id))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_faculty(member.id).await,
            Err(DatabaseError::ForeignKeyViolation(Relation::ClassFaculty))
        ));
        store.set_class_faculty(class.id, None).await.unwrap();
        assert!(store.delete_faculty(member.id).await.unwrap());
        assert!(!store.delete_faculty(member.id).await.unwrap());
    }

    #[tokio::test]
    async fn updates_keep_columns_they_do_not_name() {
        let store = MemoryStore::new();
        store.insert_department(department("01", "DCS")).await.unwrap();
        let member = store.insert_faculty(faculty("DCS001", "DCS")).await.unwrap();
        let created = store.insert_class(class("DCS", "1DCS1", 1)).await.unwrap();

        // an assignment landing after a caller read the class
        store
            .set_class_faculty(created.id, Some(member.id))
            .await
            .unwrap();
        let updated = store
            .update_class(
                created.id,
                &ClassChanges {
                    class_name: Some("Section 1".to_owned()),
                    ..ClassChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.class_name, "Section 1");
        assert_eq!(updated.faculty_id, Some(member.id));

        let cleared = store
            .update_class(
                created.id,
                &ClassChanges {
                    faculty_id: Some(None),
                    ..ClassChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.faculty_id, None);
        assert_eq!(cleared.class_name, "Section 1");

        let unchanged = store
            .update_faculty(member.id, &FacultyChanges::default())
            .await
            .unwrap();
        assert_eq!(unchanged, Some(member));
        assert_eq!(
            store
                .update_class(ClassKey(999), &ClassChanges::default())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn class_updates_recheck_identity_and_references() {
        let store = MemoryStore::new();
        store.insert_department(department("01", "DCS")).await.unwrap();
        store.insert_class(class("DCS", "1DCS1", 1)).await.unwrap();
        let other = store.insert_class(class("DCS", "1DCS1", 2)).await.unwrap();
        assert!(matches!(
            store
                .update_class(
                    other.id,
                    &ClassChanges {
                        semester: Some(1),
                        ..ClassChanges::default()
                    },
                )
                .await,
            Err(DatabaseError::UniqueViolation(
                crate::models::UniqueField::ClassIdentity
            ))
        ));
        assert!(matches!(
            store
                .update_class(
                    other.id,
                    &ClassChanges {
                        faculty_id: Some(Some(FacultyKey(999))),
                        ..ClassChanges::default()
                    },
                )
                .await,
            Err(DatabaseError::ForeignKeyViolation(Relation::ClassFaculty))
        ));
        assert_eq!(store.class(other.id).await.unwrap(), Some(other));
    }

    #[tokio::test]
    async fn stats_count_pending_students() {
        let store = MemoryStore::new();
        for handle in ["S1", "S2"] {
            store
                .insert_student(NewStudent {
                    student_id: handle.to_owned(),
                    password_hash: PasswordHash::new("hash".to_owned()),
                })
                .await
                .unwrap();
        }
        let first = store.student_by_handle("S1").await.unwrap().unwrap();
        store.set_student_approval(first.id, true).await.unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            DirectoryStats {
                total_students: 2,
                total_faculty: 0,
                pending_approvals: 1,
            }
        );
    }
}
