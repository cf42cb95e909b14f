use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::error::DatabaseError;
use crate::models::{
    name_key, Class, ClassChanges, ClassKey, Department, DepartmentChanges, DepartmentKey,
    DependencyTarget, Dependents, DirectoryStats, EntityKind, Faculty, FacultyChanges, FacultyKey,
    NewClass, NewDepartment, NewFaculty, NewStudent, PasswordHash, Student, StudentKey,
    UniqueKey,
};
use crate::schema::{classes, departments, faculty, students};
use crate::store::DirectoryStore;
use crate::Pool;

#[derive(Queryable, Selectable)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct DepartmentRow {
    id: i32,
    department_id: String,
    name: String,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: DepartmentKey(row.id),
            department_id: row.department_id,
            name: row.name,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = departments)]
struct DepartmentValues<'a> {
    department_id: &'a str,
    name: &'a str,
    name_key: String,
}

impl<'a> DepartmentValues<'a> {
    fn new(department_id: &'a str, name: &'a str) -> Self {
        Self {
            department_id,
            name,
            name_key: name_key(name),
        }
    }
}

// `None` fields are left out of the UPDATE
#[derive(AsChangeset)]
#[diesel(table_name = departments)]
struct DepartmentChangeset<'a> {
    department_id: Option<&'a str>,
    name: Option<&'a str>,
    name_key: Option<String>,
}

impl<'a> From<&'a DepartmentChanges> for DepartmentChangeset<'a> {
    fn from(changes: &'a DepartmentChanges) -> Self {
        Self {
            department_id: changes.department_id.as_deref(),
            name: changes.name.as_deref(),
            name_key: changes.name.as_deref().map(name_key),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = classes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ClassRow {
    id: i32,
    term_year: String,
    department: String,
    semester: i32,
    class_name: String,
    class_id: String,
    faculty_id: Option<i32>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Self {
            id: ClassKey(row.id),
            term_year: row.term_year,
            department: row.department,
            semester: row.semester,
            class_name: row.class_name,
            class_id: row.class_id,
            faculty_id: row.faculty_id.map(FacultyKey),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = classes)]
struct ClassValues<'a> {
    term_year: &'a str,
    department: &'a str,
    semester: i32,
    class_name: &'a str,
    class_id: &'a str,
    faculty_id: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = classes)]
struct ClassChangeset<'a> {
    term_year: Option<&'a str>,
    department: Option<&'a str>,
    semester: Option<i32>,
    class_name: Option<&'a str>,
    class_id: Option<&'a str>,
    // `Some(None)` writes NULL
    faculty_id: Option<Option<i32>>,
}

impl<'a> From<&'a ClassChanges> for ClassChangeset<'a> {
    fn from(changes: &'a ClassChanges) -> Self {
        Self {
            term_year: changes.term_year.as_deref(),
            department: changes.department.as_deref(),
            semester: changes.semester,
            class_name: changes.class_name.as_deref(),
            class_id: changes.class_id.as_deref(),
            faculty_id: changes.faculty_id.map(|faculty| faculty.map(FacultyKey::get)),
        }
    }
}

// the password hash is deliberately not selectable
#[derive(Queryable, Selectable)]
#[diesel(table_name = faculty)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct FacultyRow {
    id: i32,
    faculty_id: String,
    name: String,
    department: String,
}

impl From<FacultyRow> for Faculty {
    fn from(row: FacultyRow) -> Self {
        Self {
            id: FacultyKey(row.id),
            faculty_id: row.faculty_id,
            name: row.name,
            department: row.department,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = faculty)]
struct FacultyValues<'a> {
    faculty_id: &'a str,
    name: &'a str,
    department: &'a str,
    password_hash: &'a str,
}

#[derive(AsChangeset)]
#[diesel(table_name = faculty)]
struct FacultyChangeset<'a> {
    name: Option<&'a str>,
    department: Option<&'a str>,
    password_hash: Option<&'a str>,
}

impl<'a> From<&'a FacultyChanges> for FacultyChangeset<'a> {
    fn from(changes: &'a FacultyChanges) -> Self {
        Self {
            name: changes.name.as_deref(),
            department: changes.department.as_deref(),
            password_hash: changes.password_hash.as_ref().map(PasswordHash::as_str),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct StudentRow {
    id: i32,
    student_id: String,
    is_approved: bool,
    assigned_faculty: Option<i32>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentKey(row.id),
            student_id: row.student_id,
            is_approved: row.is_approved,
            assigned_faculty: row.assigned_faculty.map(FacultyKey),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = students)]
struct StudentValues<'a> {
    student_id: &'a str,
    password_hash: &'a str,
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

/// The PostgreSQL [`DirectoryStore`]. Constraints live in the schema, see the migrations.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        Ok(Self::new(crate::get_database_connection(database_url)?))
    }

    /// The stored hash for a faculty or student handle, for credential checks done elsewhere.
    pub async fn stored_password_hash(
        &self,
        kind: EntityKind,
        handle: &str,
    ) -> Result<Option<PasswordHash>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let hash = match kind {
            EntityKind::Faculty => {
                faculty::table
                    .filter(faculty::faculty_id.eq(handle))
                    .select(faculty::password_hash)
                    .first::<String>(&mut connection)
                    .await
            }
            EntityKind::Student => {
                students::table
                    .filter(students::student_id.eq(handle))
                    .select(students::password_hash)
                    .first::<String>(&mut connection)
                    .await
            }
            EntityKind::Department | EntityKind::Class => return Ok(None),
        };
        Ok(hash.optional()?.map(PasswordHash::new))
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn list_departments(&self) -> Result<Vec<Department>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = departments::table
            .order(departments::id.asc())
            .select(DepartmentRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn department(&self, key: DepartmentKey) -> Result<Option<Department>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(departments::table
            .find(key.get())
            .select(DepartmentRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Department::from))
    }

    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(departments::table
            .filter(departments::name_key.eq(name_key(name)))
            .select(DepartmentRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Department::from))
    }

    async fn insert_department(
        &self,
        department: NewDepartment,
    ) -> Result<Department, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let row = diesel::insert_into(departments::table)
            .values(DepartmentValues::new(
                &department.department_id,
                &department.name,
            ))
            .returning(DepartmentRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }

    // classes and faculty follow a rename through ON UPDATE CASCADE
    async fn update_department(
        &self,
        key: DepartmentKey,
        changes: &DepartmentChanges,
    ) -> Result<Option<Department>, DatabaseError> {
        // diesel refuses an UPDATE without columns
        if changes.is_empty() {
            return self.department(key).await;
        }
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(departments::table.find(key.get()))
            .set(DepartmentChangeset::from(changes))
            .returning(DepartmentRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Department::from))
    }

    async fn delete_department(&self, key: DepartmentKey) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(departments::table.find(key.get()))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn list_classes(&self) -> Result<Vec<Class>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = classes::table
            .order(classes::id.asc())
            .select(ClassRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Class::from).collect())
    }

    async fn class(&self, key: ClassKey) -> Result<Option<Class>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(classes::table
            .find(key.get())
            .select(ClassRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Class::from))
    }

    async fn classes_by_class_id(&self, class_id: &str) -> Result<Vec<Class>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = classes::table
            .filter(classes::class_id.eq(class_id))
            .order(classes::semester.asc())
            .select(ClassRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Class::from).collect())
    }

    async fn insert_class(&self, class: NewClass) -> Result<Class, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let row = diesel::insert_into(classes::table)
            .values(ClassValues {
                term_year: &class.term_year,
                department: &class.department,
                semester: class.semester,
                class_name: &class.class_name,
                class_id: &class.class_id,
                faculty_id: class.faculty_id.map(FacultyKey::get),
            })
            .returning(ClassRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }

    async fn update_class(
        &self,
        key: ClassKey,
        changes: &ClassChanges,
    ) -> Result<Option<Class>, DatabaseError> {
        if changes.is_empty() {
            return self.class(key).await;
        }
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(classes::table.find(key.get()))
            .set(ClassChangeset::from(changes))
            .returning(ClassRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Class::from))
    }

    async fn set_class_faculty(
        &self,
        key: ClassKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Class>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(classes::table.find(key.get()))
            .set(classes::faculty_id.eq(faculty.map(FacultyKey::get)))
            .returning(ClassRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Class::from))
    }

    async fn delete_class(&self, key: ClassKey) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(classes::table.find(key.get()))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = faculty::table
            .order(faculty::id.asc())
            .select(FacultyRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Faculty::from).collect())
    }

    async fn faculty(&self, key: FacultyKey) -> Result<Option<Faculty>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(faculty::table
            .find(key.get())
            .select(FacultyRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Faculty::from))
    }

    async fn faculty_by_handle(&self, faculty_id: &str) -> Result<Option<Faculty>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(faculty::table
            .filter(faculty::faculty_id.eq(faculty_id))
            .select(FacultyRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Faculty::from))
    }

    async fn insert_faculty(&self, record: NewFaculty) -> Result<Faculty, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let row = diesel::insert_into(faculty::table)
            .values(FacultyValues {
                faculty_id: &record.faculty_id,
                name: &record.name,
                department: &record.department,
                password_hash: record.password_hash.as_str(),
            })
            .returning(FacultyRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }

    async fn update_faculty(
        &self,
        key: FacultyKey,
        changes: &FacultyChanges,
    ) -> Result<Option<Faculty>, DatabaseError> {
        if changes.is_empty() {
            return self.faculty(key).await;
        }
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(faculty::table.find(key.get()))
            .set(FacultyChangeset::from(changes))
            .returning(FacultyRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Faculty::from))
    }

    async fn delete_faculty(&self, key: FacultyKey) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(faculty::table.find(key.get()))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn list_students(&self) -> Result<Vec<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = students::table
            .order(students::id.asc())
            .select(StudentRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    async fn student(&self, key: StudentKey) -> Result<Option<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(students::table
            .find(key.get())
            .select(StudentRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Student::from))
    }

    async fn student_by_handle(
        &self,
        student_id: &str,
    ) -> Result<Option<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(students::table
            .filter(students::student_id.eq(student_id))
            .select(StudentRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .map(Student::from))
    }

    async fn insert_student(&self, student: NewStudent) -> Result<Student, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let row = diesel::insert_into(students::table)
            .values(StudentValues {
                student_id: &student.student_id,
                password_hash: student.password_hash.as_str(),
            })
            .returning(StudentRow::as_returning())
            .get_result(&mut connection)
            .await?;
        Ok(row.into())
    }

    async fn set_student_approval(
        &self,
        key: StudentKey,
        approved: bool,
    ) -> Result<Option<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(students::table.find(key.get()))
            .set(students::is_approved.eq(approved))
            .returning(StudentRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Student::from))
    }

    async fn set_student_faculty(
        &self,
        key: StudentKey,
        faculty: Option<FacultyKey>,
    ) -> Result<Option<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(students::table.find(key.get()))
            .set(students::assigned_faculty.eq(faculty.map(FacultyKey::get)))
            .returning(StudentRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?
            .map(Student::from))
    }

    async fn students_of_faculty(&self, key: FacultyKey) -> Result<Vec<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let rows = students::table
            .filter(students::assigned_faculty.eq(key.get()))
            .order(students::id.asc())
            .select(StudentRow::as_select())
            .load(&mut connection)
            .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    async fn holder_of(&self, key: UniqueKey<'_>) -> Result<Option<i32>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let holder = match key {
            UniqueKey::DepartmentId(department_id) => {
                departments::table
                    .filter(departments::department_id.eq(department_id))
                    .select(departments::id)
                    .first::<i32>(&mut connection)
                    .await
            }
            UniqueKey::DepartmentName(name) => {
                departments::table
                    .filter(departments::name_key.eq(name_key(name)))
                    .select(departments::id)
                    .first::<i32>(&mut connection)
                    .await
            }
            UniqueKey::ClassIdentity { class_id, semester } => {
                classes::table
                    .filter(classes::class_id.eq(class_id))
                    .filter(classes::semester.eq(semester))
                    .select(classes::id)
                    .first::<i32>(&mut connection)
                    .await
            }
            UniqueKey::FacultyId(faculty_id) => {
                faculty::table
                    .filter(faculty::faculty_id.eq(faculty_id))
                    .select(faculty::id)
                    .first::<i32>(&mut connection)
                    .await
            }
            UniqueKey::StudentId(student_id) => {
                students::table
                    .filter(students::student_id.eq(student_id))
                    .select(students::id)
                    .first::<i32>(&mut connection)
                    .await
            }
        };
        Ok(holder.optional()?)
    }

    async fn dependents(&self, target: DependencyTarget<'_>) -> Result<Dependents, DatabaseError> {
        let mut connection = self.pool.get().await?;
        match target {
            DependencyTarget::Department(name) => {
                let class_count = classes::table
                    .filter(classes::department.eq(name))
                    .count()
                    .get_result::<i64>(&mut connection)
                    .await?;
                let faculty_count = faculty::table
                    .filter(faculty::department.eq(name))
                    .count()
                    .get_result::<i64>(&mut connection)
                    .await?;
                Ok(Dependents {
                    classes: to_count(class_count),
                    faculty: to_count(faculty_count),
                    students: 0,
                })
            }
            DependencyTarget::Faculty(key) => {
                let class_count = classes::table
                    .filter(classes::faculty_id.eq(key.get()))
                    .count()
                    .get_result::<i64>(&mut connection)
                    .await?;
                let student_count = students::table
                    .filter(students::assigned_faculty.eq(key.get()))
                    .count()
                    .get_result::<i64>(&mut connection)
                    .await?;
                Ok(Dependents {
                    classes: to_count(class_count),
                    faculty: 0,
                    students: to_count(student_count),
                })
            }
        }
    }

    // one statement, so all three counts come from the same snapshot
    async fn stats(&self) -> Result<DirectoryStats, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let (total_students, total_faculty, pending_approvals) = diesel::select((
            students::table.count().single_value(),
            faculty::table.count().single_value(),
            students::table
                .filter(students::is_approved.eq(false))
                .count()
                .single_value(),
        ))
        .get_result::<(Option<i64>, Option<i64>, Option<i64>)>(&mut connection)
        .await?;
        Ok(DirectoryStats {
            total_students: to_count(total_students.unwrap_or_default()),
            total_faculty: to_count(total_faculty.unwrap_or_default()),
            pending_approvals: to_count(pending_approvals.unwrap_or_default()),
        })
    }
}
