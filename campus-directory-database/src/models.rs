use core::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

macro_rules! record_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

record_key!(
    /// Storage-internal identifier of a department, not its `departmentId`.
    DepartmentKey
);
record_key!(ClassKey);
record_key!(
    /// Storage-internal identifier of a faculty member, not its `facultyId` handle.
    FacultyKey
);
record_key!(StudentKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Department,
    Class,
    Faculty,
    Student,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Department => "department",
            Self::Class => "class",
            Self::Faculty => "faculty",
            Self::Student => "student",
        })
    }
}

/// Canonical form used to compare department names case-insensitively.
///
/// Plain Unicode uppercasing, so the result does not depend on the locale of the process.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// A salted password hash in PHC string format. Never serialized and redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    #[must_use]
    pub const fn new(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentKey,
    pub department_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDepartment {
    pub department_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassKey,
    pub term_year: String,
    /// Name of the owning department.
    pub department: String,
    pub semester: i32,
    pub class_name: String,
    pub class_id: String,
    pub faculty_id: Option<FacultyKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
    pub term_year: String,
    pub department: String,
    pub semester: i32,
    pub class_name: String,
    pub class_id: String,
    pub faculty_id: Option<FacultyKey>,
}

/// Read model of a faculty member. The password hash stays in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: FacultyKey,
    pub faculty_id: String,
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFaculty {
    pub faculty_id: String,
    pub name: String,
    pub department: String,
    pub password_hash: PasswordHash,
}

/// Read model of a student. The password hash stays in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentKey,
    pub student_id: String,
    pub is_approved: bool,
    pub assigned_faculty: Option<FacultyKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub student_id: String,
    pub password_hash: PasswordHash,
}

/// Columns to overwrite on a department. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentChanges {
    pub department_id: Option<String>,
    pub name: Option<String>,
}

impl DepartmentChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.department_id.is_none() && self.name.is_none()
    }
}

/// Columns to overwrite on a class. `None` leaves the stored value alone, `Some(None)` in
/// `faculty_id` clears the assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassChanges {
    pub term_year: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub class_name: Option<String>,
    pub class_id: Option<String>,
    pub faculty_id: Option<Option<FacultyKey>>,
}

impl ClassChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.term_year.is_none()
            && self.department.is_none()
            && self.semester.is_none()
            && self.class_name.is_none()
            && self.class_id.is_none()
            && self.faculty_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacultyChanges {
    pub name: Option<String>,
    pub department: Option<String>,
    pub password_hash: Option<PasswordHash>,
}

impl FacultyChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.department.is_none() && self.password_hash.is_none()
    }
}

/// Fields that must be unique, named the way callers submit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniqueField {
    DepartmentId,
    DepartmentName,
    ClassIdentity,
    FacultyId,
    StudentId,
}

impl UniqueField {
    #[must_use]
    pub const fn constraint(self) -> &'static str {
        match self {
            Self::DepartmentId => "departments_department_id_unique",
            Self::DepartmentName => "departments_name_key_unique",
            Self::ClassIdentity => "classes_class_id_semester_unique",
            Self::FacultyId => "faculty_faculty_id_unique",
            Self::StudentId => "students_student_id_unique",
        }
    }

    #[must_use]
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "departments_department_id_unique" => Some(Self::DepartmentId),
            // the exact name index is implied by the canonical one
            "departments_name_key_unique" | "departments_name_unique" => {
                Some(Self::DepartmentName)
            }
            "classes_class_id_semester_unique" => Some(Self::ClassIdentity),
            "faculty_faculty_id_unique" => Some(Self::FacultyId),
            "students_student_id_unique" => Some(Self::StudentId),
            _ => None,
        }
    }
}

impl Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DepartmentId => "departmentId",
            Self::DepartmentName => "name",
            Self::ClassIdentity => "(classId, semester)",
            Self::FacultyId => "facultyId",
            Self::StudentId => "studentId",
        })
    }
}

/// A candidate value for one of the unique fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey<'a> {
    DepartmentId(&'a str),
    /// Compared through [`name_key`].
    DepartmentName(&'a str),
    ClassIdentity { class_id: &'a str, semester: i32 },
    FacultyId(&'a str),
    StudentId(&'a str),
}

impl UniqueKey<'_> {
    #[must_use]
    pub const fn field(&self) -> UniqueField {
        match self {
            Self::DepartmentId(_) => UniqueField::DepartmentId,
            Self::DepartmentName(_) => UniqueField::DepartmentName,
            Self::ClassIdentity { .. } => UniqueField::ClassIdentity,
            Self::FacultyId(_) => UniqueField::FacultyId,
            Self::StudentId(_) => UniqueField::StudentId,
        }
    }
}

/// References between records that the store protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    ClassDepartment,
    FacultyDepartment,
    ClassFaculty,
    StudentFaculty,
}

impl Relation {
    #[must_use]
    pub const fn constraint(self) -> &'static str {
        match self {
            Self::ClassDepartment => "classes_department_fkey",
            Self::FacultyDepartment => "faculty_department_fkey",
            Self::ClassFaculty => "classes_faculty_id_fkey",
            Self::StudentFaculty => "students_assigned_faculty_fkey",
        }
    }

    #[must_use]
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        [
            Self::ClassDepartment,
            Self::FacultyDepartment,
            Self::ClassFaculty,
            Self::StudentFaculty,
        ]
        .into_iter()
        .find(|relation| relation.constraint() == constraint)
    }

    /// The record that holds the reference.
    #[must_use]
    pub const fn dependent(self) -> EntityKind {
        match self {
            Self::ClassDepartment | Self::ClassFaculty => EntityKind::Class,
            Self::FacultyDepartment => EntityKind::Faculty,
            Self::StudentFaculty => EntityKind::Student,
        }
    }

    /// The record being referenced.
    #[must_use]
    pub const fn referenced(self) -> EntityKind {
        match self {
            Self::ClassDepartment | Self::FacultyDepartment => EntityKind::Department,
            Self::ClassFaculty | Self::StudentFaculty => EntityKind::Faculty,
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.dependent(), self.referenced())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyTarget<'a> {
    /// Departments are referenced by name.
    Department(&'a str),
    Faculty(FacultyKey),
}

/// Number of records referencing a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependents {
    pub classes: u64,
    pub faculty: u64,
    pub students: u64,
}

impl Dependents {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.classes + self.faculty + self.students
    }
}

impl Display for Dependents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} classes, {} faculty, {} students",
            self.classes, self.faculty, self.students
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryStats {
    pub total_students: u64,
    pub total_faculty: u64,
    pub pending_approvals: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(name_key(" dcs "), "DCS");
        assert_eq!(name_key("Dcs"), name_key("dCS"));
    }

    #[test]
    fn constraint_names_round_trip() {
        for field in [
            UniqueField::DepartmentId,
            UniqueField::DepartmentName,
            UniqueField::ClassIdentity,
            UniqueField::FacultyId,
            UniqueField::StudentId,
        ] {
            assert_eq!(UniqueField::from_constraint(field.constraint()), Some(field));
        }
        assert_eq!(
            Relation::from_constraint("students_assigned_faculty_fkey"),
            Some(Relation::StudentFaculty)
        );
        assert_eq!(Relation::from_constraint("unknown"), None);
    }

    #[test]
    fn password_hash_is_redacted() {
        let hash = PasswordHash::new("$argon2id$v=19$secret".to_owned());
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }
}
