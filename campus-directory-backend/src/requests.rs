//! Payloads accepted by [`crate::DirectoryService`]. Patches leave absent fields untouched.

use serde::{Deserialize, Deserializer};

use crate::password::Password;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartment {
    pub department_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartmentPatch {
    pub department_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    /// Department name, matched case-insensitively.
    pub department: String,
    pub class_name: String,
    pub class_id: String,
    pub term_year: String,
    pub semester: i32,
    /// `facultyId` handle. Blank means unassigned.
    #[serde(default)]
    pub faculty_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassPatch {
    pub department: Option<String>,
    pub class_name: Option<String>,
    pub class_id: Option<String>,
    pub term_year: Option<String>,
    pub semester: Option<i32>,
    /// `Some(None)` clears the assignment, `None` keeps it.
    #[serde(deserialize_with = "double_option")]
    pub faculty_id: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaculty {
    pub faculty_id: String,
    pub name: String,
    pub department: String,
    pub password: Password,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacultyPatch {
    pub name: Option<String>,
    pub department: Option<String>,
    pub password: Option<Password>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudent {
    pub student_id: String,
    pub password: Password,
}

/// Tells an explicit `null` apart from a missing field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Empty and whitespace-only handles count as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
