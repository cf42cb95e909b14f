//! Pure format checks on submitted identifiers. Nothing here touches storage.

use crate::error::DirectoryError;

/// A department code is exactly two ASCII digits, `00` to `99`.
///
/// The code is checked as submitted. Surrounding whitespace makes it invalid, and so does an
/// empty code.
pub fn validate_department_id(code: &str) -> Result<(), DirectoryError> {
    if code.len() == 2 && code.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(())
    } else {
        Err(DirectoryError::InvalidFormat {
            field: "departmentId",
            reason: format!("expected exactly two digits, got {code:?}"),
        })
    }
}

pub fn validate_class_identity(class_id: &str, semester: i32) -> Result<(), DirectoryError> {
    if class_id.trim().is_empty() {
        return Err(DirectoryError::MissingField("classId"));
    }
    validate_semester(semester)
}

pub fn validate_semester(semester: i32) -> Result<(), DirectoryError> {
    if semester > 0 {
        Ok(())
    } else {
        Err(DirectoryError::InvalidFormat {
            field: "semester",
            reason: format!("expected a positive integer, got {semester}"),
        })
    }
}

/// Trims `value` and rejects it when nothing is left.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, DirectoryError> {
    let value = value.trim();
    if value.is_empty() {
        Err(DirectoryError::MissingField(field))
    } else {
        Ok(value)
    }
}
