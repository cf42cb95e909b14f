use campus_directory_database::models::UniqueKey;
use campus_directory_database::DirectoryStore;

use crate::error::DirectoryError;

/// Whether a record other than `exclude` already holds `key`.
pub async fn is_taken<S: DirectoryStore + ?Sized>(
    store: &S,
    key: UniqueKey<'_>,
    exclude: Option<i32>,
) -> Result<bool, DirectoryError> {
    let holder = store.holder_of(key).await?;
    Ok(holder.is_some_and(|holder| Some(holder) != exclude))
}

/// Fails with [`DirectoryError::DuplicateKey`] when [`is_taken`].
///
/// Advisory only: a concurrent writer can still win the race, the store rejects the loser.
pub async fn ensure_unique<S: DirectoryStore + ?Sized>(
    store: &S,
    key: UniqueKey<'_>,
    exclude: Option<i32>,
) -> Result<(), DirectoryError> {
    if is_taken(store, key, exclude).await? {
        Err(DirectoryError::DuplicateKey(key.field()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use campus_directory_database::models::{NewDepartment, UniqueField};
    use campus_directory_database::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn department_names_collide_ignoring_case() {
        let store = MemoryStore::new();
        let department = store
            .insert_department(NewDepartment {
                department_id: "01".to_owned(),
                name: "DCS".to_owned(),
            })
            .await
            .unwrap();

        assert!(is_taken(&store, UniqueKey::DepartmentName("dcs"), None)
            .await
            .unwrap());
        assert!(matches!(
            ensure_unique(&store, UniqueKey::DepartmentName("Dcs"), None).await,
            Err(DirectoryError::DuplicateKey(UniqueField::DepartmentName))
        ));
        // the record itself does not collide with its own name
        ensure_unique(
            &store,
            UniqueKey::DepartmentName("dcs"),
            Some(department.id.get()),
        )
        .await
        .unwrap();
        ensure_unique(&store, UniqueKey::DepartmentId("02"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn class_identity_is_a_pair() {
        let store = MemoryStore::new();
        store
            .insert_department(NewDepartment {
                department_id: "01".to_owned(),
                name: "DCS".to_owned(),
            })
            .await
            .unwrap();
        store
            .insert_class(campus_directory_database::models::NewClass {
                term_year: "2025-26".to_owned(),
                department: "DCS".to_owned(),
                semester: 4,
                class_name: "4DCS1".to_owned(),
                class_id: "4DCS1".to_owned(),
                faculty_id: None,
            })
            .await
            .unwrap();

        let other_semester = UniqueKey::ClassIdentity {
            class_id: "4DCS1",
            semester: 5,
        };
        assert!(!is_taken(&store, other_semester, None).await.unwrap());
        let same = UniqueKey::ClassIdentity {
            class_id: "4DCS1",
            semester: 4,
        };
        assert!(is_taken(&store, same, None).await.unwrap());
    }
}
