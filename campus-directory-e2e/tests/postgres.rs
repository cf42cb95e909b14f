// needs a migrated database:
// podman run --rm --detach --name postgres-testing --env POSTGRES_HOST_AUTH_METHOD=trust --publish 5432:5432 docker.io/postgres
// DATABASE_URL=postgres://postgres@localhost/campus diesel migration run --migration-dir campus-directory-database/migrations
// DATABASE_URL=postgres://postgres@localhost/campus cargo test -p campus-directory-e2e --test postgres -- --ignored

use campus_directory_backend::requests::{ClassPatch, DepartmentPatch, RegisterStudent};
use campus_directory_backend::{CredentialHasher, ErrorKind, Password};
use campus_directory_database::models::{DirectoryStats, EntityKind, UniqueField};
use campus_directory_database::{get_database_connection_from_env, PgStore};
use campus_directory_e2e::{class, department, faculty, service_with};
use pretty_assertions::assert_eq;

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a migrated, empty database"]
async fn postgres_enforces_the_directory_rules() {
    let pool = get_database_connection_from_env().unwrap();
    let service = service_with(PgStore::new(pool));

    let dcs = department(&service, "01", "DCS").await.unwrap();
    assert!(matches!(
        department(&service, "02", "dcs").await,
        Err(campus_directory_backend::DirectoryError::DuplicateKey(
            UniqueField::DepartmentName
        ))
    ));

    let a = faculty(&service, "A", "dcs").await.unwrap();
    assert_eq!(a.department, "DCS");
    let created = class(&service, "DCS", "4DCS1", 4).await.unwrap();
    service.assign("A", &"4DCS1".into()).await.unwrap();
    let detail = service.class_detail(created.id).await.unwrap();
    assert_eq!(detail.faculty, Some(a.clone()));

    // only the named column is written, the assignment stays
    let renamed = service
        .update_class(
            created.id,
            ClassPatch {
                class_name: Some("Section 1".to_owned()),
                ..ClassPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.faculty_id, Some(a.id));
    let unchanged = service
        .update_class(created.id, ClassPatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged, renamed);

    assert_eq!(
        service
            .delete_faculty(a.id)
            .await
            .map_err(|error| error.kind()),
        Err(ErrorKind::ReferencedEntity)
    );
    assert_eq!(
        service
            .delete_department(dcs.id)
            .await
            .map_err(|error| error.kind()),
        Err(ErrorKind::ReferencedEntity)
    );

    service
        .update_department(
            dcs.id,
            DepartmentPatch {
                name: Some("CSE".to_owned()),
                department_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(service.class(created.id).await.unwrap().department, "CSE");
    assert_eq!(service.faculty(a.id).await.unwrap().department, "CSE");

    let hash = service
        .store()
        .stored_password_hash(EntityKind::Faculty, "A")
        .await
        .unwrap()
        .unwrap();
    assert!(service
        .hasher()
        .verify(&Password::from("secret"), &hash)
        .unwrap());

    service
        .register_student(RegisterStudent {
            student_id: "S1".to_owned(),
            password: Password::from("pw"),
        })
        .await
        .unwrap();
    assert_eq!(
        service.stats().await.unwrap(),
        DirectoryStats {
            total_students: 1,
            total_faculty: 1,
            pending_approvals: 1,
        }
    );

    service.delete_class(created.id).await.unwrap();
    service.delete_faculty(a.id).await.unwrap();
    service.delete_department(dcs.id).await.unwrap();
    assert!(matches!(
        service.faculty(a.id).await,
        Err(campus_directory_backend::DirectoryError::NotFound {
            entity: EntityKind::Faculty,
            ..
        })
    ));
}
