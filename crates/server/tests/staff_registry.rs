mod common;

use bytes::Bytes;
use common::{staff_input, with, Harness, RejectingPutStore};
use roster_server::core::Error;
use roster_server::staff::{EmploymentStatus, ExportMode, FieldInput, Upload, EXPORT_COLUMNS};
use std::sync::Arc;

fn pdf(bytes: &'static [u8]) -> Upload {
    Upload {
        filename: "scan.pdf".into(),
        data: Bytes::from_static(bytes),
    }
}

#[tokio::test]
async fn test_ni_number_is_unique_across_tenants() {
    let h = Harness::new().await;
    let first = h.boss("a@x.com").await;
    let second = h.boss("b@x.com").await;

    let staff = h
        .state
        .staff
        .create(first, &staff_input("John", "Smith", "AB123456C"), None)
        .await
        .unwrap();
    assert_eq!(staff.fields.national_insurance_number, "AB123456C");
    assert_eq!(staff.proof_of_id, doc_store::PENDING);

    let err = h
        .state
        .staff
        .create(second, &staff_input("Other", "Person", "ab123456c"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateIdentifier(_)));
}

#[tokio::test]
async fn test_create_rejects_bad_input_before_writing() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let bad_date = with(staff_input("A", "B", "AA000001A"), "date_of_birth", "01-04-1990");
    assert!(matches!(
        h.state.staff.create(boss, &bad_date, None).await,
        Err(Error::InvalidDateFormat)
    ));

    let bad_file = Upload {
        filename: "payload.exe".into(),
        data: Bytes::from_static(b"MZ"),
    };
    assert!(matches!(
        h.state
            .staff
            .create(boss, &staff_input("A", "B", "AA000001A"), Some(bad_file))
            .await,
        Err(Error::InvalidDocumentType(_))
    ));

    assert!(h.state.staff.list_by_tenant(boss).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_never_touches_identity_columns() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;
    let other = h.boss("b@x.com").await;

    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), None)
        .await
        .unwrap();

    let patch: FieldInput = [
        ("id", "999"),
        ("boss_id", other.to_string().as_str()),
        ("created_at", "2001-01-01T00:00:00Z"),
        ("firstname", "  Johnny  "),
        ("date_of_birth", "1985-12-31"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let updated = h.state.staff.update(staff.id, boss, &patch, None).await.unwrap();
    assert_eq!(updated.id, staff.id);
    assert_eq!(updated.boss_id, boss);
    assert_eq!(updated.created_at, staff.created_at);
    assert_eq!(updated.fields.firstname, "Johnny");
    assert_eq!(updated.fields.date_of_birth.to_string(), "1985-12-31");
    assert!(updated.updated_at.is_some());

    let unknown = with(FieldInput::new(), "salary", "1");
    assert!(matches!(
        h.state.staff.update(staff.id, boss, &unknown, None).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_update_rechecks_ni_only_when_changed() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let a = h
        .state
        .staff
        .create(boss, &staff_input("A", "One", "AA000001A"), None)
        .await
        .unwrap();
    h.state
        .staff
        .create(boss, &staff_input("B", "Two", "BB000002B"), None)
        .await
        .unwrap();

    // Same number, different case: not a change after normalization.
    let same = with(FieldInput::new(), "national_insurance_number", "aa000001a");
    h.state.staff.update(a.id, boss, &same, None).await.unwrap();

    let taken = with(FieldInput::new(), "national_insurance_number", "bb000002b");
    assert!(matches!(
        h.state.staff.update(a.id, boss, &taken, None).await,
        Err(Error::DuplicateIdentifier(_))
    ));
}

#[tokio::test]
async fn test_cross_tenant_access_is_not_found() {
    let h = Harness::new().await;
    let owner = h.boss("a@x.com").await;
    let intruder = h.boss("b@x.com").await;

    let staff = h
        .state
        .staff
        .create(owner, &staff_input("John", "Smith", "AB123456C"), Some(pdf(b"doc")))
        .await
        .unwrap();

    let patch = with(FieldInput::new(), "firstname", "Hacked");
    assert!(matches!(h.state.staff.get(staff.id, intruder).await, Err(Error::NotFound)));
    assert!(matches!(
        h.state.staff.update(staff.id, intruder, &patch, None).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(h.state.staff.delete(staff.id, intruder).await, Err(Error::NotFound)));
    assert!(matches!(h.state.staff.document(staff.id, intruder).await, Err(Error::NotFound)));

    let still = h.state.staff.get(staff.id, owner).await.unwrap();
    assert_eq!(still.fields.firstname, "John");
}

#[tokio::test]
async fn test_delete_then_get_and_second_delete_are_not_found() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), Some(pdf(b"doc")))
        .await
        .unwrap();
    let stored = h.uploads().join(&staff.proof_of_id);
    assert!(stored.exists());

    h.state.staff.delete(staff.id, boss).await.unwrap();
    assert!(!stored.exists());
    assert!(matches!(h.state.staff.get(staff.id, boss).await, Err(Error::NotFound)));
    assert!(matches!(h.state.staff.delete(staff.id, boss).await, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_document_replace_leaves_one_artifact() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), Some(pdf(b"first")))
        .await
        .unwrap();
    let old_ref = staff.proof_of_id.clone();

    let png = Upload {
        filename: "photo.PNG".into(),
        data: Bytes::from_static(b"second"),
    };
    let updated = h
        .state
        .staff
        .attach_document(staff.id, boss, png)
        .await
        .unwrap();
    assert_ne!(updated.proof_of_id, old_ref);
    assert!(updated.proof_of_id.ends_with(".png"));

    let (filename, resolved) = h.state.staff.document(staff.id, boss).await.unwrap();
    assert_eq!(filename, updated.proof_of_id);
    assert_eq!(&resolved.data[..], b"second");
    assert_eq!(resolved.content_type, "image/png");

    assert!(!h.uploads().join(&old_ref).exists());
    let files = std::fs::read_dir(h.uploads())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .count();
    assert_eq!(files, 1);
}

#[tokio::test]
async fn test_update_with_file_replaces_document() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), None)
        .await
        .unwrap();
    assert!(matches!(h.state.staff.document(staff.id, boss).await, Err(Error::NotFound)));

    let patch = with(FieldInput::new(), "visa_type", "Skilled Worker");
    let updated = h
        .state
        .staff
        .update(staff.id, boss, &patch, Some(pdf(b"v1")))
        .await
        .unwrap();
    assert_eq!(updated.fields.visa_type, "Skilled Worker");
    assert!(updated.has_document());

    let (_, resolved) = h.state.staff.document(staff.id, boss).await.unwrap();
    assert_eq!(&resolved.data[..], b"v1");
}

#[tokio::test]
async fn test_search_matches_text_and_status() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;
    let other = h.boss("b@x.com").await;
    let registry = &h.state.staff;

    registry
        .create(boss, &staff_input("Zoe", "Smith", "AA000001A"), None)
        .await
        .unwrap();
    registry
        .create(boss, &staff_input("adam", "SMITHSON", "AA000002A"), None)
        .await
        .unwrap();
    registry
        .create(
            boss,
            &with(staff_input("Carl", "Smithers", "AA000003A"), "employment_status", "Part-time"),
            None,
        )
        .await
        .unwrap();
    registry
        .create(boss, &staff_input("Dana", "Jones", "AA000004A"), None)
        .await
        .unwrap();
    registry
        .create(other, &staff_input("Eve", "Smith", "AA000005A"), None)
        .await
        .unwrap();

    let hits = registry
        .search(boss, Some("smith"), Some(EmploymentStatus::FullTime))
        .await
        .unwrap();
    let names: Vec<_> = hits.iter().map(|r| r.fields.firstname.as_str()).collect();
    assert_eq!(names, vec!["adam", "Zoe"]);

    // NI numbers match case-insensitively too.
    let by_ni = registry.search(boss, Some("aa000004"), None).await.unwrap();
    assert_eq!(by_ni.len(), 1);
    assert_eq!(by_ni[0].fields.lastname, "Jones");

    let everyone = registry.search(boss, None, None).await.unwrap();
    assert_eq!(everyone.len(), 4);
    assert_eq!(everyone, registry.list_by_tenant(boss).await.unwrap());
}

#[tokio::test]
async fn test_export_rows_follow_roster_order() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    h.state
        .staff
        .create(boss, &staff_input("Bella", "Young", "AA000001A"), Some(pdf(b"d")))
        .await
        .unwrap();
    h.state
        .staff
        .create(boss, &staff_input("Anna", "Zed", "AA000002A"), None)
        .await
        .unwrap();

    assert_eq!(EXPORT_COLUMNS[0], "First Name");
    assert_eq!(EXPORT_COLUMNS[11], "Proof of ID");

    let rows = h.state.staff.export_rows(boss, ExportMode::Status).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cells()[0], "Anna");
    assert_eq!(rows[0].cells()[11], "Pending");
    assert_eq!(rows[1].cells()[0], "Bella");
    assert_eq!(rows[1].cells()[11], "Uploaded");
    assert_eq!(rows[1].cells()[10], "1990-04-01");

    let raw = h.state.staff.export_rows(boss, ExportMode::Raw).await.unwrap();
    assert_eq!(raw[0].cells()[11], doc_store::PENDING);
    assert!(raw[1].cells()[11].ends_with(".pdf"));
}

#[tokio::test]
async fn test_statistics_breakdowns() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    for (i, status) in ["Full-time", "Full-time", "Contract", "Intern", "Part-time", "Contract"]
        .iter()
        .enumerate()
    {
        let ni = format!("AA00000{}A", i);
        let input = with(staff_input("Staff", &format!("N{}", i), &ni), "employment_status", status);
        h.state.staff.create(boss, &input, None).await.unwrap();
    }

    let stats = h.state.staff.statistics(boss).await.unwrap();
    assert_eq!(stats.total_staff, 6);
    assert_eq!(stats.employment_status_breakdown["Full-time"], 2);
    assert_eq!(stats.employment_status_breakdown["Contract"], 2);
    assert_eq!(stats.gender_breakdown["Female"], 6);
    assert_eq!(stats.immigration_status_breakdown["Citizen"], 6);
    assert_eq!(stats.recent_staff.len(), 5);
    assert_eq!(stats.recent_staff[0].fields.lastname, "N5");
}

#[tokio::test]
async fn test_create_for_deleted_boss_is_not_found() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;
    h.state.auth.delete_account(boss).await.unwrap();

    let err = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound), "got {:?}", err);
}

#[tokio::test]
async fn test_failed_put_leaves_no_row_behind() {
    let h = Harness::with_store(|inner| Arc::new(RejectingPutStore(inner))).await;
    let boss = h.boss("a@x.com").await;

    let err = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), Some(pdf(b"doc")))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(h.state.staff.list_by_tenant(boss).await.unwrap().is_empty());

    // The number was never claimed, so a retry without the file succeeds.
    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), None)
        .await
        .unwrap();
    assert_eq!(staff.proof_of_id, doc_store::PENDING);
}

#[tokio::test]
async fn test_unrecorded_replacement_keeps_new_document() {
    let h = Harness::new().await;
    let boss = h.boss("a@x.com").await;

    let staff = h
        .state
        .staff
        .create(boss, &staff_input("John", "Smith", "AB123456C"), Some(pdf(b"first")))
        .await
        .unwrap();
    let old_ref = staff.proof_of_id.clone();

    sqlx::query(
        "CREATE TRIGGER freeze_reference BEFORE UPDATE OF proof_of_id ON staff \
         BEGIN SELECT RAISE(ABORT, 'reference column frozen'); END",
    )
    .execute(&h.pool)
    .await
    .unwrap();

    let png = Upload {
        filename: "photo.png".into(),
        data: Bytes::from_static(b"second"),
    };
    assert!(h.state.staff.attach_document(staff.id, boss, png).await.is_err());

    // The old artifact was released by the replace; the new one must survive.
    assert!(!h.uploads().join(&old_ref).exists());
    let new_file = h.uploads().join(format!("tenant_{}_staff_{}_id.png", boss, staff.id));
    assert_eq!(std::fs::read(&new_file).unwrap(), b"second");

    // Once the row accepts writes again a re-upload repairs the record.
    sqlx::query("DROP TRIGGER freeze_reference")
        .execute(&h.pool)
        .await
        .unwrap();
    let retry = Upload {
        filename: "photo.png".into(),
        data: Bytes::from_static(b"third"),
    };
    h.state.staff.attach_document(staff.id, boss, retry).await.unwrap();
    let (_, resolved) = h.state.staff.document(staff.id, boss).await.unwrap();
    assert_eq!(&resolved.data[..], b"third");
}
