//! Integration tests for the `PostgreSQL` employee repository.
//!
//! These tests require a disposable `PostgreSQL` database named by
//! `SATCHEL_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p satchel-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use satchel::db::{
    Directory, EmployeeRepository, PgEmployeeRepository, ProfileField, RepositoryError,
};
use satchel_core::{Email, Employee, EmployeeId};
use satchel_integration_tests::{sample_employee, test_pool, unique_email};

async fn repo() -> PgEmployeeRepository {
    PgEmployeeRepository::new(test_pool().await)
}

async fn reflection_rows(repo: &PgEmployeeRepository, employee_id: EmployeeId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reflections WHERE employee_id = $1")
        .bind(employee_id)
        .fetch_one(repo.pool())
        .await
        .unwrap()
}

// ============================================================================
// Save & Load
// ============================================================================

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_save_and_load_round_trip() {
    let repo = repo().await;
    let employee = sample_employee("roundtrip");

    let saved = repo.save_employee(&employee).await.unwrap();
    assert!(saved.id.is_some());
    assert!(saved.reflections.iter().all(|r| r.id.is_some()));
    assert!(saved.reflections.iter().all(|r| r.employee_id == saved.id));

    let loaded = repo.get_employee_by_email(&employee.email).await.unwrap();
    assert_eq!(loaded, saved);

    let keys: Vec<_> = loaded.reflections.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["Coverage", "Flakiness"]);

    let roster = repo.get_employees().await.unwrap();
    let listed = roster.iter().find(|e| e.email == employee.email).unwrap();
    assert!(listed.reflections.is_empty());
    assert!(roster.windows(2).all(|w| w[0].roster_cmp(&w[1]).is_le()));
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_update_replaces_reflections() {
    let repo = repo().await;
    let mut saved = repo
        .save_employee(&sample_employee("update"))
        .await
        .unwrap();
    let kept_id = saved.reflections[0].id;

    saved.position = "Lead Tester".to_string();
    saved.reflections.remove(1);
    saved.reflections[0].value = "total".to_string();
    saved.add_reflection("Speed", "fast");

    let updated = repo.save_employee(&saved).await.unwrap();
    assert_eq!(updated.id, saved.id);

    let loaded = repo.get_employee_by_email(&saved.email).await.unwrap();
    assert_eq!(loaded.position, "Lead Tester");
    assert_eq!(loaded.reflections.len(), 2);
    assert_eq!(loaded.reflections[0].id, kept_id);
    assert_eq!(loaded.reflections[0].value, "total");
    assert_eq!(loaded.reflections[1].key, "Speed");
    assert_eq!(reflection_rows(&repo, saved.id.unwrap()).await, 2);
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_duplicate_email_conflicts() {
    let repo = repo().await;
    let first = sample_employee("conflict");
    repo.save_employee(&first).await.unwrap();

    let second = Employee::new("Someone Else", first.email.clone());
    let err = repo.save_employee(&second).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_save_with_unused_id_inserts() {
    let repo = repo().await;
    let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM employees")
        .fetch_one(repo.pool())
        .await
        .unwrap();

    let mut employee = sample_employee("explicit-id");
    employee.id = Some(EmployeeId::new(max + 1_000));
    let saved = repo.save_employee(&employee).await.unwrap();
    assert_eq!(saved.id, employee.id);

    // The sequence moved past the explicit id.
    let next = repo
        .save_employee(&sample_employee("after-explicit"))
        .await
        .unwrap();
    assert!(next.id.unwrap() > saved.id.unwrap());
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_delete_employee_cascades() {
    let repo = repo().await;
    let saved = repo
        .save_employee(&sample_employee("cascade"))
        .await
        .unwrap();
    let id = saved.id.unwrap();
    assert_eq!(reflection_rows(&repo, id).await, 2);

    repo.delete_employee(&saved.email).await.unwrap();

    assert!(matches!(
        repo.get_employee_by_email(&saved.email).await,
        Err(RepositoryError::NotFound)
    ));
    assert_eq!(reflection_rows(&repo, id).await, 0);

    assert!(matches!(
        repo.delete_employee(&saved.email).await,
        Err(RepositoryError::NotFound)
    ));
}

// ============================================================================
// Reflections
// ============================================================================

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_append_reflection() {
    let repo = repo().await;
    let saved = repo
        .save_employee(&sample_employee("append"))
        .await
        .unwrap();

    let added = repo
        .append_reflection(saved.id.unwrap(), "Coverage", "again")
        .await
        .unwrap();
    assert!(added.id.is_some());
    assert_eq!(added.employee_id, saved.id);

    let loaded = repo.get_employee_by_email(&saved.email).await.unwrap();
    assert_eq!(loaded.reflections.len(), 3);
    assert_eq!(loaded.reflections[2], added);

    let missing = EmployeeId::new(i64::MAX);
    assert!(matches!(
        repo.append_reflection(missing, "k", "v").await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_directory_guards_reflection_ownership() {
    let repo = Arc::new(repo().await);
    let directory = Directory::new(repo.clone());

    let owner = repo
        .save_employee(&sample_employee("owner"))
        .await
        .unwrap();
    let other = repo
        .save_employee(&sample_employee("other"))
        .await
        .unwrap();
    let theirs = owner.reflections[0].id.unwrap();

    let err = directory
        .delete_reflection(&other.email, theirs)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ReflectionNotFound));
    assert!(
        directory
            .get_employee_by_email(&owner.email)
            .await
            .unwrap()
            .reflection(theirs)
            .is_some()
    );

    directory
        .delete_reflection(&owner.email, theirs)
        .await
        .unwrap();
    let loaded = directory.get_employee_by_email(&owner.email).await.unwrap();
    assert!(loaded.reflection(theirs).is_none());
    assert_eq!(loaded.reflections.len(), 1);
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_directory_profile_edits() {
    let directory = Directory::new(Arc::new(repo().await));
    let saved = directory
        .save_employee(&sample_employee("edits"))
        .await
        .unwrap();

    directory
        .save_position(&saved.email, "Principal Tester")
        .await
        .unwrap();
    let updated = directory
        .save_bio(&saved.email, "Still testing.")
        .await
        .unwrap();
    assert_eq!(updated.position, "Principal Tester");
    assert_eq!(updated.bio, "Still testing.");
    assert_eq!(updated.reflections, saved.reflections);

    let stranger: Email = unique_email("stranger");
    assert!(matches!(
        directory.save_bio(&stranger, "x").await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires SATCHEL_TEST_DATABASE_URL"]
async fn test_update_profile_keeps_reflections_added_since_load() {
    let repo = repo().await;
    let stale = repo.save_employee(&sample_employee("stale")).await.unwrap();
    let id = stale.id.unwrap();

    let added = repo.append_reflection(id, "late", "arrival").await.unwrap();
    let removed = stale.reflections[0].id.unwrap();
    repo.delete_reflection(removed).await.unwrap();

    let updated = repo
        .update_profile(&stale.email, ProfileField::Bio("Edited from an old page."))
        .await
        .unwrap();
    assert_eq!(updated.bio, "Edited from an old page.");
    assert!(updated.reflection(added.id.unwrap()).is_some());
    assert!(updated.reflection(removed).is_none());
    assert_eq!(
        reflection_rows(&repo, id).await,
        i64::try_from(updated.reflections.len()).unwrap()
    );
}
