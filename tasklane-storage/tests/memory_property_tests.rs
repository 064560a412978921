//! Property-Based Tests for the In-Memory Store
//!
//! Generated users, tasks and memberships go through the same storage trait
//! the API uses. Whatever is written reads back unchanged, uniqueness holds
//! for usernames and member keys, and nullable task fields can be cleared.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tasklane_core::{EntityType, ProjectMemberId, TaskStatus};
use tasklane_storage::{AsyncStorageTrait, TaskFilter, TaskUpdate};
use tasklane_test_utils::assertions::{
    assert_already_exists, assert_err, assert_not_found, assert_ok,
};
use tasklane_test_utils::fixtures::{role_id, seeded_store, SeededStore};
use tasklane_test_utils::generators::{
    arb_due_date, arb_grantable_role_code, arb_new_task, arb_new_user, arb_task_priority,
    arb_task_status,
};

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to build runtime: {}", e)))
}

fn fail(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

/// Ids of the seeded project and its owner, known before any store exists.
/// The fixture inserts five users first, so the project gets id 6.
const PROJECT: i64 = 6;
const OWNER: i64 = 1;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A user reads back as inserted; reusing the username is a conflict.
    #[test]
    fn prop_user_round_trip_and_unique_username(user in arb_new_user()) {
        runtime()?.block_on(async {
            let store = tasklane_storage::InMemoryStorage::new();
            let first = store.user_insert(&user).await;
            assert_ok(&first);
            let created = first.map_err(fail)?;
            prop_assert_eq!(&created.username, &user.username);
            prop_assert_eq!(&created.full_name, &user.full_name);

            let fetched = store.user_get(created.user_id).await.map_err(fail)?;
            prop_assert_eq!(fetched, Some(created));

            let mut twin = user.clone();
            twin.email = format!("twin.{}", user.email);
            let again = store.user_insert(&twin).await;
            assert_err(&again);
            assert_already_exists(&again, EntityType::User);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Tasks read back field for field, and a status filter keeps exactly the
    /// tasks in that status.
    #[test]
    fn prop_task_listing_respects_status_filter(
        tasks in prop::collection::vec(arb_new_task(PROJECT, OWNER), 1..8),
        wanted in arb_task_status(),
    ) {
        runtime()?.block_on(async {
            let SeededStore { storage, project, owner, .. } = seeded_store().await.map_err(fail)?;
            prop_assert_eq!(project.project_id, PROJECT);
            prop_assert_eq!(owner.user_id, OWNER);

            for new in &tasks {
                let task = storage.task_insert(new).await.map_err(fail)?;
                prop_assert_eq!(&task.title, &new.title);
                prop_assert_eq!(&task.description, &new.description);
                prop_assert_eq!(task.status, new.status);
                prop_assert_eq!(task.priority, new.priority);
                prop_assert_eq!(task.due_date, new.due_date);
            }

            let filter = TaskFilter {
                status: Some(wanted),
                ..TaskFilter::for_project(PROJECT)
            };
            let listed = storage.task_list(&filter).await.map_err(fail)?;
            let expected = tasks.iter().filter(|t| t.status == wanted).count();
            prop_assert_eq!(listed.len(), expected);
            prop_assert!(listed.iter().all(|t| t.status == wanted));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Partial updates touch only what they name; `Some(None)` clears.
    #[test]
    fn prop_task_update_sets_and_clears_due_date(
        due_date in arb_due_date(),
        priority in arb_task_priority(),
    ) {
        runtime()?.block_on(async {
            let SeededStore { storage, project, member, .. } = seeded_store().await.map_err(fail)?;
            let task = storage
                .task_insert(&tasklane_storage::NewTask {
                    project_id: project.project_id,
                    title: "Ship it".to_string(),
                    description: Some("Checklist".to_string()),
                    status: TaskStatus::Todo,
                    priority: Default::default(),
                    due_date: None,
                    created_by: member.user_id,
                })
                .await
                .map_err(fail)?;

            let set = TaskUpdate {
                due_date: Some(due_date),
                priority: Some(priority),
                ..Default::default()
            };
            let updated = storage.task_update(task.task_id, &set).await.map_err(fail)?;
            prop_assert_eq!(updated.due_date, due_date);
            prop_assert_eq!(updated.priority, priority);
            prop_assert_eq!(updated.description.as_deref(), Some("Checklist"));

            let clear = TaskUpdate {
                due_date: Some(None),
                ..Default::default()
            };
            let cleared = storage.task_update(task.task_id, &clear).await.map_err(fail)?;
            prop_assert_eq!(cleared.due_date, None);
            prop_assert_eq!(cleared.priority, priority);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Any grantable role can be given to an outsider exactly once.
    #[test]
    fn prop_membership_keeps_granted_role(code in arb_grantable_role_code()) {
        runtime()?.block_on(async {
            let seeded = seeded_store().await.map_err(fail)?;
            let key = ProjectMemberId::new(seeded.project.project_id, seeded.outsider.user_id);

            let joined = seeded.storage.member_insert(key, role_id(code)).await;
            assert_ok(&joined);
            let stored = seeded.storage.member_get(key).await.map_err(fail)?;
            prop_assert_eq!(stored.map(|m| m.role_id), Some(role_id(code)));

            let again = seeded.storage.member_insert(key, role_id(code)).await;
            assert_already_exists(&again, EntityType::ProjectMember);

            let stranger = ProjectMemberId::new(seeded.project.project_id, i64::MAX);
            let missing = seeded.storage.member_insert(stranger, role_id(code)).await;
            assert_not_found(&missing, EntityType::User);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
