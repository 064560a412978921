//! Tasklane Test Utilities
//!
//! Centralized test infrastructure for the Tasklane workspace:
//! - Proptest generators for enums, role reference rows and insert payloads
//! - Builders for insert payloads
//! - Fixtures for common scenarios, including a seeded in-memory store
//! - Custom assertions for Tasklane error variants

// Re-export core types for convenience
pub use tasklane_core::{
    now, CommentId, EntityType, MemberRole, MemberRoleRow, Project, ProjectId, ProjectMember,
    ProjectMemberId, RegistryError, RoleCode, RoleId, StorageError, Task, TaskAssignee,
    TaskAssigneeId, TaskComment, TaskId, TaskPriority, TaskStatus, TasklaneError,
    TasklaneResult, Timestamp, User, UserId, ValidationError,
};
pub use tasklane_storage::{
    default_role_rows, InMemoryStorage, NewComment, NewProject, NewTask, NewUser,
};

use chrono::NaiveDate;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Tasklane types.

    use super::*;
    use proptest::prelude::*;

    // === Field Generators ===

    pub fn arb_due_date() -> impl Strategy<Value = Option<NaiveDate>> {
        prop::option::of((2020i32..2031, 1u32..13, 1u32..29).prop_filter_map(
            "valid calendar date",
            |(year, month, day)| NaiveDate::from_ymd_opt(year, month, day),
        ))
    }

    // === Enum Generators ===

    pub fn arb_role_code() -> impl Strategy<Value = RoleCode> {
        prop::sample::select(RoleCode::ALL.to_vec())
    }

    /// Role codes that can be granted through the member routes.
    pub fn arb_grantable_role_code() -> impl Strategy<Value = RoleCode> {
        prop_oneof![
            Just(RoleCode::Admin),
            Just(RoleCode::Member),
            Just(RoleCode::Viewer),
        ]
    }

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Todo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::InReview),
            Just(TaskStatus::Done),
        ]
    }

    pub fn arb_task_priority() -> impl Strategy<Value = TaskPriority> {
        prop_oneof![
            Just(TaskPriority::Low),
            Just(TaskPriority::Medium),
            Just(TaskPriority::High),
            Just(TaskPriority::Urgent),
        ]
    }

    // === Reference Data Generators ===

    /// Generate a role code in any letter case, as it might be stored.
    pub fn arb_role_code_text() -> impl Strategy<Value = (RoleCode, String)> {
        (arb_role_code(), any::<bool>()).prop_map(|(code, lower)| {
            let text = if lower {
                code.as_db_str().to_ascii_lowercase()
            } else {
                code.as_db_str().to_string()
            };
            (code, text)
        })
    }

    /// Generate a code string that no [`RoleCode`] parses from.
    pub fn arb_unmapped_code() -> impl Strategy<Value = String> {
        "[A-Z_]{1,12}".prop_filter("must not be a known role code", |s| {
            RoleCode::from_db_str(s).is_err()
        })
    }

    /// Generate a set of reference rows: a random subset of the known codes
    /// with unique ids, interleaved with unmapped rows.
    ///
    /// Returns the rows and the codes present among them.
    pub fn arb_role_rows() -> impl Strategy<Value = (Vec<MemberRoleRow>, Vec<RoleCode>)> {
        (
            prop::sample::subsequence(RoleCode::ALL.to_vec(), 0..=RoleCode::ALL.len()),
            prop::collection::vec(arb_unmapped_code(), 0..4),
        )
            .prop_map(|(present, unmapped)| {
                let mut rows = Vec::new();
                let mut next_id = 1;
                let mut unmapped = unmapped.into_iter();
                for code in &present {
                    if let Some(junk) = unmapped.next() {
                        rows.push(MemberRoleRow::new(next_id, junk));
                        next_id += 1;
                    }
                    rows.push(MemberRoleRow::new(next_id, code.as_db_str()));
                    next_id += 1;
                }
                for junk in unmapped {
                    rows.push(MemberRoleRow::new(next_id, junk));
                    next_id += 1;
                }
                (rows, present)
            })
    }

    // === Entity Generators ===

    /// Generate a username that passes API validation.
    pub fn arb_username() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_.-]{2,20}"
    }

    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9]{0,10}", "[a-z]{2,10}").prop_map(|(local, domain)| {
            format!("{}@{}.dev", local, domain)
        })
    }

    pub fn arb_new_user() -> impl Strategy<Value = NewUser> {
        (arb_username(), arb_email(), prop::option::of("[A-Z][a-z]{1,10} [A-Z][a-z]{1,10}"))
            .prop_map(|(username, email, full_name)| NewUser {
                username,
                email,
                full_name,
            })
    }

    pub fn arb_new_task(project_id: ProjectId, created_by: UserId) -> impl Strategy<Value = NewTask> {
        (
            "[A-Za-z][A-Za-z ]{0,40}",
            prop::option::of("[a-z ]{0,80}"),
            arb_task_status(),
            arb_task_priority(),
            arb_due_date(),
        )
            .prop_map(move |(title, description, status, priority, due_date)| NewTask {
                project_id,
                title,
                description,
                status,
                priority,
                due_date,
                created_by,
            })
    }
}

// ============================================================================
// TEST-DATA BUILDERS
// ============================================================================

pub mod builders {
    //! Insert payloads with sensible defaults; override only what a test cares about.

    use super::*;

    /// Builder for [`NewUser`]. The email is derived from the username.
    #[derive(Debug, Clone)]
    pub struct UserBuilder {
        username: String,
        email: String,
        full_name: Option<String>,
    }

    impl UserBuilder {
        pub fn new(username: impl Into<String>) -> Self {
            let username = username.into();
            Self {
                email: format!("{}@example.com", username),
                username,
                full_name: None,
            }
        }

        pub fn email(mut self, email: impl Into<String>) -> Self {
            self.email = email.into();
            self
        }

        pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
            self.full_name = Some(full_name.into());
            self
        }

        pub fn into_new(self) -> NewUser {
            NewUser {
                username: self.username,
                email: self.email,
                full_name: self.full_name,
            }
        }
    }

    /// Builder for [`NewProject`].
    #[derive(Debug, Clone)]
    pub struct ProjectBuilder {
        name: String,
        description: Option<String>,
        owner_id: UserId,
    }

    impl ProjectBuilder {
        pub fn new(owner_id: UserId) -> Self {
            Self {
                name: "Test Project".to_string(),
                description: None,
                owner_id,
            }
        }

        pub fn name(mut self, name: impl Into<String>) -> Self {
            self.name = name.into();
            self
        }

        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.description = Some(description.into());
            self
        }

        pub fn into_new(self) -> NewProject {
            NewProject {
                name: self.name,
                description: self.description,
                owner_id: self.owner_id,
            }
        }
    }

    /// Builder for [`NewTask`].
    #[derive(Debug, Clone)]
    pub struct TaskBuilder {
        project_id: ProjectId,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        priority: TaskPriority,
        due_date: Option<NaiveDate>,
        created_by: UserId,
    }

    impl TaskBuilder {
        pub fn new(project_id: ProjectId, created_by: UserId) -> Self {
            Self {
                project_id,
                title: "Test Task".to_string(),
                description: None,
                status: TaskStatus::default(),
                priority: TaskPriority::default(),
                due_date: None,
                created_by,
            }
        }

        pub fn title(mut self, title: impl Into<String>) -> Self {
            self.title = title.into();
            self
        }

        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.description = Some(description.into());
            self
        }

        pub fn status(mut self, status: TaskStatus) -> Self {
            self.status = status;
            self
        }

        pub fn priority(mut self, priority: TaskPriority) -> Self {
            self.priority = priority;
            self
        }

        pub fn due_date(mut self, due_date: NaiveDate) -> Self {
            self.due_date = Some(due_date);
            self
        }

        pub fn into_new(self) -> NewTask {
            NewTask {
                project_id: self.project_id,
                title: self.title,
                description: self.description,
                status: self.status,
                priority: self.priority,
                due_date: self.due_date,
                created_by: self.created_by,
            }
        }
    }

    /// Builder for [`NewComment`].
    #[derive(Debug, Clone)]
    pub struct CommentBuilder {
        task_id: TaskId,
        author_id: UserId,
        content: String,
    }

    impl CommentBuilder {
        pub fn new(task_id: TaskId, author_id: UserId) -> Self {
            Self {
                task_id,
                author_id,
                content: "Looks good to me".to_string(),
            }
        }

        pub fn content(mut self, content: impl Into<String>) -> Self {
            self.content = content.into();
            self
        }

        pub fn into_new(self) -> NewComment {
            NewComment {
                task_id: self.task_id,
                author_id: self.author_id,
                content: self.content,
            }
        }
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::builders::{ProjectBuilder, UserBuilder};
    use super::*;
    use tasklane_storage::AsyncStorageTrait;

    /// Role id of `code` in the default seeded reference data.
    pub fn role_id(code: RoleCode) -> RoleId {
        match code {
            RoleCode::Owner => 1,
            RoleCode::Admin => 2,
            RoleCode::Member => 3,
            RoleCode::Viewer => 4,
        }
    }

    /// The scenario table holding only OWNER and MEMBER.
    pub fn partial_role_rows() -> Vec<MemberRoleRow> {
        vec![
            MemberRoleRow::new(1, RoleCode::Owner.as_db_str()),
            MemberRoleRow::new(2, RoleCode::Member.as_db_str()),
        ]
    }

    /// A store populated with one project and a user per role.
    pub struct SeededStore {
        pub storage: InMemoryStorage,
        pub project: Project,
        pub owner: User,
        pub admin: User,
        pub member: User,
        pub viewer: User,
        /// A user with no membership in the project.
        pub outsider: User,
    }

    /// Build a [`SeededStore`] over a fresh in-memory store with default roles.
    pub async fn seeded_store() -> TasklaneResult<SeededStore> {
        let storage = InMemoryStorage::new();

        let owner = storage.user_insert(&UserBuilder::new("owner").into_new()).await?;
        let admin = storage.user_insert(&UserBuilder::new("admin").into_new()).await?;
        let member = storage.user_insert(&UserBuilder::new("member").into_new()).await?;
        let viewer = storage.user_insert(&UserBuilder::new("viewer").into_new()).await?;
        let outsider = storage
            .user_insert(&UserBuilder::new("outsider").into_new())
            .await?;

        let project = storage
            .project_insert(
                &ProjectBuilder::new(owner.user_id).into_new(),
                role_id(RoleCode::Owner),
            )
            .await?;

        for (user, code) in [
            (&admin, RoleCode::Admin),
            (&member, RoleCode::Member),
            (&viewer, RoleCode::Viewer),
        ] {
            storage
                .member_insert(
                    ProjectMemberId::new(project.project_id, user.user_id),
                    role_id(code),
                )
                .await?;
        }

        Ok(SeededStore {
            storage,
            project,
            owner,
            admin,
            member,
            viewer,
            outsider,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertions for Tasklane-specific validation.

    use super::*;

    /// Assert that a TasklaneResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &TasklaneResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a TasklaneResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &TasklaneResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a TasklaneResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &TasklaneResult<T>, entity_type: EntityType) {
        match result {
            Err(TasklaneError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a TasklaneResult is an AlreadyExists storage error.
    #[track_caller]
    pub fn assert_already_exists<T: std::fmt::Debug>(
        result: &TasklaneResult<T>,
        entity_type: EntityType,
    ) {
        match result {
            Err(TasklaneError::Storage(StorageError::AlreadyExists { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in AlreadyExists error");
            }
            other => panic!(
                "Expected AlreadyExists error for {:?}, got: {:?}",
                entity_type, other
            ),
        }
    }

    /// Assert that a registry lookup failed for exactly `code`.
    #[track_caller]
    pub fn assert_role_not_found<T: std::fmt::Debug>(
        result: &Result<T, RegistryError>,
        code: RoleCode,
    ) {
        match result {
            Err(RegistryError::RoleNotFound { code: missing }) => {
                assert_eq!(*missing, code, "Wrong code in RoleNotFound error");
            }
            other => panic!("Expected RoleNotFound for {}, got: {:?}", code, other),
        }
    }

    /// Assert that a cached role carries the code it was looked up by.
    #[track_caller]
    pub fn assert_role_code(role: &MemberRole, code: RoleCode) {
        assert_eq!(
            role.code, code,
            "Role {} cached under the wrong code",
            role.role_id
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
