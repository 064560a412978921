//! In-memory storage backend.
//!
//! Used by tests and by `TASKLANE_STORAGE=memory`. All tables sit behind one
//! `RwLock`, so multi-table writes such as cascading deletes are atomic.

use crate::{
    default_role_rows, AsyncStorageTrait, NewComment, NewProject, NewTask, NewUser,
    ProjectUpdate, RoleSource, TaskFilter, TaskUpdate,
};
use ::async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tasklane_core::{
    now, CommentId, EntityId, EntityType, MemberRoleRow, Project, ProjectId, ProjectMember,
    ProjectMemberId, RoleId, StorageError, Task, TaskAssignee, TaskAssigneeId, TaskComment,
    TaskId, TasklaneError, TasklaneResult, User, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    roles: Vec<MemberRoleRow>,
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    members: HashMap<ProjectMemberId, ProjectMember>,
    tasks: HashMap<TaskId, Task>,
    assignees: HashMap<TaskAssigneeId, TaskAssignee>,
    comments: HashMap<CommentId, TaskComment>,
}

impl Tables {
    fn require_user(&self, id: UserId) -> TasklaneResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::not_found(EntityType::User, id).into())
        }
    }

    fn require_project(&self, id: ProjectId) -> TasklaneResult<()> {
        if self.projects.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::not_found(EntityType::Project, id).into())
        }
    }

    fn require_task(&self, id: TaskId) -> TasklaneResult<&Task> {
        self.tasks
            .get(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Task, id).into())
    }

    fn require_role(&self, id: RoleId) -> TasklaneResult<()> {
        if self.roles.iter().any(|row| row.role_id == id) {
            Ok(())
        } else {
            Err(StorageError::not_found(EntityType::MemberRole, id).into())
        }
    }

    fn remove_tasks_where(&mut self, predicate: impl Fn(&Task) -> bool) {
        let removed: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|task| predicate(task))
            .map(|task| task.task_id)
            .collect();
        for task_id in &removed {
            self.tasks.remove(task_id);
        }
        self.assignees.retain(|key, _| !removed.contains(&key.task_id()));
        self.comments
            .retain(|_, comment| !removed.contains(&comment.task_id));
    }
}

/// In-memory implementation of [`AsyncStorageTrait`].
#[derive(Debug)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a store seeded with the default member roles.
    pub fn new() -> Self {
        Self::with_roles(default_role_rows())
    }

    /// Create a store seeded with the given `member_roles` rows.
    pub fn with_roles(roles: Vec<MemberRoleRow>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                roles,
                ..Tables::default()
            }),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> EntityId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn read(&self) -> TasklaneResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| TasklaneError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> TasklaneResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| TasklaneError::Storage(StorageError::LockPoisoned))
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.read().map(|t| t.users.len()).unwrap_or(0)
    }

    /// Number of stored tasks.
    pub fn task_count(&self) -> usize {
        self.read().map(|t| t.tasks.len()).unwrap_or(0)
    }
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl RoleSource for InMemoryStorage {
    async fn member_role_list(&self) -> TasklaneResult<Vec<MemberRoleRow>> {
        Ok(self.read()?.roles.clone())
    }
}

#[async_trait]
impl AsyncStorageTrait for InMemoryStorage {
    // === User Operations ===

    async fn user_insert(&self, user: &NewUser) -> TasklaneResult<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::already_exists(EntityType::User, &user.username).into());
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StorageError::already_exists(EntityType::User, &user.email).into());
        }

        let created = User {
            user_id: self.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            created_at: now(),
        };
        tables.users.insert(created.user_id, created.clone());
        Ok(created)
    }

    async fn user_get(&self, id: UserId) -> TasklaneResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_list(&self, limit: i64, offset: i64) -> TasklaneResult<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by_key(|u| u.user_id);
        Ok(paginate(users, limit, offset))
    }

    // === Project Operations ===

    async fn project_insert(
        &self,
        project: &NewProject,
        owner_role_id: RoleId,
    ) -> TasklaneResult<Project> {
        let mut tables = self.write()?;
        tables.require_user(project.owner_id)?;
        tables.require_role(owner_role_id)?;

        let ts = now();
        let created = Project {
            project_id: self.next_id(),
            name: project.name.clone(),
            description: project.description.clone(),
            owner_id: project.owner_id,
            created_at: ts,
            updated_at: ts,
        };
        let owner = ProjectMember {
            id: ProjectMemberId::new(created.project_id, project.owner_id),
            role_id: owner_role_id,
            joined_at: ts,
        };
        tables.projects.insert(created.project_id, created.clone());
        tables.members.insert(owner.id, owner);
        Ok(created)
    }

    async fn project_get(&self, id: ProjectId) -> TasklaneResult<Option<Project>> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn project_list_for_user(&self, user_id: UserId) -> TasklaneResult<Vec<Project>> {
        let tables = self.read()?;
        let mut projects: Vec<Project> = tables
            .members
            .keys()
            .filter(|key| key.user_id() == user_id)
            .filter_map(|key| tables.projects.get(&key.project_id()).cloned())
            .collect();
        projects.sort_by_key(|p| p.project_id);
        Ok(projects)
    }

    async fn project_update(
        &self,
        id: ProjectId,
        update: &ProjectUpdate,
    ) -> TasklaneResult<Project> {
        let mut tables = self.write()?;
        let project = tables
            .projects
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Project, id))?;

        if let Some(name) = &update.name {
            project.name = name.clone();
        }
        if let Some(description) = &update.description {
            project.description = description.clone();
        }
        project.updated_at = now();
        Ok(project.clone())
    }

    async fn project_delete(&self, id: ProjectId) -> TasklaneResult<()> {
        let mut tables = self.write()?;
        if tables.projects.remove(&id).is_none() {
            return Err(StorageError::not_found(EntityType::Project, id).into());
        }
        tables.members.retain(|key, _| key.project_id() != id);
        tables.remove_tasks_where(|task| task.project_id == id);
        Ok(())
    }

    // === Member Operations ===

    async fn member_insert(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember> {
        let mut tables = self.write()?;
        tables.require_project(id.project_id())?;
        tables.require_user(id.user_id())?;
        tables.require_role(role_id)?;
        if tables.members.contains_key(&id) {
            return Err(StorageError::already_exists(EntityType::ProjectMember, id).into());
        }

        let member = ProjectMember {
            id,
            role_id,
            joined_at: now(),
        };
        tables.members.insert(id, member.clone());
        Ok(member)
    }

    async fn member_get(&self, id: ProjectMemberId) -> TasklaneResult<Option<ProjectMember>> {
        Ok(self.read()?.members.get(&id).cloned())
    }

    async fn member_list(&self, project_id: ProjectId) -> TasklaneResult<Vec<ProjectMember>> {
        let mut members: Vec<ProjectMember> = self
            .read()?
            .members
            .values()
            .filter(|m| m.project_id() == project_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn member_update_role(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember> {
        let mut tables = self.write()?;
        tables.require_role(role_id)?;
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::ProjectMember, id))?;
        member.role_id = role_id;
        Ok(member.clone())
    }

    async fn member_delete(&self, id: ProjectMemberId) -> TasklaneResult<Vec<TaskAssigneeId>> {
        let mut tables = self.write()?;
        if tables.members.remove(&id).is_none() {
            return Err(StorageError::not_found(EntityType::ProjectMember, id).into());
        }
        let mut dropped: Vec<TaskAssigneeId> = tables
            .tasks
            .values()
            .filter(|task| task.project_id == id.project_id())
            .map(|task| TaskAssigneeId::new(task.task_id, id.user_id()))
            .filter(|key| tables.assignees.contains_key(key))
            .collect();
        dropped.sort_by_key(|key| key.task_id());
        for key in &dropped {
            tables.assignees.remove(key);
        }
        Ok(dropped)
    }

    // === Task Operations ===

    async fn task_insert(&self, task: &NewTask) -> TasklaneResult<Task> {
        let mut tables = self.write()?;
        tables.require_project(task.project_id)?;
        tables.require_user(task.created_by)?;

        let ts = now();
        let created = Task {
            task_id: self.next_id(),
            project_id: task.project_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_by: task.created_by,
            created_at: ts,
            updated_at: ts,
        };
        tables.tasks.insert(created.task_id, created.clone());
        Ok(created)
    }

    async fn task_get(&self, id: TaskId) -> TasklaneResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn task_list(&self, filter: &TaskFilter) -> TasklaneResult<Vec<Task>> {
        let tables = self.read()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == filter.project_id)
            .filter(|t| filter.status.map_or(true, |status| t.status == status))
            .filter(|t| {
                filter.assignee_id.map_or(true, |user_id| {
                    tables
                        .assignees
                        .contains_key(&TaskAssigneeId::new(t.task_id, user_id))
                })
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.task_id);
        Ok(paginate(tasks, filter.limit, filter.offset))
    }

    async fn task_update(&self, id: TaskId, update: &TaskUpdate) -> TasklaneResult<Task> {
        let mut tables = self.write()?;
        let task = tables
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Task, id))?;

        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = description.clone();
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = due_date;
        }
        task.updated_at = now();
        Ok(task.clone())
    }

    async fn task_delete(&self, id: TaskId) -> TasklaneResult<()> {
        let mut tables = self.write()?;
        tables.require_task(id)?;
        tables.remove_tasks_where(|task| task.task_id == id);
        Ok(())
    }

    // === Assignee Operations ===

    async fn assignee_insert(&self, id: TaskAssigneeId) -> TasklaneResult<TaskAssignee> {
        let mut tables = self.write()?;
        tables.require_task(id.task_id())?;
        tables.require_user(id.user_id())?;
        if tables.assignees.contains_key(&id) {
            return Err(StorageError::already_exists(EntityType::TaskAssignee, id).into());
        }

        let assignee = TaskAssignee {
            id,
            assigned_at: now(),
        };
        tables.assignees.insert(id, assignee.clone());
        Ok(assignee)
    }

    async fn assignee_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskAssignee>> {
        let mut assignees: Vec<TaskAssignee> = self
            .read()?
            .assignees
            .values()
            .filter(|a| a.task_id() == task_id)
            .cloned()
            .collect();
        assignees.sort_by_key(|a| a.id);
        Ok(assignees)
    }

    async fn assignee_delete(&self, id: TaskAssigneeId) -> TasklaneResult<()> {
        match self.write()?.assignees.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(EntityType::TaskAssignee, id).into()),
        }
    }

    // === Comment Operations ===

    async fn comment_insert(&self, comment: &NewComment) -> TasklaneResult<TaskComment> {
        let mut tables = self.write()?;
        tables.require_task(comment.task_id)?;
        tables.require_user(comment.author_id)?;

        let ts = now();
        let created = TaskComment {
            comment_id: self.next_id(),
            task_id: comment.task_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: ts,
            updated_at: ts,
        };
        tables.comments.insert(created.comment_id, created.clone());
        Ok(created)
    }

    async fn comment_get(&self, id: CommentId) -> TasklaneResult<Option<TaskComment>> {
        Ok(self.read()?.comments.get(&id).cloned())
    }

    async fn comment_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskComment>> {
        let mut comments: Vec<TaskComment> = self
            .read()?
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.comment_id);
        Ok(comments)
    }

    async fn comment_delete(&self, id: CommentId) -> TasklaneResult<()> {
        match self.write()?.comments.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(EntityType::TaskComment, id).into()),
        }
    }

    // === Health ===

    async fn health_check(&self) -> TasklaneResult<bool> {
        Ok(self.tables.read().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoleRegistry;
    use tasklane_core::{RoleCode, TaskPriority, TaskStatus};

    const OWNER: RoleId = 1;
    const MEMBER: RoleId = 3;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            full_name: None,
        }
    }

    fn new_task(project_id: ProjectId, created_by: UserId, title: &str) -> NewTask {
        NewTask {
            project_id,
            title: title.to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            created_by,
        }
    }

    async fn seed_project(storage: &InMemoryStorage) -> (User, Project) {
        let owner = storage.user_insert(&new_user("alice")).await.unwrap();
        let project = storage
            .project_insert(
                &NewProject {
                    name: "Apollo".to_string(),
                    description: None,
                    owner_id: owner.user_id,
                },
                OWNER,
            )
            .await
            .unwrap();
        (owner, project)
    }

    fn is_not_found(err: &TasklaneError) -> bool {
        matches!(err, TasklaneError::Storage(StorageError::NotFound { .. }))
    }

    fn is_already_exists(err: &TasklaneError) -> bool {
        matches!(err, TasklaneError::Storage(StorageError::AlreadyExists { .. }))
    }

    // ========================================================================
    // User Tests
    // ========================================================================

    #[tokio::test]
    async fn test_user_insert_get() {
        let storage = InMemoryStorage::new();
        let user = storage.user_insert(&new_user("alice")).await.unwrap();

        let retrieved = storage.user_get(user.user_id).await.unwrap();
        assert_eq!(retrieved, Some(user));
        assert_eq!(storage.user_count(), 1);
    }

    #[tokio::test]
    async fn test_user_insert_duplicate_username() {
        let storage = InMemoryStorage::new();
        storage.user_insert(&new_user("alice")).await.unwrap();

        let mut dup = new_user("alice");
        dup.email = "other@example.com".to_string();
        let err = storage.user_insert(&dup).await.unwrap_err();
        assert!(is_already_exists(&err));
    }

    #[tokio::test]
    async fn test_user_list_paginates_in_id_order() {
        let storage = InMemoryStorage::new();
        for name in ["ann", "bob", "cat"] {
            storage.user_insert(&new_user(name)).await.unwrap();
        }

        let page = storage.user_list(2, 1).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["bob", "cat"]);
    }

    // ========================================================================
    // Project & Member Tests
    // ========================================================================

    #[tokio::test]
    async fn test_project_insert_adds_owner_member() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;

        let member = storage
            .member_get(ProjectMemberId::new(project.project_id, owner.user_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.role_id, OWNER);

        let projects = storage.project_list_for_user(owner.user_id).await.unwrap();
        assert_eq!(projects, vec![project]);
    }

    #[tokio::test]
    async fn test_project_insert_requires_owner() {
        let storage = InMemoryStorage::new();
        let err = storage
            .project_insert(
                &NewProject {
                    name: "Orphan".to_string(),
                    description: None,
                    owner_id: 999,
                },
                OWNER,
            )
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_project_update() {
        let storage = InMemoryStorage::new();
        let (_, project) = seed_project(&storage).await;

        let updated = storage
            .project_update(
                project.project_id,
                &ProjectUpdate {
                    description: Some(Some("Moonshot".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Apollo");
        assert_eq!(updated.description.as_deref(), Some("Moonshot"));
        assert!(updated.updated_at >= project.updated_at);

        let renamed = storage
            .project_update(
                project.project_id,
                &ProjectUpdate {
                    name: Some("Artemis".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.description.as_deref(), Some("Moonshot"));
    }

    #[tokio::test]
    async fn test_update_clears_nullable_fields() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let due = chrono::NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        let task = storage
            .task_insert(&NewTask {
                description: Some("Sketch first".to_string()),
                due_date: Some(due),
                ..new_task(project.project_id, owner.user_id, "Draft")
            })
            .await
            .unwrap();

        let cleared = storage
            .task_update(
                task.task_id,
                &TaskUpdate {
                    description: Some(None),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.title, "Draft");
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.due_date, None);

        let described = ProjectUpdate {
            description: Some(Some("Moonshot".to_string())),
            ..Default::default()
        };
        storage.project_update(project.project_id, &described).await.unwrap();
        let project = storage
            .project_update(
                project.project_id,
                &ProjectUpdate {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(project.name, "Apollo");
        assert_eq!(project.description, None);
    }

    #[tokio::test]
    async fn test_member_insert_duplicate_key() {
        let storage = InMemoryStorage::new();
        let (_, project) = seed_project(&storage).await;
        let bob = storage.user_insert(&new_user("bob")).await.unwrap();

        let key = ProjectMemberId::new(project.project_id, bob.user_id);
        storage.member_insert(key, MEMBER).await.unwrap();
        let err = storage
            .member_insert(ProjectMemberId::new(project.project_id, bob.user_id), MEMBER)
            .await
            .unwrap_err();
        assert!(is_already_exists(&err));
        assert_eq!(storage.member_list(project.project_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_member_insert_rejects_unknown_role() {
        let storage = InMemoryStorage::new();
        let (_, project) = seed_project(&storage).await;
        let bob = storage.user_insert(&new_user("bob")).await.unwrap();

        let err = storage
            .member_insert(ProjectMemberId::new(project.project_id, bob.user_id), 42)
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_member_update_role() {
        let storage = InMemoryStorage::new();
        let (_, project) = seed_project(&storage).await;
        let bob = storage.user_insert(&new_user("bob")).await.unwrap();
        let key = ProjectMemberId::new(project.project_id, bob.user_id);
        storage.member_insert(key, MEMBER).await.unwrap();

        let updated = storage.member_update_role(key, 4).await.unwrap();
        assert_eq!(updated.role_id, 4);
    }

    #[tokio::test]
    async fn test_member_delete_drops_assignments_in_project() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let bob = storage.user_insert(&new_user("bob")).await.unwrap();
        let key = ProjectMemberId::new(project.project_id, bob.user_id);
        storage.member_insert(key, MEMBER).await.unwrap();

        let task = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Launch"))
            .await
            .unwrap();
        storage
            .assignee_insert(TaskAssigneeId::new(task.task_id, bob.user_id))
            .await
            .unwrap();

        let other = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Unassigned"))
            .await
            .unwrap();

        let dropped = storage.member_delete(key).await.unwrap();
        assert_eq!(dropped, vec![TaskAssigneeId::new(task.task_id, bob.user_id)]);
        assert!(storage.assignee_list(task.task_id).await.unwrap().is_empty());
        assert!(storage.assignee_list(other.task_id).await.unwrap().is_empty());
        assert!(storage.member_get(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_project_delete_cascades() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let task = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Launch"))
            .await
            .unwrap();
        storage
            .comment_insert(&NewComment {
                task_id: task.task_id,
                author_id: owner.user_id,
                content: "Go".to_string(),
            })
            .await
            .unwrap();

        storage.project_delete(project.project_id).await.unwrap();

        assert!(storage.project_get(project.project_id).await.unwrap().is_none());
        assert!(storage.member_list(project.project_id).await.unwrap().is_empty());
        assert!(storage.task_get(task.task_id).await.unwrap().is_none());
        assert!(storage.comment_list(task.task_id).await.unwrap().is_empty());
        assert_eq!(storage.task_count(), 0);

        let err = storage.project_delete(project.project_id).await.unwrap_err();
        assert!(is_not_found(&err));
    }

    // ========================================================================
    // Task Tests
    // ========================================================================

    #[tokio::test]
    async fn test_task_list_filters() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;

        let t1 = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "One"))
            .await
            .unwrap();
        let mut done = new_task(project.project_id, owner.user_id, "Two");
        done.status = TaskStatus::Done;
        let t2 = storage.task_insert(&done).await.unwrap();
        storage
            .assignee_insert(TaskAssigneeId::new(t2.task_id, owner.user_id))
            .await
            .unwrap();

        let all = storage
            .task_list(&TaskFilter::for_project(project.project_id))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_id, t1.task_id);

        let mut filter = TaskFilter::for_project(project.project_id);
        filter.status = Some(TaskStatus::Done);
        let done_tasks = storage.task_list(&filter).await.unwrap();
        assert_eq!(done_tasks.len(), 1);
        assert_eq!(done_tasks[0].task_id, t2.task_id);

        let mut filter = TaskFilter::for_project(project.project_id);
        filter.assignee_id = Some(owner.user_id);
        let assigned = storage.task_list(&filter).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].task_id, t2.task_id);
    }

    #[tokio::test]
    async fn test_task_update() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let task = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Draft"))
            .await
            .unwrap();

        let updated = storage
            .task_update(
                task.task_id,
                &TaskUpdate {
                    status: Some(TaskStatus::InProgress),
                    priority: Some(TaskPriority::Urgent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.priority, TaskPriority::Urgent);

        let err = storage
            .task_update(999, &TaskUpdate::default())
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_task_insert_requires_project() {
        let storage = InMemoryStorage::new();
        let user = storage.user_insert(&new_user("alice")).await.unwrap();
        let err = storage
            .task_insert(&new_task(999, user.user_id, "Nowhere"))
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    // ========================================================================
    // Assignee & Comment Tests
    // ========================================================================

    #[tokio::test]
    async fn test_assignee_insert_duplicate_key() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let task = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Launch"))
            .await
            .unwrap();

        storage
            .assignee_insert(TaskAssigneeId::new(task.task_id, owner.user_id))
            .await
            .unwrap();
        let err = storage
            .assignee_insert(TaskAssigneeId::new(task.task_id, owner.user_id))
            .await
            .unwrap_err();
        assert!(is_already_exists(&err));

        storage
            .assignee_delete(TaskAssigneeId::new(task.task_id, owner.user_id))
            .await
            .unwrap();
        assert!(storage.assignee_list(task.task_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let storage = InMemoryStorage::new();
        let (owner, project) = seed_project(&storage).await;
        let task = storage
            .task_insert(&new_task(project.project_id, owner.user_id, "Launch"))
            .await
            .unwrap();

        let first = storage
            .comment_insert(&NewComment {
                task_id: task.task_id,
                author_id: owner.user_id,
                content: "first".to_string(),
            })
            .await
            .unwrap();
        let second = storage
            .comment_insert(&NewComment {
                task_id: task.task_id,
                author_id: owner.user_id,
                content: "second".to_string(),
            })
            .await
            .unwrap();

        let comments = storage.comment_list(task.task_id).await.unwrap();
        assert_eq!(comments, vec![first.clone(), second]);

        storage.comment_delete(first.comment_id).await.unwrap();
        assert!(storage.comment_get(first.comment_id).await.unwrap().is_none());
        let err = storage.comment_delete(first.comment_id).await.unwrap_err();
        assert!(is_not_found(&err));
    }

    // ========================================================================
    // Role Source Tests
    // ========================================================================

    #[tokio::test]
    async fn test_registry_initializes_from_store() {
        let storage = InMemoryStorage::with_roles(vec![
            MemberRoleRow::new(10, "OWNER"),
            MemberRoleRow::new(11, "LEGACY"),
        ]);
        let registry = RoleRegistry::default();
        registry.initialize(&storage).await.unwrap();

        assert_eq!(registry.get_role_id(RoleCode::Owner), Ok(10));
        assert!(registry.get_role_id(RoleCode::Viewer).is_err());
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(InMemoryStorage::new().health_check().await.unwrap());
    }
}
