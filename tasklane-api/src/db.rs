//! Database Connection Pool Module
//!
//! PostgreSQL storage backend: connection pooling with deadpool-postgres and
//! plain SQL over tokio-postgres. [`DbClient`] implements the storage traits
//! so the role registry and the route handlers can run against it unchanged.

use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use std::fmt;
use std::time::Duration;
use tasklane_core::{
    now, CommentId, EntityType, MemberRoleRow, Project, ProjectId, ProjectMember,
    ProjectMemberId, RoleId, StorageError, Task, TaskAssignee, TaskAssigneeId, TaskComment,
    TaskId, TaskPriority, TaskStatus, TasklaneError, TasklaneResult, User, UserId,
};
use tasklane_storage::{
    default_role_rows, AsyncStorageTrait, NewComment, NewProject, NewTask, NewUser,
    ProjectUpdate, RoleSource, TaskFilter, TaskUpdate,
};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// SCHEMA
// ============================================================================

/// Embedded schema, applied idempotently by [`DbClient::migrate`].
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id     BIGSERIAL PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL UNIQUE,
    full_name   TEXT,
    created_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS member_roles (
    role_id     BIGSERIAL PRIMARY KEY,
    code        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS projects (
    project_id  BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    owner_id    BIGINT NOT NULL REFERENCES users (user_id),
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS project_members (
    project_id  BIGINT NOT NULL REFERENCES projects (project_id) ON DELETE CASCADE,
    user_id     BIGINT NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
    role_id     BIGINT NOT NULL REFERENCES member_roles (role_id),
    joined_at   TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_project_members_user ON project_members (user_id);

CREATE TABLE IF NOT EXISTS tasks (
    task_id     BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects (project_id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'TODO',
    priority    TEXT NOT NULL DEFAULT 'MEDIUM',
    due_date    DATE,
    created_by  BIGINT NOT NULL REFERENCES users (user_id),
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks (project_id);

CREATE TABLE IF NOT EXISTS task_assignees (
    task_id     BIGINT NOT NULL REFERENCES tasks (task_id) ON DELETE CASCADE,
    user_id     BIGINT NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
    assigned_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (task_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_task_assignees_user ON task_assignees (user_id);

CREATE TABLE IF NOT EXISTS task_comments (
    comment_id  BIGSERIAL PRIMARY KEY,
    task_id     BIGINT NOT NULL REFERENCES tasks (task_id) ON DELETE CASCADE,
    author_id   BIGINT NOT NULL REFERENCES users (user_id),
    content     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_task_comments_task ON task_comments (task_id);
"#;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait, create and recycle timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "tasklane".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from `TASKLANE_DB_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("TASKLANE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("TASKLANE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("TASKLANE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("TASKLANE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("TASKLANE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("TASKLANE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("TASKLANE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig {
            max_size: self.max_size,
            timeouts: Timeouts {
                wait: Some(self.timeout),
                create: Some(self.timeout),
                recycle: Some(self.timeout),
            },
            ..Default::default()
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: deadpool_postgres::PoolError) -> TasklaneError {
    tracing::error!(error = %err, "Failed to acquire database connection");
    StorageError::ConnectionFailed {
        reason: err.to_string(),
    }
    .into()
}

fn query_error(err: tokio_postgres::Error) -> TasklaneError {
    tracing::error!(error = ?err, "Database query failed");
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
    .into()
}

/// Entity referenced by a foreign-key constraint, by column name.
fn referenced_entity(constraint: &str) -> EntityType {
    if constraint.contains("project_id") {
        EntityType::Project
    } else if constraint.contains("task_id") {
        EntityType::Task
    } else if constraint.contains("role_id") {
        EntityType::MemberRole
    } else {
        EntityType::User
    }
}

/// Split a nullable update field into a "touch it" flag and the new value.
fn nullable_param<T: Clone>(field: &Option<Option<T>>) -> (bool, Option<T>) {
    (field.is_some(), field.clone().flatten())
}

/// Pull `42` out of `Key (user_id)=(42) is not present in table "users".`
fn key_value(detail: &str) -> Option<&str> {
    let start = detail.find(")=(")? + 3;
    let end = start + detail[start..].find(')')?;
    Some(&detail[start..end])
}

/// Translate constraint violations into storage errors.
///
/// Unique violations become `AlreadyExists` for `entity_type`/`id`;
/// foreign-key violations become `NotFound` for the referenced row.
fn write_error(
    err: tokio_postgres::Error,
    entity_type: EntityType,
    id: impl fmt::Display,
) -> TasklaneError {
    match err.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
            StorageError::already_exists(entity_type, id).into()
        }
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            let db_error = err.as_db_error();
            let referenced = db_error
                .and_then(|e| e.constraint())
                .map(referenced_entity)
                .unwrap_or(EntityType::User);
            let key = db_error
                .and_then(|e| e.detail())
                .and_then(key_value)
                .unwrap_or("unknown")
                .to_string();
            StorageError::not_found(referenced, key).into()
        }
        _ => query_error(err),
    }
}

fn decode_error(reason: impl fmt::Display) -> TasklaneError {
    StorageError::QueryFailed {
        reason: format!("Failed to decode row: {}", reason),
    }
    .into()
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn user_from_row(row: &Row) -> TasklaneResult<User> {
    Ok(User {
        user_id: row.try_get("user_id").map_err(decode_error)?,
        username: row.try_get("username").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        full_name: row.try_get("full_name").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn role_from_row(row: &Row) -> TasklaneResult<MemberRoleRow> {
    Ok(MemberRoleRow {
        role_id: row.try_get("role_id").map_err(decode_error)?,
        code: row.try_get("code").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
    })
}

fn project_from_row(row: &Row) -> TasklaneResult<Project> {
    Ok(Project {
        project_id: row.try_get("project_id").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        owner_id: row.try_get("owner_id").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn member_from_row(row: &Row) -> TasklaneResult<ProjectMember> {
    Ok(ProjectMember {
        id: ProjectMemberId::new(
            row.try_get("project_id").map_err(decode_error)?,
            row.try_get("user_id").map_err(decode_error)?,
        ),
        role_id: row.try_get("role_id").map_err(decode_error)?,
        joined_at: row.try_get("joined_at").map_err(decode_error)?,
    })
}

fn task_from_row(row: &Row) -> TasklaneResult<Task> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let priority: String = row.try_get("priority").map_err(decode_error)?;
    Ok(Task {
        task_id: row.try_get("task_id").map_err(decode_error)?,
        project_id: row.try_get("project_id").map_err(decode_error)?,
        title: row.try_get("title").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        status: TaskStatus::from_db_str(&status).map_err(decode_error)?,
        priority: TaskPriority::from_db_str(&priority).map_err(decode_error)?,
        due_date: row.try_get("due_date").map_err(decode_error)?,
        created_by: row.try_get("created_by").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn assignee_from_row(row: &Row) -> TasklaneResult<TaskAssignee> {
    Ok(TaskAssignee {
        id: TaskAssigneeId::new(
            row.try_get("task_id").map_err(decode_error)?,
            row.try_get("user_id").map_err(decode_error)?,
        ),
        assigned_at: row.try_get("assigned_at").map_err(decode_error)?,
    })
}

fn comment_from_row(row: &Row) -> TasklaneResult<TaskComment> {
    Ok(TaskComment {
        comment_id: row.try_get("comment_id").map_err(decode_error)?,
        task_id: row.try_get("task_id").map_err(decode_error)?,
        author_id: row.try_get("author_id").map_err(decode_error)?,
        content: row.try_get("content").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn collect<T>(rows: Vec<Row>, map: fn(&Row) -> TasklaneResult<T>) -> TasklaneResult<Vec<T>> {
    rows.iter().map(map).collect()
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// PostgreSQL storage backend over a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn client(&self) -> TasklaneResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Apply the embedded schema and seed the member role reference data.
    ///
    /// Existing role rows are left untouched.
    pub async fn migrate(&self) -> ApiResult<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;

        let mut seeded = 0;
        for role in default_role_rows() {
            seeded += client
                .execute(
                    "INSERT INTO member_roles (code, description) VALUES ($1, $2) \
                     ON CONFLICT (code) DO NOTHING",
                    &[&role.code, &role.description],
                )
                .await?;
        }

        tracing::info!(seeded_roles = seeded, "Database schema applied");
        Ok(())
    }
}

#[async_trait]
impl RoleSource for DbClient {
    async fn member_role_list(&self) -> TasklaneResult<Vec<MemberRoleRow>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT role_id, code, description FROM member_roles ORDER BY role_id",
                &[],
            )
            .await
            .map_err(query_error)?;
        collect(rows, role_from_row)
    }
}

#[async_trait]
impl AsyncStorageTrait for DbClient {
    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    async fn user_insert(&self, user: &NewUser) -> TasklaneResult<User> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO users (username, email, full_name, created_at) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING user_id, username, email, full_name, created_at",
                &[&user.username, &user.email, &user.full_name, &now()],
            )
            .await
            .map_err(|e| write_error(e, EntityType::User, &user.username))?;
        user_from_row(&row)
    }

    async fn user_get(&self, id: UserId) -> TasklaneResult<Option<User>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT user_id, username, email, full_name, created_at \
                 FROM users WHERE user_id = $1",
                &[&id],
            )
            .await
            .map_err(query_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_list(&self, limit: i64, offset: i64) -> TasklaneResult<Vec<User>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT user_id, username, email, full_name, created_at \
                 FROM users ORDER BY user_id LIMIT $1 OFFSET $2",
                &[&limit.max(0), &offset.max(0)],
            )
            .await
            .map_err(query_error)?;
        collect(rows, user_from_row)
    }

    // ========================================================================
    // PROJECT OPERATIONS
    // ========================================================================

    async fn project_insert(
        &self,
        project: &NewProject,
        owner_role_id: RoleId,
    ) -> TasklaneResult<Project> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(query_error)?;
        let ts = now();

        let row = tx
            .query_one(
                "INSERT INTO projects (name, description, owner_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $4) \
                 RETURNING project_id, name, description, owner_id, created_at, updated_at",
                &[&project.name, &project.description, &project.owner_id, &ts],
            )
            .await
            .map_err(|e| write_error(e, EntityType::Project, &project.name))?;
        let created = project_from_row(&row)?;

        tx.execute(
            "INSERT INTO project_members (project_id, user_id, role_id, joined_at) \
             VALUES ($1, $2, $3, $4)",
            &[&created.project_id, &project.owner_id, &owner_role_id, &ts],
        )
        .await
        .map_err(|e| {
            write_error(
                e,
                EntityType::ProjectMember,
                ProjectMemberId::new(created.project_id, project.owner_id),
            )
        })?;

        tx.commit().await.map_err(query_error)?;
        Ok(created)
    }

    async fn project_get(&self, id: ProjectId) -> TasklaneResult<Option<Project>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT project_id, name, description, owner_id, created_at, updated_at \
                 FROM projects WHERE project_id = $1",
                &[&id],
            )
            .await
            .map_err(query_error)?;
        row.as_ref().map(project_from_row).transpose()
    }

    async fn project_list_for_user(&self, user_id: UserId) -> TasklaneResult<Vec<Project>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT p.project_id, p.name, p.description, p.owner_id, p.created_at, p.updated_at \
                 FROM projects p \
                 JOIN project_members m ON m.project_id = p.project_id \
                 WHERE m.user_id = $1 ORDER BY p.project_id",
                &[&user_id],
            )
            .await
            .map_err(query_error)?;
        collect(rows, project_from_row)
    }

    async fn project_update(
        &self,
        id: ProjectId,
        update: &ProjectUpdate,
    ) -> TasklaneResult<Project> {
        let client = self.client().await?;
        let (set_description, description) = nullable_param(&update.description);
        let row = client
            .query_opt(
                "UPDATE projects SET \
                     name = COALESCE($2, name), \
                     description = CASE WHEN $3 THEN $4 ELSE description END, \
                     updated_at = $5 \
                 WHERE project_id = $1 \
                 RETURNING project_id, name, description, owner_id, created_at, updated_at",
                &[&id, &update.name, &set_description, &description, &now()],
            )
            .await
            .map_err(query_error)?
            .ok_or_else(|| StorageError::not_found(EntityType::Project, id))?;
        project_from_row(&row)
    }

    async fn project_delete(&self, id: ProjectId) -> TasklaneResult<()> {
        let client = self.client().await?;
        // Members, tasks, assignees and comments go with ON DELETE CASCADE.
        let deleted = client
            .execute("DELETE FROM projects WHERE project_id = $1", &[&id])
            .await
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(StorageError::not_found(EntityType::Project, id).into());
        }
        Ok(())
    }

    // ========================================================================
    // MEMBER OPERATIONS
    // ========================================================================

    async fn member_insert(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO project_members (project_id, user_id, role_id, joined_at) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING project_id, user_id, role_id, joined_at",
                &[&id.project_id(), &id.user_id(), &role_id, &now()],
            )
            .await
            .map_err(|e| write_error(e, EntityType::ProjectMember, id))?;
        member_from_row(&row)
    }

    async fn member_get(&self, id: ProjectMemberId) -> TasklaneResult<Option<ProjectMember>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT project_id, user_id, role_id, joined_at FROM project_members \
                 WHERE project_id = $1 AND user_id = $2",
                &[&id.project_id(), &id.user_id()],
            )
            .await
            .map_err(query_error)?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn member_list(&self, project_id: ProjectId) -> TasklaneResult<Vec<ProjectMember>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT project_id, user_id, role_id, joined_at FROM project_members \
                 WHERE project_id = $1 ORDER BY user_id",
                &[&project_id],
            )
            .await
            .map_err(query_error)?;
        collect(rows, member_from_row)
    }

    async fn member_update_role(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "UPDATE project_members SET role_id = $3 \
                 WHERE project_id = $1 AND user_id = $2 \
                 RETURNING project_id, user_id, role_id, joined_at",
                &[&id.project_id(), &id.user_id(), &role_id],
            )
            .await
            .map_err(|e| write_error(e, EntityType::ProjectMember, id))?
            .ok_or_else(|| StorageError::not_found(EntityType::ProjectMember, id))?;
        member_from_row(&row)
    }

    async fn member_delete(&self, id: ProjectMemberId) -> TasklaneResult<Vec<TaskAssigneeId>> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(query_error)?;

        let rows = tx
            .query(
                "DELETE FROM task_assignees a USING tasks t \
                 WHERE a.task_id = t.task_id AND t.project_id = $1 AND a.user_id = $2 \
                 RETURNING a.task_id",
                &[&id.project_id(), &id.user_id()],
            )
            .await
            .map_err(query_error)?;
        let mut dropped = rows
            .iter()
            .map(|row| {
                row.try_get::<_, TaskId>("task_id")
                    .map(|task_id| TaskAssigneeId::new(task_id, id.user_id()))
                    .map_err(query_error)
            })
            .collect::<Result<Vec<_>, _>>()?;
        dropped.sort_by_key(|key| key.task_id());

        let deleted = tx
            .execute(
                "DELETE FROM project_members WHERE project_id = $1 AND user_id = $2",
                &[&id.project_id(), &id.user_id()],
            )
            .await
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(StorageError::not_found(EntityType::ProjectMember, id).into());
        }

        tx.commit().await.map_err(query_error)?;
        Ok(dropped)
    }

    // ========================================================================
    // TASK OPERATIONS
    // ========================================================================

    async fn task_insert(&self, task: &NewTask) -> TasklaneResult<Task> {
        let client = self.client().await?;
        let ts = now();
        let row = client
            .query_one(
                "INSERT INTO tasks (project_id, title, description, status, priority, due_date, \
                                    created_by, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
                 RETURNING task_id, project_id, title, description, status, priority, due_date, \
                           created_by, created_at, updated_at",
                &[
                    &task.project_id,
                    &task.title,
                    &task.description,
                    &task.status.as_db_str(),
                    &task.priority.as_db_str(),
                    &task.due_date,
                    &task.created_by,
                    &ts,
                ],
            )
            .await
            .map_err(|e| write_error(e, EntityType::Task, &task.title))?;
        task_from_row(&row)
    }

    async fn task_get(&self, id: TaskId) -> TasklaneResult<Option<Task>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT task_id, project_id, title, description, status, priority, due_date, \
                        created_by, created_at, updated_at \
                 FROM tasks WHERE task_id = $1",
                &[&id],
            )
            .await
            .map_err(query_error)?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn task_list(&self, filter: &TaskFilter) -> TasklaneResult<Vec<Task>> {
        let client = self.client().await?;
        let status = filter.status.map(|s| s.as_db_str());
        let rows = client
            .query(
                "SELECT t.task_id, t.project_id, t.title, t.description, t.status, t.priority, \
                        t.due_date, t.created_by, t.created_at, t.updated_at \
                 FROM tasks t \
                 WHERE t.project_id = $1 \
                   AND ($2::TEXT IS NULL OR t.status = $2) \
                   AND ($3::BIGINT IS NULL OR EXISTS ( \
                        SELECT 1 FROM task_assignees a \
                        WHERE a.task_id = t.task_id AND a.user_id = $3)) \
                 ORDER BY t.task_id LIMIT $4 OFFSET $5",
                &[
                    &filter.project_id,
                    &status,
                    &filter.assignee_id,
                    &filter.limit.max(0),
                    &filter.offset.max(0),
                ],
            )
            .await
            .map_err(query_error)?;
        collect(rows, task_from_row)
    }

    async fn task_update(&self, id: TaskId, update: &TaskUpdate) -> TasklaneResult<Task> {
        let client = self.client().await?;
        let status = update.status.map(|s| s.as_db_str());
        let priority = update.priority.map(|p| p.as_db_str());
        let (set_description, description) = nullable_param(&update.description);
        let (set_due_date, due_date) = nullable_param(&update.due_date);
        let row = client
            .query_opt(
                "UPDATE tasks SET \
                     title = COALESCE($2, title), \
                     description = CASE WHEN $3 THEN $4 ELSE description END, \
                     status = COALESCE($5, status), \
                     priority = COALESCE($6, priority), \
                     due_date = CASE WHEN $7 THEN $8 ELSE due_date END, \
                     updated_at = $9 \
                 WHERE task_id = $1 \
                 RETURNING task_id, project_id, title, description, status, priority, due_date, \
                           created_by, created_at, updated_at",
                &[
                    &id,
                    &update.title,
                    &set_description,
                    &description,
                    &status,
                    &priority,
                    &set_due_date,
                    &due_date,
                    &now(),
                ],
            )
            .await
            .map_err(query_error)?
            .ok_or_else(|| StorageError::not_found(EntityType::Task, id))?;
        task_from_row(&row)
    }

    async fn task_delete(&self, id: TaskId) -> TasklaneResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM tasks WHERE task_id = $1", &[&id])
            .await
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(StorageError::not_found(EntityType::Task, id).into());
        }
        Ok(())
    }

    // ========================================================================
    // ASSIGNEE OPERATIONS
    // ========================================================================

    async fn assignee_insert(&self, id: TaskAssigneeId) -> TasklaneResult<TaskAssignee> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO task_assignees (task_id, user_id, assigned_at) \
                 VALUES ($1, $2, $3) RETURNING task_id, user_id, assigned_at",
                &[&id.task_id(), &id.user_id(), &now()],
            )
            .await
            .map_err(|e| write_error(e, EntityType::TaskAssignee, id))?;
        assignee_from_row(&row)
    }

    async fn assignee_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskAssignee>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT task_id, user_id, assigned_at FROM task_assignees \
                 WHERE task_id = $1 ORDER BY user_id",
                &[&task_id],
            )
            .await
            .map_err(query_error)?;
        collect(rows, assignee_from_row)
    }

    async fn assignee_delete(&self, id: TaskAssigneeId) -> TasklaneResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute(
                "DELETE FROM task_assignees WHERE task_id = $1 AND user_id = $2",
                &[&id.task_id(), &id.user_id()],
            )
            .await
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(StorageError::not_found(EntityType::TaskAssignee, id).into());
        }
        Ok(())
    }

    // ========================================================================
    // COMMENT OPERATIONS
    // ========================================================================

    async fn comment_insert(&self, comment: &NewComment) -> TasklaneResult<TaskComment> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO task_comments (task_id, author_id, content, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $4) \
                 RETURNING comment_id, task_id, author_id, content, created_at, updated_at",
                &[&comment.task_id, &comment.author_id, &comment.content, &now()],
            )
            .await
            .map_err(|e| write_error(e, EntityType::TaskComment, comment.task_id))?;
        comment_from_row(&row)
    }

    async fn comment_get(&self, id: CommentId) -> TasklaneResult<Option<TaskComment>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT comment_id, task_id, author_id, content, created_at, updated_at \
                 FROM task_comments WHERE comment_id = $1",
                &[&id],
            )
            .await
            .map_err(query_error)?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn comment_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskComment>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT comment_id, task_id, author_id, content, created_at, updated_at \
                 FROM task_comments WHERE task_id = $1 ORDER BY created_at, comment_id",
                &[&task_id],
            )
            .await
            .map_err(query_error)?;
        collect(rows, comment_from_row)
    }

    async fn comment_delete(&self, id: CommentId) -> TasklaneResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM task_comments WHERE comment_id = $1", &[&id])
            .await
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(StorageError::not_found(EntityType::TaskComment, id).into());
        }
        Ok(())
    }

    // ========================================================================
    // HEALTH & DIAGNOSTICS
    // ========================================================================

    async fn health_check(&self) -> TasklaneResult<bool> {
        let client = match self.pool.get().await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Database health check could not get a connection");
                return Ok(false);
            }
        };
        match client.simple_query("SELECT 1").await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check query failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "tasklane");
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_referenced_entity_from_constraint() {
        assert_eq!(
            referenced_entity("project_members_project_id_fkey"),
            EntityType::Project
        );
        assert_eq!(referenced_entity("task_assignees_task_id_fkey"), EntityType::Task);
        assert_eq!(
            referenced_entity("project_members_role_id_fkey"),
            EntityType::MemberRole
        );
        assert_eq!(referenced_entity("tasks_created_by_fkey"), EntityType::User);
    }

    #[test]
    fn test_key_value_from_detail() {
        assert_eq!(
            key_value(r#"Key (user_id)=(42) is not present in table "users"."#),
            Some("42")
        );
        assert_eq!(key_value("no key here"), None);
    }

    #[test]
    fn test_nullable_param_separates_clear_from_keep() {
        assert_eq!(nullable_param::<String>(&None), (false, None));
        assert_eq!(nullable_param::<String>(&Some(None)), (true, None));
        assert_eq!(
            nullable_param(&Some(Some("kept".to_string()))),
            (true, Some("kept".to_string()))
        );
    }

    #[test]
    fn test_schema_declares_composite_keys() {
        assert!(SCHEMA.contains("PRIMARY KEY (project_id, user_id)"));
        assert!(SCHEMA.contains("PRIMARY KEY (task_id, user_id)"));
    }
}
