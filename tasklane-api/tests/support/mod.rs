#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tasklane_api::{create_api_router, ApiConfig, AppState, DbClient, DbConfig, USER_ID_HEADER};
use tasklane_core::{Project, User, UserId};
use tasklane_storage::{RoleRegistry, RoleRegistryConfig, SharedStorage};
use tasklane_test_utils::fixtures::{seeded_store, SeededStore};
use tower::ServiceExt;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn test_db_client() -> TestResult<DbClient> {
    let config = DbConfig::from_env();
    Ok(DbClient::from_config(&config)?)
}

/// A router over a seeded in-memory store with an initialized registry.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub project: Project,
    pub owner: User,
    pub admin: User,
    pub member: User,
    pub viewer: User,
    pub outsider: User,
}

impl TestApp {
    pub async fn new() -> TestResult<Self> {
        let SeededStore {
            storage,
            project,
            owner,
            admin,
            member,
            viewer,
            outsider,
        } = seeded_store().await?;

        let storage: SharedStorage = Arc::new(storage);
        let registry = RoleRegistry::new(RoleRegistryConfig::default());
        registry.initialize(storage.as_ref()).await?;

        let state = AppState::new(storage, Arc::new(registry), ApiConfig::default());
        let router = create_api_router(state.clone());

        Ok(Self {
            router,
            state,
            project,
            owner,
            admin,
            member,
            viewer,
            outsider,
        })
    }

    /// Send a request and decode the JSON response body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        actor: Option<UserId>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = actor {
            builder = builder.header(USER_ID_HEADER, user_id.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, actor: UserId) -> TestResult<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(actor), None).await
    }

    pub async fn post(&self, uri: &str, actor: UserId, body: Value) -> TestResult<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(actor), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, actor: UserId, body: Value) -> TestResult<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(actor), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, actor: UserId) -> TestResult<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(actor), None).await
    }

    pub fn project_uri(&self, suffix: &str) -> String {
        format!("/api/v1/projects/{}{}", self.project.project_id, suffix)
    }

    /// Create a task in the seeded project as the owner; returns its id.
    pub async fn create_task(&self, title: &str) -> TestResult<i64> {
        let (status, body) = self
            .post(
                &self.project_uri("/tasks"),
                self.owner.user_id,
                serde_json::json!({ "title": title }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "create task: {}", body);
        body["task_id"]
            .as_i64()
            .ok_or_else(|| "task_id missing from response".into())
    }
}

/// Error code string of an `ApiError` body.
pub fn error_code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}
