//! Router-level tests over the in-memory store.
//!
//! Every request goes through the full router, so the acting-user
//! extractor, permission checks, error mapping and event broadcast are
//! exercised together.

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::{error_code, TestApp, TestResult};
use tasklane_api::{Topic, WsEvent};

// ============================================================================
// ACTING USER
// ============================================================================

#[tokio::test]
async fn test_missing_actor_is_unauthorized() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app
        .send(Method::GET, "/api/v1/projects", None, None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn test_unknown_actor_is_unauthorized() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app.get("/api/v1/projects", 9_999).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_user_signup_needs_no_actor() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "username": "  grace ", "email": "grace@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["username"], "grace");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "username": "grace", "email": "other@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "ENTITY_ALREADY_EXISTS");
    Ok(())
}

#[tokio::test]
async fn test_user_signup_rejects_bad_email() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "username": "grace", "email": "not-an-email" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

// ============================================================================
// PROJECTS
// ============================================================================

#[tokio::test]
async fn test_create_project_makes_creator_owner() -> TestResult {
    let app = TestApp::new().await?;
    let actor = app.outsider.user_id;

    let (status, project) = app
        .post("/api/v1/projects", actor, json!({ "name": "Side Project" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", project);
    assert_eq!(project["owner_id"], actor);

    let uri = format!("/api/v1/projects/{}/members", project["project_id"]);
    let (status, body) = app.get(&uri, actor).await?;
    assert_eq!(status, StatusCode::OK);
    let members = body["members"].as_array().cloned().unwrap_or_default();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["user_id"], actor);
    assert_eq!(members[0]["role"], "OWNER");
    Ok(())
}

#[tokio::test]
async fn test_project_listing_is_scoped_to_membership() -> TestResult {
    let app = TestApp::new().await?;

    let (_, body) = app.get("/api/v1/projects", app.viewer.user_id).await?;
    assert_eq!(body["projects"].as_array().map(Vec::len), Some(1));

    let (_, body) = app.get("/api/v1/projects", app.outsider.user_id).await?;
    assert_eq!(body["projects"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_non_member_is_forbidden_and_missing_project_not_found() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app.get(&app.project_uri(""), app.outsider.user_id).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let (status, body) = app.get("/api/v1/projects/424242", app.owner.user_id).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "ENTITY_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_admin_updates_but_only_owner_deletes() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app
        .patch(&app.project_uri(""), app.admin.user_id, json!({ "name": "Renamed" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "Renamed");

    let (status, _) = app
        .patch(&app.project_uri(""), app.member.user_id, json!({ "name": "Nope" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&app.project_uri(""), app.admin.user_id).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&app.project_uri(""), app.owner.user_id).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&app.project_uri(""), app.owner.user_id).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_empty_project_update_is_rejected() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .patch(&app.project_uri(""), app.owner.user_id, json!({}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

// ============================================================================
// MEMBERS
// ============================================================================

#[tokio::test]
async fn test_add_member_and_duplicate_conflict() -> TestResult {
    let app = TestApp::new().await?;
    let uri = app.project_uri("/members");
    let outsider = app.outsider.user_id;

    let (status, body) = app
        .post(&uri, app.admin.user_id, json!({ "user_id": outsider, "role": "VIEWER" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["role"], "VIEWER");
    assert_eq!(body["role_id"], 4);

    let (status, body) = app
        .post(&uri, app.admin.user_id, json!({ "user_id": outsider, "role": "MEMBER" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "ENTITY_ALREADY_EXISTS");
    Ok(())
}

#[tokio::test]
async fn test_member_role_cannot_manage_members() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .post(
            &app.project_uri("/members"),
            app.member.user_id,
            json!({ "user_id": app.outsider.user_id, "role": "VIEWER" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_adding_unknown_user_is_not_found() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .post(
            &app.project_uri("/members"),
            app.owner.user_id,
            json!({ "user_id": 777, "role": "MEMBER" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_owner_role_is_protected() -> TestResult {
    let app = TestApp::new().await?;
    let owner_uri = app.project_uri(&format!("/members/{}", app.owner.user_id));

    let (status, _) = app
        .post(
            &app.project_uri("/members"),
            app.owner.user_id,
            json!({ "user_id": app.outsider.user_id, "role": "OWNER" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(&owner_uri, app.admin.user_id, json!({ "role": "VIEWER" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&owner_uri, app.admin.user_id).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_change_member_role() -> TestResult {
    let app = TestApp::new().await?;
    let uri = app.project_uri(&format!("/members/{}", app.viewer.user_id));

    let (status, body) = app
        .patch(&uri, app.admin.user_id, json!({ "role": "MEMBER" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["role"], "MEMBER");
    assert_eq!(body["role_id"], 3);

    // The promoted viewer can now create tasks.
    let (status, _) = app
        .post(&app.project_uri("/tasks"), app.viewer.user_id, json!({ "title": "Promoted" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn test_member_may_leave_project() -> TestResult {
    let app = TestApp::new().await?;
    let uri = app.project_uri(&format!("/members/{}", app.viewer.user_id));

    let (status, _) = app.delete(&uri, app.viewer.user_id).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&app.project_uri(""), app.viewer.user_id).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_removing_member_drops_their_assignments() -> TestResult {
    let app = TestApp::new().await?;
    let task_id = app.create_task("Cascade").await?;
    let assignees_uri = format!("/api/v1/tasks/{}/assignees", task_id);

    let (status, _) = app
        .post(&assignees_uri, app.owner.user_id, json!({ "user_id": app.member.user_id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let mut rx = app.state.ws.subscribe();
    let member_uri = app.project_uri(&format!("/members/{}", app.member.user_id));
    let (status, _) = app.delete(&member_uri, app.owner.user_id).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get(&assignees_uri, app.owner.user_id).await?;
    assert_eq!(body["assignees"].as_array().map(Vec::len), Some(0));

    let project_id = app.project.project_id;
    assert_eq!(
        rx.try_recv()?,
        WsEvent::TaskUnassigned {
            project_id,
            task_id,
            user_id: app.member.user_id,
        }
    );
    assert_eq!(
        rx.try_recv()?,
        WsEvent::MemberRemoved {
            project_id,
            user_id: app.member.user_id,
        }
    );
    assert!(rx.try_recv().is_err());
    Ok(())
}

// ============================================================================
// TASKS, ASSIGNEES AND COMMENTS
// ============================================================================

#[tokio::test]
async fn test_task_collaboration_flow() -> TestResult {
    let app = TestApp::new().await?;
    let member = app.member.user_id;

    let (status, task) = app
        .post(
            &app.project_uri("/tasks"),
            member,
            json!({ "title": "Write docs", "priority": "HIGH", "due_date": "2026-11-02" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "HIGH");
    assert_eq!(task["created_by"], member);
    let task_uri = format!("/api/v1/tasks/{}", task["task_id"]);

    let (status, body) = app
        .post(&format!("{}/assignees", task_uri), member, json!({ "user_id": member }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = app
        .patch(&task_uri, member, json!({ "status": "IN_PROGRESS" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "IN_PROGRESS");

    let (status, _) = app
        .post(&format!("{}/comments", task_uri), app.viewer.user_id, json!({ "content": "Nice" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&format!("{}/comments", task_uri), member).await?;
    assert_eq!(body["comments"].as_array().map(Vec::len), Some(1));

    let filtered = app.project_uri(&format!("/tasks?assignee_id={}&status=IN_PROGRESS", member));
    let (status, body) = app.get(&filtered, app.viewer.user_id).await?;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["tasks"].as_array().cloned().unwrap_or_default();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["task_id"], task["task_id"]);

    let (status, _) = app.delete(&task_uri, member).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&task_uri, member).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_null_clears_description_and_due_date() -> TestResult {
    let app = TestApp::new().await?;
    let member = app.member.user_id;

    let (status, task) = app
        .post(
            &app.project_uri("/tasks"),
            member,
            json!({ "title": "Plan launch", "description": "Outline", "due_date": "2026-12-01" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    let task_uri = format!("/api/v1/tasks/{}", task["task_id"]);

    let (status, body) = app
        .patch(&task_uri, member, json!({ "priority": "LOW" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["description"], "Outline");
    assert_eq!(body["due_date"], "2026-12-01");

    let (status, body) = app
        .patch(&task_uri, member, json!({ "description": null, "due_date": null }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["description"].is_null());
    assert!(body["due_date"].is_null());
    assert_eq!(body["title"], "Plan launch");
    assert_eq!(body["priority"], "LOW");

    let owner = app.owner.user_id;
    let (_, body) = app
        .patch(&app.project_uri(""), owner, json!({ "description": "Quarterly" }))
        .await?;
    assert_eq!(body["description"], "Quarterly");
    let (status, body) = app
        .patch(&app.project_uri(""), owner, json!({ "description": null }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["description"].is_null());
    assert!(body["name"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_viewer_cannot_edit_tasks() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .post(&app.project_uri("/tasks"), app.viewer.user_id, json!({ "title": "Nope" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let task_id = app.create_task("Owned").await?;
    let (status, _) = app
        .patch(
            &format!("/api/v1/tasks/{}", task_id),
            app.viewer.user_id,
            json!({ "title": "Hijack" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_assigning_non_member_is_rejected() -> TestResult {
    let app = TestApp::new().await?;
    let task_id = app.create_task("Solo").await?;

    let (status, body) = app
        .post(
            &format!("/api/v1/tasks/{}/assignees", task_id),
            app.owner.user_id,
            json!({ "user_id": app.outsider.user_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");
    Ok(())
}

#[tokio::test]
async fn test_comment_deletion_rights() -> TestResult {
    let app = TestApp::new().await?;
    let task_id = app.create_task("Discuss").await?;

    let (_, comment) = app
        .post(
            &format!("/api/v1/tasks/{}/comments", task_id),
            app.viewer.user_id,
            json!({ "content": "First!" }),
        )
        .await?;
    let comment_uri = format!("/api/v1/comments/{}", comment["comment_id"]);

    let (status, _) = app.delete(&comment_uri, app.member.user_id).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&comment_uri, app.admin.user_id).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&comment_uri, app.admin.user_id).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

// ============================================================================
// ROLES AND HEALTH
// ============================================================================

#[tokio::test]
async fn test_list_roles() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app.send(Method::GET, "/api/v1/roles", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<_> = body["roles"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|role| role["code"].as_str().map(str::to_string))
        .collect();
    assert_eq!(codes, vec!["OWNER", "ADMIN", "MEMBER", "VIEWER"]);
    Ok(())
}

#[tokio::test]
async fn test_readiness_reports_healthy() -> TestResult {
    let app = TestApp::new().await?;

    let (status, body) = app.send(Method::GET, "/health/ready", None, None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "healthy");
    Ok(())
}

// ============================================================================
// BROADCAST
// ============================================================================

#[tokio::test]
async fn test_mutations_are_broadcast_on_topics() -> TestResult {
    let app = TestApp::new().await?;
    let mut rx = app.state.ws.subscribe();
    let project_id = app.project.project_id;

    let task_id = app.create_task("Broadcast").await?;
    let event = rx.try_recv()?;
    assert!(matches!(&event, WsEvent::TaskCreated { task } if task.task_id == task_id));
    assert_eq!(event.topics(), vec![Topic::Project(project_id)]);

    let (status, _) = app
        .post(
            &format!("/api/v1/tasks/{}/assignees", task_id),
            app.owner.user_id,
            json!({ "user_id": app.member.user_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let event = rx.try_recv()?;
    assert_eq!(event.event_type(), "TaskAssigned");
    assert_eq!(
        event.topics(),
        vec![Topic::Project(project_id), Topic::User(app.member.user_id)]
    );

    // Rejected requests publish nothing.
    let (status, _) = app
        .post(&app.project_uri("/tasks"), app.viewer.user_id, json!({ "title": "Denied" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(rx.try_recv().is_err());
    Ok(())
}
