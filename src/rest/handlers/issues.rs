use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::{Issue, IssuePlacement, IssueStatus, IssueType, NewIssue, User},
};

use super::super::{
    error::ApiError,
    extract::{ApiPath, AuthUser, JsonBody},
    models::{
        format_timestamp, ChildIssueResponse, CreateIssueRequest, IssueBrief, IssueResponse,
        IssueSummaryResponse, ParentRef, ProjectRef, UpdateIssueRequest, UserRef,
    },
    AppState,
};
use super::{non_blank, projects::load_project};

pub(super) fn load_issue<R: StorageRead>(storage: &R, id: i64) -> Result<Issue, ApiError> {
    storage
        .find_issue(id)?
        .ok_or_else(|| ApiError::not_found("Issue not found"))
}

fn load_assignee<R: StorageRead>(storage: &R, id: i64) -> Result<User, ApiError> {
    storage
        .find_user(id)?
        .ok_or_else(|| ApiError::not_found("Assignee not found"))
}

fn user_ref<R: StorageRead>(storage: &R, id: Option<i64>) -> anyhow::Result<Option<UserRef>> {
    Ok(match id {
        Some(id) => storage.find_user(id)?.as_ref().map(UserRef::from),
        None => None,
    })
}

/// Full serialization with project, parent, people and children resolved.
fn issue_response<R: StorageRead>(storage: &R, issue: &Issue) -> anyhow::Result<IssueResponse> {
    let project = match issue.project_id {
        Some(id) => storage.find_project(id)?.as_ref().map(ProjectRef::from),
        None => None,
    };
    let parent = match issue.parent_id {
        Some(id) => storage.find_issue(id)?.map(|parent| ParentRef {
            id: parent.id,
            title: parent.title,
        }),
        None => None,
    };
    let children = storage.list_child_issues(issue.id)?;

    Ok(IssueResponse {
        id: issue.id,
        title: issue.title.clone(),
        description: issue.description.clone(),
        issue_type: issue.issue_type,
        status: issue.status,
        story_points: issue.story_points,
        created_at: format_timestamp(&issue.created_at),
        updated_at: format_timestamp(&issue.updated_at),
        project,
        parent,
        assignee: user_ref(storage, issue.assignee_id)?,
        reporter: user_ref(storage, issue.reporter_id)?,
        children: if children.is_empty() {
            None
        } else {
            Some(children.iter().map(IssueBrief::from).collect())
        },
    })
}

/// Rows for the backlog and dashboard lists; project names are looked up once each.
pub(super) fn summarize<R: StorageRead>(
    storage: &R,
    issues: Vec<Issue>,
) -> anyhow::Result<Vec<IssueSummaryResponse>> {
    let mut projects: HashMap<i64, Option<ProjectRef>> = HashMap::new();
    let mut rows = Vec::with_capacity(issues.len());
    for issue in issues {
        let project = match issue.project_id {
            Some(id) => {
                if !projects.contains_key(&id) {
                    let found = storage.find_project(id)?.as_ref().map(ProjectRef::from);
                    projects.insert(id, found);
                }
                projects.get(&id).cloned().flatten()
            }
            None => None,
        };
        rows.push(IssueSummaryResponse {
            id: issue.id,
            title: issue.title,
            issue_type: issue.issue_type,
            status: issue.status,
            story_points: issue.story_points,
            project,
        });
    }
    Ok(rows)
}

pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issue = load_issue(&state.storage, id)?;
    Ok(Json(issue_response(&state.storage, &issue)?))
}

pub async fn children<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ChildIssueResponse>>, ApiError> {
    let issue = load_issue(&state.storage, id)?;
    let mut rows = Vec::new();
    for child in state.storage.list_child_issues(issue.id)? {
        rows.push(ChildIssueResponse {
            id: child.id,
            assignee: user_ref(&state.storage, child.assignee_id)?,
            title: child.title,
            issue_type: child.issue_type,
            status: child.status,
            story_points: child.story_points,
        });
    }
    Ok(Json(rows))
}

pub async fn backlog<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<IssueSummaryResponse>>, ApiError> {
    let issues = state.storage.list_backlog()?;
    Ok(Json(summarize(&state.storage, issues)?))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(reporter): AuthUser,
    JsonBody(request): JsonBody<CreateIssueRequest>,
) -> Result<(StatusCode, Json<IssueResponse>), ApiError> {
    let Some(title) = non_blank(request.title) else {
        return Err(ApiError::bad_request("Title is required"));
    };
    let Some(raw_type) = non_blank(request.issue_type) else {
        return Err(ApiError::bad_request("Type is required"));
    };
    let issue_type: IssueType = raw_type
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid type. Allowed: epic, task"))?;

    let tx = state.storage.begin_tx()?;
    let placement = match issue_type {
        IssueType::Epic => {
            let project_id = request
                .project_id
                .ok_or_else(|| ApiError::bad_request("projectId is required for epic"))?;
            load_project(&tx, project_id)?;
            IssuePlacement::Epic { project_id }
        }
        IssueType::Task => {
            let parent_id = request
                .parent_id
                .ok_or_else(|| ApiError::bad_request("parentId is required for task"))?;
            let parent = tx
                .find_issue(parent_id)?
                .ok_or_else(|| ApiError::not_found("Parent issue not found"))?;
            if !parent.is_epic() {
                return Err(ApiError::bad_request("Parent issue must be an epic"));
            }
            IssuePlacement::Task {
                parent: parent.id,
                project_id: parent.project_id,
            }
        }
    };
    if let Some(assignee_id) = request.assignee_id {
        load_assignee(&tx, assignee_id)?;
    }

    let issue = tx.insert_issue(&NewIssue {
        placement,
        title,
        description: request.description.unwrap_or_default(),
        story_points: request.story_points,
        assignee_id: request.assignee_id,
        reporter_id: Some(reporter.id),
        created_at: Utc::now(),
    })?;
    let response = issue_response(&tx, &issue)?;
    tx.commit()?;
    log::info!(
        "📝 {} {} created by user {}",
        issue.issue_type,
        issue.id,
        reporter.id
    );

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(request): JsonBody<UpdateIssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let mut issue = load_issue(&tx, id)?;

    if let Some(title) = request.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::bad_request("Title cannot be empty"));
        }
        issue.title = title;
    }
    if let Some(description) = request.description {
        issue.description = description;
    }
    if let Some(status) = request.status {
        issue.status = status.trim().parse::<IssueStatus>().map_err(|_| {
            ApiError::bad_request("Invalid status. Allowed: todo, in_progress, done")
        })?;
    }
    if let Some(assignee_id) = request.assignee_id {
        if let Some(user_id) = assignee_id {
            load_assignee(&tx, user_id)?;
        }
        issue.assignee_id = assignee_id;
    }
    if let Some(story_points) = request.story_points {
        issue.story_points = story_points;
    }
    issue.updated_at = Utc::now();

    tx.update_issue(&issue)?;
    let response = issue_response(&tx, &issue)?;
    tx.commit()?;
    Ok(Json(response))
}

pub async fn remove<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let tx = state.storage.begin_tx()?;
    if !tx.delete_issue(id)? {
        return Err(ApiError::not_found("Issue not found"));
    }
    tx.commit()?;
    log::info!("🗑️ Issue {} deleted by user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{rest::test_support::TestApp, storage::StorageRead};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_epic_then_task_inherits_project() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let token = app.token(&user);

        let (status, epic) = app
            .post(
                "/api/issues",
                &token,
                json!({"title": "Launch", "type": "epic", "projectId": project.id}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(epic["type"], "epic");
        assert_eq!(epic["status"], "todo");
        assert_eq!(epic["description"], "");
        assert_eq!(epic["project"], json!({"id": project.id, "name": "Apollo"}));
        assert_eq!(epic["reporter"], json!({"id": user.id, "email": "user@example.com"}));
        assert!(epic.get("parent").is_none());
        assert!(epic.get("assignee").is_none());

        let (status, task) = app
            .post(
                "/api/issues",
                &token,
                json!({
                    "title": "Fuel",
                    "type": "task",
                    "parentId": epic["id"],
                    "storyPoints": 3,
                    "assigneeId": user.id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["project"]["id"], project.id);
        assert_eq!(task["parent"], json!({"id": epic["id"], "title": "Launch"}));
        assert_eq!(task["storyPoints"], 3);
        assert_eq!(task["assignee"]["id"], user.id);

        let (status, epic) = app
            .get(&format!("/api/issues/{}", epic["id"]), &token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(epic["children"][0]["title"], "Fuel");
    }

    #[tokio::test]
    async fn create_validates_payload() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let task = app.task(&epic, "Fuel", None);
        let token = app.token(&user);

        let cases = [
            (json!({"type": "epic"}), StatusCode::BAD_REQUEST, "Title is required"),
            (json!({"title": "x"}), StatusCode::BAD_REQUEST, "Type is required"),
            (
                json!({"title": "x", "type": "bug"}),
                StatusCode::BAD_REQUEST,
                "Invalid type. Allowed: epic, task",
            ),
            (
                json!({"title": "x", "type": "epic"}),
                StatusCode::BAD_REQUEST,
                "projectId is required for epic",
            ),
            (
                json!({"title": "x", "type": "epic", "projectId": 999}),
                StatusCode::NOT_FOUND,
                "Project not found",
            ),
            (
                json!({"title": "x", "type": "task"}),
                StatusCode::BAD_REQUEST,
                "parentId is required for task",
            ),
            (
                json!({"title": "x", "type": "task", "parentId": 999}),
                StatusCode::NOT_FOUND,
                "Parent issue not found",
            ),
            (
                json!({"title": "x", "type": "task", "parentId": task.id}),
                StatusCode::BAD_REQUEST,
                "Parent issue must be an epic",
            ),
            (
                json!({"title": "x", "type": "task", "parentId": epic.id, "assigneeId": 999}),
                StatusCode::NOT_FOUND,
                "Assignee not found",
            ),
        ];
        for (body, expected_status, message) in cases {
            let (status, response) = app.post("/api/issues", &token, body).await;
            assert_eq!(status, expected_status, "{message}");
            assert_eq!(response["message"], message);
        }
    }

    #[tokio::test]
    async fn patch_distinguishes_null_from_missing() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let task = app.task(&epic, "Fuel", Some(&user));
        let token = app.token(&user);
        let uri = format!("/api/issues/{}", task.id);

        let (status, body) = app
            .patch(&uri, &token, json!({"status": "in_progress", "storyPoints": 5}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["storyPoints"], 5);
        assert_eq!(body["assignee"]["id"], user.id);

        let (status, body) = app
            .patch(&uri, &token, json!({"assigneeId": null, "storyPoints": null}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("assignee").is_none());
        assert!(body["storyPoints"].is_null());
        assert_eq!(body["status"], "in_progress");

        let stored = app.storage().find_issue(task.id).unwrap().unwrap();
        assert!(stored.updated_at >= task.updated_at);
        assert_eq!(stored.assignee_id, None);
    }

    #[tokio::test]
    async fn patch_rejects_invalid_values() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let token = app.token(&user);
        let uri = format!("/api/issues/{}", epic.id);

        let (status, body) = app.patch(&uri, &token, json!({"title": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Title cannot be empty");

        let (status, body) = app.patch(&uri, &token, json!({"status": "closed"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid status. Allowed: todo, in_progress, done");

        let (status, body) = app.patch(&uri, &token, json!({"assigneeId": 999})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Assignee not found");

        let (status, body) = app
            .patch("/api/issues/999", &token, json!({"title": "x"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Issue not found");
    }

    #[tokio::test]
    async fn children_and_delete_cascade() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let task = app.task(&epic, "Fuel", Some(&user));
        let token = app.token(&user);

        let (status, body) = app
            .get(&format!("/api/issues/{}/children", epic.id), &token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": task.id,
                "title": "Fuel",
                "type": "task",
                "status": "todo",
                "storyPoints": null,
                "assignee": {"id": user.id, "email": "user@example.com"},
            }])
        );

        let (status, _) = app.delete(&format!("/api/issues/{}", epic.id), &token).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.storage().find_issue(task.id).unwrap().is_none());

        let (status, body) = app
            .get(&format!("/api/issues/{}/children", epic.id), &token)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Issue not found");
    }

    #[tokio::test]
    async fn backlog_skips_epics() {
        let app = TestApp::new();
        let user = app.user("user@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let task = app.task(&epic, "Fuel", None);

        let (status, body) = app.get("/api/issues/backlog", &app.token(&user)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], task.id);
        assert_eq!(rows[0]["project"], json!({"id": project.id, "name": "Apollo"}));
    }
}
