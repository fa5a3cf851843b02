use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::{NewProject, Project, User},
};

use super::super::{
    error::ApiError,
    extract::{ApiPath, AdminUser, AuthUser, JsonBody},
    models::{
        format_timestamp, ProjectDetailResponse, ProjectIssueResponse, ProjectRequest,
        ProjectResponse, UserSummary,
    },
    AppState,
};
use super::non_blank;

pub(super) fn load_project<R: StorageRead>(storage: &R, id: i64) -> Result<Project, ApiError> {
    storage
        .find_project(id)?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

fn with_root_issues<R: StorageRead>(
    storage: &R,
    project: &Project,
) -> Result<ProjectResponse, ApiError> {
    let issues = storage.list_project_issues(project.id)?;
    Ok(ProjectResponse::new(project, Some(&issues)))
}

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.storage.list_projects()?;
    Ok(Json(
        projects
            .iter()
            .map(|project| ProjectResponse::new(project, None))
            .collect(),
    ))
}

pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProjectDetailResponse>, ApiError> {
    let project = load_project(&state.storage, id)?;
    let issues = state.storage.list_project_issues(project.id)?;

    let mut assignees: HashMap<i64, Option<User>> = HashMap::new();
    let mut rows = Vec::with_capacity(issues.len());
    for issue in issues {
        let assignee = match issue.assignee_id {
            Some(user_id) => {
                if !assignees.contains_key(&user_id) {
                    assignees.insert(user_id, state.storage.find_user(user_id)?);
                }
                assignees
                    .get(&user_id)
                    .and_then(|user| user.as_ref())
                    .map(UserSummary::from)
            }
            None => None,
        };
        rows.push(ProjectIssueResponse {
            id: issue.id,
            title: issue.title,
            issue_type: issue.issue_type,
            status: issue.status,
            assignee,
        });
    }

    Ok(Json(ProjectDetailResponse {
        id: project.id,
        name: project.name,
        description: project.description,
        created_at: format_timestamp(&project.created_at),
        updated_at: format_timestamp(&project.updated_at),
        issues: rows,
    }))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    JsonBody(request): JsonBody<ProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let Some(name) = non_blank(request.name) else {
        return Err(ApiError::bad_request("Name is required"));
    };

    let tx = state.storage.begin_tx()?;
    let project = tx.insert_project(&NewProject {
        name,
        description: request.description.unwrap_or_default(),
        created_at: Utc::now(),
    })?;
    tx.commit()?;
    log::info!("📁 Project {} created by user {}", project.id, admin.id);

    Ok((
        StatusCode::CREATED,
        Json(with_root_issues(&state.storage, &project)?),
    ))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(request): JsonBody<ProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let mut project = load_project(&tx, id)?;
    if let Some(name) = request.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required"));
        }
        project.name = name;
    }
    if let Some(description) = request.description {
        project.description = description;
    }
    project.updated_at = Utc::now();
    tx.update_project(&project)?;
    let response = with_root_issues(&tx, &project)?;
    tx.commit()?;

    Ok(Json(response))
}

pub async fn remove<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let tx = state.storage.begin_tx()?;
    if !tx.delete_project(id)? {
        return Err(ApiError::not_found("Project not found"));
    }
    tx.commit()?;
    log::info!("🗑️ Project {} deleted by user {}", id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}
