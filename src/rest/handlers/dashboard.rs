use axum::{extract::State, Json};

use crate::{storage::Storage, types::IssueStatus};

use super::super::{
    error::ApiError,
    extract::AuthUser,
    models::{DashboardProjectResponse, DashboardResponse, MyTasksResponse},
    AppState,
};
use super::issues::summarize;

const TOP_PROJECTS: usize = 5;

pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let projects = state
        .storage
        .top_active_projects(TOP_PROJECTS)?
        .into_iter()
        .map(|activity| DashboardProjectResponse {
            id: activity.project.id,
            name: activity.project.name,
            description: activity.project.description,
            opened_issue_count: activity.opened_issue_count,
            finished_issue_count: activity.finished_issue_count,
        })
        .collect();

    let (in_progress, todo): (Vec<_>, Vec<_>) = state
        .storage
        .list_assigned_open_issues(user.id)?
        .into_iter()
        .filter(|issue| issue.status.is_open())
        .partition(|issue| issue.status == IssueStatus::InProgress);

    Ok(Json(DashboardResponse {
        projects,
        my_tasks: MyTasksResponse {
            in_progress: summarize(&state.storage, in_progress)?,
            todo: summarize(&state.storage, todo)?,
        },
    }))
}
