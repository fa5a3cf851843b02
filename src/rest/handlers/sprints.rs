use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;

use crate::{
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::{parse_sprint_date, NewSprint, Sprint, User},
};

use super::super::{
    error::ApiError,
    extract::{ApiPath, AdminUser, AuthUser, JsonBody},
    models::{SprintIssueResponse, SprintRequest, SprintResponse, UserSummary},
    AppState,
};
use super::{issues::load_issue, non_blank};

const DATES_REQUIRED: &str = "startDate and endDate are required (YYYY-MM-DD)";
const BACKWARDS_RANGE: &str = "endDate must not be before startDate";

fn load_sprint<R: StorageRead>(storage: &R, id: i64) -> Result<Sprint, ApiError> {
    storage
        .find_sprint(id)?
        .ok_or_else(|| ApiError::not_found("Sprint not found"))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_sprint_date(raw).ok_or_else(|| ApiError::bad_request(DATES_REQUIRED))
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if end < start {
        return Err(ApiError::bad_request(BACKWARDS_RANGE));
    }
    Ok(())
}

/// Serializes a sprint with its non-epic issues and their people.
fn sprint_response<R: StorageRead>(storage: &R, sprint: &Sprint) -> anyhow::Result<SprintResponse> {
    let mut people: HashMap<i64, Option<User>> = HashMap::new();
    let mut summary = |id: Option<i64>| -> anyhow::Result<Option<UserSummary>> {
        let Some(id) = id else {
            return Ok(None);
        };
        if !people.contains_key(&id) {
            people.insert(id, storage.find_user(id)?);
        }
        Ok(people
            .get(&id)
            .and_then(|user| user.as_ref())
            .map(UserSummary::from))
    };

    let mut issues = Vec::new();
    for issue in storage.list_sprint_issues(sprint.id)? {
        if issue.is_epic() {
            continue;
        }
        issues.push(SprintIssueResponse {
            id: issue.id,
            assignee: summary(issue.assignee_id)?,
            reporter: summary(issue.reporter_id)?,
            title: issue.title,
            issue_type: issue.issue_type,
            status: issue.status,
            story_points: issue.story_points,
        });
    }
    Ok(SprintResponse::new(sprint, issues))
}

pub async fn active<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
) -> Result<Json<SprintResponse>, ApiError> {
    let sprint = state
        .storage
        .find_active_sprint()?
        .ok_or_else(|| ApiError::not_found("No active sprint found"))?;
    Ok(Json(sprint_response(&state.storage, &sprint)?))
}

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<SprintResponse>>, ApiError> {
    let mut rows = Vec::new();
    for sprint in state.storage.list_sprints()? {
        rows.push(sprint_response(&state.storage, &sprint)?);
    }
    Ok(Json(rows))
}

pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SprintResponse>, ApiError> {
    let sprint = load_sprint(&state.storage, id)?;
    Ok(Json(sprint_response(&state.storage, &sprint)?))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    JsonBody(request): JsonBody<SprintRequest>,
) -> Result<(StatusCode, Json<SprintResponse>), ApiError> {
    let Some(name) = non_blank(request.name) else {
        return Err(ApiError::bad_request("Name is required"));
    };
    let (Some(start), Some(end)) = (request.start_date, request.end_date) else {
        return Err(ApiError::bad_request(DATES_REQUIRED));
    };
    let start_date = parse_date(&start)?;
    let end_date = parse_date(&end)?;
    check_range(start_date, end_date)?;

    let tx = state.storage.begin_tx()?;
    let sprint = tx.insert_sprint(&NewSprint {
        name,
        start_date,
        end_date,
        is_active: request.is_active.unwrap_or(false),
    })?;
    if sprint.is_active {
        tx.deactivate_other_sprints(sprint.id)?;
    }
    let response = sprint_response(&tx, &sprint)?;
    tx.commit()?;
    log::info!("🏃 Sprint {} created by user {}", sprint.id, admin.id);

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(request): JsonBody<SprintRequest>,
) -> Result<Json<SprintResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let mut sprint = load_sprint(&tx, id)?;

    if let Some(name) = request.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required"));
        }
        sprint.name = name;
    }
    if let Some(start) = request.start_date {
        sprint.start_date = parse_date(&start)?;
    }
    if let Some(end) = request.end_date {
        sprint.end_date = parse_date(&end)?;
    }
    if !sprint.has_valid_range() {
        return Err(ApiError::bad_request(BACKWARDS_RANGE));
    }
    if let Some(is_active) = request.is_active {
        sprint.is_active = is_active;
    }

    tx.update_sprint(&sprint)?;
    if sprint.is_active {
        tx.deactivate_other_sprints(sprint.id)?;
    }
    let response = sprint_response(&tx, &sprint)?;
    tx.commit()?;
    Ok(Json(response))
}

pub async fn remove<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let tx = state.storage.begin_tx()?;
    if !tx.delete_sprint(id)? {
        return Err(ApiError::not_found("Sprint not found"));
    }
    tx.commit()?;
    log::info!("🗑️ Sprint {} deleted by user {}", id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_issue<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    ApiPath((id, issue_id)): ApiPath<(i64, i64)>,
) -> Result<Json<SprintResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let sprint = load_sprint(&tx, id)?;
    let issue = load_issue(&tx, issue_id)?;
    if issue.is_epic() {
        return Err(ApiError::bad_request("Epics cannot be planned in a sprint"));
    }
    tx.add_sprint_issue(sprint.id, issue.id)?;
    let response = sprint_response(&tx, &sprint)?;
    tx.commit()?;
    Ok(Json(response))
}

pub async fn remove_issue<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    ApiPath((id, issue_id)): ApiPath<(i64, i64)>,
) -> Result<Json<SprintResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let sprint = load_sprint(&tx, id)?;
    if !tx.remove_sprint_issue(sprint.id, issue_id)? {
        return Err(ApiError::not_found("Issue is not in this sprint"));
    }
    let response = sprint_response(&tx, &sprint)?;
    tx.commit()?;
    Ok(Json(response))
}
