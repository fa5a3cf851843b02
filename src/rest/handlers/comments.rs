use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::NewComment,
};

use super::super::{
    error::ApiError,
    extract::{ApiPath, AuthUser, JsonBody},
    models::{CommentResponse, CreateCommentRequest},
    AppState,
};
use super::{issues::load_issue, non_blank};

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
    ApiPath(issue_id): ApiPath<i64>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let issue = load_issue(&state.storage, issue_id)?;
    let mut rows = Vec::new();
    for comment in state.storage.list_comments(issue.id)? {
        let author = match comment.author_id {
            Some(id) => state.storage.find_user(id)?,
            None => None,
        };
        rows.push(CommentResponse::new(&comment, author.as_ref()));
    }
    Ok(Json(rows))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(author): AuthUser,
    ApiPath(issue_id): ApiPath<i64>,
    JsonBody(request): JsonBody<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let Some(content) = non_blank(request.content) else {
        return Err(ApiError::bad_request("Content is required"));
    };

    let tx = state.storage.begin_tx()?;
    let issue = load_issue(&tx, issue_id)?;
    let comment = tx.insert_comment(&NewComment {
        issue_id: issue.id,
        author_id: Some(author.id),
        content,
        created_at: Utc::now(),
    })?;
    tx.commit()?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(&comment, Some(&author))),
    ))
}

/// Only the author or an admin may delete a comment.
pub async fn remove<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let tx = state.storage.begin_tx()?;
    let comment = tx
        .find_comment(id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if comment.author_id != Some(user.id) && !user.is_admin() {
        log::warn!("User {} denied deleting comment {}", user.id, id);
        return Err(ApiError::access_denied());
    }
    tx.delete_comment(id)?;
    tx.commit()?;
    Ok(StatusCode::NO_CONTENT)
}
