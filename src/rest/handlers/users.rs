use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    auth::{hash_password, is_acceptable_password},
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::{roles_for, NewUser, User},
};

use super::super::{
    error::ApiError,
    extract::{ApiPath, AdminUser, AuthUser, JsonBody},
    models::{CreateUserRequest, UpdateUserRequest, UserResponse},
    AppState,
};
use super::non_blank;

const FIELDS_REQUIRED: &str = "Email, firstName and lastName are required";

fn load_user<R: StorageRead>(storage: &R, id: i64) -> Result<User, ApiError> {
    storage
        .find_user(id)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn required(value: String) -> Result<String, ApiError> {
    non_blank(Some(value)).ok_or_else(|| ApiError::bad_request(FIELDS_REQUIRED))
}

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.storage.list_users()?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

pub async fn show<S: Storage>(
    State(state): State<AppState<S>>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state.storage, id)?;
    if caller.id != user.id && !caller.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(Json(UserResponse::from(&user)))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (Some(email), Some(first_name), Some(last_name)) = (
        non_blank(request.email),
        non_blank(request.first_name),
        non_blank(request.last_name),
    ) else {
        return Err(ApiError::bad_request(FIELDS_REQUIRED));
    };

    let password_hash = match request.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            if !is_acceptable_password(&password) {
                return Err(ApiError::bad_request(
                    "Password must be at least 8 characters",
                ));
            }
            hash_password(&password)?
        }
        None => String::new(),
    };

    let tx = state.storage.begin_tx()?;
    if tx.find_user_by_email(&email)?.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }
    let user = tx.insert_user(&NewUser {
        email,
        first_name,
        last_name,
        password_hash,
        roles: roles_for(request.is_admin.unwrap_or(false)),
        created_at: Utc::now(),
    })?;
    tx.commit()?;
    log::info!("👤 User {} created by admin {}", user.id, admin.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let tx = state.storage.begin_tx()?;
    let mut user = load_user(&tx, id)?;

    if let Some(email) = request.email {
        let email = required(email)?;
        if let Some(other) = tx.find_user_by_email(&email)? {
            if other.id != user.id {
                return Err(ApiError::conflict("Email already exists"));
            }
        }
        user.email = email;
    }
    if let Some(first_name) = request.first_name {
        user.first_name = required(first_name)?;
    }
    if let Some(last_name) = request.last_name {
        user.last_name = required(last_name)?;
    }
    if let Some(is_admin) = request.is_admin {
        user.roles = roles_for(is_admin.unwrap_or(false));
    }
    user.updated_at = Utc::now();

    tx.update_user(&user)?;
    tx.commit()?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn remove<S: Storage>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let tx = state.storage.begin_tx()?;
    if !tx.delete_user(id)? {
        return Err(ApiError::not_found("User not found"));
    }
    tx.commit()?;
    log::info!("🗑️ User {} deleted by admin {}", id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{auth::verify_password, rest::test_support::TestApp, storage::StorageRead};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn admin_creates_users_and_rejects_duplicates() {
        let app = TestApp::new();
        let admin = app.user("admin@example.com", true);
        let token = app.token(&admin);

        let (status, body) = app
            .post(
                "/api/users",
                &token,
                json!({"email": "new@example.com", "firstName": "New", "lastName": "Person", "isAdmin": true}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["roles"], json!(["ROLE_USER", "ROLE_ADMIN"]));
        assert_eq!(body["isAdmin"], true);
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());

        let (status, body) = app
            .post(
                "/api/users",
                &token,
                json!({"email": "NEW@example.com", "firstName": "A", "lastName": "B"}),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already exists");

        let (status, body) = app
            .post("/api/users", &token, json!({"email": "x@example.com"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email, firstName and lastName are required");
    }

    #[tokio::test]
    async fn created_user_can_get_a_password() {
        let app = TestApp::new();
        let admin = app.user("admin@example.com", true);
        let (status, body) = app
            .post(
                "/api/users",
                &app.token(&admin),
                json!({"email": "dev@example.com", "firstName": "D", "lastName": "V", "password": "long enough"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        let stored = app.storage().find_user(id).unwrap().unwrap();
        assert!(verify_password("long enough", &stored.password_hash));
    }

    #[tokio::test]
    async fn show_is_limited_to_self_or_admin() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com", false);
        let bob = app.user("bob@example.com", false);
        let admin = app.user("admin@example.com", true);

        let (status, body) = app
            .get(&format!("/api/users/{}", alice.id), &app.token(&alice))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "alice@example.com");

        let (status, body) = app
            .get(&format!("/api/users/{}", alice.id), &app.token(&bob))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");

        let (status, _) = app
            .get(&format!("/api/users/{}", alice.id), &app.token(&admin))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/api/users/999", &app.token(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");

        let (status, body) = app.get("/api/users/999", &app.token(&bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");

        let (status, body) = app.get("/api/users/me", &app.token(&bob)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], bob.id);

        let (status, _) = app.get("/api/users", &app.token(&bob)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app.get("/api/users", &app.token(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn promotion_takes_effect_without_new_token() {
        let app = TestApp::new();
        let admin = app.user("admin@example.com", true);
        let user = app.user("user@example.com", false);
        let user_token = app.token(&user);

        let (status, _) = app.get("/api/users", &user_token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .patch(
                &format!("/api/users/{}", user.id),
                &app.token(&admin),
                json!({"isAdmin": true, "firstName": "Promoted"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAdmin"], true);
        assert_eq!(body["firstName"], "Promoted");

        let (status, _) = app.get("/api/users", &user_token).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_rejects_taken_email() {
        let app = TestApp::new();
        let admin = app.user("admin@example.com", true);
        let user = app.user("user@example.com", false);

        let (status, body) = app
            .patch(
                &format!("/api/users/{}", user.id),
                &app.token(&admin),
                json!({"email": "admin@example.com"}),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already exists");

        let (status, _) = app
            .patch(
                &format!("/api/users/{}", user.id),
                &app.token(&admin),
                json!({"email": "user@example.com"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_a_user_unassigns_their_issues() {
        let app = TestApp::new();
        let admin = app.user("admin@example.com", true);
        let dev = app.user("dev@example.com", false);
        let project = app.project("Apollo");
        let epic = app.epic(&project, "Launch");
        let task = app.task(&epic, "Fuel", Some(&dev));

        let (status, _) = app
            .delete(&format!("/api/users/{}", dev.id), &app.token(&admin))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let stored = app.storage().find_issue(task.id).unwrap().unwrap();
        assert_eq!(stored.assignee_id, None);
    }
}
