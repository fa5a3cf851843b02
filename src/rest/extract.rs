use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use super::{error::ApiError, AppState};
use crate::{
    auth::AuthError,
    storage::Storage,
    types::User,
};

/// `Json<T>` whose rejections answer `400 {"message": "Invalid JSON payload"}`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                log::debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::bad_request("Invalid JSON payload"))
            }
        }
    }
}

/// `Path<T>` whose rejections answer `400 {"message": "Invalid path parameter"}`.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                log::debug!("Rejected path {}: {}", parts.uri.path(), rejection.body_text());
                Err(ApiError::bad_request("Invalid path parameter"))
            }
        }
    }
}

/// The caller identified by a valid bearer token, reloaded from storage.
pub struct AuthUser(pub User);

/// Like [`AuthUser`] but only admits `ROLE_ADMIN`.
pub struct AdminUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[async_trait]
impl<S: Storage> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.jwt.verify(token)?;
        let user = state
            .storage
            .find_user_by_email(&claims.username)?
            .filter(|user| user.id == claims.id)
            .ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl<S: Storage> FromRequestParts<AppState<S>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            log::warn!("User {} denied admin-only {}", user.id, parts.uri.path());
            return Err(ApiError::access_denied());
        }
        Ok(AdminUser(user))
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        points: Option<Option<i64>>,
    }

    #[test]
    fn double_option_separates_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.points, None);
        let null: Patch = serde_json::from_str(r#"{"points": null}"#).unwrap();
        assert_eq!(null.points, Some(None));
        let set: Patch = serde_json::from_str(r#"{"points": 5}"#).unwrap();
        assert_eq!(set.points, Some(Some(5)));
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
