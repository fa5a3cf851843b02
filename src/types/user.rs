use chrono::{DateTime, Utc};

use super::TrackerError;

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string. Empty means the account cannot log in yet.
    pub password_hash: String,
    pub roles: Vec<String>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }

    pub fn reset_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.reset_token_hash, self.reset_token_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token_hash = None;
        self.reset_token_expires_at = None;
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Every account carries `ROLE_USER`; admins additionally carry `ROLE_ADMIN`.
pub fn roles_for(is_admin: bool) -> Vec<String> {
    let mut roles = vec![ROLE_USER.to_string()];
    if is_admin {
        roles.push(ROLE_ADMIN.to_string());
    }
    roles
}

pub fn encode_roles(roles: &[String]) -> String {
    serde_json::Value::from(roles.to_vec()).to_string()
}

pub fn decode_roles(raw: &str) -> Result<Vec<String>, TrackerError> {
    let mut roles: Vec<String> =
        serde_json::from_str(raw).map_err(|err| TrackerError::InvalidRoles(err.to_string()))?;
    if !roles.iter().any(|r| r == ROLE_USER) {
        roles.insert(0, ROLE_USER.to_string());
    }
    Ok(roles)
}
