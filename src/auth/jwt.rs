use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::User;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
    pub roles: Vec<String>,
    /// The user's email; the token subject.
    pub username: String,
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("JWT Token not found")]
    MissingToken,
    #[error("Expired JWT Token")]
    ExpiredToken,
    #[error("Invalid JWT Token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// HS256 signer/verifier shared by the login endpoint and the auth extractors.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            iat,
            exp: iat + self.ttl_secs,
            roles: user.roles.clone(),
            username: user.email.clone(),
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}
