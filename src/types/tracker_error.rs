use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("unknown issue type: {0}")]
    UnknownIssueType(String),
    #[error("unknown issue status: {0}")]
    UnknownIssueStatus(String),
    #[error("invalid role list: {0}")]
    InvalidRoles(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
