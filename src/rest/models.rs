use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::extract::double_option;
use crate::types::{
    Comment, Issue, IssueStatus, IssueType, Project, Sprint, User, SPRINT_DATE_FORMAT,
};

/// `2026-02-03T07:36:30+00:00`
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(SPRINT_DATE_FORMAT).to_string()
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---- auth ----

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

// ---- shared references ----

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRef {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
}

impl From<&Project> for ProjectRef {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub id: i64,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssueBrief {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
}

impl From<&Issue> for IssueBrief {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id,
            title: issue.title.clone(),
            issue_type: issue.issue_type,
            status: issue.status,
        }
    }
}

// ---- projects ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<IssueBrief>>,
}

impl ProjectResponse {
    pub fn new(project: &Project, root_issues: Option<&[Issue]>) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            description: project.description.clone(),
            created_at: format_timestamp(&project.created_at),
            updated_at: format_timestamp(&project.updated_at),
            issues: root_issues.map(|issues| {
                issues
                    .iter()
                    .filter(|issue| issue.parent_id.is_none())
                    .map(IssueBrief::from)
                    .collect()
            }),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub issues: Vec<ProjectIssueResponse>,
}

#[derive(Serialize, Deserialize)]
pub struct ProjectIssueResponse {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub assignee: Option<UserSummary>,
}

#[derive(Deserialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ---- issues ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub story_points: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<IssueBrief>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildIssueResponse {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub story_points: Option<i64>,
    pub assignee: Option<UserRef>,
}

/// Issue row used by the backlog and the dashboard task lists.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummaryResponse {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub story_points: Option<i64>,
    pub project: Option<ProjectRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub story_points: Option<i64>,
    pub assignee_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub story_points: Option<Option<i64>>,
}

// ---- comments ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub author: Option<UserSummary>,
}

impl CommentResponse {
    pub fn new(comment: &Comment, author: Option<&User>) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            created_at: format_timestamp(&comment.created_at),
            author: author.map(UserSummary::from),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
}

// ---- sprints ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintResponse {
    pub id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub issues: Vec<SprintIssueResponse>,
}

impl SprintResponse {
    pub fn new(sprint: &Sprint, issues: Vec<SprintIssueResponse>) -> Self {
        Self {
            id: sprint.id,
            name: sprint.name.clone(),
            start_date: format_date(&sprint.start_date),
            end_date: format_date(&sprint.end_date),
            is_active: sprint.is_active,
            issues,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintIssueResponse {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub story_points: Option<i64>,
    pub assignee: Option<UserSummary>,
    pub reporter: Option<UserSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintRequest {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: Option<bool>,
}

// ---- users ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles: user.roles.clone(),
            is_admin: user.is_admin(),
            created_at: format_timestamp(&user.created_at),
            updated_at: format_timestamp(&user.updated_at),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: Option<bool>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub is_admin: Option<Option<bool>>,
}

// ---- dashboard ----

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub projects: Vec<DashboardProjectResponse>,
    pub my_tasks: MyTasksResponse,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardProjectResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub opened_issue_count: i64,
    pub finished_issue_count: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyTasksResponse {
    pub in_progress: Vec<IssueSummaryResponse>,
    pub todo: Vec<IssueSummaryResponse>,
}
