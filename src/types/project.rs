use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A project with its issue counts, as ranked on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectActivity {
    pub project: Project,
    pub opened_issue_count: i64,
    pub finished_issue_count: i64,
}
