use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Epic,
    Task,
}

impl IssueType {
    pub const ALL: [IssueType; 2] = [IssueType::Epic, IssueType::Task];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Epic => "epic",
            IssueType::Task => "task",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownIssueType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Todo,
    InProgress,
    Done,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [IssueStatus::Todo, IssueStatus::InProgress, IssueStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Todo => "todo",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Done => "done",
        }
    }

    /// Todo and in-progress issues count as open on the dashboard.
    pub fn is_open(&self) -> bool {
        !matches!(self, IssueStatus::Done)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownIssueStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: i64,
    pub project_id: Option<i64>,
    pub issue_type: IssueType,
    pub status: IssueStatus,
    pub parent_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub story_points: Option<i64>,
    pub assignee_id: Option<i64>,
    pub reporter_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn is_epic(&self) -> bool {
        self.issue_type == IssueType::Epic
    }
}

/// Where a new issue hangs in the hierarchy. Epics belong to a project,
/// tasks to an epic whose project they inherit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePlacement {
    Epic { project_id: i64 },
    Task { parent: i64, project_id: Option<i64> },
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub placement: IssuePlacement,
    pub title: String,
    pub description: String,
    pub story_points: Option<i64>,
    pub assignee_id: Option<i64>,
    pub reporter_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl NewIssue {
    pub fn issue_type(&self) -> IssueType {
        match self.placement {
            IssuePlacement::Epic { .. } => IssueType::Epic,
            IssuePlacement::Task { .. } => IssueType::Task,
        }
    }

    pub fn project_id(&self) -> Option<i64> {
        match self.placement {
            IssuePlacement::Epic { project_id } => Some(project_id),
            IssuePlacement::Task { project_id, .. } => project_id,
        }
    }

    pub fn parent_id(&self) -> Option<i64> {
        match self.placement {
            IssuePlacement::Epic { .. } => None,
            IssuePlacement::Task { parent, .. } => Some(parent),
        }
    }
}
