mod comment;
mod issue;
mod project;
mod sprint;
mod tracker_error;
mod user;

pub use comment::{Comment, NewComment};
pub use issue::{Issue, IssuePlacement, IssueStatus, IssueType, NewIssue};
pub use project::{NewProject, Project, ProjectActivity};
pub use sprint::{parse_sprint_date, NewSprint, Sprint, SPRINT_DATE_FORMAT};
pub use tracker_error::TrackerError;
pub use user::{decode_roles, encode_roles, roles_for, NewUser, User, ROLE_ADMIN, ROLE_USER};
