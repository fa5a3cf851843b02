use crate::types::{
    Comment, Issue, NewComment, NewIssue, NewProject, NewSprint, NewUser, Project,
    ProjectActivity, Sprint, User,
};

pub trait StorageRead {
    fn find_user(&self, id: i64) -> anyhow::Result<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    fn find_user_by_reset_token_hash(&self, token_hash: &str) -> anyhow::Result<Option<User>>;
    fn list_users(&self) -> anyhow::Result<Vec<User>>;

    fn find_project(&self, id: i64) -> anyhow::Result<Option<Project>>;
    fn list_projects(&self) -> anyhow::Result<Vec<Project>>;
    fn list_project_issues(&self, project_id: i64) -> anyhow::Result<Vec<Issue>>;
    /// Projects ranked by open (todo + in progress) issue count, most active first.
    fn top_active_projects(&self, limit: usize) -> anyhow::Result<Vec<ProjectActivity>>;

    fn find_issue(&self, id: i64) -> anyhow::Result<Option<Issue>>;
    fn list_child_issues(&self, parent_id: i64) -> anyhow::Result<Vec<Issue>>;
    /// Open non-epic issues assigned to `user_id`, by status then most recently updated.
    fn list_assigned_open_issues(&self, user_id: i64) -> anyhow::Result<Vec<Issue>>;
    /// Non-epic issues that are either in no sprint or not done yet, newest first.
    fn list_backlog(&self) -> anyhow::Result<Vec<Issue>>;

    fn find_sprint(&self, id: i64) -> anyhow::Result<Option<Sprint>>;
    fn find_active_sprint(&self) -> anyhow::Result<Option<Sprint>>;
    fn list_sprints(&self) -> anyhow::Result<Vec<Sprint>>;
    fn list_sprint_issues(&self, sprint_id: i64) -> anyhow::Result<Vec<Issue>>;
    fn sprint_has_issue(&self, sprint_id: i64, issue_id: i64) -> anyhow::Result<bool>;

    fn find_comment(&self, id: i64) -> anyhow::Result<Option<Comment>>;
    fn list_comments(&self, issue_id: i64) -> anyhow::Result<Vec<Comment>>;
}

pub trait StorageWrite {
    fn insert_user(&self, user: &NewUser) -> anyhow::Result<User>;
    fn update_user(&self, user: &User) -> anyhow::Result<()>;
    fn delete_user(&self, id: i64) -> anyhow::Result<bool>;

    fn insert_project(&self, project: &NewProject) -> anyhow::Result<Project>;
    fn update_project(&self, project: &Project) -> anyhow::Result<()>;
    fn delete_project(&self, id: i64) -> anyhow::Result<bool>;

    fn insert_issue(&self, issue: &NewIssue) -> anyhow::Result<Issue>;
    fn update_issue(&self, issue: &Issue) -> anyhow::Result<()>;
    fn delete_issue(&self, id: i64) -> anyhow::Result<bool>;

    fn insert_sprint(&self, sprint: &NewSprint) -> anyhow::Result<Sprint>;
    fn update_sprint(&self, sprint: &Sprint) -> anyhow::Result<()>;
    fn delete_sprint(&self, id: i64) -> anyhow::Result<bool>;
    /// Clears the active flag on every sprint except `keep_id`.
    fn deactivate_other_sprints(&self, keep_id: i64) -> anyhow::Result<usize>;
    fn add_sprint_issue(&self, sprint_id: i64, issue_id: i64) -> anyhow::Result<()>;
    fn remove_sprint_issue(&self, sprint_id: i64, issue_id: i64) -> anyhow::Result<bool>;

    fn insert_comment(&self, comment: &NewComment) -> anyhow::Result<Comment>;
    fn delete_comment(&self, id: i64) -> anyhow::Result<bool>;
}

pub trait StorageTx: StorageRead + StorageWrite {
    fn commit(self) -> anyhow::Result<()>;
}

pub trait Storage: StorageRead + Clone + Send + Sync + 'static {
    type Tx: StorageTx;

    fn begin_tx(&self) -> anyhow::Result<Self::Tx>;
}
