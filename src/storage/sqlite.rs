use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use std::{path::Path, str::FromStr};

use super::traits::{Storage, StorageRead, StorageTx, StorageWrite};
use crate::types::{
    decode_roles, encode_roles, Comment, Issue, IssueStatus, IssueType, NewComment, NewIssue,
    NewProject, NewSprint, NewUser, Project, ProjectActivity, Sprint, User,
};

const DB_SCHEMA_VERSION: i64 = 2;

/// Linear schema history. Entry `n` upgrades `user_version` from `n` to `n + 1`.
const MIGRATIONS: [&str; DB_SCHEMA_VERSION as usize] = [
    r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        password TEXT NOT NULL,
        roles TEXT NOT NULL,
        reset_token TEXT,
        reset_token_expires_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX users_reset_token_idx
        ON users(reset_token)
        WHERE reset_token IS NOT NULL;
    CREATE TABLE projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER REFERENCES projects(id) ON DELETE CASCADE,
        type TEXT NOT NULL CHECK (type IN ('epic', 'task')),
        status TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'done')),
        parent_id INTEGER REFERENCES issues(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        story_points INTEGER,
        assignee_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        reporter_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (type <> 'epic' OR (project_id IS NOT NULL AND parent_id IS NULL)),
        CHECK (type <> 'task' OR parent_id IS NOT NULL)
    );
    CREATE INDEX issues_project_idx ON issues(project_id);
    CREATE INDEX issues_parent_idx ON issues(parent_id);
    CREATE INDEX issues_assignee_idx ON issues(assignee_id);
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        author_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX comments_issue_idx ON comments(issue_id);
    CREATE TABLE sprints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        CHECK (end_date >= start_date)
    );
    "#,
    r#"
    CREATE TABLE sprint_issue (
        sprint_id INTEGER NOT NULL REFERENCES sprints(id) ON DELETE CASCADE,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        PRIMARY KEY (sprint_id, issue_id)
    );
    CREATE INDEX sprint_issue_issue_idx ON sprint_issue(issue_id);
    "#,
];

const USER_COLUMNS: &str = "id, email, first_name, last_name, password, roles, reset_token, reset_token_expires_at, created_at, updated_at";
const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.created_at, p.updated_at";
const ISSUE_COLUMNS: &str = "i.id, i.project_id, i.type, i.status, i.parent_id, i.title, i.description, i.story_points, i.assignee_id, i.reporter_id, i.created_at, i.updated_at";
const SPRINT_COLUMNS: &str = "s.id, s.name, s.start_date, s.end_date, s.is_active";
const COMMENT_COLUMNS: &str = "id, issue_id, author_id, content, created_at";

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

pub struct SqliteTx {
    conn: Connection,
}

impl StorageTx for SqliteTx {
    fn commit(self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

fn conversion_error<E>(col: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(col, ty, Box::new(err))
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let roles_raw: String = row.get(5)?;
    let roles = decode_roles(&roles_raw).map_err(|err| conversion_error(5, Type::Text, err))?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        roles,
        reset_token_hash: row.get(6)?,
        reset_token_expires_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn map_issue_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issue> {
    let type_raw: String = row.get(2)?;
    let issue_type =
        IssueType::from_str(&type_raw).map_err(|err| conversion_error(2, Type::Text, err))?;
    let status_raw: String = row.get(3)?;
    let status =
        IssueStatus::from_str(&status_raw).map_err(|err| conversion_error(3, Type::Text, err))?;
    Ok(Issue {
        id: row.get(0)?,
        project_id: row.get(1)?,
        issue_type,
        status,
        parent_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        story_points: row.get(7)?,
        assignee_id: row.get(8)?,
        reporter_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_sprint_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Sprint> {
    let is_active_int: i64 = row.get(4)?;
    Ok(Sprint {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get::<_, NaiveDate>(2)?,
        end_date: row.get::<_, NaiveDate>(3)?,
        is_active: is_active_int != 0,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get::<_, DateTime<Utc>>(4)?,
    })
}

fn query_list<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>>
where
    P: rusqlite::Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_find_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        map_user_row,
    )
    .optional()
}

fn db_find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email.trim()],
        map_user_row,
    )
    .optional()
}

fn db_find_user_by_reset_token_hash(
    conn: &Connection,
    token_hash: &str,
) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE reset_token = ?1"),
        params![token_hash],
        map_user_row,
    )
    .optional()
}

fn db_list_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    query_list(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"),
        [],
        map_user_row,
    )
}

fn db_find_project(conn: &Connection, id: i64) -> rusqlite::Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
        params![id],
        map_project_row,
    )
    .optional()
}

fn db_list_projects(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    query_list(
        conn,
        &format!("SELECT {PROJECT_COLUMNS} FROM projects p ORDER BY p.id"),
        [],
        map_project_row,
    )
}

fn db_list_project_issues(conn: &Connection, project_id: i64) -> rusqlite::Result<Vec<Issue>> {
    query_list(
        conn,
        &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.project_id = ?1 ORDER BY i.id"),
        params![project_id],
        map_issue_row,
    )
}

fn db_top_active_projects(
    conn: &Connection,
    limit: usize,
) -> rusqlite::Result<Vec<ProjectActivity>> {
    let sql = format!(
        r#"
        SELECT {PROJECT_COLUMNS},
            SUM(CASE WHEN i.status IN ('todo', 'in_progress') THEN 1 ELSE 0 END) AS opened_issue_count,
            SUM(CASE WHEN i.status = 'done' THEN 1 ELSE 0 END) AS finished_issue_count
        FROM projects p
        LEFT JOIN issues i ON i.project_id = p.id
        GROUP BY p.id
        ORDER BY opened_issue_count DESC, p.id ASC
        LIMIT ?1
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(ProjectActivity {
                project: map_project_row(row)?,
                opened_issue_count: row.get(5)?,
                finished_issue_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_find_issue(conn: &Connection, id: i64) -> rusqlite::Result<Option<Issue>> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.id = ?1"),
        params![id],
        map_issue_row,
    )
    .optional()
}

fn db_list_child_issues(conn: &Connection, parent_id: i64) -> rusqlite::Result<Vec<Issue>> {
    query_list(
        conn,
        &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.parent_id = ?1 ORDER BY i.id"),
        params![parent_id],
        map_issue_row,
    )
}

fn db_list_assigned_open_issues(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Issue>> {
    query_list(
        conn,
        &format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues i
            WHERE i.assignee_id = ?1
              AND i.status IN ('in_progress', 'todo')
              AND i.type <> 'epic'
            ORDER BY i.status ASC, i.updated_at DESC, i.id DESC
            "#
        ),
        params![user_id],
        map_issue_row,
    )
}

fn db_list_backlog(conn: &Connection) -> rusqlite::Result<Vec<Issue>> {
    query_list(
        conn,
        &format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues i
            LEFT JOIN sprint_issue si ON si.issue_id = i.id
            WHERE (si.sprint_id IS NULL OR i.status <> 'done')
              AND i.type <> 'epic'
            GROUP BY i.id
            ORDER BY i.created_at DESC, i.id DESC
            "#
        ),
        [],
        map_issue_row,
    )
}

fn db_find_sprint(conn: &Connection, id: i64) -> rusqlite::Result<Option<Sprint>> {
    conn.query_row(
        &format!("SELECT {SPRINT_COLUMNS} FROM sprints s WHERE s.id = ?1"),
        params![id],
        map_sprint_row,
    )
    .optional()
}

fn db_find_active_sprint(conn: &Connection) -> rusqlite::Result<Option<Sprint>> {
    conn.query_row(
        &format!("SELECT {SPRINT_COLUMNS} FROM sprints s WHERE s.is_active = 1 ORDER BY s.id LIMIT 1"),
        [],
        map_sprint_row,
    )
    .optional()
}

fn db_list_sprints(conn: &Connection) -> rusqlite::Result<Vec<Sprint>> {
    query_list(
        conn,
        &format!("SELECT {SPRINT_COLUMNS} FROM sprints s ORDER BY s.start_date ASC, s.id ASC"),
        [],
        map_sprint_row,
    )
}

fn db_list_sprint_issues(conn: &Connection, sprint_id: i64) -> rusqlite::Result<Vec<Issue>> {
    query_list(
        conn,
        &format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues i
            JOIN sprint_issue si ON si.issue_id = i.id
            WHERE si.sprint_id = ?1
            ORDER BY i.id
            "#
        ),
        params![sprint_id],
        map_issue_row,
    )
}

fn db_sprint_has_issue(conn: &Connection, sprint_id: i64, issue_id: i64) -> rusqlite::Result<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sprint_issue WHERE sprint_id = ?1 AND issue_id = ?2",
            params![sprint_id, issue_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(existing.is_some())
}

fn db_find_comment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        params![id],
        map_comment_row,
    )
    .optional()
}

fn db_list_comments(conn: &Connection, issue_id: i64) -> rusqlite::Result<Vec<Comment>> {
    query_list(
        conn,
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE issue_id = ?1 ORDER BY created_at, id"),
        params![issue_id],
        map_comment_row,
    )
}

fn db_insert_user(conn: &Connection, user: &NewUser) -> rusqlite::Result<User> {
    conn.execute(
        r#"
        INSERT INTO users (email, first_name, last_name, password, roles, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
        params![
            user.email.trim(),
            user.first_name,
            user.last_name,
            user.password_hash,
            encode_roles(&user.roles),
            user.created_at
        ],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        email: user.email.trim().to_string(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        password_hash: user.password_hash.clone(),
        roles: user.roles.clone(),
        reset_token_hash: None,
        reset_token_expires_at: None,
        created_at: user.created_at,
        updated_at: user.created_at,
    })
}

fn db_update_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        UPDATE users
        SET email = ?2, first_name = ?3, last_name = ?4, password = ?5, roles = ?6,
            reset_token = ?7, reset_token_expires_at = ?8, updated_at = ?9
        WHERE id = ?1
        "#,
        params![
            user.id,
            user.email.trim(),
            user.first_name,
            user.last_name,
            user.password_hash,
            encode_roles(&user.roles),
            user.reset_token_hash,
            user.reset_token_expires_at,
            user.updated_at
        ],
    )?;
    Ok(())
}

fn db_insert_project(conn: &Connection, project: &NewProject) -> rusqlite::Result<Project> {
    conn.execute(
        "INSERT INTO projects (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![project.name, project.description, project.created_at],
    )?;
    Ok(Project {
        id: conn.last_insert_rowid(),
        name: project.name.clone(),
        description: project.description.clone(),
        created_at: project.created_at,
        updated_at: project.created_at,
    })
}

fn db_update_project(conn: &Connection, project: &Project) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE projects SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            project.id,
            project.name,
            project.description,
            project.updated_at
        ],
    )?;
    Ok(())
}

fn db_insert_issue(conn: &Connection, issue: &NewIssue) -> rusqlite::Result<Issue> {
    let status = IssueStatus::Todo;
    conn.execute(
        r#"
        INSERT INTO issues (
            project_id, type, status, parent_id, title, description, story_points,
            assignee_id, reporter_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
        params![
            issue.project_id(),
            issue.issue_type().as_str(),
            status.as_str(),
            issue.parent_id(),
            issue.title,
            issue.description,
            issue.story_points,
            issue.assignee_id,
            issue.reporter_id,
            issue.created_at
        ],
    )?;
    Ok(Issue {
        id: conn.last_insert_rowid(),
        project_id: issue.project_id(),
        issue_type: issue.issue_type(),
        status,
        parent_id: issue.parent_id(),
        title: issue.title.clone(),
        description: issue.description.clone(),
        story_points: issue.story_points,
        assignee_id: issue.assignee_id,
        reporter_id: issue.reporter_id,
        created_at: issue.created_at,
        updated_at: issue.created_at,
    })
}

fn db_update_issue(conn: &Connection, issue: &Issue) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        UPDATE issues
        SET title = ?2, description = ?3, status = ?4, story_points = ?5,
            assignee_id = ?6, updated_at = ?7
        WHERE id = ?1
        "#,
        params![
            issue.id,
            issue.title,
            issue.description,
            issue.status.as_str(),
            issue.story_points,
            issue.assignee_id,
            issue.updated_at
        ],
    )?;
    Ok(())
}

fn db_insert_sprint(conn: &Connection, sprint: &NewSprint) -> rusqlite::Result<Sprint> {
    conn.execute(
        "INSERT INTO sprints (name, start_date, end_date, is_active) VALUES (?1, ?2, ?3, ?4)",
        params![
            sprint.name,
            sprint.start_date,
            sprint.end_date,
            sprint.is_active as i64
        ],
    )?;
    Ok(Sprint {
        id: conn.last_insert_rowid(),
        name: sprint.name.clone(),
        start_date: sprint.start_date,
        end_date: sprint.end_date,
        is_active: sprint.is_active,
    })
}

fn db_update_sprint(conn: &Connection, sprint: &Sprint) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE sprints SET name = ?2, start_date = ?3, end_date = ?4, is_active = ?5 WHERE id = ?1",
        params![
            sprint.id,
            sprint.name,
            sprint.start_date,
            sprint.end_date,
            sprint.is_active as i64
        ],
    )?;
    Ok(())
}

fn db_deactivate_other_sprints(conn: &Connection, keep_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE sprints SET is_active = 0 WHERE id <> ?1 AND is_active = 1",
        params![keep_id],
    )
}

fn db_add_sprint_issue(conn: &Connection, sprint_id: i64, issue_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sprint_issue (sprint_id, issue_id) VALUES (?1, ?2)",
        params![sprint_id, issue_id],
    )?;
    Ok(())
}

fn db_remove_sprint_issue(
    conn: &Connection,
    sprint_id: i64,
    issue_id: i64,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM sprint_issue WHERE sprint_id = ?1 AND issue_id = ?2",
        params![sprint_id, issue_id],
    )?;
    Ok(rows > 0)
}

fn db_insert_comment(conn: &Connection, comment: &NewComment) -> rusqlite::Result<Comment> {
    conn.execute(
        "INSERT INTO comments (issue_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            comment.issue_id,
            comment.author_id,
            comment.content,
            comment.created_at
        ],
    )?;
    Ok(Comment {
        id: conn.last_insert_rowid(),
        issue_id: comment.issue_id,
        author_id: comment.author_id,
        content: comment.content.clone(),
        created_at: comment.created_at,
    })
}

fn db_delete_by_id(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
    Ok(rows > 0)
}

impl StorageRead for SqliteTx {
    fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(db_find_user(&self.conn, id)?)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(db_find_user_by_email(&self.conn, email)?)
    }

    fn find_user_by_reset_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        Ok(db_find_user_by_reset_token_hash(&self.conn, token_hash)?)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(db_list_users(&self.conn)?)
    }

    fn find_project(&self, id: i64) -> Result<Option<Project>> {
        Ok(db_find_project(&self.conn, id)?)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(db_list_projects(&self.conn)?)
    }

    fn list_project_issues(&self, project_id: i64) -> Result<Vec<Issue>> {
        Ok(db_list_project_issues(&self.conn, project_id)?)
    }

    fn top_active_projects(&self, limit: usize) -> Result<Vec<ProjectActivity>> {
        Ok(db_top_active_projects(&self.conn, limit)?)
    }

    fn find_issue(&self, id: i64) -> Result<Option<Issue>> {
        Ok(db_find_issue(&self.conn, id)?)
    }

    fn list_child_issues(&self, parent_id: i64) -> Result<Vec<Issue>> {
        Ok(db_list_child_issues(&self.conn, parent_id)?)
    }

    fn list_assigned_open_issues(&self, user_id: i64) -> Result<Vec<Issue>> {
        Ok(db_list_assigned_open_issues(&self.conn, user_id)?)
    }

    fn list_backlog(&self) -> Result<Vec<Issue>> {
        Ok(db_list_backlog(&self.conn)?)
    }

    fn find_sprint(&self, id: i64) -> Result<Option<Sprint>> {
        Ok(db_find_sprint(&self.conn, id)?)
    }

    fn find_active_sprint(&self) -> Result<Option<Sprint>> {
        Ok(db_find_active_sprint(&self.conn)?)
    }

    fn list_sprints(&self) -> Result<Vec<Sprint>> {
        Ok(db_list_sprints(&self.conn)?)
    }

    fn list_sprint_issues(&self, sprint_id: i64) -> Result<Vec<Issue>> {
        Ok(db_list_sprint_issues(&self.conn, sprint_id)?)
    }

    fn sprint_has_issue(&self, sprint_id: i64, issue_id: i64) -> Result<bool> {
        Ok(db_sprint_has_issue(&self.conn, sprint_id, issue_id)?)
    }

    fn find_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(db_find_comment(&self.conn, id)?)
    }

    fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>> {
        Ok(db_list_comments(&self.conn, issue_id)?)
    }
}

impl StorageWrite for SqliteTx {
    fn insert_user(&self, user: &NewUser) -> Result<User> {
        Ok(db_insert_user(&self.conn, user)?)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        Ok(db_update_user(&self.conn, user)?)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        Ok(db_delete_by_id(&self.conn, "users", id)?)
    }

    fn insert_project(&self, project: &NewProject) -> Result<Project> {
        Ok(db_insert_project(&self.conn, project)?)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        Ok(db_update_project(&self.conn, project)?)
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        Ok(db_delete_by_id(&self.conn, "projects", id)?)
    }

    fn insert_issue(&self, issue: &NewIssue) -> Result<Issue> {
        Ok(db_insert_issue(&self.conn, issue)?)
    }

    fn update_issue(&self, issue: &Issue) -> Result<()> {
        Ok(db_update_issue(&self.conn, issue)?)
    }

    fn delete_issue(&self, id: i64) -> Result<bool> {
        Ok(db_delete_by_id(&self.conn, "issues", id)?)
    }

    fn insert_sprint(&self, sprint: &NewSprint) -> Result<Sprint> {
        Ok(db_insert_sprint(&self.conn, sprint)?)
    }

    fn update_sprint(&self, sprint: &Sprint) -> Result<()> {
        Ok(db_update_sprint(&self.conn, sprint)?)
    }

    fn delete_sprint(&self, id: i64) -> Result<bool> {
        Ok(db_delete_by_id(&self.conn, "sprints", id)?)
    }

    fn deactivate_other_sprints(&self, keep_id: i64) -> Result<usize> {
        Ok(db_deactivate_other_sprints(&self.conn, keep_id)?)
    }

    fn add_sprint_issue(&self, sprint_id: i64, issue_id: i64) -> Result<()> {
        Ok(db_add_sprint_issue(&self.conn, sprint_id, issue_id)?)
    }

    fn remove_sprint_issue(&self, sprint_id: i64, issue_id: i64) -> Result<bool> {
        Ok(db_remove_sprint_issue(&self.conn, sprint_id, issue_id)?)
    }

    fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        Ok(db_insert_comment(&self.conn, comment)?)
    }

    fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(db_delete_by_id(&self.conn, "comments", id)?)
    }
}

impl Storage for SqliteStorage {
    type Tx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = open_connection(&self.path)?;
        conn.execute("BEGIN IMMEDIATE", [])?;
        Ok(SqliteTx { conn })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn reset_all(&self) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let path = format!("{}{}", self.path, suffix);
            if Path::new(&path).exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = open_connection(&self.path)?;
        Self::migrate(&conn)?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        if !(0..DB_SCHEMA_VERSION).contains(&version) {
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
                Some(
                    "database schema version mismatch; please run with --reset option"
                        .to_string(),
                ),
            ));
        }

        log::info!(
            "SQLite schema migration: {} -> {}",
            version,
            DB_SCHEMA_VERSION
        );

        for (from, sql) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            let to = from as i64 + 1;
            conn.execute_batch(&format!(
                "BEGIN; {sql} PRAGMA user_version = {to}; COMMIT;"
            ))?;
            log::debug!("applied schema migration {}", to);
        }
        Ok(())
    }
}

impl StorageRead for SqliteStorage {
    fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user(conn, id))?)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user_by_email(conn, email))?)
    }

    fn find_user_by_reset_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user_by_reset_token_hash(conn, token_hash))?)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.with_conn(db_list_users)?)
    }

    fn find_project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.with_conn(|conn| db_find_project(conn, id))?)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.with_conn(db_list_projects)?)
    }

    fn list_project_issues(&self, project_id: i64) -> Result<Vec<Issue>> {
        Ok(self.with_conn(|conn| db_list_project_issues(conn, project_id))?)
    }

    fn top_active_projects(&self, limit: usize) -> Result<Vec<ProjectActivity>> {
        Ok(self.with_conn(|conn| db_top_active_projects(conn, limit))?)
    }

    fn find_issue(&self, id: i64) -> Result<Option<Issue>> {
        Ok(self.with_conn(|conn| db_find_issue(conn, id))?)
    }

    fn list_child_issues(&self, parent_id: i64) -> Result<Vec<Issue>> {
        Ok(self.with_conn(|conn| db_list_child_issues(conn, parent_id))?)
    }

    fn list_assigned_open_issues(&self, user_id: i64) -> Result<Vec<Issue>> {
        Ok(self.with_conn(|conn| db_list_assigned_open_issues(conn, user_id))?)
    }

    fn list_backlog(&self) -> Result<Vec<Issue>> {
        Ok(self.with_conn(db_list_backlog)?)
    }

    fn find_sprint(&self, id: i64) -> Result<Option<Sprint>> {
        Ok(self.with_conn(|conn| db_find_sprint(conn, id))?)
    }

    fn find_active_sprint(&self) -> Result<Option<Sprint>> {
        Ok(self.with_conn(db_find_active_sprint)?)
    }

    fn list_sprints(&self) -> Result<Vec<Sprint>> {
        Ok(self.with_conn(db_list_sprints)?)
    }

    fn list_sprint_issues(&self, sprint_id: i64) -> Result<Vec<Issue>> {
        Ok(self.with_conn(|conn| db_list_sprint_issues(conn, sprint_id))?)
    }

    fn sprint_has_issue(&self, sprint_id: i64, issue_id: i64) -> Result<bool> {
        Ok(self.with_conn(|conn| db_sprint_has_issue(conn, sprint_id, issue_id))?)
    }

    fn find_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.with_conn(|conn| db_find_comment(conn, id))?)
    }

    fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>> {
        Ok(self.with_conn(|conn| db_list_comments(conn, issue_id))?)
    }
}
