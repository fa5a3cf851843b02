use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use super::{router, AppState};
use crate::{
    auth::{hash_password, JwtKeys},
    mailer::RecordingMailer,
    storage::{sqlite::SqliteTx, SqliteStorage, Storage, StorageTx, StorageWrite},
    types::{roles_for, Issue, IssuePlacement, NewIssue, NewProject, NewUser, Project, User},
};

pub const TEST_SECRET: &[u8] = b"test-secret-with-enough-entropy";

pub struct TestApp {
    pub state: AppState<SqliteStorage>,
    pub mailer: RecordingMailer,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(dir.path().join("tracker.sqlite"));
        storage.init().unwrap();
        let mailer = RecordingMailer::default();
        let state = AppState::new(
            storage,
            JwtKeys::new(TEST_SECRET, 3600),
            Arc::new(mailer.clone()),
            Url::parse("http://localhost:3000").unwrap(),
        );
        Self {
            state,
            mailer,
            _dir: dir,
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.state.storage
    }

    fn write<T>(&self, f: impl FnOnce(&SqliteTx) -> T) -> T {
        let tx = self.state.storage.begin_tx().unwrap();
        let out = f(&tx);
        tx.commit().unwrap();
        out
    }

    /// Seeds an account without a usable password.
    pub fn user(&self, email: &str, is_admin: bool) -> User {
        self.write(|tx| {
            tx.insert_user(&NewUser {
                email: email.to_string(),
                first_name: "First".to_string(),
                last_name: "Last".to_string(),
                password_hash: String::new(),
                roles: roles_for(is_admin),
                created_at: Utc::now(),
            })
            .unwrap()
        })
    }

    pub fn user_with_password(&self, email: &str, password: &str) -> User {
        let hash = hash_password(password).unwrap();
        self.write(|tx| {
            tx.insert_user(&NewUser {
                email: email.to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                password_hash: hash,
                roles: roles_for(false),
                created_at: Utc::now(),
            })
            .unwrap()
        })
    }

    pub fn project(&self, name: &str) -> Project {
        self.write(|tx| {
            tx.insert_project(&NewProject {
                name: name.to_string(),
                description: String::new(),
                created_at: Utc::now(),
            })
            .unwrap()
        })
    }

    pub fn epic(&self, project: &Project, title: &str) -> Issue {
        self.issue(IssuePlacement::Epic { project_id: project.id }, title, None)
    }

    pub fn task(&self, epic: &Issue, title: &str, assignee: Option<&User>) -> Issue {
        self.issue(
            IssuePlacement::Task {
                parent: epic.id,
                project_id: epic.project_id,
            },
            title,
            assignee.map(|u| u.id),
        )
    }

    fn issue(&self, placement: IssuePlacement, title: &str, assignee_id: Option<i64>) -> Issue {
        self.write(|tx| {
            tx.insert_issue(&NewIssue {
                placement,
                title: title.to_string(),
                description: String::new(),
                story_points: None,
                assignee_id,
                reporter_id: None,
                created_at: Utc::now(),
            })
            .unwrap()
        })
    }

    pub fn token(&self, user: &User) -> String {
        self.state.jwt.issue(user).unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send_request(builder.body(body).unwrap()).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }
}
