use std::net::TcpListener;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

mod common;

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free port")
}

fn http_get(port: u16, path: &str) -> reqwest::Result<reqwest::blocking::Response> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?
        .get(format!("http://127.0.0.1:{port}{path}"))
        .send()
}

#[test]
fn e2e_serve_answers_health_and_guards_api() {
    let data_dir = TempDir::new().expect("temp dir");
    let port = free_port();

    let child = common::base_cmd(&data_dir)
        .arg("--api-listen")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--jwt-secret")
        .arg(common::JWT_SECRET)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn server");
    let _guard = KillOnDrop(child);

    let deadline = Instant::now() + Duration::from_secs(30);
    let health = loop {
        if let Ok(response) = http_get(port, "/health") {
            break response;
        }
        assert!(Instant::now() < deadline, "server did not come up");
        std::thread::sleep(Duration::from_millis(100));
    };
    assert_eq!(health.status(), StatusCode::OK);
    let body: Value = health.json().expect("health json");
    assert_eq!(body["status"], "ok");

    let projects = http_get(port, "/api/projects").expect("api response");
    assert_eq!(projects.status(), StatusCode::UNAUTHORIZED);
    let body: Value = projects.json().expect("error json");
    assert_eq!(body["message"], "JWT Token not found");
}

#[test]
fn e2e_serve_without_secret_exits_with_error() {
    let data_dir = TempDir::new().expect("temp dir");
    let output = common::base_cmd(&data_dir)
        .arg("--api-listen")
        .arg(format!("127.0.0.1:{}", free_port()))
        .output()
        .expect("run server");
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("JWT secret"),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}
