use std::process::Command as ProcCommand;

use tempfile::TempDir;

#[allow(dead_code)]
pub const JWT_SECRET: &str = "e2e-secret";

/// The tracker binary pointed at `data_dir`, isolated from any `.env` or
/// `TRACKER_*` variables of the surrounding shell.
pub fn base_cmd(data_dir: &TempDir) -> ProcCommand {
    let mut command = ProcCommand::new(env!("CARGO_BIN_EXE_issuetracker"));

    for (key, _) in std::env::vars() {
        if key.starts_with("TRACKER_") {
            command.env_remove(key);
        }
    }
    command
        .env("DOTENV_PATH", data_dir.path().join("missing.env"))
        .env("RUST_LOG", "info")
        .arg("--data-dir")
        .arg(data_dir.path());

    command
}

#[allow(dead_code)]
pub fn db_path(data_dir: &TempDir) -> std::path::PathBuf {
    data_dir.path().join("issuetracker.sqlite")
}
