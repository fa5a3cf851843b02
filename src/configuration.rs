use std::{net::SocketAddr, path::PathBuf};

use url::Url;

#[derive(Clone)]
pub struct Configuration {
    pub data_dir: PathBuf,
    pub reset: bool,
    pub api_listen: SocketAddr,
    /// Only needed to serve HTTP; CLI commands run without it.
    pub jwt_secret: Option<String>,
    pub jwt_ttl_secs: i64,
    pub frontend_url: Url,
    pub mailer_from: String,
    /// When absent, outgoing emails are only logged.
    pub smtp_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Configuration {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("issuetracker.sqlite")
    }
}
