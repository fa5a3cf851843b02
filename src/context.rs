use std::path::PathBuf;

use crate::configuration::Configuration;

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let cfg = Configuration {
            data_dir: PathBuf::from(&cli.data_dir),
            reset: cli.reset,
            api_listen: cli.api_listen,
            jwt_secret: cli.jwt_secret.clone().filter(|secret| !secret.is_empty()),
            jwt_ttl_secs: cli.jwt_ttl,
            frontend_url: cli.frontend_url.clone(),
            mailer_from: cli.mailer_from.clone(),
            smtp_url: cli.smtp_url.clone().filter(|url| !url.trim().is_empty()),
            log_file: cli.log_file.as_ref().map(PathBuf::from),
        };
        Self { config: cfg }
    }
}
