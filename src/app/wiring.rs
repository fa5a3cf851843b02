use std::sync::Arc;

use crate::{
    auth::JwtKeys,
    context,
    mailer::{LogMailer, Mailer, SmtpMailer},
    storage,
};
use anyhow::{Context, Result};

pub fn init_data_dir(ctx: &context::Context) -> Result<()> {
    std::fs::create_dir_all(&ctx.config.data_dir)?;
    Ok(())
}

pub fn init_storage(ctx: &context::Context) -> Result<storage::SqliteStorage> {
    let sqlite = storage::SqliteStorage::new(ctx.config.db_path());
    if ctx.config.reset {
        sqlite.reset_all().context("resetting storage")?;
    }
    sqlite.init().context("initializing storage")?;
    Ok(sqlite)
}

pub fn build_jwt_keys(ctx: &context::Context) -> Result<JwtKeys> {
    let secret = ctx
        .config
        .jwt_secret
        .as_deref()
        .context("a JWT secret is required to serve; set --jwt-secret or TRACKER_JWT_SECRET")?;
    Ok(JwtKeys::new(secret.as_bytes(), ctx.config.jwt_ttl_secs))
}

pub fn build_mailer(ctx: &context::Context) -> Result<Arc<dyn Mailer>> {
    match ctx.config.smtp_url.as_deref() {
        Some(url) => {
            let mailer =
                SmtpMailer::from_url(url, &ctx.config.mailer_from).context("configuring SMTP")?;
            Ok(Arc::new(mailer))
        }
        None => {
            log::warn!("✉️ No SMTP server configured; emails will only be logged");
            Ok(Arc::new(LogMailer {
                from: ctx.config.mailer_from.clone(),
            }))
        }
    }
}
