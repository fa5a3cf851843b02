mod wiring;

use crate::{cli, context, rest, storage};
use anyhow::{Context as AnyhowContext, Result};
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli);

        crate::tracing::init(ctx.config.log_file.as_deref());
        log::info!("🚀 Starting issuetracker");
        log::info!("📂 Data dir: {}", ctx.config.data_dir.to_string_lossy());

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;

        Ok((Self { ctx, storage }, cli))
    }
}

pub async fn run_daemon(app: App) -> Result<()> {
    let config = &app.ctx.config;
    log::info!("🌐 REST API: http://{}", config.api_listen);
    log::info!("🔗 Frontend URL: {}", config.frontend_url);
    log::info!("⏱️ Token lifetime: {}s", config.jwt_ttl_secs);
    if let Some(path) = config.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.to_string_lossy());
    }

    let jwt = wiring::build_jwt_keys(&app.ctx)?;
    let mailer = wiring::build_mailer(&app.ctx)?;
    let state = rest::AppState::new(app.storage, jwt, mailer, config.frontend_url.clone());

    let shutdown = CancellationToken::new();
    let api_addr = config.api_listen;
    let rest_shutdown = shutdown.clone();

    let mut rest_handle =
        tokio::spawn(async move { rest::serve(api_addr, state, rest_shutdown).await });

    let served = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
            None
        }
        result = &mut rest_handle => Some(result),
    };

    shutdown.cancel();
    let result = match served {
        Some(result) => result,
        None => rest_handle.await,
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::error!("REST server error: {:#}", e);
            return Err(e);
        }
        Err(e) => {
            log::error!("REST task failed: {}", e);
            return Err(e.into());
        }
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        // one-shot command mode
        cmd.run(&app.ctx, &app.storage)?;
        return Ok(());
    }

    run_daemon(app).await
}
