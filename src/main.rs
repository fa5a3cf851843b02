mod app;
mod auth;
mod cli;
mod commands;
mod configuration;
mod context;
mod mailer;
mod rest;
mod storage;
mod tracing;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
