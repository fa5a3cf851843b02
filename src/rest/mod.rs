use std::{net::SocketAddr, sync::Arc, time::SystemTime};

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use url::Url;

use crate::{auth::JwtKeys, mailer::Mailer, storage::Storage};

mod error;
mod extract;
mod handlers;
mod middleware_log;
mod models;
#[cfg(test)]
mod test_support;


#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub storage: S,
    pub started_at: SystemTime,
    pub jwt: JwtKeys,
    pub mailer: Arc<dyn Mailer>,
    /// Base of the links sent in password reset emails.
    pub frontend_url: Url,
}

impl<S: Storage> AppState<S> {
    pub fn new(storage: S, jwt: JwtKeys, mailer: Arc<dyn Mailer>, frontend_url: Url) -> Self {
        Self {
            storage,
            started_at: SystemTime::now(),
            jwt,
            mailer,
            frontend_url,
        }
    }
}

pub fn router<S: Storage>(state: AppState<S>) -> Router {
    use handlers::{auth, comments, dashboard, issues, password, projects, sprints, users};

    let api = Router::new()
        .route(
            "/projects",
            get(projects::list::<S>).post(projects::create::<S>),
        )
        .route(
            "/projects/:id",
            get(projects::show::<S>)
                .patch(projects::update::<S>)
                .delete(projects::remove::<S>),
        )
        .route("/issues", post(issues::create::<S>))
        .route("/issues/backlog", get(issues::backlog::<S>))
        .route(
            "/issues/:id",
            get(issues::show::<S>)
                .patch(issues::update::<S>)
                .delete(issues::remove::<S>),
        )
        .route("/issues/:id/children", get(issues::children::<S>))
        .route(
            "/issues/:id/comments",
            get(comments::list::<S>).post(comments::create::<S>),
        )
        .route("/comments/:id", delete(comments::remove::<S>))
        .route(
            "/sprints",
            get(sprints::active::<S>).post(sprints::create::<S>),
        )
        .route("/sprints/all", get(sprints::list::<S>))
        .route(
            "/sprints/:id",
            get(sprints::show::<S>)
                .patch(sprints::update::<S>)
                .delete(sprints::remove::<S>),
        )
        .route(
            "/sprints/:id/issues/:issue_id",
            put(sprints::add_issue::<S>).delete(sprints::remove_issue::<S>),
        )
        .route("/users", get(users::list::<S>).post(users::create::<S>))
        .route("/users/me", get(users::me))
        .route(
            "/users/:id",
            get(users::show::<S>)
                .patch(users::update::<S>)
                .delete(users::remove::<S>),
        )
        .route("/dashboard", get(dashboard::show::<S>));

    Router::new()
        .route("/health", get(handlers::health::<S>))
        .route("/auth", post(auth::login::<S>))
        .route("/password/forgot", post(password::forgot::<S>))
        .route("/password/reset", post(password::reset::<S>))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(middleware_log::log_requests))
        .with_state(state)
}

pub async fn serve<S: Storage>(
    addr: SocketAddr,
    state: AppState<S>,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    log::info!("🌐 REST service on http://{}", addr);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
