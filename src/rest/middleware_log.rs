use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;

/// One log line per request: method, path, status and latency.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, path = %path);

    let started = Instant::now();
    let response = next.run(request).instrument(span).await;
    let elapsed = started.elapsed();

    let status = response.status();
    if status.is_server_error() {
        log::error!("{} {} -> {} ({:?})", method, path, status.as_u16(), elapsed);
    } else {
        log::info!("{} {} -> {} ({:?})", method, path, status.as_u16(), elapsed);
    }
    response
}
