//! Sample routes that emit one log record at each severity.
//!
//! Loggers read the ambient request context, so the same router works with or
//! without [`RequestSpanLayer`](crate::http::middleware::RequestSpanLayer)
//! wrapped around it.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::logging::{FieldValue, Level, Logger};

#[derive(Clone, Debug)]
pub struct AppState {
    pub logger: Logger,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    message: Option<String>,
}

impl MessageQuery {
    fn or(self, default: &str) -> String {
        self.message.unwrap_or_else(|| default.to_string())
    }
}

/// Router with the `/logging/*`, `/errors/*` and `/healthz` routes.
pub fn router(logger: Logger) -> Router {
    Router::new()
        .route("/logging/debug", get(send_debug))
        .route("/logging/info", get(send_info))
        .route("/logging/exception", get(send_exception))
        .route("/logging/exception_stack", get(send_exception_details))
        .route("/logging/error", get(send_error))
        .route("/logging/critical", get(send_critical))
        .route("/errors/stacktrace", get(broken_code))
        .route("/healthz", get(healthz))
        .with_state(AppState { logger })
}

async fn send_debug(State(state): State<AppState>, Query(q): Query<MessageQuery>) -> Json<()> {
    state.logger.debug(q.or("Debug message"));
    Json(())
}

async fn send_info(State(state): State<AppState>, Query(q): Query<MessageQuery>) -> Json<()> {
    state.logger.info(q.or("info message"));
    Json(())
}

async fn send_exception(State(state): State<AppState>, Query(q): Query<MessageQuery>) -> Json<()> {
    state.logger.error(q.or("exception message"));
    Json(())
}

async fn send_exception_details(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
) -> Json<()> {
    let details = json!({ "message": "information inside the exception" });
    state.logger.log_with_fields(
        Level::Error,
        q.or("exception_details message"),
        [("exception", FieldValue::Json(details))],
    );
    Json(())
}

async fn send_error(State(state): State<AppState>, Query(q): Query<MessageQuery>) -> Json<()> {
    state.logger.error(q.or("error message"));
    Json(())
}

async fn send_critical(State(state): State<AppState>, Query(q): Query<MessageQuery>) -> Json<()> {
    state.logger.critical(q.or("critical message"));
    Json(())
}

async fn broken_code() -> Json<u32> {
    let divisor = std::hint::black_box(0u32);
    Json(1 / divisor)
}

async fn healthz() -> &'static str {
    "ok"
}
