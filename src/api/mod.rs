//! JSON API over the article store and the two pipelines.

mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::AppError;

pub type SharedApp = Arc<App>;

pub fn router(app: SharedApp) -> Router {
    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/article/{id}", get(handlers::get_article))
        .route("/api/stats", get(handlers::stats))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/analyze", post(handlers::analyze))
        .route(
            "/api/config",
            get(handlers::get_config).post(handlers::update_config),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
