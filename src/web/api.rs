use super::AppState;
use crate::data::Series;
use crate::dataset::View;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/api/views", get(list_views))
        .route("/api/views/{view}", get(view_series))
}

#[derive(Debug, Serialize)]
struct ViewResponse {
    view: View,
    series: Vec<Series>,
}

async fn list_views() -> Json<Vec<&'static str>> {
    Json(View::ALL.iter().map(|v| v.label()).collect())
}

async fn view_series(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Response {
    let view = match label.parse::<View>() {
        Ok(view) => view,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e),
    };

    match state.dataset.view_series(view) {
        Ok(series) => Json(ViewResponse { view, series }).into_response(),
        Err(e @ AppError::ColumnUnavailable(_)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

fn error_response(status: StatusCode, err: AppError) -> Response {
    warn!("API request failed ({}): {}", status, err);
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
