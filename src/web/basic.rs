use super::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/healthcheck", get(|| async { "OK" }))
}
