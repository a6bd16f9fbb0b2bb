mod api;
mod basic;
mod chart;
mod page;

use crate::dataset::Dataset;
use crate::error::Result;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use chart::render_svg;
pub use page::{escape_html, render_page};

/// Read-only state shared by every handler
pub struct AppState {
    pub dataset: Dataset,
}

pub fn router(state: Arc<AppState>) -> Router {
    add_routes(
        Router::new(),
        &[basic::add_route, page::add_route, api::add_route],
    )
    .with_state(state)
}

/// Serve the dashboard until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Dashboard listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn add_routes<T>(app: Router<T>, funcs: &[fn(Router<T>) -> Router<T>]) -> Router<T> {
    let mut app = app;
    for func in funcs {
        app = func(app);
    }
    app
}
