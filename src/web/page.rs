use super::chart::render_svg;
use super::AppState;
use crate::dataset::{Dataset, View};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

const TITLE: &str = "AQI Forecasting Dashboard";

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/", get(dashboard))
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    view: Option<String>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> (StatusCode, Html<String>) {
    let view = match query.view.as_deref() {
        None => View::default(),
        Some(label) => match label.parse::<View>() {
            Ok(view) => view,
            Err(e) => {
                warn!("Dashboard request for {}", e);
                return (
                    StatusCode::NOT_FOUND,
                    Html(render_page(&state.dataset, None)),
                );
            }
        },
    };

    (StatusCode::OK, Html(render_page(&state.dataset, Some(view))))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Break up every `</style` in any letter case so injected CSS cannot close
/// the element it is embedded in
fn neutralise_style_close(css: &str) -> String {
    const CLOSE: &[u8] = b"</style";
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let (mut start, mut i) = (0, 0);
    while i + CLOSE.len() <= bytes.len() {
        if bytes[i..i + CLOSE.len()].eq_ignore_ascii_case(CLOSE) {
            out.push_str(&css[start..i]);
            out.push_str("<\\/");
            start = i + 2;
            i += CLOSE.len();
        } else {
            i += 1;
        }
    }
    out.push_str(&css[start..]);
    out
}

/// Full dashboard page for `view`; `None` renders an unknown-view notice
/// in place of the chart.
pub fn render_page(dataset: &Dataset, view: Option<View>) -> String {
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{TITLE}</title>\n\
         <style>{}</style>\n</head>\n<body>\n<main>\n<h1>{TITLE}</h1>\n",
        neutralise_style_close(&dataset.stylesheet)
    );

    html.push_str(
        "<h2>Welcome to the AQI Forecasting Dashboard</h2>\n\
         <p>This dashboard allows you to view historical AQI data, along with ARIMA and SARIMA forecasts.</p>\n",
    );

    render_selector(&mut html, view);

    match view {
        Some(view) => render_view(&mut html, dataset, view),
        None => html.push_str(
            "<div class=\"graph-container\">\n<p class=\"diagnostic\">Unknown graph selection.</p>\n</div>\n",
        ),
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_selector(html: &mut String, selected: Option<View>) {
    html.push_str(
        "<form method=\"get\" action=\"/\">\n<label for=\"view\">Choose a graph to display:</label>\n\
         <select id=\"view\" name=\"view\" onchange=\"this.form.submit()\">\n",
    );
    for view in View::ALL {
        let label = escape_html(view.label());
        let marker = if Some(view) == selected { " selected" } else { "" };
        let _ = writeln!(html, "<option value=\"{label}\"{marker}>{label}</option>");
    }
    html.push_str("</select>\n<noscript><button type=\"submit\">Show</button></noscript>\n</form>\n");
}

fn render_view(html: &mut String, dataset: &Dataset, view: View) {
    let _ = write!(
        html,
        "<h2>{}</h2>\n<p>{}</p>\n<div class=\"graph-container\">\n",
        escape_html(view.subheader()),
        escape_html(view.caption())
    );

    match dataset
        .view_series(view)
        .and_then(|series| render_svg(&series))
    {
        Ok(svg) => html.push_str(&svg),
        Err(AppError::ColumnUnavailable(column)) => {
            warn!("View '{}' cannot be charted: column '{}' missing", view, column);
            let _ = write!(
                html,
                "<p class=\"diagnostic\">The '{}' column is missing in the data.</p>",
                escape_html(&column)
            );
        }
        Err(e) => {
            warn!("View '{}' cannot be charted: {}", view, e);
            let _ = write!(
                html,
                "<p class=\"diagnostic\">{}</p>",
                escape_html(&e.to_string())
            );
        }
    }

    html.push_str("\n</div>\n");
}
