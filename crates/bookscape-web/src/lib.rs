//! Axum + Askama web shell for BookScape Explorer.

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use bookscape_reports::{Report, Table};
use bookscape_source::VolumesClient;
use bookscape_store::{BookStore, IngestSummary};
use serde::Deserialize;
use tokio::net::TcpListener;

pub const CRATE_NAME: &str = "bookscape-web";

#[derive(Clone)]
pub struct AppState {
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IngestForm {
    q: String,
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    name: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    reports: Vec<&'static str>,
}

#[derive(Template)]
#[template(path = "ingest.html")]
struct IngestTemplate {
    search_key: String,
    seen: u64,
    skipped: u64,
    stored: u64,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    name: &'static str,
    row_count: usize,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    has_chart: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ingest", post(ingest_handler))
        .route("/reports/run", get(report_run_handler))
        .route("/reports/chart", get(report_chart_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("BOOKSCAPE_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let state = AppState::new(".");
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(_state): State<Arc<AppState>>) -> Response {
    render_html(IndexTemplate {
        reports: bookscape_reports::names().collect(),
    })
}

async fn ingest_handler(
    State(_state): State<Arc<AppState>>,
    Form(form): Form<IngestForm>,
) -> Response {
    let search_key = form.q.trim().to_string();
    if search_key.is_empty() {
        return Redirect::to("/").into_response();
    }
    match fetch_and_store(&search_key).await {
        Ok(summary) => render_html(IngestTemplate {
            search_key,
            seen: summary.seen,
            skipped: summary.skipped,
            stored: summary.stored,
        }),
        Err(err) => server_error(err),
    }
}

async fn report_run_handler(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let report = match bookscape_reports::find(&query.name) {
        Ok(report) => report,
        Err(err) => return (StatusCode::NOT_FOUND, Html(err.to_string())).into_response(),
    };
    match run_report(report).await {
        Ok(table) => {
            let has_chart = chart_spec(report.name, &table).is_some();
            render_html(ReportTemplate {
                name: report.name,
                row_count: table.rows.len(),
                columns: table.columns.clone(),
                rows: table
                    .rows
                    .iter()
                    .map(|row| row.iter().map(ToString::to_string).collect())
                    .collect(),
                has_chart,
            })
        }
        Err(err) => server_error(err),
    }
}

async fn report_chart_handler(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let report = match bookscape_reports::find(&query.name) {
        Ok(report) => report,
        Err(err) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": err.to_string()})),
            )
                .into_response()
        }
    };
    match run_report(report).await {
        Ok(table) => match chart_spec(report.name, &table) {
            Some(spec) => Json(spec).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        },
        Err(err) => server_error(err),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

/// One user action, one connection: fetch the page, open the store, ingest.
async fn fetch_and_store(search_key: &str) -> anyhow::Result<IngestSummary> {
    let client = VolumesClient::from_env()?;
    let page = client.search(search_key).await?;
    let mut store = BookStore::connect_from_env().await?;
    Ok(store.ingest(&page, search_key).await?)
}

async fn run_report(report: &'static Report) -> anyhow::Result<Table> {
    let mut store = BookStore::connect_from_env().await?;
    Ok(bookscape_reports::execute(report, store.connection()).await?)
}

/// Builds the plotly payload for a result table. Two columns plot as one bar
/// series, three as bar series grouped by the middle column. Any other width
/// has no chart shape.
pub fn chart_spec(title: &str, table: &Table) -> Option<serde_json::Value> {
    let data = match table.columns.len() {
        2 => {
            let x = table
                .rows
                .iter()
                .map(|row| row[0].to_string())
                .collect::<Vec<_>>();
            let y = table.rows.iter().map(|row| &row[1]).collect::<Vec<_>>();
            vec![serde_json::json!({
                "type": "bar",
                "x": x,
                "y": y,
                "marker": {"color": "#0ea5e9"}
            })]
        }
        3 => {
            let mut groups = Vec::<String>::new();
            for row in &table.rows {
                let group = row[1].to_string();
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
            groups
                .into_iter()
                .map(|group| {
                    let mut x = Vec::new();
                    let mut y = Vec::new();
                    for row in &table.rows {
                        if row[1].to_string() == group {
                            x.push(row[0].to_string());
                            y.push(&row[2]);
                        }
                    }
                    serde_json::json!({"type": "bar", "name": group, "x": x, "y": y})
                })
                .collect()
        }
        _ => return None,
    };

    let layout = if table.columns.len() == 3 {
        serde_json::json!({
            "title": title,
            "barmode": "group",
            "paper_bgcolor": "#ffffff",
            "plot_bgcolor": "#f8fafc"
        })
    } else {
        serde_json::json!({
            "title": title,
            "paper_bgcolor": "#ffffff",
            "plot_bgcolor": "#f8fafc"
        })
    };
    Some(serde_json::json!({"data": data, "layout": layout}))
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
