use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::AppConfig,
    export::Exporter,
    influx::InfluxClient,
    metrics::{self, RequestTimer},
    models::Metric,
    window::{self, WindowParams},
    DwhExportError, Result,
};

#[derive(Clone)]
pub struct ExportState {
    pub token: Arc<str>,
    pub exporter: Arc<Exporter>,
}

/// Query parameters of `GET /dwh`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub interval: Option<String>,
    pub range: Option<String>,
    pub offset: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    #[serde(default)]
    pub token: String,
}

impl ExportParams {
    fn window_params(self) -> WindowParams {
        WindowParams {
            interval: self.interval,
            range: self.range,
            offset: self.offset,
            start: self.start,
            end: self.end,
        }
    }
}

pub fn router(state: ExportState) -> Router {
    Router::new()
        .route("/dwh", get(collect_metrics))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn collect_metrics(
    State(state): State<ExportState>,
    Query(params): Query<ExportParams>,
) -> Result<Json<Vec<Metric>>> {
    let _timer = RequestTimer::new();

    if state.token.to_lowercase() != params.token.to_lowercase() {
        return Err(DwhExportError::AuthFailure);
    }

    let now = chrono::Utc::now().timestamp_millis();
    let window = window::resolve(&params.window_params(), now)?;
    info!(
        start = window.start_millis,
        end = window.end_millis,
        interval = window.interval_millis,
        "Exporting metrics"
    );

    let metrics = state.exporter.export(&window).await;
    Ok(Json(metrics))
}

async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let executor = Arc::new(InfluxClient::new(&config.influx)?);
    let exporter = Exporter::new(executor, config.metrics, config.derive_database_from_query);
    info!(
        metrics = exporter.definitions().len(),
        influx = %config.influx.url,
        "Loaded metric definitions"
    );

    let state = ExportState {
        token: Arc::from(config.token.as_str()),
        exporter: Arc::new(exporter),
    };
    let app = router(state);

    let addr = config.listen_addr;
    info!("Starting DWH exporter on {}", addr);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        DwhExportError::Config(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DwhExportError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
