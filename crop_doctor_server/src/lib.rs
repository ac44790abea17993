use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crop_doctor::{ActionContext, ActionResult, DiagnosisPipeline, DiagnosisReport, DoctorError, Submission};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");
const CLIENT_JS: &str = include_str!("../static/main.js");

pub const PORT_VAR: &str = "PORT";
pub const BIND_HOST_VAR: &str = "CROP_DOCTOR_BIND";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(BIND_HOST_VAR)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup(PORT_VAR)
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        Self {
            bind_addr: format!("{host}:{port}"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DiagnosisPipeline>,
}

/// Failures surfaced to HTTP clients as `{ok: false, error}`.
#[derive(Debug)]
pub enum ApiError {
    Doctor(DoctorError),
    BadRequest(String),
    Internal(String),
}

impl From<DoctorError> for ApiError {
    fn from(e: DoctorError) -> Self {
        ApiError::Doctor(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Doctor(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Doctor(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            tracing::error!("{error}");
        }
        (status, Json(ErrorBody { ok: false, error })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(flatten)]
    pub context: ActionContext,
}

#[derive(Serialize)]
struct ActionResponse {
    ok: bool,
    #[serde(flatten)]
    result: ActionResult,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn client_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());
    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "crop" => submission.crop = Some(field.text().await.map_err(bad)?),
            "description" => submission.description = Some(field.text().await.map_err(bad)?),
            "file" => {
                let has_filename = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field.bytes().await.map_err(bad)?;
                if has_filename {
                    submission.image_bytes = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }
    Ok(submission)
}

async fn predict(State(state): State<AppState>, multipart: Multipart) -> Result<Json<DiagnosisReport>, ApiError> {
    let submission = read_submission(multipart).await?;
    let pipeline = state.pipeline.clone();
    // Decoding and inference are CPU-bound.
    let report = tokio::task::spawn_blocking(move || pipeline.report(&submission))
        .await
        .map_err(|e| ApiError::Internal(format!("diagnosis task failed: {e}")))??;
    tracing::info!(
        crop = %report.crop,
        label = %report.prediction.label,
        confidence = report.prediction.confidence,
        "prediction served"
    );
    Ok(Json(report))
}

async fn action(
    State(state): State<AppState>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let result = state.pipeline.dispatch_action(&request.action, &request.context)?;
    Ok(Json(ActionResponse { ok: true, result }))
}

pub fn build_router(pipeline: Arc<DiagnosisPipeline>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/main.js", get(client_js))
        .route("/healthz", get(|| async { "ok" }))
        .route("/predict", post(predict))
        .route("/action", post(action))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

pub async fn start_server(pipeline: Arc<DiagnosisPipeline>, cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let classifier = pipeline.classifier().describe();
    let app = build_router(pipeline);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        "Crop doctor listening on http://{} (classifier={})",
        cfg.bind_addr,
        classifier
    );
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("server stopped: {e}");
        }
    });
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn default_bind_address() {
        assert_eq!(config_from(&[]).bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn port_and_host_overrides() {
        let cfg = config_from(&[(PORT_VAR, "8080"), (BIND_HOST_VAR, "127.0.0.1")]);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(config_from(&[(PORT_VAR, "not-a-port")]).bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn client_errors_map_to_400() {
        let resp = ApiError::from(DoctorError::InputMissing).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ApiError::from(DoctorError::Inference("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
