//! HTTP server for analyzing uploaded heart-rate exports.
//!
//! This module provides an HTTP server that:
//! - Accepts raw export files via POST /uploads
//! - Keeps each upload under its own handle for the life of the process
//! - Returns detected windows and the latest-window summary as JSON
//!
//! # Architecture
//!
//! ```text
//! client ──→ POST /uploads?filename=hr.csv ──→ normalize ──→ upload handle
//!                                                               │
//! client ←── GET /uploads/{id}/windows|summary ←── detect ←─────┘
//! ```

use crate::config::{Config, ConfigError};
use crate::core::{AnalysisReport, ReportBuilder, Window, WindowConfig, WindowDetector, WindowSummary};
use crate::ingest::{NormalizeError, Normalizer, NormalizerConfig, Sample};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Window detection settings
    pub window: WindowConfig,
    /// Input parsing settings
    pub normalizer: NormalizerConfig,
    /// Request bodies larger than this are refused
    pub max_upload_bytes: usize,
    /// Stored uploads beyond this evict the oldest one
    pub max_uploads: usize,
}

impl ServerConfig {
    /// Create a server configuration with default detection settings
    pub fn new(port: u16) -> Self {
        let defaults = Config::default();
        Self {
            port,
            window: defaults.window,
            normalizer: NormalizerConfig::default(),
            max_upload_bytes: defaults.max_upload_bytes,
            max_uploads: defaults.max_uploads,
        }
    }

    /// Build a server configuration from the persisted configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            port: config.server_port,
            window: config.window,
            normalizer: config.normalizer_config()?,
            max_upload_bytes: config.max_upload_bytes,
            max_uploads: config.max_uploads,
        })
    }
}

/// A parsed upload
struct Upload {
    /// Insertion order, used for eviction
    sequence: u64,
    filename: String,
    received_at: DateTime<Utc>,
    samples: Arc<Vec<Sample>>,
}

/// Shared server state
pub struct ServerState {
    normalizer: Normalizer,
    detector: WindowDetector,
    report_builder: ReportBuilder,
    /// Uploads keyed by handle
    uploads: RwLock<HashMap<Uuid, Upload>>,
    max_uploads: usize,
    next_sequence: AtomicU64,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config.normalizer.clone()),
            detector: WindowDetector::new(config.window),
            report_builder: ReportBuilder::new(),
            uploads: RwLock::new(HashMap::new()),
            max_uploads: config.max_uploads.max(1),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Store an upload, evicting the oldest ones once the store is full.
    async fn insert(&self, id: Uuid, upload: Upload) {
        let mut uploads = self.uploads.write().await;
        while uploads.len() >= self.max_uploads {
            let Some(oldest) = uploads
                .iter()
                .min_by_key(|(_, u)| u.sequence)
                .map(|(id, _)| *id)
            else {
                break;
            };
            if let Some(evicted) = uploads.remove(&oldest) {
                tracing::info!(upload_id = %oldest, "Evicted upload {}", evicted.filename);
            }
        }
        uploads.insert(id, upload);
    }

    /// Look up an upload, returning its file name and samples
    async fn upload(&self, id: Uuid) -> Result<(String, Arc<Vec<Sample>>), ApiError> {
        let uploads = self.uploads.read().await;
        uploads
            .get(&id)
            .map(|u| (u.filename.clone(), Arc::clone(&u.samples)))
            .ok_or_else(|| {
                api_error(
                    StatusCode::NOT_FOUND,
                    "UNKNOWN_UPLOAD",
                    format!("No upload with id {id}"),
                )
            })
    }
}

/// Query parameters for POST /uploads
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name; its extension selects the format
    pub filename: String,
}

/// Response from the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub upload_id: Uuid,
    pub filename: String,
    pub sample_count: usize,
    pub received_at: DateTime<Utc>,
}

/// One window with its samples
#[derive(Debug, Clone, Serialize)]
pub struct WindowView {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub samples: Vec<Sample>,
    pub summary: Option<WindowSummary>,
}

impl WindowView {
    fn new(index: usize, window: &Window) -> Self {
        Self {
            index,
            start: window.start(),
            end: window.end(),
            samples: window.samples().to_vec(),
            summary: window.summary(),
        }
    }
}

/// Response from the windows endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WindowsResponse {
    pub upload_id: Uuid,
    pub filename: String,
    pub config: WindowConfig,
    pub window_count: usize,
    pub windows: Vec<WindowView>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

fn normalize_error(e: NormalizeError) -> ApiError {
    let code = match e {
        NormalizeError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
        NormalizeError::Parse(_) => "PARSE_ERROR",
    };
    api_error(StatusCode::BAD_REQUEST, code, e.to_string())
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /uploads?filename=<name>
///
/// Parses the raw body and stores the samples under a new handle.
async fn create_upload(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let samples = state
        .normalizer
        .normalize_file(&params.filename, &body)
        .map_err(|e| {
            tracing::warn!("Rejected upload {}: {}", params.filename, e);
            normalize_error(e)
        })?;

    let upload_id = Uuid::new_v4();
    let received_at = Utc::now();
    let sample_count = samples.len();

    let sequence = state.next_sequence.fetch_add(1, Ordering::Relaxed);
    state
        .insert(
            upload_id,
            Upload {
                sequence,
                filename: params.filename.clone(),
                received_at,
                samples: Arc::new(samples),
            },
        )
        .await;

    tracing::info!(%upload_id, sample_count, "Stored upload {}", params.filename);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            upload_id,
            filename: params.filename,
            sample_count,
            received_at,
        }),
    ))
}

/// GET /uploads/{id}/windows
async fn list_windows(
    State(state): State<Arc<ServerState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<WindowsResponse>, ApiError> {
    let (filename, samples) = state.upload(upload_id).await?;
    let windows = state.detector.detect(&samples);

    Ok(Json(WindowsResponse {
        upload_id,
        filename,
        config: *state.detector.config(),
        window_count: windows.len(),
        windows: windows
            .iter()
            .enumerate()
            .map(|(i, w)| WindowView::new(i, w))
            .collect(),
    }))
}

/// GET /uploads/{id}/summary
///
/// Returns the analysis report, whose `latest` entry summarizes the most
/// recent window.
async fn summary(
    State(state): State<Arc<ServerState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let (filename, samples) = state.upload(upload_id).await?;
    let windows = state.detector.detect(&samples);

    let report = state.report_builder.build(
        Some(&filename),
        samples.len(),
        state.detector.config(),
        &windows,
    );

    if !report.has_windows() {
        let config = state.detector.config();
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "NO_WINDOWS",
            format!(
                "No valid {}s window at {}s cadence in {}",
                config.duration().num_seconds(),
                config.step().num_seconds(),
                filename
            ),
        ));
    }

    Ok(Json(report))
}

/// DELETE /uploads/{id}
async fn delete_upload(
    State(state): State<Arc<ServerState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.uploads.write().await.remove(&upload_id) {
        Some(upload) => {
            tracing::info!(
                %upload_id,
                "Deleted upload {} received at {}",
                upload.filename,
                upload.received_at
            );
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            "UNKNOWN_UPLOAD",
            format!("No upload with id {upload_id}"),
        )),
    }
}

/// Build the application router
pub fn router(config: &ServerConfig) -> Router {
    let state = Arc::new(ServerState::new(config));

    Router::new()
        .route("/health", get(health))
        .route("/uploads", post(create_upload))
        .route("/uploads/:id", axum::routing::delete(delete_upload))
        .route("/uploads/:id/windows", get(list_windows))
        .route("/uploads/:id/summary", get(summary))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(&config);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("heartrate-windows server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
