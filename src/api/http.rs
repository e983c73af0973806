//! HTTP API Server
//!
//! REST API for strong/weak writes, per-student reads, and the event log.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::consistency::{record_attendance, Replicator};
use crate::error::{Error, Result};
use crate::store::Gradebook;

/// Shared application state
pub struct AppState {
    /// Simulator state
    pub book: Arc<Gradebook>,
    /// Weak-model replicator
    pub replicator: Arc<Replicator>,
}

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, book: Arc<Gradebook>, replicator: Arc<Replicator>) -> Self {
        let state = Arc::new(AppState { book, replicator });
        Self { config, state }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Create the router
    pub fn router(&self) -> Router {
        let router = Router::new()
            // Consistency-model writes
            .route("/api/strong/kehadiran", post(handle_attendance))
            .route("/api/weak/nilai_tugas", post(handle_task_score))
            // Reads
            .route("/api/data/:student_id", get(handle_student))
            .route("/api/log", get(handle_log))
            .route("/health", get(handle_health))
            .with_state(Arc::clone(&self.state))
            // Classroom UI
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .layer(TraceLayer::new_for_http());

        if self.config.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(&self, listen: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(listen).await?;
        tracing::info!("Server berjalan di port {}", listen.port());
        tracing::info!("Serving static assets from {:?}", self.config.static_dir);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Request/Response Types ============

/// Attendance write request
#[derive(Debug, Deserialize, Serialize)]
pub struct AttendanceRequest {
    #[serde(rename = "studentId", default)]
    pub student_id: Option<String>,
    #[serde(rename = "isPresent", default)]
    pub is_present: Option<bool>,
}

/// Task score write request
#[derive(Debug, Deserialize, Serialize)]
pub struct TaskScoreRequest {
    #[serde(rename = "studentId", default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub pending_replications: usize,
    pub known_students: usize,
}

// ============ Handlers ============

async fn handle_attendance(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<AttendanceRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = body.map_err(|e| Error::BadRequest(e.body_text()))?;
    let student_id = req.student_id.unwrap_or_default();

    let receipt = record_attendance(&state.book, &student_id, req.is_present.unwrap_or(false)).await;
    Ok((StatusCode::OK, Json(receipt)))
}

async fn handle_task_score(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TaskScoreRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = body.map_err(|e| Error::BadRequest(e.body_text()))?;
    let student_id = req.student_id.unwrap_or_default();

    let receipt = state.replicator.submit(&student_id, req.score).await;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

async fn handle_student(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    Json(state.book.view(&student_id).await)
}

async fn handle_log(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.book.events().await)
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        pending_replications: state.replicator.pending(),
        known_students: state.book.known_students().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::ConsistencyConfig;
    use crate::consistency::BatchProcessor;

    fn server(static_dir: &std::path::Path) -> HttpServer {
        let book = Arc::new(Gradebook::new(&ConsistencyConfig {
            replication_delay_ms: 15_000,
            batch_interval_ms: 5_000,
        }));
        let replicator = Arc::new(Replicator::new(Arc::clone(&book)));
        let config = ServerConfig {
            static_dir: static_dir.to_path_buf(),
            ..ServerConfig::default()
        };
        HttpServer::new(config, book, replicator)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_strong_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(dir.path()).router();

        let (status, body) = send(
            &app,
            post_json("/api/strong/kehadiran", json!({ "studentId": "MHS100", "isPresent": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Hadir");
        assert_eq!(body["message"], "Kehadiran dicatat segera (Strong Consistency).");

        let (status, body) = send(&app, get("/api/data/MHS100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["studentId"], "MHS100");
        assert_eq!(body["kehadiran"], "Hadir (Strong)");
        assert_eq!(body["nilai_tugas"], "N/A (Weak - tertinggal hingga 15s)");
        assert_eq!(body["nilai_akhir"], "N/A (Eventual - tunggu batch 5s)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_weak_write_is_accepted_then_replicated() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let app = server.router();

        let (status, body) = send(
            &app,
            post_json("/api/weak/nilai_tugas", json!({ "studentId": "MHS101", "score": 80 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["score_received"], 80);

        let (_, body) = send(&app, get("/api/data/MHS101")).await;
        assert!(body["nilai_tugas"].is_string());

        let (_, health) = send(&app, get("/health")).await;
        assert_eq!(health["pending_replications"], 1);

        tokio::time::sleep(Duration::from_secs(16)).await;
        let (_, body) = send(&app, get("/api/data/MHS101")).await;
        assert_eq!(body["nilai_tugas"], 80);
    }

    #[tokio::test]
    async fn test_final_score_after_batch() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let app = server.router();

        send(&app, post_json("/api/strong/kehadiran", json!({ "studentId": "MHS102", "isPresent": true }))).await;
        send(&app, post_json("/api/weak/nilai_tugas", json!({ "studentId": "MHS102", "score": 75 }))).await;

        BatchProcessor::new(Arc::clone(&server.state().book)).run_once().await;

        let (_, body) = send(&app, get("/api/data/MHS102")).await;
        assert_eq!(body["nilai_akhir"], "85.00");
    }

    #[tokio::test]
    async fn test_log_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(dir.path()).router();

        send(&app, post_json("/api/strong/kehadiran", json!({ "studentId": "A", "isPresent": true }))).await;
        send(&app, post_json("/api/weak/nilai_tugas", json!({ "studentId": "A", "score": 1 }))).await;

        let (status, body) = send(&app, get("/api/log")).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["type"], "WEAK_WRITE_START");
        assert_eq!(entries[1]["type"], "STRONG_WRITE");
    }

    #[tokio::test]
    async fn test_missing_fields_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(dir.path()).router();

        let (status, body) = send(&app, post_json("/api/strong/kehadiran", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Tidak Hadir");

        let (status, body) = send(&app, post_json("/api/weak/nilai_tugas", json!({ "studentId": "B" }))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["score_received"], Value::Null);
    }

    #[tokio::test]
    async fn test_mistyped_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(dir.path()).router();

        let (status, body) = send(
            &app,
            post_json("/api/weak/nilai_tugas", json!({ "studentId": "B", "score": "tinggi" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_serves_static_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>gradebook</h1>").unwrap();
        let app = server(dir.path()).router();

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>gradebook</h1>");
    }
}
