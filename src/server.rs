//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/pdfs` | List stored PDFs |
//! | `GET`    | `/pdf/{id}` | One PDF with its (empty) chunk list |
//! | `DELETE` | `/pdf/{id}` | Delete a PDF |
//! | `POST`   | `/upload` | Multipart upload, field `file` |
//! | `POST`   | `/summarize` | `{ "pdf_id": 1 }` → `{ "summary": "..." }` |
//! | `POST`   | `/qa` | `{ "pdf_id": 1, "question": "..." }` → `{ "answer": "..." }` |
//!
//! Errors use the body described in [`crate::error`], including malformed
//! path parameters and JSON bodies, which answer `400 bad_request`.
//!
//! # CORS
//!
//! With `[server].allowed_origins` empty, all origins, methods, and headers
//! are permitted. That suits a local frontend during development; set the
//! list before exposing the server anywhere else.
//!
//! # Detached pipeline work
//!
//! `/summarize` and `/qa` run the pipeline in a spawned task. If the client
//! goes away, the extraction and generation still finish and the result is
//! cached for the next request.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::llm::Generator;
use crate::models::{
    DeleteResponse, PdfDetail, PdfRecord, QaRequest, QaResponse, SummarizeRequest,
    SummarizeResponse, UploadResponse,
};

/// Starts the HTTP server with the generation endpoint from `[llm]`.
///
/// Runs until Ctrl-C, then closes the database pool.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = Arc::new(App::open(config).await?);
    serve(app).await
}

/// Starts the HTTP server with a caller-supplied [`Generator`].
pub async fn run_server_with_generator(
    config: &Config,
    generator: Arc<dyn Generator>,
) -> anyhow::Result<()> {
    let app = Arc::new(App::open_with_generator(config, generator).await?);
    serve(app).await
}

async fn serve(app: Arc<App>) -> anyhow::Result<()> {
    let bind_addr = app.config().server.bind.clone();
    let router = router(app.clone())?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.close().await;
    tracing::info!("server stopped");
    Ok(())
}

/// Builds the router with CORS, tracing, and the upload size limit applied.
pub fn router(app: Arc<App>) -> anyhow::Result<Router> {
    let cors = cors_layer(&app.config().server)?;
    let max_upload = app.config().server.max_upload_bytes;

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/pdfs", get(handle_list))
        .route("/pdf/{id}", get(handle_get).delete(handle_delete))
        .route("/upload", post(handle_upload))
        .route("/summarize", post(handle_summarize))
        .route("/qa", post(handle_qa))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app))
}

fn cors_layer(config: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| anyhow::anyhow!("invalid origin in server.allowed_origins '{}': {}", o, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Runs `fut` on its own task so dropping the request does not cancel it.
async fn detached<F, T>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| Error::Internal(format!("pipeline task failed: {}", e)))?
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ PDFs ============

async fn handle_list(State(app): State<Arc<App>>) -> Result<Json<Vec<PdfRecord>>> {
    Ok(Json(app.list().await?))
}

async fn handle_get(
    State(app): State<Arc<App>>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<PdfDetail>> {
    let Path(id) = path?;
    Ok(Json(app.detail(id).await?))
}

async fn handle_delete(
    State(app): State<Arc<App>>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>> {
    let Path(id) = path?;
    let record = app.delete(id).await?;
    Ok(Json(DeleteResponse {
        detail: format!("PDF {} ({}) deleted.", record.id, record.filename),
    }))
}

// ============ POST /upload ============

/// Accepts the first multipart field named `file`; other fields are ignored.
async fn handle_upload(
    State(app): State<Arc<App>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::InvalidRequest("file field has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read upload: {}", e)))?;

        tracing::debug!(filename = %filename, bytes = data.len(), "upload received");
        let record = app.upload(data.to_vec(), &filename).await?;
        return Ok(Json(UploadResponse::for_record(&record)));
    }

    Err(Error::InvalidRequest(
        "multipart body has no `file` field".to_string(),
    ))
}

// ============ POST /summarize ============

async fn handle_summarize(
    State(app): State<Arc<App>>,
    body: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>> {
    let Json(req) = body?;
    let summary = detached(async move { app.summarize(req.pdf_id).await }).await?;
    Ok(Json(SummarizeResponse { summary }))
}

// ============ POST /qa ============

async fn handle_qa(
    State(app): State<Arc<App>>,
    body: std::result::Result<Json<QaRequest>, JsonRejection>,
) -> Result<Json<QaResponse>> {
    let Json(req) = body?;
    let answer = detached(async move { app.answer(req.pdf_id, &req.question).await }).await?;
    Ok(Json(QaResponse { answer }))
}
