mod config;
mod dto;
mod handlers;
mod models;
mod repository;
mod service;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
};

use std::sync::Arc;

use handlers::rest;
use repository::{ClientError, http::HttpBackend, memory::MemoryBackend};

use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::{BackendConfig, BackendKind};
use service::NoteBoard;

fn build_board(cfg: &BackendConfig) -> Result<NoteBoard, ClientError> {
    match cfg.kind {
        BackendKind::Http => {
            let backend = Arc::new(HttpBackend::new(cfg)?);
            tracing::info!("Using backend at {}", cfg.base_url);
            Ok(NoteBoard::new(backend.clone(), backend.clone(), backend))
        }
        BackendKind::Memory => {
            let backend = Arc::new(MemoryBackend::new(
                &cfg.user,
                &cfg.media_prefix,
                cfg.signed_url_ttl,
            ));
            tracing::warn!("Using in-memory backend, nothing will be persisted");
            Ok(NoteBoard::new(backend.clone(), backend.clone(), backend))
        }
    }
}

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().expect("failed to locate or load config file");
    tracing::info!("Successfully loaded note board config");

    // Board creation
    let board = build_board(&cfg.backend).unwrap_or_else(|e| {
        tracing::error!("Failed to set up backend clients: {e}");
        panic!("failed to set up backend clients: {e}");
    });
    let board = Arc::new(board);

    // Initial fetch, the board starts empty if it fails
    if let Err(e) = board.list_notes().await {
        tracing::error!("Failed to load notes: {e}");
    }

    // Router config
    let router = Router::new()
        .route("/", any(root))
        .merge(rest::router(board, cfg.max_upload_bytes))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Failed to read local address");

    tracing::info!("Note board starting, listening on {}", addr);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}

async fn root() -> Response {
    (StatusCode::OK, "Hello from note board!").into_response()
}
