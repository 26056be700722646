mod dto;
mod error;
mod handlers;
mod models;
mod repository;
mod service;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use std::{env, sync::Arc};

use handlers::rest;
use repository::Repository;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use service::NoteService;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Fetch env variables
    let db_path = env::var("NOTES_DB_PATH").unwrap_or_else(|_| "notes.db".to_string());
    let bind_addr = env::var("NOTES_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    // Store creation and schema bootstrap
    let repo = Repository::new(&db_path).unwrap_or_else(|e| {
        tracing::error!("Failed to open database at {db_path}: {e}");
        panic!("failed to open database at {db_path}: {e}");
    });
    repo.init_schema().unwrap_or_else(|e| {
        tracing::error!("Failed to initialize notes schema: {e}");
        panic!("failed to initialize notes schema: {e}");
    });

    // Service creation
    let service = Arc::new(NoteService::new(repo));

    let router = router(service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tracing::info!("Notes server starting, listening on {}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("HTTP server error: {e}");
        panic!("failed to start HTTP server: {e}");
    }
}

fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/notes", post(rest::create_note))
        .route("/notes", get(rest::list_notes))
        .route("/notes/{id}", put(rest::update_note))
        .route("/notes/{id}", delete(rest::delete_note))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> Response {
    (StatusCode::OK, "Notes server is running").into_response()
}
