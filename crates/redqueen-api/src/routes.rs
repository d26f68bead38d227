//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with the host allow list, CORS, tracing,
//! compression, and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use redqueen_core::error::{RedQueenError, Result};

use crate::handlers;
use crate::host::require_allowed_host;
use crate::state::AppState;

/// Request bodies are chat messages; nothing legitimate comes close.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.server.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{port}"),
        format!("http://localhost:{port}"),
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let page_routes = Router::new()
        .route("/", get(handlers::ui))
        .route("/ui", get(handlers::ui))
        .route("/highlight.css", get(handlers::highlight_css))
        .route("/health", get(handlers::health));

    let chat_routes = Router::new()
        .route("/state", get(handlers::get_state))
        .route(
            "/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route(
            "/conversations/{id}/select",
            post(handlers::select_conversation),
        )
        .route("/selection/clear", post(handlers::clear_selection))
        .route("/messages", post(handlers::send_message))
        .route("/regenerate", post(handlers::regenerate))
        .route("/stream", get(handlers::stream));

    page_routes
        .merge(chat_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_allowed_host,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Runs until Ctrl+C, then aborts pending replies and drains connections.
pub async fn start_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let chat = state.chat.clone();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RedQueenError::Server(format!("Failed to bind {addr}: {e}")))?;

    info!("Red Queen listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
            chat.shutdown();
        })
        .await
        .map_err(|e| RedQueenError::Server(format!("Server error: {e}")))?;

    Ok(())
}
