use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::extract::State;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::handlers::{drawing, pages, proxy, question};
use crate::state::AppState;

const SESSION_COOKIE_NAME: &str = "mind_palette";
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn session_key(config: &Config) -> Key {
    match config.session_secret.as_deref() {
        Some(secret) => match Key::try_from(secret.as_bytes()) {
            Ok(key) => key,
            Err(_) => {
                warn!("SESSION_SECRET must be at least 64 bytes; signing sessions with a random key.");
                Key::generate()
            }
        },
        None => {
            info!("SESSION_SECRET not set; signing session cookies with a random key.");
            Key::generate()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let sessions = SessionManagerLayer::new(state.sessions.clone())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(state.config.session_ttl()))
        .with_secure(state.config.session_cookie_secure)
        .with_signed(session_key(&state.config));

    Router::new()
        .route("/", get(pages::home))
        .route("/reflection", get(pages::reflection))
        .route("/api/question", post(question::answer_question))
        .route("/api/process-drawing", post(drawing::process_drawing))
        .route("/proxy", get(proxy::proxy_image))
        .route("/health", get(health))
        .layer(sessions)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "healthy": true,
        "sessions": state.sessions.session_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    state
        .sessions
        .spawn_pruning(state.config.session_prune_interval());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Mind Palette listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
