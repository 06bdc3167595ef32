//! Axum router: maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{
    auth::{check_session, login, logout, register},
    chat::chat,
    kb::{kb_upload, reindex},
    leads::{get_lead, list_leads, update_lead_status},
    sync_logs::list_sync_logs,
    system::{health, root},
};
use crate::sse::sse_handler;
use crate::state::SharedState;

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let max_body = state.config.server.max_upload_bytes;

    Router::new()
        .route("/",        get(root))
        .route("/health",  get(health))

        // Chat
        .route("/chat",    post(chat))

        // Sessions
        .route("/check-session", get(check_session))
        .route("/login",         post(login))
        .route("/logout",        post(logout))
        .route("/register",      post(register))

        // Knowledge base
        .route("/kb-upload", post(kb_upload))
        .route("/reindex",   post(reindex))
        .route("/sync-logs", get(list_sync_logs))

        // CRM
        .route("/leads",             get(list_leads))
        .route("/leads/{id}",        get(get_lead))
        .route("/leads/{id}/status", post(update_lead_status))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Middleware
        // enforced by the extractors, so oversized bodies get the JSON error shape
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `["*"]` mirrors the request origin; cookies need a concrete origin, so a
/// wildcard response header is never sent.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let list: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
