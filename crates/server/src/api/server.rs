use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{auth_handlers, editor_handlers, json, pages};
use crate::auth::SessionManager;
use crate::backend::{MagicLinkAuth, Tables};
use crate::draft::DraftStore;
use crate::metrics_exporter::render_metrics;
use crate::toast::ToastBoard;

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<dyn Tables>,
    pub auth: Arc<dyn MagicLinkAuth>,
    pub sessions: SessionManager,
    pub drafts: DraftStore,
    pub toasts: ToastBoard,
    /// Public base URL without a trailing slash
    pub public_url: String,
}

impl AppState {
    /// Where sign-in links send the browser.
    pub fn confirm_url(&self) -> String {
        format!("{}/auth/confirm", self.public_url)
    }
}

pub async fn metrics_handler() -> (StatusCode, String) {
    (StatusCode::OK, render_metrics())
}

pub fn build_app_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/users", get(json::list_users))
        .route("/api/users/{username}", get(json::get_user))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        );

    Router::new()
        .route("/", get(pages::home))
        .route("/app", get(pages::editor).post(editor_handlers::submit))
        .route("/user/{username}", get(pages::profile))
        .route("/users", get(pages::users))
        .route("/auth/magic-link", post(auth_handlers::request_link))
        .route("/auth/confirm", get(auth_handlers::confirm))
        .route("/auth/sign-out", post(auth_handlers::sign_out))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api(state: AppState, bind: String, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_app_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
