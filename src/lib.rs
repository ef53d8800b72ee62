use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod render;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::CurrentUser;
use flash::set_flash;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// (main.rs) and the integration tests.
pub use config::AppConfig;
pub use render::{HtmlRenderer, RendererState};
pub use repository::{RepositoryState, SqliteRepository};

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming
/// requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts database access via the SQLite pool.
    pub repo: RepositoryState,
    /// Presentation layer: turns template names plus data into HTML pages.
    pub renderer: RendererState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations let extractors and middleware pull individual
// components out of the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RendererState {
    fn from_ref(app_state: &AppState) -> RendererState {
        app_state.renderer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_login
///
/// Middleware guarding the authenticated routes. Anonymous requests are
/// redirected to the login page with a one-shot notice; nothing below the
/// guard runs for them.
async fn require_login(user: CurrentUser, jar: CookieJar, request: Request, next: Next) -> Response {
    if user.0.is_none() {
        let jar = set_flash(jar, handlers::LOGIN_BEFORE_COMMENTING_FLASH);
        return (jar, Redirect::to("/login")).into_response();
    }
    next.run(request).await
}

/// require_admin
///
/// Middleware guarding the post-mutation routes. Everyone except the admin
/// account, including anonymous visitors, gets a 403 before the handler or
/// any persistence call executes.
async fn require_admin(user: CurrentUser, request: Request, next: Next) -> Response {
    if !user.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies the guard
/// and observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router Assembly
    let base_router = Router::new()
        // Public routes: no guard applied.
        .merge(public::public_routes())
        // Authenticated routes: anonymous requests bounce to /login.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_login,
            )),
        )
        // Admin routes: everyone but the admin is rejected with 403.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_admin,
            )),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 2. Observability and Correlation Layers (applied outermost)
    base_router.layer(
        ServiceBuilder::new()
            // 2a. Request ID generation: a unique UUID for every request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 2b. Request tracing: wraps the request/response lifecycle in a
            // span carrying the generated request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 2c. Request ID propagation back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI so
/// every log line for one request is correlated by a unique id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
