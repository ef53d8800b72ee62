use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Endpoints requiring a logged-in user. The login guard layered above this
/// router redirects anonymous requests to /login with a flash notice, so the
/// handlers here always see a resolved viewer.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // POST /post/{id}
        // Submits a comment on the post and re-renders its page with the
        // full comment list.
        .route("/post/{id}", post(handlers::add_comment))
}
