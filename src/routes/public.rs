use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints accessible to any client, anonymous or logged-in. Reading never
/// requires an account; the register and login pages bounce already
/// authenticated visitors back to the listing themselves.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // The home listing with every post.
        .route("/", get(handlers::list_posts))
        // GET/POST /register
        // Account creation. Duplicate emails flash and divert to /login.
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        // GET/POST /login
        // Credential check; failures re-render the form with a generic
        // message.
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET /logout
        // Unconditionally clears the session. Idempotent.
        .route("/logout", get(handlers::logout))
        // GET /post/{id}
        // A single post with its comment thread. Missing ids render 404.
        .route("/post/{id}", get(handlers::show_post))
        // GET /about, GET /contact
        // Static informational pages.
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
}
