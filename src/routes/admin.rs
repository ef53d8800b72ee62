use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// The post-mutation endpoints, exclusively for the admin account. The admin
/// guard layered above this router answers 403 for anonymous and non-admin
/// requests before any handler executes, so no partial mutation can occur.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /new-post
        // Empty form, then creation stamped with today's date and the admin
        // as author.
        .route(
            "/new-post",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        // GET/POST /edit-post/{id}
        // Pre-filled form, then an overwrite of title/subtitle/image/body.
        // Author and creation date stay as they were.
        .route(
            "/edit-post/{id}",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        // GET /delete/{id}
        // Removes the post and, with it, its comments.
        .route("/delete/{id}", get(handlers::delete_post))
}
