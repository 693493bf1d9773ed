use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Every route here sits behind the login-required middleware. The edit and
/// delete handlers additionally take the `PostOwner` extractor, which compares
/// the post's author with the logged-in user.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/logout", get(handlers::logout))
        // GET/POST /edit-post/{post_id}
        // Owner-only: edit an existing post.
        .route(
            "/edit-post/{post_id}",
            get(handlers::edit_post_page).post(handlers::edit_post),
        )
        // GET /delete/{post_id}
        // Owner-only: delete a post and its comments.
        .route("/delete/{post_id}", get(handlers::delete_post))
}
