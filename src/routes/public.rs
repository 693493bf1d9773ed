use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages plus the contact form. Commenting lives here too because
/// `GET` and `POST /post/{post_id}` share a path; the handler itself sends
/// anonymous commenters to the login page.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the process supervisor.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The post listing.
        .route("/", get(handlers::get_all_posts))
        // GET/POST /post/{post_id}
        // A post with its comments; POST adds a comment.
        .route(
            "/post/{post_id}",
            get(handlers::show_post).post(handlers::add_comment),
        )
        .route("/about", get(handlers::about))
        // GET/POST /contact
        // POST sends one email to the blog owner.
        .route(
            "/contact",
            get(handlers::contact_page).post(handlers::contact),
        )
}
