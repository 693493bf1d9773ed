use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Post authoring. The admin-only middleware rejects anonymous visitors with the
/// login redirect and non-admin users with a redirect to the post listing.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/new-post",
        get(handlers::new_post_page).post(handlers::new_post),
    )
}
