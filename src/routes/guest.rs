use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Guest Router Module
///
/// Account pages. A logged-in visitor is redirected away by the guest-only
/// middleware applied in `create_router`.
pub fn guest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/login", get(handlers::login_page).post(handlers::login))
}
