use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod flash;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod password;
pub mod repository;
pub mod views;

// Routing segregation (Public, Guest, Authenticated, Admin).
pub mod routes;
use auth::{AdminUser, AuthUser, Guest};
use routes::{admin, authenticated, guest, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use errors::{BlogError, BlogResult};
pub use mailer::{MailerState, MockMailer, SmtpMailer};
pub use repository::{RepositoryState, SqliteRepository};

/// ApiDoc
///
/// OpenAPI description of the HTML routes and their form payloads, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_page, handlers::register, handlers::login_page, handlers::login,
        handlers::logout, handlers::get_all_posts, handlers::show_post, handlers::add_comment,
        handlers::new_post_page, handlers::new_post, handlers::edit_post_page, handlers::edit_post,
        handlers::delete_post, handlers::about, handlers::contact_page, handlers::contact
    ),
    components(
        schemas(
            models::RegisterForm, models::LoginForm, models::PostForm,
            models::CommentForm, models::ContactForm,
        )
    ),
    tags(
        (name = "quill-blog", description = "Server-rendered blog")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into
/// every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: users, posts and comments.
    pub repo: RepositoryState,
    /// Outbound mail for the contact form.
    pub mailer: MailerState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_login
///
/// Login-required gate for the authenticated router. A failed `AuthUser`
/// extraction short-circuits with its flash redirect; on success the identity is
/// stored in the request extensions so handlers do not resolve the session twice.
async fn require_login(user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// require_admin
///
/// Admin-only gate for the admin router.
async fn require_admin(AdminUser(user): AdminUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// require_guest
///
/// Guest-only gate for the register and login pages.
async fn require_guest(_guest: Guest, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routers, their gates and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            guest::guest_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_guest)),
        )
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_login)),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its
/// method, URI and `x-request-id`.
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
