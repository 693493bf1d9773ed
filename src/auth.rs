use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::BlogResult,
    flash,
    models::{Post, Role, User},
    repository::RepositoryState,
};

pub const SESSION_COOKIE: &str = "session";

/// Claims
///
/// Payload of the signed session token stored in the `session` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// Signs a session token for `user_id` valid for the configured TTL.
pub fn issue_session(user_id: Uuid, config: &AppConfig) -> BlogResult<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(config.session_ttl_hours)).timestamp() as usize,
    };
    let key = EncodingKey::from_secret(config.secret_key.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// The cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .build()
}

/// The removal cookie for logout.
pub fn clear_session() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// AuthUser
///
/// The resolved identity of a logged-in request. It is per-request context:
/// handlers receive it as an argument, nothing stores it globally.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Denied
///
/// Why a gate turned the request away. Every variant renders as a flash message
/// plus a redirect, never as an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    LoginRequired,
    CommentLoginRequired,
    AdminOnly,
    OwnerOnly,
    PostMissing,
    AlreadyLoggedIn,
}

impl Denied {
    pub fn message(&self) -> &'static str {
        match self {
            Denied::LoginRequired => "You need to be logged in to access this page.",
            Denied::CommentLoginRequired => "You need to login or register to comment.",
            Denied::AdminOnly => "Only admin users can create a new post.",
            Denied::OwnerOnly => "Only the owner of the post can edit or delete it.",
            Denied::PostMissing => "That post does not exist.",
            Denied::AlreadyLoggedIn => "You are already logged in.",
        }
    }

    pub fn location(&self) -> &'static str {
        match self {
            Denied::LoginRequired | Denied::CommentLoginRequired => "/login",
            _ => "/",
        }
    }
}

impl IntoResponse for Denied {
    fn into_response(self) -> Response {
        tracing::debug!(reason = ?self, "request denied");
        flash::redirect(CookieJar::new(), self.message(), self.location())
    }
}

/// Resolves the session cookie into an identity.
///
/// Any failure (no cookie, bad signature, expired token, deleted user) yields `None`.
async fn resolve_identity(parts: &Parts, repo: &RepositoryState, config: &AppConfig) -> Option<AuthUser> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE)?.value().to_string();

    let key = DecodingKey::from_secret(config.secret_key.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(&token, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            return None;
        }
    };

    match repo.get_user_by_id(claims.sub).await {
        Ok(user) => user.map(AuthUser::from),
        Err(e) => {
            tracing::error!(error = %e, "session user lookup failed");
            None
        }
    }
}

/// Login-required gate.
///
/// Reuses the identity placed in the request extensions by the route-layer
/// middleware when present, otherwise resolves the session cookie itself.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Denied;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_identity(parts, &repo, &config)
            .await
            .ok_or(Denied::LoginRequired)
    }
}

/// MaybeUser
///
/// Optional identity for pages open to everyone. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(AuthUser::from_request_parts(parts, state).await.ok()))
    }
}

/// AdminUser
///
/// Admin-only gate: a logged-in user whose role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Denied;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(Denied::AdminOnly)
        }
    }
}

/// PostOwner
///
/// Owner-only gate for routes carrying a `{post_id}` path parameter. Loads the
/// post once so the handler does not have to. A missing or malformed post id is
/// reported explicitly; a failed lookup is a server error, not a denial.
#[derive(Debug, Clone)]
pub struct PostOwner {
    pub user: AuthUser,
    pub post: Post,
}

impl<S> FromRequestParts<S> for PostOwner
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Path(post_id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| Denied::PostMissing.into_response())?;

        let repo = RepositoryState::from_ref(state);
        let post = match repo.get_post(post_id).await {
            Ok(Some(post)) => post,
            Ok(None) => return Err(Denied::PostMissing.into_response()),
            Err(e) => {
                tracing::error!(error = %e, %post_id, "post lookup failed");
                return Err(e.into_response());
            }
        };

        if post.author_id == user.id {
            Ok(PostOwner { user, post })
        } else {
            Err(Denied::OwnerOnly.into_response())
        }
    }
}

/// Guest
///
/// Guest-only gate for the register and login pages.
#[derive(Debug, Clone, Copy)]
pub struct Guest;

impl<S> FromRequestParts<S> for Guest
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Denied;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(_) => Err(Denied::AlreadyLoggedIn),
            Err(_) => Ok(Guest),
        }
    }
}
