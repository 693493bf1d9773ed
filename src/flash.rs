//! One-shot flash messages carried in a cookie across a redirect.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

pub const FLASH_COOKIE: &str = "flash";

/// Attaches `message` to the jar and redirects (303) to `to`.
pub fn redirect(jar: CookieJar, message: impl Into<String>, to: &str) -> Response {
    let cookie = Cookie::build((FLASH_COOKIE, message.into()))
        .path("/")
        .http_only(true);
    (jar.add(cookie), Redirect::to(to)).into_response()
}

/// Pops the pending message, if any. The returned jar carries the removal cookie
/// and must be part of the response.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_string());
    match message {
        Some(message) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(message)),
        None => (jar, None),
    }
}
