//! askama page templates. Each template carries a `PageContext` read by `base.html`.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{
    auth::AuthUser,
    models::{Comment, ContactForm, Post, PostForm},
};

/// Navigation state and the pending flash message shared by every page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub current_user: Option<AuthUser>,
    pub flash: Option<String>,
}

impl PageContext {
    pub fn new(current_user: Option<AuthUser>, flash: Option<String>) -> Self {
        Self {
            current_user,
            flash,
        }
    }
}

/// Renders a template into an HTML response; a rendering failure is logged and becomes a 500.
pub struct HtmlTemplate<T>(pub T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "template rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub page: PageContext,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub comment_text: String,
    pub is_owner: bool,
}

#[derive(Template)]
#[template(path = "make-post.html")]
pub struct PostFormTemplate {
    pub page: PageContext,
    pub form: PostForm,
    pub is_edit: bool,
    pub action: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub page: PageContext,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub form: ContactForm,
    pub msg_sent: bool,
}
