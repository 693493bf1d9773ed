use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field stored in `users.role`. Only `Admin` may author new posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reader => "reader",
        }
    }
}

/// User
///
/// A row of the `users` table. The password column holds an argon2 PHC string
/// and is never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    // Display name shown next to posts and comments.
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Post
///
/// A row of `blog_posts`, joined with `users` to carry the author's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    // Human-readable creation date, e.g. "October 19, 2026".
    pub date: String,
    // HTML produced by the post editor.
    pub body: String,
    pub img_url: String,
    pub author_id: Uuid,
    pub author_name: String,
}

/// Comment
///
/// A row of `comments`, joined with `users` for the author's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub comment_text: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
}

// --- Form Payloads (Input Schemas) ---
//
// Every field defaults to an empty string so that a missing field is reported
// by `validate()` as a flash message instead of a 422 from the Form extractor.

/// RegisterForm
///
/// Input payload for `POST /register`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
}

/// LoginForm
///
/// Input payload for `POST /login`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

/// PostForm
///
/// Input payload for `POST /new-post` and `POST /edit-post/{post_id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 250))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 250))]
    pub subtitle: String,
    #[serde(default)]
    #[validate(url)]
    pub img_url: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub body: String,
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
        }
    }
}

/// CommentForm
///
/// Input payload for `POST /post/{post_id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub comment_text: String,
}

/// ContactForm
///
/// Input payload for `POST /contact`. All four values end up in the outgoing email.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ContactForm {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub message: String,
}
