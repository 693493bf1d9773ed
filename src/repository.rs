use crate::errors::{BlogError, BlogResult};
use crate::models::{Comment, Post, PostForm, RegisterForm, Role, User};
use crate::password;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const EMAIL_TAKEN: &str = "Email already taken. Please try another.";
const TITLE_TAKEN: &str = "A post with that title already exists.";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Posts are always read together with the author's display name.
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.author_id, u.name AS author_name
    FROM blog_posts p
    JOIN users u ON p.author_id = u.id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.comment_text, c.author_id, c.post_id, u.name AS author_name
    FROM comments c
    JOIN users u ON c.author_id = u.id
"#;

/// Repository Trait
///
/// The persistence contract for users, posts and comments. Handlers and the auth
/// extractors only ever see `Arc<dyn Repository>`, so tests can swap the backing
/// database for an in-memory one.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_users(&self) -> BlogResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> BlogResult<Option<User>>;

    /// Entry point used by the session loader.
    async fn get_user_by_id(&self, id: Uuid) -> BlogResult<Option<User>> {
        self.get_user(id).await
    }

    // Lookup is by normalized (trimmed, lowercased) email.
    async fn get_user_by_email(&self, email: &str) -> BlogResult<Option<User>>;
    // `Validation` when the email is already taken.
    async fn register_user(&self, form: &RegisterForm, role: Role) -> BlogResult<User>;

    // --- Posts ---
    async fn get_posts(&self) -> BlogResult<Vec<Post>>;
    async fn get_post(&self, id: Uuid) -> BlogResult<Option<Post>>;
    async fn add_post(&self, form: &PostForm, author_id: Uuid) -> BlogResult<Post>;
    // Overwrites title/subtitle/img_url/body only. `NotFound` when absent.
    async fn change_post(&self, id: Uuid, form: &PostForm) -> BlogResult<Post>;
    // Deletes the post and, through the foreign key, its comments.
    async fn remove_post(&self, id: Uuid) -> BlogResult<()>;

    // --- Comments ---
    async fn create_comment(&self, text: &str, post_id: Uuid, author_id: Uuid)
    -> BlogResult<Comment>;
    async fn get_comments(&self, post_id: Uuid) -> BlogResult<Vec<Comment>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// SqliteRepository
///
/// The `Repository` implementation backed by a single embedded SQLite database.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies the embedded migrations.
    pub async fn connect(url: &str) -> BlogResult<Self> {
        // Writers queue on the busy timeout instead of failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!().run(&pool).await?;
        tracing::info!(url, "database ready");
        Ok(Self::new(pool))
    }

    /// A private in-memory database. The pool is pinned to one connection that is
    /// never recycled, otherwise the data would vanish with it.
    pub async fn in_memory() -> BlogResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!().run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Maps a UNIQUE violation to a user-facing validation message.
fn unique_violation(err: sqlx::Error, message: &str) -> BlogError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return BlogError::Validation(message.to_string());
        }
    }
    BlogError::Database(err)
}

/// Maps a FOREIGN KEY violation to `NotFound` for the referenced entity.
fn dangling_reference(err: sqlx::Error, what: &'static str) -> BlogError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return BlogError::NotFound(what);
        }
    }
    BlogError::Database(err)
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get_users(&self) -> BlogResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, role FROM users ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> BlogResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> BlogResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, role FROM users WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// register_user
    ///
    /// Hashes first, then a single INSERT; the UNIQUE constraint on the
    /// normalized email is the duplicate check. No lock is held while hashing.
    async fn register_user(&self, form: &RegisterForm, role: Role) -> BlogResult<User> {
        let email = normalize_email(&form.email);
        let hashed = password::hash_password(&form.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, password, name, role)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id, email, password, name, role"#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(hashed)
        .bind(&form.name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, EMAIL_TAKEN))?;

        tracing::info!(user_id = %user.id, role = role.as_str(), "user registered");
        Ok(user)
    }

    async fn get_posts(&self) -> BlogResult<Vec<Post>> {
        let query = format!("{POST_SELECT} ORDER BY p.rowid DESC");
        let posts = sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: Uuid) -> BlogResult<Option<Post>> {
        let query = format!("{POST_SELECT} WHERE p.id = ?");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// add_post
    ///
    /// Inserts a post stamped with today's date, e.g. "October 19, 2026".
    async fn add_post(&self, form: &PostForm, author_id: Uuid) -> BlogResult<Post> {
        let id = Uuid::new_v4();
        let date = chrono::Local::now().format("%B %d, %Y").to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO blog_posts (id, title, subtitle, date, body, img_url, author_id)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&date)
        .bind(&form.body)
        .bind(&form.img_url)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(e, TITLE_TAKEN) {
            BlogError::Database(e) => dangling_reference(e, "author"),
            other => other,
        })?;

        let query = format!("{POST_SELECT} WHERE p.id = ?");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(post_id = %post.id, author_id = %author_id, "post created");
        Ok(post)
    }

    async fn change_post(&self, id: Uuid, form: &PostForm) -> BlogResult<Post> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE blog_posts SET title = ?, subtitle = ?, img_url = ?, body = ? WHERE id = ?",
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&form.img_url)
        .bind(&form.body)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, TITLE_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound("post"));
        }

        let query = format!("{POST_SELECT} WHERE p.id = ?");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(post_id = %id, "post updated");
        Ok(post)
    }

    async fn remove_post(&self, id: Uuid) -> BlogResult<()> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound("post"));
        }
        tracing::info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// create_comment
    ///
    /// No lookup of the post or author happens first; a dangling reference is
    /// rejected by the foreign keys and reported as `NotFound("post")`.
    async fn create_comment(
        &self,
        text: &str,
        post_id: Uuid,
        author_id: Uuid,
    ) -> BlogResult<Comment> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO comments (id, comment_text, author_id, post_id) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| dangling_reference(e, "post"))?;

        let query = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn get_comments(&self, post_id: Uuid) -> BlogResult<Vec<Comment>> {
        let query = format!("{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.rowid ASC");
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }
}
