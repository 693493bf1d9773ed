use quill_blog::{
    AppConfig, AppState, MockMailer, SqliteRepository, create_router,
    mailer::{CONTACT_SUBJECT, MailerState},
    repository::{Repository, RepositoryState},
};
use reqwest::{StatusCode, header, redirect::Policy};
use std::{collections::HashMap, sync::Arc};
use tokio::net::TcpListener;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@example.com";
const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub address: String,
    pub repo: RepositoryState,
    pub pool: sqlx::SqlitePool,
    pub mailer: Arc<MockMailer>,
}

async fn spawn_app_with(mailer: MockMailer) -> TestApp {
    let sqlite = SqliteRepository::in_memory()
        .await
        .expect("Failed to open the in-memory database in tests");
    let pool = sqlite.pool().clone();
    let repo = Arc::new(sqlite) as RepositoryState;
    let mailer = Arc::new(mailer);
    let config = AppConfig {
        admin_email: Some(ADMIN_EMAIL.to_string()),
        ..AppConfig::default()
    };

    let state = AppState {
        repo: repo.clone(),
        mailer: mailer.clone() as MailerState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        pool,
        mailer,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(MockMailer::new()).await
}

/// A minimal cookie-keeping client that never follows redirects on its own,
/// so tests can assert on every 303 hop.
struct Browser {
    base: String,
    http: reqwest::Client,
    cookies: HashMap<String, String>,
}

impl Browser {
    fn new(app: &TestApp) -> Self {
        Browser {
            base: app.address.clone(),
            http: reqwest::Client::builder()
                .redirect(Policy::none())
                .build()
                .unwrap(),
            cookies: HashMap::new(),
        }
    }

    fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    fn absorb(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.to_string());
            }
        }
    }

    fn with_cookies(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.cookies.is_empty() {
            return request;
        }
        let header_value = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        request.header(header::COOKIE, header_value)
    }

    async fn get(&mut self, path: &str) -> reqwest::Response {
        let request = self.with_cookies(self.http.get(format!("{}{}", self.base, path)));
        let response = request.send().await.expect("req fail");
        self.absorb(&response);
        response
    }

    async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        let request = self.with_cookies(
            self.http
                .post(format!("{}{}", self.base, path))
                .form(form),
        );
        let response = request.send().await.expect("req fail");
        self.absorb(&response);
        response
    }

    /// Asserts a 303 to `expected` and returns the body of the page it points at.
    async fn follow(&mut self, response: reqwest::Response, expected: &str) -> String {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(location, expected);
        let page = self.get(&location).await;
        assert_eq!(page.status(), StatusCode::OK);
        page.text().await.unwrap()
    }

    async fn register(&mut self, email: &str, name: &str) -> reqwest::Response {
        self.post(
            "/register",
            &[("email", email), ("password", PASSWORD), ("name", name)],
        )
        .await
    }

    async fn login(&mut self, email: &str, password: &str) -> reqwest::Response {
        self.post("/login", &[("email", email), ("password", password)])
            .await
    }

    /// Registers and logs in, leaving the session cookie in the jar.
    async fn sign_up(&mut self, email: &str, name: &str) {
        let registered = self.register(email, name).await;
        assert_eq!(registered.status(), StatusCode::SEE_OTHER);
        let logged_in = self.login(email, PASSWORD).await;
        assert_eq!(logged_in.status(), StatusCode::SEE_OTHER);
        assert!(self.has_cookie("session"));
    }
}

async fn publish(browser: &mut Browser, app: &TestApp, title: &str) -> Uuid {
    let response = browser
        .post(
            "/new-post",
            &[
                ("title", title),
                ("subtitle", "Notes from the field"),
                ("img_url", "https://images.example.com/cover.jpg"),
                ("body", "<p>Lorem ipsum</p>"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    app.repo
        .get_posts()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.title == title)
        .expect("post should exist")
        .id
}

// --- Accounts ---

#[tokio::test]
async fn test_register_then_login() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);

    let registered = browser.register("alice@example.com", "Alice").await;
    let login_page = browser.follow(registered, "/login").await;
    assert!(login_page.contains("Account created, please log in."));

    let logged_in = browser.login("alice@example.com", PASSWORD).await;
    let session_header = logged_in
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .map(str::to_string)
        .expect("session cookie should be set");
    assert!(session_header.contains("HttpOnly"));

    let home = browser.follow(logged_in, "/").await;
    assert!(home.contains("Signed in as Alice"));
    assert!(home.contains("href=\"/logout\""));
    // Readers never see the new-post link.
    assert!(!home.contains("href=\"/new-post\""));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);

    browser.register("alice@example.com", "Alice").await;
    let again = browser.register("alice@example.com", "Alice Again").await;

    assert_eq!(again.status(), StatusCode::OK);
    let html = again.text().await.unwrap();
    assert!(html.contains(
        "There was an issue registering your account: Email already taken. Please try another."
    ));
}

#[tokio::test]
async fn test_admin_email_cannot_be_claimed_twice() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;

    let mut impostor = Browser::new(&app);
    let response = impostor.register("ADMIN@Example.com", "Impostor").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Email already taken. Please try another."));

    let admins = app
        .repo
        .get_users()
        .await
        .unwrap()
        .into_iter()
        .filter(|u| u.is_admin())
        .count();
    assert_eq!(admins, 1);

    // The real admin can still log in with any letter case.
    let mut again = Browser::new(&app);
    let logged_in = again.login("Admin@Example.COM", PASSWORD).await;
    let home = again.follow(logged_in, "/").await;
    assert!(home.contains("href=\"/new-post\""));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);
    browser.register("alice@example.com", "Alice").await;

    let response = browser.login("alice@example.com", "wrong-password").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!browser.has_cookie("session"));
    let html = response.text().await.unwrap();
    assert!(html.contains("Password incorrect, please try again."));
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);
    browser.sign_up("alice@example.com", "Alice").await;

    let response = browser.get("/logout").await;
    let home = browser.follow(response, "/").await;

    assert!(!browser.has_cookie("session"));
    assert!(!home.contains("Signed in as"));
    assert!(home.contains("href=\"/login\""));
}

#[tokio::test]
async fn test_logged_in_user_is_kept_off_guest_pages() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);
    browser.sign_up("alice@example.com", "Alice").await;

    for path in ["/login", "/register"] {
        let response = browser.get(path).await;
        let home = browser.follow(response, "/").await;
        assert!(home.contains("You are already logged in."), "GET {path}");
    }
}

// --- Posts ---

#[tokio::test]
async fn test_reader_cannot_create_posts() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);
    browser.sign_up("reader@example.com", "Reader").await;

    let response = browser.get("/new-post").await;
    let home = browser.follow(response, "/").await;
    assert!(home.contains("Only admin users can create a new post."));

    let submitted = browser
        .post(
            "/new-post",
            &[
                ("title", "Sneaky"),
                ("subtitle", "Nope"),
                ("img_url", "https://images.example.com/x.jpg"),
                ("body", "<p>x</p>"),
            ],
        )
        .await;
    assert_eq!(submitted.status(), StatusCode::SEE_OTHER);
    assert!(app.repo.get_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_publishes_edits_and_deletes_a_post() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;

    let form_page = admin.get("/new-post").await;
    assert_eq!(form_page.status(), StatusCode::OK);

    let post_id = publish(&mut admin, &app, "Hello World").await;

    let home = admin.get("/").await.text().await.unwrap();
    assert!(home.contains("Hello World"));
    assert!(home.contains("href=\"/new-post\""));

    let page = admin.get(&format!("/post/{post_id}")).await.text().await.unwrap();
    assert!(page.contains("<p>Lorem ipsum</p>"));
    assert!(page.contains(&format!("href=\"/edit-post/{post_id}\"")));

    let edit_form = admin.get(&format!("/edit-post/{post_id}")).await;
    assert_eq!(edit_form.status(), StatusCode::OK);
    assert!(edit_form.text().await.unwrap().contains("value=\"Hello World\""));

    let edited = admin
        .post(
            &format!("/edit-post/{post_id}"),
            &[
                ("title", "Hello Again"),
                ("subtitle", "Revised"),
                ("img_url", "https://images.example.com/new.jpg"),
                ("body", "<p>Edited</p>"),
            ],
        )
        .await;
    let page = admin.follow(edited, &format!("/post/{post_id}")).await;
    assert!(page.contains("Hello Again"));
    assert!(page.contains("<p>Edited</p>"));

    let deleted = admin.get(&format!("/delete/{post_id}")).await;
    let home = admin.follow(deleted, "/").await;
    assert!(home.contains("Post deleted."));
    assert!(app.repo.get_post(post_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_post_form_is_rerendered() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;

    let response = admin
        .post(
            "/new-post",
            &[
                ("title", "Broken"),
                ("subtitle", "Bad image"),
                ("img_url", "not a url"),
                ("body", "<p>x</p>"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("There was an issue adding your post: Please correct the following fields: img_url"));
    assert!(html.contains("value=\"Broken\""));
    assert!(app.repo.get_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_owner_cannot_edit_or_delete() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;
    let post_id = publish(&mut admin, &app, "Mine").await;

    let mut reader = Browser::new(&app);
    reader.sign_up("reader@example.com", "Reader").await;

    let post_page = reader.get(&format!("/post/{post_id}")).await.text().await.unwrap();
    assert!(!post_page.contains("href=\"/edit-post/"));

    for path in [format!("/edit-post/{post_id}"), format!("/delete/{post_id}")] {
        let response = reader.get(&path).await;
        let home = reader.follow(response, "/").await;
        assert!(
            home.contains("Only the owner of the post can edit or delete it."),
            "GET {path}"
        );
    }

    let sneaky_edit = reader
        .post(
            &format!("/edit-post/{post_id}"),
            &[
                ("title", "Hijacked"),
                ("subtitle", "x"),
                ("img_url", "https://images.example.com/x.jpg"),
                ("body", "x"),
            ],
        )
        .await;
    assert_eq!(sneaky_edit.status(), StatusCode::SEE_OTHER);

    let post = app.repo.get_post(post_id).await.unwrap().expect("post survives");
    assert_eq!(post.title, "Mine");
}

#[tokio::test]
async fn test_editing_a_missing_post() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;

    let response = admin.get(&format!("/edit-post/{}", Uuid::new_v4())).await;
    let home = admin.follow(response, "/").await;

    assert!(home.contains("That post does not exist."));
}

#[tokio::test]
async fn test_owner_gate_reports_a_failed_lookup_as_server_error() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;
    let post_id = publish(&mut admin, &app, "Fragile").await;

    // Users stay readable so the session still resolves; posts do not.
    sqlx::query("DROP TABLE comments").execute(&app.pool).await.unwrap();
    sqlx::query("DROP TABLE blog_posts").execute(&app.pool).await.unwrap();

    let response = admin.get(&format!("/edit-post/{post_id}")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
}

// --- Comments ---

#[tokio::test]
async fn test_comments() {
    let app = spawn_app().await;
    let mut admin = Browser::new(&app);
    admin.sign_up(ADMIN_EMAIL, "Admin").await;
    let post_id = publish(&mut admin, &app, "Discuss").await;
    let path = format!("/post/{post_id}");

    let mut anonymous = Browser::new(&app);
    let response = anonymous.post(&path, &[("comment_text", "drive-by")]).await;
    let login = anonymous.follow(response, "/login").await;
    assert!(login.contains("You need to login or register to comment."));

    let mut reader = Browser::new(&app);
    reader.sign_up("reader@example.com", "Reader").await;
    let response = reader.post(&path, &[("comment_text", "Great read")]).await;
    let page = reader.follow(response, &path).await;
    assert!(page.contains("Great read"));
    assert!(page.contains("Reader"));
    assert!(!page.contains("drive-by"));

    let comments = app.repo.get_comments(post_id).await.unwrap();
    assert_eq!(comments.len(), 1);
}

// --- Contact ---

#[tokio::test]
async fn test_contact_sends_one_mail() {
    let app = spawn_app().await;
    let mut browser = Browser::new(&app);

    let response = browser
        .post(
            "/contact",
            &[
                ("name", "Jane Doe"),
                ("email", "jane@example.com"),
                ("phone", "555-0100"),
                ("message", "Love the blog"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Successfully sent your message"));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, CONTACT_SUBJECT);
    for value in ["Jane Doe", "jane@example.com", "555-0100", "Love the blog"] {
        assert!(sent[0].body.contains(value), "mail body should contain {value}");
    }
}

#[tokio::test]
async fn test_contact_mail_failure_is_reported() {
    let app = spawn_app_with(MockMailer::new_failing()).await;
    let mut browser = Browser::new(&app);

    let response = browser
        .post(
            "/contact",
            &[
                ("name", "Jane Doe"),
                ("email", "jane@example.com"),
                ("phone", "555-0100"),
                ("message", "Hello"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("There was an issue sending your message, please try again later."));
    assert!(!html.contains("Successfully sent your message"));
    assert!(app.mailer.sent().is_empty());
}
