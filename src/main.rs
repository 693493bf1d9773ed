use quill_blog::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    mailer::{MailerState, SmtpMailer},
    repository::{RepositoryState, SqliteRepository},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, opens the database, builds the mailer
/// and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise verbose defaults for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill_blog=debug,tower_http=info,sqlx=warn".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database (SQLite file, migrations applied on open)
    let repo = Arc::new(
        SqliteRepository::connect(&config.db_url)
            .await
            .expect("FATAL: Failed to open the database. Check DATABASE_URL."),
    ) as RepositoryState;

    // 4. Mail transport for the contact form
    let mailer = Arc::new(
        SmtpMailer::new(&config.mail).expect("FATAL: Invalid mail configuration. Check EMAIL_*."),
    ) as MailerState;
    tracing::info!(
        host = %config.mail.host,
        port = config.mail.port,
        starttls = config.mail.starttls,
        "mail transport configured"
    );

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        mailer,
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
