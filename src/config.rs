use std::env;
use std::time::Duration;

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup and
/// shared read-only through the application state (see `FromRef` in lib.rs).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls secure cookies, log format and mail transport.
    pub env: Env,
    // SQLite connection string, e.g. `sqlite://posts.db`.
    pub db_url: String,
    pub bind_addr: String,
    // Secret used to sign session tokens.
    pub secret_key: String,
    pub session_ttl_hours: i64,
    // Registering with this address grants the admin role.
    pub admin_email: Option<String>,
    pub mail: MailSettings,
}

/// MailSettings
///
/// Outbound SMTP settings for the contact form.
#[derive(Clone, Debug)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    // STARTTLS with credentials in production; plaintext to a local mail catcher otherwise.
    pub starttls: bool,
    pub from: String,
    pub password: String,
    pub to: String,
    pub timeout: Duration,
}

/// Env
///
/// Switches between local development conveniences and production hardening.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_SECRET: &str = "local-development-session-secret";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            secret_key: LOCAL_SECRET.to_string(),
            session_ttl_hours: 168,
            admin_email: None,
            mail: MailSettings::local(),
        }
    }
}

impl MailSettings {
    fn local() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            starttls: false,
            from: "blog@localhost".to_string(),
            password: String::new(),
            to: "owner@localhost".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `SECRET_KEY` or any of the `EMAIL_*` credentials
    /// are missing, so the server never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://posts.db".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(168);
        let admin_email = env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty());
        let timeout = Duration::from_secs(
            env::var("SMTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        );

        match env {
            Env::Local => {
                let defaults = MailSettings::local();
                Self {
                    env: Env::Local,
                    db_url,
                    bind_addr,
                    secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| LOCAL_SECRET.to_string()),
                    session_ttl_hours,
                    admin_email,
                    mail: MailSettings {
                        host: env::var("SMTP_HOST").unwrap_or(defaults.host),
                        port: env::var("SMTP_PORT")
                            .ok()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(defaults.port),
                        starttls: false,
                        from: env::var("EMAIL_FROM").unwrap_or(defaults.from),
                        password: env::var("EMAIL_PASSWORD").unwrap_or_default(),
                        to: env::var("EMAIL_TO").unwrap_or(defaults.to),
                        timeout,
                    },
                }
            }
            Env::Production => Self {
                env: Env::Production,
                db_url,
                bind_addr,
                secret_key: env::var("SECRET_KEY")
                    .expect("FATAL: SECRET_KEY must be set in production."),
                session_ttl_hours,
                admin_email,
                mail: MailSettings {
                    host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                    port: env::var("SMTP_PORT")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(587),
                    starttls: true,
                    from: env::var("EMAIL_FROM").expect("FATAL: EMAIL_FROM required in prod"),
                    password: env::var("EMAIL_PASSWORD")
                        .expect("FATAL: EMAIL_PASSWORD required in prod"),
                    to: env::var("EMAIL_TO").expect("FATAL: EMAIL_TO required in prod"),
                    timeout,
                },
            },
        }
    }

    /// Whether registering with `email` should grant the admin role.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}
