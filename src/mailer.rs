use crate::config::MailSettings;
use crate::errors::{BlogError, BlogResult};
use crate::models::ContactForm;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::{Arc, Mutex};

pub const CONTACT_SUBJECT: &str = "New message from the blog contact form";

/// OutgoingMail
///
/// A plaintext message. Sender and recipient are fixed by the mailer's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Builds the contact-form notification carrying all four submitted values.
    pub fn contact(form: &ContactForm) -> Self {
        Self {
            subject: CONTACT_SUBJECT.to_string(),
            body: format!(
                "Name: {}\nEmail: {}\nPhone: {}\nMessage: {}",
                form.name, form.email, form.phone, form.message
            ),
        }
    }
}

/// Mailer
///
/// The outbound mail contract. The SMTP client is used in the running server and
/// `MockMailer` in tests, without the handlers knowing which one they hold.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> BlogResult<()>;
}

/// SmtpMailer
///
/// `lettre` async SMTP transport. In production it speaks STARTTLS with
/// credentials; locally it talks plaintext to a mail catcher on `localhost:1025`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> BlogResult<Self> {
        let transport = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| BlogError::Mail(e.to_string()))?
                .port(settings.port)
                .credentials(Credentials::new(
                    settings.from.clone(),
                    settings.password.clone(),
                ))
                .timeout(Some(settings.timeout))
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .timeout(Some(settings.timeout))
                .build()
        };

        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| BlogError::Mail(format!("invalid sender address: {e}")))?;
        let to = settings
            .to
            .parse::<Mailbox>()
            .map_err(|e| BlogError::Mail(format!("invalid recipient address: {e}")))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> BlogResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| BlogError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| BlogError::Mail(e.to_string()))?;

        tracing::info!(to = %self.to, "contact mail sent");
        Ok(())
    }
}

/// MockMailer
///
/// Records every message instead of sending it.
#[derive(Default)]
pub struct MockMailer {
    /// When true, every send fails.
    pub should_fail: bool,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: OutgoingMail) -> BlogResult<()> {
        if self.should_fail {
            return Err(BlogError::Mail("Mock Mailer Error: Simulation requested".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
        Ok(())
    }
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;
