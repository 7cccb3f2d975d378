use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;

use crate::models::errors::{AppError, ErrorHandler};
use crate::services::auth::AuthService;
use crate::utils::config::MailConfig;

const FROM_NAME: &str = "PhotoShake App";
const CONFIRM_SUBJECT: &str = "Confirm your email ";
const DELIVERY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError>;
}

/// SMTP delivery over implicit TLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| AppError::email_failed(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .build();

        let address = config
            .from
            .parse()
            .map_err(|e| AppError::email_failed(format!("Invalid sender address: {}", e)))?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(FROM_NAME.to_string()), address),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::email_failed(format!("Invalid recipient: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| AppError::email_failed(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::email_failed(e.to_string()))?;

        Ok(())
    }
}

/// Used when no SMTP server is configured
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        tracing::info!(
            "Mail delivery disabled, would send '{}' to {}",
            message.subject,
            message.to
        );
        tracing::debug!("Mail body: {}", message.html);
        Ok(())
    }
}

pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    auth: Arc<AuthService>,
    retry_delay: Duration,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, auth: Arc<AuthService>) -> Self {
        Self {
            mailer,
            auth,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends the confirmation link; `host` is the public base URL ending in `/`
    pub async fn send_confirmation(
        &self,
        email: &str,
        username: &str,
        host: &str,
    ) -> Result<(), AppError> {
        let token = self.auth.create_email_token(email)?;
        let message = EmailMessage {
            to: email.to_string(),
            subject: CONFIRM_SUBJECT.to_string(),
            html: confirmation_html(host, username, &token),
        };

        ErrorHandler::retry_async_with_backoff(
            || self.mailer.send(message.clone()),
            DELIVERY_ATTEMPTS,
            self.retry_delay,
        )
        .await
    }

    /// Fire-and-forget delivery; failures only reach the log
    pub fn spawn_confirmation(self: &Arc<Self>, email: String, username: String, host: String) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            match service.send_confirmation(&email, &username, &host).await {
                Ok(()) => tracing::info!("Confirmation mail sent to {}", email),
                Err(e) => tracing::warn!("Confirmation mail to {} failed: {}", email, e),
            }
        });
    }
}

fn confirmation_html(host: &str, username: &str, token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body style="font-family: sans-serif;">
    <h2>Hello, {username}!</h2>
    <p>Thanks for joining PhotoShake. Please confirm your email address:</p>
    <p><a href="{host}api/auth/confirmed_email/{token}">Confirm email</a></p>
    <p>If you did not sign up, ignore this message.</p>
</body>
</html>"#
    )
}
