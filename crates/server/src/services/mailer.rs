//! Welcome mail delivery.
//!
//! Uses SMTP via lettre with askama templates for the message body. Delivery
//! is fire-and-forget: the signup response never waits on the SMTP server,
//! and a failed send is logged, not surfaced.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use referral_rewards_core::Email;

use crate::config::EmailConfig;

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    email: &'a str,
    share_url: &'a str,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    email: &'a str,
    share_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailerError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Mailer for the welcome message.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Dispatch a welcome email on a detached task.
    ///
    /// Returns immediately; the outcome is logged from the background task.
    /// User creation has already committed by the time this is called, and a
    /// delivery failure does not undo it.
    pub fn spawn_welcome(&self, to: &Email, share_url: Url) {
        let mailer = self.clone();
        let to = to.clone();

        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&to, &share_url).await {
                tracing::warn!(to = %to, error = %e, "Failed to send welcome email");
            }
        });
    }

    /// Send the welcome email for a new signup.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to render, build, or send.
    pub async fn send_welcome(&self, to: &Email, share_url: &Url) -> Result<(), MailerError> {
        let message = self.build_welcome(to, share_url)?;
        self.transport.send(message).await?;

        tracing::info!(to = %to, "Welcome email sent");
        Ok(())
    }

    /// Build the multipart (text + HTML) welcome message.
    fn build_welcome(&self, to: &Email, share_url: &Url) -> Result<Message, MailerError> {
        let html = WelcomeEmailHtml {
            email: to.as_str(),
            share_url: share_url.as_str(),
        }
        .render()?;
        let text = WelcomeEmailText {
            email: to.as_str(),
            share_url: share_url.as_str(),
        }
        .render()?;

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailerError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| MailerError::InvalidAddress(to.to_string()))?)
            .subject("Welcome to the rewards program!")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        Ok(message)
    }
}
