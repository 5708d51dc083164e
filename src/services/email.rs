//! Notification dispatch: the `Notifier` contract and its SMTP implementation

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// A message to deliver to one or more recipients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Outbound notification channel. Delivery is fire-and-forget: a failure is
/// reported to the caller and never retried here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification, recipients: &[String]) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, notification: &Notification, recipients: &[String]) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Biblioteca");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Notification(format!("Invalid from address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .subject(notification.subject.as_str());
        for recipient in recipients {
            let to_mailbox = Mailbox::from_str(recipient).map_err(|e| {
                AppError::Notification(format!("Invalid to address {}: {}", recipient, e))
            })?;
            builder = builder.to(to_mailbox);
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host).map_err(|e| {
                AppError::Notification(format!("Failed to create SMTP transport: {}", e))
            })?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, notification: &Notification, recipients: &[String]) -> AppResult<()> {
        if recipients.is_empty() {
            return Ok(());
        }

        if !self.config.enabled {
            tracing::info!(
                recipients = ?recipients,
                subject = %notification.subject,
                "Email disabled, notification not sent"
            );
            return Ok(());
        }

        let email = self.build_message(notification, recipients)?;
        let mailer = self.mailer()?;

        // lettre's SMTP transport blocks; keep it off the async workers.
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;

        tracing::debug!(count = recipients.len(), "Notification sent");
        Ok(())
    }
}
