//! Email service for login codes and account verification

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Outgoing mail used by the authentication flow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a one-time login code
    async fn send_otp_code(&self, to: &str, code: &str, ttl_minutes: u64) -> AppResult<()>;

    /// Send the email verification link of a new account
    async fn send_verification(&self, to: &str, link: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("EV Rental");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.trim().replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => mailer_builder,
        };

        let mailer = mailer_builder.build();

        // SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::debug!(subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_otp_code(&self, to: &str, code: &str, ttl_minutes: u64) -> AppResult<()> {
        let body = format!(
            r#"
Your EV Rental login code is: {code}

This code will expire in {ttl_minutes} minutes.

If you didn't try to sign in, please change your password.
"#
        );

        self.send_email(to, "Your EV Rental login code", &body).await
    }

    async fn send_verification(&self, to: &str, link: &str) -> AppResult<()> {
        let body = format!(
            r#"
Welcome to EV Rental!

Please confirm your email address by opening the link below:
{link}
"#
        );

        self.send_email(to, "Confirm your EV Rental account", &body).await
    }
}
