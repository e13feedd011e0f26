//! Email notification dispatch over SMTP via lettre.
//!
//! Each send opens its own authenticated STARTTLS session; there is no
//! persistent connection pooling. Callers treat failures as non-fatal.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::errors::AppError;

#[derive(Clone)]
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Transport(format!("smtp relay setup failed: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send an HTML email. Connection, authentication and send failures all
    /// surface as [`AppError::Transport`].
    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| AppError::Transport(format!("invalid from address: {}", self.from_address)))?,
            )
            .to(to
                .parse()
                .map_err(|_| AppError::Transport(format!("invalid recipient address: {}", to)))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::Transport(format!("message build failed: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::Transport(format!("smtp send failed: {}", e)))?;

        tracing::debug!(to, subject, "notification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> EmailNotifier {
        EmailNotifier::new(&SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "user".into(),
            password: "pass".into(),
            from_address: "alerts@shelfsense.local".into(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn invalid_recipient_is_a_transport_error() {
        let err = notifier()
            .send("not an address", "subject", "<p>body</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
