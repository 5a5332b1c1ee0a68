//! Alert email delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send
//! plain-text alert emails. Delivery is opt-in: unless
//! `ENABLE_EMAIL_ALERTS=true`, [`EmailConfig::from_env`] returns `None` and
//! no mailer should be constructed.

use async_trait::async_trait;
use pumpwatch_core::alert::Alert;

use crate::message;
use crate::notifier::{NotificationChannel, NotificationError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Port that speaks TLS from the first byte instead of upgrading.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "alerts@pumpwatch.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Alert recipients.
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when email alerts are disabled or when the host or
    /// recipient list is missing.
    ///
    /// | Variable              | Required | Default                   |
    /// |-----------------------|----------|---------------------------|
    /// | `ENABLE_EMAIL_ALERTS` | yes      | `false`                   |
    /// | `SMTP_HOST`           | yes      | -                         |
    /// | `ALERT_EMAIL_TO`      | yes      | - (comma-separated)       |
    /// | `SMTP_PORT`           | no       | `587`                     |
    /// | `SMTP_FROM`           | no       | `alerts@pumpwatch.local`  |
    /// | `SMTP_USER`           | no       | -                         |
    /// | `SMTP_PASSWORD`       | no       | -                         |
    pub fn from_env() -> Option<Self> {
        if std::env::var("ENABLE_EMAIL_ALERTS").ok().as_deref() != Some("true") {
            return None;
        }
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        let recipients = parse_recipients(&std::env::var("ALERT_EMAIL_TO").ok()?);
        if recipients.is_empty() {
            tracing::warn!("ENABLE_EMAIL_ALERTS is set but ALERT_EMAIL_TO is empty");
            return None;
        }
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            recipients,
        })
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends alert emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    /// Create a new email delivery service with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send one alert email to a single address.
    pub async fn deliver(&self, to_email: &str, alert: &Alert) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(message::subject(alert))
            .header(ContentType::TEXT_PLAIN)
            .body(message::plain_text(alert))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let relay = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        };
        let mut transport_builder = relay.port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, alert_id = alert.id, alert_type = %alert.kind, "Alert email sent");
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for EmailDelivery {
    fn name(&self) -> &'static str {
        "email"
    }

    /// Sends to every recipient; the first failure is reported after all
    /// recipients have been tried.
    async fn send(&self, alert: &Alert) -> Result<(), NotificationError> {
        let mut first_err = None;
        for to in &self.config.recipients {
            if let Err(e) = self.deliver(to, alert).await {
                tracing::warn!(to = %to, error = %e, "Alert email to recipient failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_when_disabled() {
        std::env::remove_var("ENABLE_EMAIL_ALERTS");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            parse_recipients(" ops@example.com, ,oncall@example.com "),
            vec!["ops@example.com".to_string(), "oncall@example.com".to_string()]
        );
        assert!(parse_recipients(" , ").is_empty());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[tokio::test]
    async fn bad_sender_address_fails_before_connecting() {
        let delivery = EmailDelivery::new(EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: "not an address".to_string(),
            smtp_user: None,
            smtp_password: None,
            recipients: vec!["ops@example.com".to_string()],
        });
        let result = delivery.send(&crate::message::tests::sample_alert()).await;
        assert!(matches!(
            result,
            Err(NotificationError::Email(EmailError::Address(_)))
        ));
    }
}
