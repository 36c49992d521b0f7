// Alert delivery for upstream failures

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::environment::{AlertChannel, EnvironmentVariables};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub service: String,
    pub message: String,
}

impl Alert {
    pub fn circuit_open(service: &str) -> Self {
        Self {
            service: service.to_string(),
            message: format!(
                "Circuit breaker triggered for {service}. Service temporarily unavailable."
            ),
        }
    }

    pub fn subject(&self) -> String {
        format!("Alert: Service Issue in {}", self.service)
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid mailbox '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build alert email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Writes alerts to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        warn!(service = %alert.service, subject = %alert.subject(), "{}", alert.message);
        Ok(())
    }
}

/// Emails alerts through a STARTTLS relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn from_env(env: &EnvironmentVariables) -> Result<Self, AlertError> {
        let from: Mailbox = parse_mailbox(&env.smtp_username)?;
        let to: Mailbox = parse_mailbox(&env.alert_email)?;

        let transport: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&env.smtp_server)?
                .port(env.smtp_port)
                .credentials(Credentials::new(
                    env.smtp_username.to_string(),
                    env.smtp_password.to_string(),
                ))
                .build();

        Ok(Self { transport, from, to })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, AlertError> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.message.clone())?)
    }
}

#[async_trait]
impl AlertNotifier for SmtpNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let message: Message = self.build_message(alert)?;
        self.transport.send(message).await?;
        info!(service = %alert.service, "Alert sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address.parse().map_err(|e: lettre::address::AddressError| AlertError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Picks the notifier configured by ALERT_CHANNEL
pub fn notifier_from_env(env: &EnvironmentVariables) -> Result<Arc<dyn AlertNotifier>, AlertError> {
    match env.alert_channel {
        AlertChannel::Email => Ok(Arc::new(SmtpNotifier::from_env(env)?)),
        AlertChannel::Log => Ok(Arc::new(LogNotifier)),
    }
}

/// Delivers an alert in the background. Failures are logged, never returned.
pub fn dispatch(notifier: Arc<dyn AlertNotifier>, alert: Alert) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&alert).await {
            error!(service = %alert.service, "Failed to send alert: {}", e);
        }
    });
}
