//! Email alerts over STARTTLS SMTP.
//!
//! When any delivery parameter is missing the notifier degrades to a logged
//! no-op instead of failing, so the watcher still works as a console-only
//! monitor.

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Subject line for slot alerts.
pub const ALERT_SUBJECT: &str = "[TeachAssist] Appointment slot detected!";

/// Anything that can deliver an alert.
///
/// The watcher only sees this seam, so alert dispatch can be exercised
/// without an SMTP server, the same way the scanner reaches pages only
/// through `PageSource`.
#[async_trait]
pub trait AlertSink {
    /// Deliver one alert. Returns `false` when delivery is unconfigured and
    /// the alert was skipped.
    async fn notify(&self, subject: &str, body: &str) -> Result<bool>;
}

struct SmtpSettings {
    host: String,
    port: u16,
    credentials: Credentials,
    from: Mailbox,
    to: Mailbox,
}

/// Sends alert emails, or logs and skips when delivery is unconfigured.
pub struct Notifier {
    smtp: Option<SmtpSettings>,
}

impl Notifier {
    /// Build from config. Missing recipient/sender/SMTP credentials yield an
    /// unconfigured notifier; malformed addresses are a startup error.
    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.email_configured() {
            return Ok(Self { smtp: None });
        }

        // email_configured() guarantees these are present.
        let to = config.alert_email_to.as_deref().unwrap_or_default();
        let from = config.alert_email_from.as_deref().unwrap_or_default();
        let user = config.smtp_user.clone().unwrap_or_default();
        let pass = config.smtp_pass.clone().unwrap_or_default();

        Ok(Self {
            smtp: Some(SmtpSettings {
                host: config.smtp_host.clone(),
                port: config.smtp_port,
                credentials: Credentials::new(user, pass),
                from: from
                    .parse()
                    .with_context(|| format!("invalid sender address: {from}"))?,
                to: to
                    .parse()
                    .with_context(|| format!("invalid recipient address: {to}"))?,
            }),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_some()
    }
}

#[async_trait]
impl AlertSink for Notifier {
    /// Send one plain-text alert. Returns `false` when delivery is
    /// unconfigured (no network activity in that case).
    async fn notify(&self, subject: &str, body: &str) -> Result<bool> {
        let Some(smtp) = &self.smtp else {
            info!("email not configured, skipping alert");
            return Ok(false);
        };

        let message = Message::builder()
            .from(smtp.from.clone())
            .to(smtp.to.clone())
            .date_now()
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build alert message")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .context("failed to build SMTP transport")?
            .port(smtp.port)
            .credentials(smtp.credentials.clone())
            .build();

        mailer
            .send(message)
            .await
            .context("failed to send alert email")?;

        info!(to = %smtp.to, "alert email sent");
        Ok(true)
    }
}
