//! The polling loop.
//!
//! Two steady states: scanning, then waiting. A positive scan triggers the
//! notifier and a long cool-off so a persisting slot doesn't spam alerts; a
//! negative scan waits a jittered interval so the polling pattern stays
//! irregular; a failed cycle logs and takes a fixed recovery pause. No cycle
//! outcome is ever fatal -- the loop only exits on cancellation.

use crate::config::Config;
use crate::notifier::{ALERT_SUBJECT, AlertSink, Notifier};
use crate::portal::PortalClient;
use crate::scanner;
use crate::utils::fmt_duration;
use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Send the alert for a positive scan result; negative results dispatch
/// nothing.
///
/// Delivery failures are logged and contained here -- a dead SMTP server must
/// not take the watcher down with it.
pub async fn dispatch_alert(sink: &(impl AlertSink + ?Sized), available: bool, body: &str) {
    if !available {
        return;
    }

    match sink.notify(ALERT_SUBJECT, body).await {
        Ok(true) => {}
        Ok(false) => info!("slot detected but alerts are log-only"),
        Err(e) => error!(error = ?e, "failed to send alert email"),
    }
}

pub struct Watcher {
    config: Config,
    portal: PortalClient,
    notifier: Notifier,
}

impl Watcher {
    pub async fn new(config: Config) -> Result<Self> {
        let portal = PortalClient::new(&config).await?;
        let notifier = Notifier::from_config(&config)?;
        Ok(Self {
            config,
            portal,
            notifier,
        })
    }

    /// Run the watch loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            email = self.notifier.is_configured(),
            "watcher started"
        );

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.cycle() => result,
            };

            let pause = match result {
                Ok(true) => Duration::from_secs(self.config.cooloff_sec),
                Ok(false) => {
                    let secs = rand::rng()
                        .random_range(self.config.check_min_sec..=self.config.check_max_sec);
                    Duration::from_secs(secs)
                }
                Err(_) => Duration::from_secs(self.config.recovery_sec),
            };

            debug!(pause = fmt_duration(pause), "waiting for next cycle");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("watcher exiting gracefully");
    }

    /// Run exactly one scan-and-notify pass (the `--once` mode).
    pub async fn run_once(&self) -> Result<bool> {
        self.cycle().await
    }

    /// One loop iteration: scan, alert on a positive result.
    async fn cycle(&self) -> Result<bool> {
        let available = self.scan().await?;
        info!(any_available = available, "scan cycle complete");

        dispatch_alert(&self.notifier, available, &self.alert_body()).await;

        Ok(available)
    }

    async fn scan(&self) -> Result<bool> {
        scanner::scan(&self.portal, self.config.start_date, self.config.end_date)
            .await
            .inspect_err(|e| error!(error = ?e, "scan cycle failed"))
    }

    fn alert_body(&self) -> String {
        let sample_url = self
            .portal
            .booking_url(self.config.start_date)
            .map(|u| u.to_string())
            .unwrap_or_default();

        format!(
            "At least one date in your range shows potential availability.\n\
             Open TeachAssist and book ASAP.\n\n\
             Window: {start} to {end}\n\
             Direct sample URL: {sample_url}\n\
             (Automated alert)",
            start = self.config.start_date,
            end = self.config.end_date,
        )
    }
}
