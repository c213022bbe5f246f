//! Environment-sourced configuration.
//!
//! All knobs come from the environment (a `.env` file is loaded first), and
//! are extracted once at startup into an explicit [`Config`] that is passed
//! into each component. Identity and date fields are required; email fields
//! are optional and only disable notification when absent.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Portal base URL.
    #[serde(default = "default_base")]
    pub base: String,

    /// Student number (or username) used to log in.
    pub user_id: String,
    pub user_password: String,

    /// Identifiers carried in the booking-page query string.
    pub school_id: String,
    pub student_id: String,

    /// Inclusive date window to scan.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    // Email delivery. All four of to/from/user/pass must be present for
    // alerts to be sent; otherwise the watcher degrades to log-only.
    #[serde(default)]
    pub alert_email_to: Option<String>,
    #[serde(default)]
    pub alert_email_from: Option<String>,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,

    /// Jitter bounds (seconds) for the idle wait between negative scans.
    #[serde(default = "default_check_min_sec")]
    pub check_min_sec: u64,
    #[serde(default = "default_check_max_sec")]
    pub check_max_sec: u64,

    /// Pause after a positive detection, to avoid repeated alerts while the
    /// same slot persists.
    #[serde(default = "default_cooloff_sec")]
    pub cooloff_sec: u64,

    /// Pause after a failed cycle before scanning again.
    #[serde(default = "default_recovery_sec")]
    pub recovery_sec: u64,

    /// Where the serialized session cookies live between runs.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_base() -> String {
    "https://ta.yrdsb.ca".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_check_min_sec() -> u64 {
    60
}

fn default_check_max_sec() -> u64 {
    180
}

fn default_cooloff_sec() -> u64 {
    300
}

fn default_recovery_sec() -> u64 {
    120
}

fn default_state_path() -> PathBuf {
    PathBuf::from("ta_state.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Reject configurations that would make the scanner meaningless.
    ///
    /// An inverted date range is an error rather than a silent zero-date
    /// scan, so a typo in `START_DATE`/`END_DATE` surfaces at startup.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            anyhow::bail!(
                "start_date {} is after end_date {}",
                self.start_date,
                self.end_date
            );
        }
        if self.check_min_sec > self.check_max_sec {
            anyhow::bail!(
                "check_min_sec {} exceeds check_max_sec {}",
                self.check_min_sec,
                self.check_max_sec
            );
        }
        Ok(())
    }

    /// True when every delivery parameter needed to send mail is present.
    pub fn email_configured(&self) -> bool {
        self.alert_email_to.is_some()
            && self.alert_email_from.is_some()
            && self.smtp_user.is_some()
            && self.smtp_pass.is_some()
    }
}

/// A filled-in config for unit tests elsewhere in the crate.
#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        base: default_base(),
        user_id: "123456789".to_string(),
        user_password: "hunter2".to_string(),
        school_id: "001".to_string(),
        student_id: "42".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        alert_email_to: None,
        alert_email_from: None,
        smtp_host: default_smtp_host(),
        smtp_port: default_smtp_port(),
        smtp_user: None,
        smtp_pass: None,
        check_min_sec: 60,
        check_max_sec: 180,
        cooloff_sec: 300,
        recovery_sec: 120,
        state_path: default_state_path(),
        log_level: default_log_level(),
    }
}
