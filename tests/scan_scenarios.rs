//! End-to-end scan scenarios driven through a canned page source.
//!
//! These exercise the full range-expansion -> fetch -> classify -> aggregate
//! -> alert path without touching the network: the portal is replaced by a
//! fixture that serves recorded page bodies (or fails) per date, and the
//! SMTP transport is replaced by a recording sink.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use tawatch::notifier::{ALERT_SUBJECT, AlertSink, Notifier};
use tawatch::portal::PageSource;
use tawatch::scanner::{date_range, scan_pages};
use tawatch::watcher::dispatch_alert;

const NOT_A_SCHOOL_DAY_PAGE: &str = r#"<html><body>
    <h1>Book an Appointment</h1>
    <p>Not a school day.</p>
</body></html>"#;

const BLUE_BOX_BOOKABLE_PAGE: &str = r#"<html><body>
    <h1>Book an Appointment</h1>
    <div class="box blue">
        <span>9:00 AM - 9:15 AM</span>
        <button>Book</button>
    </div>
    <div class="box yellow"><p>None Available</p></div>
</body></html>"#;

const NOTHING_OPEN_PAGE: &str = r#"<html><body>
    <h1>Book an Appointment</h1>
    <div class="box blue"><p>None Available</p></div>
    <div class="box yellow"><p>None Available</p></div>
</body></html>"#;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Serves a fixed body (or error) per date, recording every request.
struct RecordedPortal {
    pages: HashMap<NaiveDate, Result<String, String>>,
    requests: Mutex<Vec<NaiveDate>>,
}

impl RecordedPortal {
    fn new(pages: Vec<(&str, Result<&str, &str>)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(date, r)| (d(date), r.map(String::from).map_err(String::from)))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<NaiveDate> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for RecordedPortal {
    async fn appointment_page(&self, date: NaiveDate) -> Result<String> {
        self.requests.lock().unwrap().push(date);
        match self.pages.get(&date) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg.clone())),
            None => panic!("scan requested an unexpected date: {date}"),
        }
    }
}

/// Records every alert delivery instead of talking to an SMTP server.
struct RecordingSink {
    deliveries: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
        }
    }

    fn delivered(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn notify(&self, subject: &str, body: &str) -> Result<bool> {
        self.deliveries
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(true)
    }
}

/// A weekend-only range renders "Not a school day", the scan comes back
/// negative, and no alert is dispatched.
#[tokio::test]
async fn saturday_only_range_is_negative() {
    let portal = RecordedPortal::new(vec![("2024-01-06", Ok(NOT_A_SCHOOL_DAY_PAGE))]);
    let dates = date_range(d("2024-01-06"), d("2024-01-06")).unwrap();

    let available = scan_pages(&portal, &dates).await;
    assert!(!available);
    assert_eq!(portal.requested(), vec![d("2024-01-06")]);

    let sink = RecordingSink::new();
    dispatch_alert(&sink, available, "body").await;
    assert!(sink.delivered().is_empty());
}

/// One date's blue box carries a real button: the scan is positive and
/// exactly one alert with the fixed subject line goes out.
#[tokio::test]
async fn blue_box_button_triggers_detection() {
    let portal = RecordedPortal::new(vec![
        ("2024-01-08", Ok(NOTHING_OPEN_PAGE)),
        ("2024-01-09", Ok(BLUE_BOX_BOOKABLE_PAGE)),
    ]);
    let dates = date_range(d("2024-01-08"), d("2024-01-09")).unwrap();

    let available = scan_pages(&portal, &dates).await;
    assert!(available);

    let sink = RecordingSink::new();
    dispatch_alert(&sink, available, "window 2024-01-08 to 2024-01-09").await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, ALERT_SUBJECT);
    assert_eq!(delivered[0].1, "window 2024-01-08 to 2024-01-09");
}

/// The middle day of a 3-day range times out, but the last day is bookable.
/// The failure is contained per-date and the scan stays positive.
#[tokio::test]
async fn mid_range_failure_does_not_mask_later_availability() {
    let portal = RecordedPortal::new(vec![
        ("2024-01-08", Ok(NOTHING_OPEN_PAGE)),
        ("2024-01-09", Err("navigation timeout after 3 attempts")),
        ("2024-01-10", Ok(BLUE_BOX_BOOKABLE_PAGE)),
    ]);
    let dates = date_range(d("2024-01-08"), d("2024-01-10")).unwrap();

    assert!(scan_pages(&portal, &dates).await);
    // All three dates were attempted despite the failure in the middle.
    assert_eq!(
        portal.requested(),
        vec![d("2024-01-08"), d("2024-01-09"), d("2024-01-10")]
    );
}

/// With delivery parameters absent the notifier skips without any network
/// call, so a positive scan degrades to console-only reporting.
#[tokio::test]
async fn unconfigured_notifier_degrades_gracefully() {
    let config: tawatch::config::Config = figment::Figment::new()
        .merge(figment::providers::Serialized::defaults(
            serde_json::json!({
                "user_id": "123456789",
                "user_password": "hunter2",
                "school_id": "001",
                "student_id": "42",
                "start_date": "2024-01-08",
                "end_date": "2024-01-12",
            }),
        ))
        .extract()
        .unwrap();

    let notifier = Notifier::from_config(&config).unwrap();
    assert!(!notifier.is_configured());
    assert!(!notifier.notify(ALERT_SUBJECT, "body").await.unwrap());
}
