//! Date-range scanner: one session, one pass over every date in the window.
//!
//! A failure on one date is logged and counts as unavailable; the scan keeps
//! going so a single flaky page can't hide availability later in the range.

use crate::classifier;
use crate::portal::{PageSource, PortalClient};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

/// Expand an inclusive date range, oldest first.
///
/// `start > end` is rejected rather than yielding an empty scan; config
/// validation catches this at startup, this is the last line of defense.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        anyhow::bail!("start date {start} is after end date {end}");
    }

    let mut dates = Vec::new();
    let mut current = start;
    loop {
        dates.push(current);
        if current == end {
            break;
        }
        current = current.succ_opt().context("date out of range")?;
    }
    Ok(dates)
}

/// Check every date against a page source, aggregating by logical OR.
pub async fn scan_pages(source: &(impl PageSource + ?Sized), dates: &[NaiveDate]) -> bool {
    let mut any_available = false;

    for &date in dates {
        match source.appointment_page(date).await {
            Ok(body) => {
                let verdict = classifier::classify(&body);
                debug!(
                    %date,
                    available = verdict.available,
                    blue = verdict.blue,
                    yellow = verdict.yellow,
                    school_day = verdict.school_day,
                    "checked date"
                );
                if verdict.available {
                    info!(%date, "appointment slot available");
                    any_available = true;
                }
            }
            Err(e) => {
                error!(%date, error = ?e, "failed to check date");
            }
        }
    }

    any_available
}

/// Run one full scan cycle: authenticate once, check every date, persist the
/// session state. Persistence happens on both success and failure paths.
pub async fn scan(portal: &PortalClient, start: NaiveDate, end: NaiveDate) -> Result<bool> {
    let dates = date_range(start, end)?;
    debug!(start = %start, end = %end, days = dates.len(), "starting scan cycle");

    let outcome = async {
        portal
            .ensure_session()
            .await
            .context("failed to establish portal session")?;
        Ok(scan_pages(portal, &dates).await)
    }
    .await;

    if let Err(e) = portal.persist_session().await {
        warn!(error = ?e, "failed to persist session state");
    }

    outcome
}
