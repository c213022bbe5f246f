//! TeachAssist portal client.
//!
//! TeachAssist is a plain server-rendered PHP application with cookie
//! sessions. Logging in means round-tripping the landing page's login form
//! with credentials filled in; once the session cookie is set, the per-date
//! booking pages are ordinary GETs.

mod errors;
pub mod session;

pub use errors::PortalError;

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use html_scraper::{Html, Selector};
use reqwest_cookie_store::CookieStoreMutex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Landing page; redirects to the login form when the session is stale.
const LANDING_PATH: &str = "/yrdsb/";

/// Per-date appointment booking page.
const BOOKING_PATH: &str = "/live/students/bookAppointment.php";

/// Attempts per navigation before the failure surfaces to the caller.
const NAV_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; scaled linearly by attempt number.
const NAV_BACKOFF: Duration = Duration::from_secs(2);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static USERNAME_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="student_number"], input[name="username"]"#).unwrap()
});
static PASSWORD_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="password"], input[name="password"]"#).unwrap()
});
static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static INPUT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input").unwrap());

/// Anything that can produce the booking page body for a date.
///
/// The scanner only sees this seam, so the scraping heuristics can be
/// exercised against canned pages without a network.
#[async_trait]
pub trait PageSource {
    async fn appointment_page(&self, date: NaiveDate) -> Result<String>;
}

/// The login form as extracted from the landing page: resolved action URL
/// plus every field that must be round-tripped on submit.
#[derive(Debug)]
struct LoginForm {
    action: Url,
    fields: Vec<(String, String)>,
}

/// Client for the TeachAssist portal, with a durable cookie session.
pub struct PortalClient {
    http: reqwest::Client,
    cookies: Arc<CookieStoreMutex>,
    base: Url,
    user_id: String,
    user_password: String,
    school_id: String,
    student_id: String,
    state_path: PathBuf,
}

impl PortalClient {
    /// Build a client with the persisted session (if any) preloaded.
    pub async fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(config.base.trim_end_matches('/'))
            .with_context(|| format!("invalid base URL: {}", config.base))?;

        let cookies = Arc::new(CookieStoreMutex::new(
            session::load(&config.state_path).await,
        ));

        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            cookies,
            base,
            user_id: config.user_id.clone(),
            user_password: config.user_password.clone(),
            school_id: config.school_id.clone(),
            student_id: config.student_id.clone(),
            state_path: config.state_path.clone(),
        })
    }

    /// Make sure the cookie session is authenticated. Idempotent per cycle.
    ///
    /// Hits the landing page; if it renders a login form, submits credentials
    /// through it. Login is considered complete when the post-submit page no
    /// longer contains a password input.
    pub async fn ensure_session(&self) -> Result<(), PortalError> {
        let landing = self
            .base
            .join(LANDING_PATH)
            .context("failed to build landing URL")?;

        let resp = self
            .send_with_retry(self.http.get(landing), "landing page")
            .await?;
        let final_url = resp.url().clone();
        let body = resp.text().await.context("failed to read landing page")?;

        let Some(form) = parse_login_form(&body, &final_url, &self.user_id, &self.user_password)
        else {
            debug!("session already authenticated");
            return Ok(());
        };

        info!(action = %form.action, "submitting login form");
        let resp = self
            .send_with_retry(
                self.http.post(form.action).form(&form.fields),
                "login submission",
            )
            .await?;
        let body = resp.text().await.context("failed to read login response")?;

        if has_password_input(&body) {
            return Err(PortalError::LoginFailed(
                "login page still shown after submitting credentials".to_string(),
            ));
        }

        info!("login completed");
        Ok(())
    }

    /// Persist the session cookies to the state file.
    pub async fn persist_session(&self) -> Result<()> {
        session::save(&self.cookies, &self.state_path).await
    }

    /// Booking-page URL for one date.
    pub fn booking_url(&self, date: NaiveDate) -> Result<Url> {
        let mut url = self
            .base
            .join(BOOKING_PATH)
            .context("failed to build booking URL")?;
        url.query_pairs_mut()
            .append_pair("school_id", &self.school_id)
            .append_pair("student_id", &self.student_id)
            .append_pair("inputDate", &date.to_string());
        Ok(url)
    }

    /// Send a request with bounded retries and linearly increasing backoff.
    ///
    /// Every navigation (GETs and the login POST alike) goes through here;
    /// the builder is cloned per attempt so form bodies can be replayed.
    async fn send_with_retry(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        retry_navigation(what, || {
            let attempt = request.try_clone();
            async move {
                let request = attempt.context("request body cannot be replayed")?;
                request
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(anyhow::Error::from)
            }
        })
        .await
    }
}

/// Run a navigation attempt up to [`NAV_ATTEMPTS`] times, backing off
/// linearly between failures.
async fn retry_navigation<T, Fut>(what: &str, mut attempt: impl FnMut() -> Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if tries < NAV_ATTEMPTS => {
                let backoff = NAV_BACKOFF * tries;
                warn!(
                    page = what,
                    attempt = tries,
                    error = %e,
                    backoff = ?backoff,
                    "navigation failed, retrying"
                );
                sleep(backoff).await;
                tries += 1;
            }
            Err(e) => {
                return Err(e.context(format!("{what} failed after {NAV_ATTEMPTS} attempts")));
            }
        }
    }
}

#[async_trait]
impl PageSource for PortalClient {
    async fn appointment_page(&self, date: NaiveDate) -> Result<String> {
        let url = self.booking_url(date)?;
        let resp = self.send_with_retry(self.http.get(url), "booking page").await?;
        resp.text().await.context("failed to read booking page")
    }
}

/// Extract the login form from a page body, if one is present.
///
/// Finds the form enclosing the `student_number`/`username` input,
/// round-trips its fields (skipping submit/image/button inputs and unchecked
/// radio/checkbox inputs), and fills in the credentials. Returns `None` when
/// the page carries no login form, i.e. the session is already live.
fn parse_login_form(body: &str, page_url: &Url, user: &str, password: &str) -> Option<LoginForm> {
    let html = Html::parse_document(body);

    let login_form = html
        .select(&FORM)
        .find(|form| form.select(&USERNAME_INPUT).next().is_some())?;

    let mut fields: Vec<(String, String)> = Vec::new();
    let mut user_field = None;
    let mut password_field = None;

    for input in login_form.select(&INPUT) {
        let name = match input.attr("name") {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };
        let input_type = input.attr("type").unwrap_or("text").to_lowercase();

        if input_type == "submit" || input_type == "image" || input_type == "button" {
            continue;
        }
        if (input_type == "radio" || input_type == "checkbox") && input.attr("checked").is_none() {
            continue;
        }

        if name == "student_number" || name == "username" {
            user_field = Some(name.to_string());
        } else if input_type == "password" || name == "password" {
            password_field = Some(name.to_string());
        }

        let value = input.attr("value").unwrap_or_default().to_string();
        fields.push((name.to_string(), value));
    }

    let user_field = user_field?;
    let password_field = password_field.unwrap_or_else(|| "password".to_string());

    set_field(&mut fields, &user_field, user);
    set_field(&mut fields, &password_field, password);

    let action = match login_form.attr("action").filter(|a| !a.is_empty()) {
        Some(action) => page_url.join(action).ok()?,
        None => page_url.clone(),
    };

    Some(LoginForm { action, fields })
}

fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    if let Some(existing) = fields.iter_mut().find(|(n, _)| n == name) {
        existing.1 = value.to_string();
    } else {
        fields.push((name.to_string(), value.to_string()));
    }
}

fn has_password_input(body: &str) -> bool {
    let html = Html::parse_document(body);
    html.select(&PASSWORD_INPUT).next().is_some()
}
