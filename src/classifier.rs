//! Availability classifier for a single date's booking page.
//!
//! TeachAssist offers no structured API, so availability is inferred from the
//! rendered HTML: a date is bookable when one of the appointment boxes
//! contains a real control (button, link, or submit-style input) and does not
//! say "None Available". Weekends and holidays are gated up front by the
//! page-wide "not a school day" banner.

use html_scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Page-wide negative: the date is a weekend or holiday.
const NOT_A_SCHOOL_DAY: &str = "not a school day";

/// Per-box negative: the box is rendered but has nothing to book.
const NONE_AVAILABLE: &str = "none available";

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static BLUE_BOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.box.blue").unwrap());
static YELLOW_BOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.box.yellow").unwrap());

/// A bookable action nested inside a box. Decorative empty boxes have none.
static BOOKABLE_CONTROL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"button, a, input[type="submit"], input[type="button"]"#).unwrap()
});

/// Classification outcome for one date's page.
///
/// The per-box flags exist for logging; callers should consult [`Verdict::available`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// At least one box exposes a bookable control.
    pub available: bool,
    pub blue: bool,
    pub yellow: bool,
    /// False when the page carries the "not a school day" banner.
    pub school_day: bool,
}

impl Verdict {
    fn unavailable(school_day: bool) -> Self {
        Self {
            available: false,
            blue: false,
            yellow: false,
            school_day,
        }
    }
}

/// Classify one booking page body.
///
/// Never errors: a page with neither box (or no body at all) is simply
/// unavailable.
pub fn classify(body: &str) -> Verdict {
    let html = Html::parse_document(body);

    let body_text = html
        .select(&BODY)
        .next()
        .map(normalize)
        .unwrap_or_default();
    if body_text.contains(NOT_A_SCHOOL_DAY) {
        return Verdict::unavailable(false);
    }

    let blue = html.select(&BLUE_BOX).any(box_available);
    let yellow = html.select(&YELLOW_BOX).any(box_available);

    Verdict {
        available: blue || yellow,
        blue,
        yellow,
        school_day: true,
    }
}

/// True when this box has something to book: no "none available" text, and
/// at least one real control nested inside it.
fn box_available(region: ElementRef<'_>) -> bool {
    if normalize(region).contains(NONE_AVAILABLE) {
        return false;
    }
    region.select(&BOOKABLE_CONTROL).next().is_some()
}

/// Collapse an element's visible text: whitespace joined to single spaces,
/// lowercased.
fn normalize(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
