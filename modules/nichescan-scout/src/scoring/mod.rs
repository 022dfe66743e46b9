//! Opportunity scoring. Pure functions over acquired data; no I/O.
//!
//! Insufficient input yields `None` rather than a score of unknown validity.

mod category;
mod niche;

pub use category::{score_category, CATEGORY_MIN_ITEMS};
pub use niche::score_niche;

use chrono::NaiveDate;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Release dates arrive in the catalog's display format, e.g. "Mar 14, 2025".
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%b %d, %Y").ok()
}
