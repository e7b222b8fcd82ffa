//! Billing-interval derivation from invoice line-item text.
//!
//! Stripe line descriptions carry the cadence as free text, e.g.
//! `1 × Owner's Report — Monthly (at $29.00 / month)`. Two heuristics run
//! in order: a dash-separated plan adjective (`— Monthly`, `- Annual`),
//! then a `/ <unit>` price suffix (`$29.00 / month`). If neither matches
//! the interval is unknown and the caller persists NULL rather than
//! aborting the event.

use std::sync::LazyLock;

use regex::Regex;

use owner_report_core::BillingInterval;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[–—-]\s*(monthly|annual|yearly|weekly|quarterly|daily)\b")
        .expect("Invalid regex")
});

static UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/\s*(day|week|month|year)\b").expect("Invalid regex"));

/// Classify a line-item description into a billing interval.
///
/// Returns `None` when the description is empty or matches neither
/// heuristic.
#[must_use]
pub fn classify_interval(description: &str) -> Option<BillingInterval> {
    if description.trim().is_empty() {
        return None;
    }

    if let Some(caps) = LABEL_RE.captures(description) {
        let label = caps.get(1)?.as_str().to_lowercase();
        return match label.as_str() {
            "monthly" => Some(BillingInterval::Month),
            "annual" | "yearly" => Some(BillingInterval::Year),
            "weekly" => Some(BillingInterval::Week),
            "quarterly" => Some(BillingInterval::Quarter),
            "daily" => Some(BillingInterval::Day),
            _ => None,
        };
    }

    UNIT_RE
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|unit| unit.as_str().to_lowercase().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_label_em_dash() {
        assert_eq!(
            classify_interval("Owner's Report — Monthly (at $29.00 / month)"),
            Some(BillingInterval::Month)
        );
        assert_eq!(
            classify_interval("Plan — Annual"),
            Some(BillingInterval::Year)
        );
    }

    #[test]
    fn test_dash_label_hyphen_and_en_dash() {
        assert_eq!(
            classify_interval("Plan - Quarterly"),
            Some(BillingInterval::Quarter)
        );
        assert_eq!(
            classify_interval("Report – Daily"),
            Some(BillingInterval::Day)
        );
        assert_eq!(
            classify_interval("Plan - Weekly"),
            Some(BillingInterval::Week)
        );
    }

    #[test]
    fn test_dash_label_case_insensitive() {
        assert_eq!(
            classify_interval("PLAN — YEARLY"),
            Some(BillingInterval::Year)
        );
    }

    #[test]
    fn test_slash_unit_fallback() {
        assert_eq!(classify_interval("$5.00 / week"), Some(BillingInterval::Week));
        assert_eq!(classify_interval("$29.00 / month"), Some(BillingInterval::Month));
        assert_eq!(classify_interval("$290.00 /year"), Some(BillingInterval::Year));
    }

    #[test]
    fn test_label_takes_precedence_over_slash_unit() {
        // "— Annual" wins even though "/ month" also appears.
        assert_eq!(
            classify_interval("Plan — Annual (was $29.00 / month)"),
            Some(BillingInterval::Year)
        );
    }

    #[test]
    fn test_unknown_text() {
        assert_eq!(classify_interval("Some random text"), None);
        assert_eq!(classify_interval(""), None);
        assert_eq!(classify_interval("   "), None);
    }

    #[test]
    fn test_word_boundary_respected() {
        // "monthlyish" is not a plan adjective.
        assert_eq!(classify_interval("Plan — Monthlyish"), None);
    }

    #[test]
    fn test_full_production_description() {
        assert_eq!(
            classify_interval("1 × Owner's Stock Report — Monthly (at $29.00 / month)"),
            Some(BillingInterval::Month)
        );
    }
}
