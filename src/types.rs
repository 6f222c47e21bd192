use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Daily sequence numbers are drawn from [1, MAX_ORDER_NUMBER] per cafe.
pub const MAX_ORDER_NUMBER: i32 = 900;

/// The closed set of ordering locations sharing this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CafeSlug {
    Raysdiner,
    Lovesgrove,
    Cosmiccafe,
}

impl CafeSlug {
    pub const ALL: [CafeSlug; 3] = [CafeSlug::Raysdiner, CafeSlug::Lovesgrove, CafeSlug::Cosmiccafe];

    pub fn as_str(&self) -> &'static str {
        match self {
            CafeSlug::Raysdiner => "raysdiner",
            CafeSlug::Lovesgrove => "lovesgrove",
            CafeSlug::Cosmiccafe => "cosmiccafe",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CafeSlug::Raysdiner => "Rays Diner",
            CafeSlug::Lovesgrove => "Loves Grove",
            CafeSlug::Cosmiccafe => "Cosmic Cafe",
        }
    }

    /// Slugs arrive from clients in arbitrary casing/whitespace.
    pub fn parse(value: &str) -> Option<CafeSlug> {
        let normalized = value.trim().to_lowercase();
        CafeSlug::ALL.into_iter().find(|slug| slug.as_str() == normalized)
    }

    pub fn label_for(slug: &str) -> String {
        match CafeSlug::parse(slug) {
            Some(cafe) => cafe.label().to_owned(),
            None => slug.to_owned(),
        }
    }
}

impl Display for CafeSlug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Kitchen-facing order lifecycle. Forward-moving only, with one shortcut
/// (Pending -> Ready) for staff skipping the Preparing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
}

impl OrderStatus {
    pub const FLOW: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<OrderStatus> {
        OrderStatus::FLOW.into_iter().find(|status| status.as_str() == value)
    }

    fn position(&self) -> usize {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Completed => 3,
        }
    }

    /// Legal edges: self-loop, the next stage, and Pending -> Ready.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        if self == OrderStatus::Pending && next == OrderStatus::Ready {
            return true;
        }

        next.position() == self.position() || next.position() == self.position() + 1
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Round half-away-from-zero to 2 decimal places. The epsilon nudge keeps
/// half-boundary values like 1.005, whose closest f64 sits just below the
/// midpoint, from rounding down. Applied after every arithmetic combination
/// of currency values so report totals reproduce ledger-style incremental
/// bookkeeping exactly.
pub fn round_money(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// Prices read back from persistence are coerced: anything non-finite
/// becomes 0.
pub fn sanitize_price(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Zero-pad the daily sequence to a minimum of 2 digits: 1 -> "01",
/// 42 -> "42", 900 -> "900".
pub fn format_order_number(sequence: i32) -> String {
    format!("{:02}", sequence)
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

pub fn normalize_email(value: &str) -> Option<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Report dates must be real calendar dates in strict `YYYY-MM-DD` form.
pub fn parse_report_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if !DATE_RE.is_match(trimmed) {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("Order not found")]
    NotFound,

    #[error("Invalid status transition from {current}")]
    InvalidTransition { current: String },

    #[error("Daily order number capacity (900) reached for this cafe.")]
    CapacityExhausted,

    #[error("Order number allocation kept losing the counter race and gave up")]
    Contention,

    #[error("Database error: {0}")]
    Db(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_matrix_is_exactly_the_legal_edges() {
        use OrderStatus::*;

        let legal = [
            (Pending, Pending),
            (Pending, Preparing),
            (Pending, Ready),
            (Preparing, Preparing),
            (Preparing, Ready),
            (Ready, Ready),
            (Ready, Completed),
            (Completed, Completed),
        ];

        for current in OrderStatus::FLOW {
            for next in OrderStatus::FLOW {
                let expected = legal.contains(&(current, next));
                assert_eq!(
                    current.can_transition(next),
                    expected,
                    "{current} -> {next} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn backward_and_skipping_moves_are_rejected() {
        assert!(!OrderStatus::Ready.can_transition(OrderStatus::Preparing));
        assert!(!OrderStatus::Completed.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Preparing.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Completed));
        assert!(!OrderStatus::Preparing.can_transition(OrderStatus::Completed));
    }

    #[test]
    fn unknown_status_strings_do_not_parse() {
        assert_eq!(OrderStatus::parse("Pending"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("pending"), None);
        assert_eq!(OrderStatus::parse("Cancelled"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn order_numbers_are_padded_to_a_minimum_of_two_digits() {
        assert_eq!(format_order_number(1), "01");
        assert_eq!(format_order_number(9), "09");
        assert_eq!(format_order_number(42), "42");
        assert_eq!(format_order_number(900), "900");
    }

    #[test]
    fn money_rounding_is_half_away_from_zero() {
        assert_eq!(round_money(0.125), 0.13);
        assert_eq!(round_money(12.5), 12.5);
    }

    #[test]
    fn half_boundary_prices_round_up() {
        // 1.005 stores as 1.00499999...; the nudge keeps it on the upper side.
        assert_eq!(round_money(1.005), 1.01);
        assert_eq!(round_money(10.005), 10.01);
        assert_eq!(round_money(2.675), 2.68);
    }

    #[test]
    fn running_rounded_sums_do_not_drift() {
        let mut total = 0.0;
        for _ in 0..3 {
            total = round_money(total + 0.10);
        }
        assert_eq!(total, 0.30);
    }

    #[test]
    fn non_finite_prices_coerce_to_zero() {
        assert_eq!(sanitize_price(f64::NAN), 0.0);
        assert_eq!(sanitize_price(f64::INFINITY), 0.0);
        assert_eq!(sanitize_price(4.25), 4.25);
    }

    #[test]
    fn cafe_slugs_parse_case_insensitively_from_the_closed_set() {
        assert_eq!(CafeSlug::parse(" RaysDiner "), Some(CafeSlug::Raysdiner));
        assert_eq!(CafeSlug::parse("lovesgrove"), Some(CafeSlug::Lovesgrove));
        assert_eq!(CafeSlug::parse("some-other-cafe"), None);
        assert_eq!(CafeSlug::label_for("cosmiccafe"), "Cosmic Cafe");
    }

    #[test]
    fn email_shape_check_matches_the_simple_pattern() {
        assert!(is_valid_email("guest@example.com"));
        assert!(!is_valid_email("guest@example"));
        assert!(!is_valid_email("guest example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn report_dates_must_be_strict_iso_calendar_dates() {
        assert!(parse_report_date("2026-08-28").is_some());
        assert!(parse_report_date("2026-8-28").is_none());
        assert!(parse_report_date("2026-02-30").is_none());
        assert!(parse_report_date("not-a-date").is_none());
    }
}
