use thiserror::Error;

use crate::value_objects::enums::{billing_periods::BillingPeriod, plans::Plan};

pub const CURRENCY: &str = "EUR";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Ongeldig abonnement gekozen")]
    InvalidPlan,
    #[error("Ongeldige betaalperiode gekozen")]
    InvalidBillingPeriod,
    #[error("invalid amount value: {0}")]
    InvalidAmount(String),
}

/// Base price in euro cents, before any discount.
pub fn base_price(plan: Plan, period: BillingPeriod) -> i32 {
    match (plan, period) {
        (Plan::Solo, BillingPeriod::Monthly) => 3_495,
        (Plan::Solo, BillingPeriod::Yearly) => 34_900,
        (Plan::Team, BillingPeriod::Monthly) => 7_995,
        (Plan::Team, BillingPeriod::Yearly) => 79_900,
    }
}

pub fn parse_selection(plan: &str, period: &str) -> Result<(Plan, BillingPeriod), PricingError> {
    let plan = Plan::from_str(plan).ok_or(PricingError::InvalidPlan)?;
    let period = BillingPeriod::from_str(period).ok_or(PricingError::InvalidBillingPeriod)?;
    Ok((plan, period))
}

/// Formats cents the way the Mollie API expects amount values: `"349.00"`.
pub fn format_amount(minor: i32) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parses a Mollie amount value (`"349.00"`) back into cents.
pub fn parse_amount(value: &str) -> Result<i32, PricingError> {
    let invalid = || PricingError::InvalidAmount(value.to_string());
    let trimmed = value.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty()
        || fraction.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i32 = whole.parse().map_err(|_| invalid())?;
    let fraction: i32 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i32>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };

    let minor = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(invalid)?;

    Ok(if negative { -minor } else { minor })
}

/// Dutch display format used in emails: `"€ 349,00"`.
pub fn format_euro(minor: i32) -> String {
    format!("€ {}", format_amount(minor).replace('.', ","))
}
