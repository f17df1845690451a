use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

pub const CONTRACT_LENGTH_MONTHS: u32 = 12;
pub const OPT_OUT_PERIOD_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractDates {
    pub contract_start_date: DateTime<Utc>,
    pub contract_end_date: DateTime<Utc>,
    pub opt_out_deadline: DateTime<Utc>,
}

/// End date is twelve calendar months after `start`, clamped to the last day of the
/// month when the day does not exist (2024-02-29 becomes 2025-02-28).
pub fn calculate_contract_dates(start: DateTime<Utc>) -> Result<ContractDates> {
    let contract_end_date = start
        .checked_add_months(Months::new(CONTRACT_LENGTH_MONTHS))
        .context("failed to compute contract end date")?;
    let opt_out_deadline = start
        .checked_add_signed(Duration::days(OPT_OUT_PERIOD_DAYS))
        .context("failed to compute opt-out deadline")?;

    Ok(ContractDates {
        contract_start_date: start,
        contract_end_date,
        opt_out_deadline,
    })
}

pub fn is_in_opt_out_period(opt_out_deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    opt_out_deadline.is_some_and(|deadline| now <= deadline)
}

pub fn is_contract_active(contract_end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    contract_end_date.is_some_and(|end| now <= end)
}

/// Whole days left until `deadline`, rounded up; zero once it has passed.
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = deadline - now;
    if remaining <= Duration::zero() {
        return 0;
    }
    let days = remaining.num_days();
    if remaining > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn contract_runs_twelve_calendar_months() {
        let dates = calculate_contract_dates(at(2025, 3, 15)).unwrap();
        assert_eq!(dates.contract_start_date, at(2025, 3, 15));
        assert_eq!(dates.contract_end_date, at(2026, 3, 15));
        assert_eq!(dates.opt_out_deadline, at(2025, 3, 29));
    }

    #[test]
    fn month_end_start_dates_keep_their_day() {
        let dates = calculate_contract_dates(at(2025, 1, 31)).unwrap();
        assert_eq!(dates.contract_end_date, at(2026, 1, 31));
    }

    #[test]
    fn leap_day_start_is_clamped_to_end_of_february() {
        let dates = calculate_contract_dates(at(2024, 2, 29)).unwrap();
        assert_eq!(dates.contract_end_date, at(2025, 2, 28));
    }

    #[test]
    fn opt_out_window_crosses_month_boundaries() {
        let dates = calculate_contract_dates(at(2025, 12, 25)).unwrap();
        assert_eq!(dates.opt_out_deadline, at(2026, 1, 8));
    }

    #[test]
    fn opt_out_period_is_a_closed_interval() {
        let deadline = at(2025, 3, 29);
        assert!(is_in_opt_out_period(Some(deadline), deadline));
        assert!(is_in_opt_out_period(
            Some(deadline),
            deadline - Duration::seconds(1)
        ));
        assert!(!is_in_opt_out_period(
            Some(deadline),
            deadline + Duration::seconds(1)
        ));
    }

    #[test]
    fn missing_dates_are_never_in_period() {
        assert!(!is_in_opt_out_period(None, at(2025, 1, 1)));
        assert!(!is_contract_active(None, at(2025, 1, 1)));
    }

    #[test]
    fn contract_is_active_through_its_end_date() {
        let end = at(2026, 3, 15);
        assert!(is_contract_active(Some(end), end));
        assert!(!is_contract_active(Some(end), end + Duration::seconds(1)));
    }

    #[test]
    fn partial_days_count_as_a_full_day() {
        let now = at(2025, 3, 15);
        assert_eq!(days_until(now + Duration::hours(1), now), 1);
        assert_eq!(days_until(now + Duration::days(14), now), 14);
        assert_eq!(days_until(now - Duration::days(1), now), 0);
    }
}
