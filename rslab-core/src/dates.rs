//! Rebalance date generation and trading-date resolution.
//!
//! Theoretical dates are calendar arithmetic only; resolution maps each one
//! to the latest available trading date on or before it.

use chrono::{Duration, NaiveDate};

use crate::error::{CoreError, CoreResult};

/// Default calendar spacing between theoretical rebalance dates.
pub const DEFAULT_SPACING_DAYS: i64 = 30;

/// `periods` dates `reference_date - i * spacing_days` for `i = 0..periods`,
/// most recent first.
pub fn generate_theoretical_dates(
    reference_date: NaiveDate,
    periods: usize,
    spacing_days: i64,
) -> Vec<NaiveDate> {
    (0..periods)
        .map(|i| reference_date - Duration::days(i as i64 * spacing_days))
        .collect()
}

/// Resolve each theoretical date to the maximum available date `<=` it.
///
/// `available` must be sorted ascending (a panel's date index always is).
/// Output preserves the input order and length, so two theoretical dates may
/// resolve to the same trading day. Resolving an actual trading date returns
/// that same date.
pub fn resolve_to_trading_dates(
    available: &[NaiveDate],
    theoretical: &[NaiveDate],
) -> CoreResult<Vec<NaiveDate>> {
    theoretical
        .iter()
        .map(|&date| {
            // Number of available dates <= `date`.
            let upto = available.partition_point(|d| *d <= date);
            if upto == 0 {
                Err(CoreError::NoTradingDate { date })
            } else {
                Ok(available[upto - 1])
            }
        })
        .collect()
}

/// Calendar window a market-data collaborator must cover so that every
/// theoretical date resolves and indicators have `warmup_days` of history
/// before the oldest one. The end bound is exclusive (newest + 1 day).
pub fn download_window(
    theoretical: &[NaiveDate],
    warmup_days: i64,
) -> CoreResult<(NaiveDate, NaiveDate)> {
    let oldest = theoretical
        .iter()
        .min()
        .ok_or_else(|| CoreError::structural("no theoretical dates to build a window from"))?;
    let newest = theoretical
        .iter()
        .max()
        .ok_or_else(|| CoreError::structural("no theoretical dates to build a window from"))?;
    Ok((
        *oldest - Duration::days(warmup_days),
        *newest + Duration::days(1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn theoretical_dates_most_recent_first() {
        let dates = generate_theoretical_dates(d(2025, 3, 10), 3, DEFAULT_SPACING_DAYS);
        assert_eq!(dates, vec![d(2025, 3, 10), d(2025, 2, 8), d(2025, 1, 9)]);
    }

    #[test]
    fn zero_periods_is_empty() {
        assert!(generate_theoretical_dates(d(2025, 3, 10), 0, 30).is_empty());
    }

    #[test]
    fn resolves_weekend_to_previous_friday() {
        // 2024-01-06 is a Saturday.
        let available = vec![d(2024, 1, 4), d(2024, 1, 5), d(2024, 1, 8)];
        let resolved = resolve_to_trading_dates(&available, &[d(2024, 1, 6)]).unwrap();
        assert_eq!(resolved, vec![d(2024, 1, 5)]);
    }

    #[test]
    fn resolution_preserves_order_and_duplicates() {
        let available = vec![d(2024, 1, 2), d(2024, 1, 5)];
        let theoretical = vec![d(2024, 1, 4), d(2024, 1, 3), d(2024, 1, 9)];
        let resolved = resolve_to_trading_dates(&available, &theoretical).unwrap();
        assert_eq!(resolved, vec![d(2024, 1, 2), d(2024, 1, 2), d(2024, 1, 5)]);
    }

    #[test]
    fn resolution_is_idempotent_on_trading_dates() {
        let available = vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 5)];
        let resolved = resolve_to_trading_dates(&available, &available).unwrap();
        assert_eq!(resolved, available);
    }

    #[test]
    fn no_prior_date_is_an_error() {
        let available = vec![d(2024, 1, 5)];
        let err = resolve_to_trading_dates(&available, &[d(2024, 1, 4)]).unwrap_err();
        assert_eq!(err, CoreError::NoTradingDate { date: d(2024, 1, 4) });
    }

    #[test]
    fn download_window_adds_warmup_and_exclusive_end() {
        let theoretical = generate_theoretical_dates(d(2025, 3, 10), 7, 30);
        let (start, end) = download_window(&theoretical, 60).unwrap();
        assert_eq!(end, d(2025, 3, 11));
        assert_eq!(start, d(2025, 3, 10) - Duration::days(180 + 60));
        assert!(download_window(&[], 60).is_err());
    }
}
