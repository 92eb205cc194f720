//! Fee calculator.
//!
//! Pure date arithmetic; no side effects, no persistence. Amounts are
//! rounded to two decimal places.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Rental fee for the planned borrowing period.
///
/// A same-day loan still costs one day, hence the floor at 1.
pub fn base_amount(
    borrow_date: NaiveDate,
    expected_return_date: NaiveDate,
    daily_fee: Decimal,
) -> Decimal {
    let days = (expected_return_date - borrow_date).num_days().max(1);
    (daily_fee * Decimal::from(days)).round_dp(2)
}

/// Overdue fine, or `None` when the borrowing came back on time.
///
/// `None` means no Fine payment row is created at all; it is not a
/// zero-amount fine.
pub fn fine_amount(
    expected_return_date: NaiveDate,
    actual_return_date: NaiveDate,
    daily_fee: Decimal,
) -> Option<Decimal> {
    let overdue_days = (actual_return_date - expected_return_date).num_days();
    if overdue_days <= 0 {
        return None;
    }
    Some((daily_fee * Decimal::from(overdue_days)).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn fee() -> Decimal {
        Decimal::new(199, 2) // 1.99
    }

    #[test]
    fn same_day_loan_costs_one_day() {
        assert_eq!(base_amount(day(1), day(1), fee()), Decimal::new(199, 2));
    }

    #[test]
    fn five_day_loan() {
        assert_eq!(base_amount(day(1), day(6), fee()), Decimal::new(995, 2));
    }

    #[test]
    fn on_time_return_produces_no_fine() {
        assert_eq!(fine_amount(day(10), day(10), fee()), None);
    }

    #[test]
    fn early_return_produces_no_fine() {
        assert_eq!(fine_amount(day(10), day(8), fee()), None);
    }

    #[test]
    fn three_days_late() {
        assert_eq!(
            fine_amount(day(10), day(13), fee()),
            Some(Decimal::new(597, 2))
        );
    }

    #[test]
    fn ten_days_late() {
        assert_eq!(
            fine_amount(day(1), day(11), fee()),
            Some(Decimal::new(1990, 2))
        );
    }
}
