//! Rental pricing.
//!
//! A rental is charged per day for the car, plus a flat daily fee when a
//! driver is hired. Late returns are charged the same daily rate for every
//! day past the agreed end date.

use crate::money::Money;
use chrono::NaiveDate;
use thiserror::Error;

/// Daily fee for hiring a driver.
pub const DRIVER_FEE_PER_DAY: Money = Money::from_major(100_000);

/// Pricing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    /// The rental period is empty or reversed.
    #[error("End date must be greater than start date")]
    InvalidPeriod,
}

/// Number of rental days between `start` and `end`.
///
/// # Errors
///
/// [`PricingError::InvalidPeriod`] when `end <= start`.
pub fn rent_duration(start: NaiveDate, end: NaiveDate) -> Result<i64, PricingError> {
    let days = (end - start).num_days();
    if days <= 0 {
        return Err(PricingError::InvalidPeriod);
    }
    Ok(days)
}

/// Daily rate for a car, with the driver fee when applicable.
#[must_use]
pub const fn daily_rate(price: Money, with_driver: bool) -> Money {
    if with_driver {
        price.saturating_add(DRIVER_FEE_PER_DAY)
    } else {
        price
    }
}

/// Total charge for `days` days.
#[must_use]
pub const fn total_cost(price: Money, days: i64, with_driver: bool) -> Money {
    daily_rate(price, with_driver).times(days)
}

/// Late fee for returning on `return_date` a car due on `end`.
///
/// `None` when the car came back on time.
#[must_use]
pub fn late_fee(price: Money, end: NaiveDate, return_date: NaiveDate, with_driver: bool) -> Option<Money> {
    let late_days = (return_date - end).num_days();
    (late_days > 0).then(|| daily_rate(price, with_driver).times(late_days))
}
