//! Settlement rules and cash-flow discounting.
//!
//! A [`DiscountEngine`] turns the delivery date of a storage cash flow into a
//! discount factor: the delivery date is mapped to a cash settlement date by
//! a [`SettlementRule`], and the settlement date is discounted with a
//! continuously compounded rate read from an interest-rate [`Curve`].
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use storage_core::market_data::curves::Curve;
//! use storage_core::market_data::discount::{DiscountEngine, MonthEndOffset};
//! use storage_core::types::{midnight, TimeGrid};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
//! let rates = Curve::flat(TimeGrid::daily(start, end).unwrap(), 0.01).unwrap();
//!
//! let engine = DiscountEngine::new(midnight(start), rates, MonthEndOffset::new(20));
//! let df = engine.discount_factor(midnight(NaiveDate::from_ymd_opt(2021, 7, 10).unwrap()));
//! assert!(df < 1.0 && df > 0.99);
//! ```

use chrono::{Datelike, Duration, Months, NaiveDateTime};
use std::fmt;
use std::sync::Arc;

use super::curves::Curve;
use crate::types::{midnight, DayCountConvention};

/// Maps a delivery date to its cash settlement date.
///
/// Implemented for any `Fn(NaiveDateTime) -> NaiveDateTime`, so a closure
/// can be passed wherever a rule is expected.
pub trait SettlementRule: Send + Sync {
    /// Settlement date of a cash flow for delivery at `delivery`.
    fn settlement_date(&self, delivery: NaiveDateTime) -> NaiveDateTime;
}

impl<F> SettlementRule for F
where
    F: Fn(NaiveDateTime) -> NaiveDateTime + Send + Sync,
{
    fn settlement_date(&self, delivery: NaiveDateTime) -> NaiveDateTime {
        self(delivery)
    }
}

/// Settles on the delivery date itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SameDay;

impl SettlementRule for SameDay {
    fn settlement_date(&self, delivery: NaiveDateTime) -> NaiveDateTime {
        delivery
    }
}

/// Settles a fixed number of days after the last day of the delivery month.
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::market_data::discount::{MonthEndOffset, SettlementRule};
/// use storage_core::types::midnight;
///
/// let rule = MonthEndOffset::new(20);
/// let delivery = midnight(NaiveDate::from_ymd_opt(2021, 2, 3).unwrap());
/// assert_eq!(
///     rule.settlement_date(delivery),
///     midnight(NaiveDate::from_ymd_opt(2021, 3, 20).unwrap())
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthEndOffset {
    days: i64,
}

impl MonthEndOffset {
    /// Rule settling `days` after month end.
    pub fn new(days: i64) -> Self {
        Self { days }
    }

    /// Offset in days.
    pub fn days(&self) -> i64 {
        self.days
    }
}

impl SettlementRule for MonthEndOffset {
    fn settlement_date(&self, delivery: NaiveDateTime) -> NaiveDateTime {
        let date = delivery.date();
        let month_end = date
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        midnight(month_end) + Duration::days(self.days)
    }
}

/// Discount factors for storage cash flows.
///
/// `DF(t) = exp(-r(settle) * yf(valuation_date, settle))` with
/// `settle = rule(t)`. Settlement on or before the valuation date gives 1.
#[derive(Clone)]
pub struct DiscountEngine {
    valuation_date: NaiveDateTime,
    rates: Curve,
    settlement: Arc<dyn SettlementRule>,
    day_count: DayCountConvention,
}

impl DiscountEngine {
    /// Engine with Act/365F year fractions.
    pub fn new<R>(valuation_date: NaiveDateTime, rates: Curve, settlement: R) -> Self
    where
        R: SettlementRule + 'static,
    {
        Self {
            valuation_date,
            rates,
            settlement: Arc::new(settlement),
            day_count: DayCountConvention::Actual365Fixed,
        }
    }

    /// Overrides the day count convention.
    pub fn with_day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Valuation date.
    #[inline]
    pub fn valuation_date(&self) -> NaiveDateTime {
        self.valuation_date
    }

    /// Interest-rate curve.
    #[inline]
    pub fn rates(&self) -> &Curve {
        &self.rates
    }

    /// Day count convention.
    #[inline]
    pub fn day_count(&self) -> DayCountConvention {
        self.day_count
    }

    /// Settlement date of a cash flow for delivery at `delivery`.
    #[inline]
    pub fn settlement_date(&self, delivery: NaiveDateTime) -> NaiveDateTime {
        self.settlement.settlement_date(delivery)
    }

    /// Discount factor for a cash flow paid exactly at `settlement`.
    pub fn discount_factor_at_settlement(&self, settlement: NaiveDateTime) -> f64 {
        if settlement <= self.valuation_date {
            return 1.0;
        }
        let rate = self.rates.value_at(settlement);
        let yf = self.day_count.year_fraction(self.valuation_date, settlement);
        (-rate * yf).exp()
    }

    /// Discount factor for a cash flow arising from delivery at `delivery`.
    pub fn discount_factor(&self, delivery: NaiveDateTime) -> f64 {
        self.discount_factor_at_settlement(self.settlement_date(delivery))
    }
}

impl fmt::Debug for DiscountEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscountEngine")
            .field("valuation_date", &self.valuation_date)
            .field("day_count", &self.day_count)
            .field("rates_len", &self.rates.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeGrid;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDateTime {
        midnight(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    fn flat_rates(rate: f64) -> Curve {
        let grid = TimeGrid::new(d(2021, 4, 1), d(2022, 6, 1), crate::types::Frequency::Daily)
            .unwrap();
        Curve::flat(grid, rate).unwrap()
    }

    #[test]
    fn test_month_end_offset() {
        let rule = MonthEndOffset::new(20);
        assert_eq!(rule.settlement_date(d(2021, 4, 25)), d(2021, 5, 20));
        assert_eq!(rule.settlement_date(d(2021, 12, 31)), d(2022, 1, 20));
        assert_eq!(rule.settlement_date(d(2024, 2, 10)), d(2024, 3, 20));
        assert_eq!(MonthEndOffset::new(0).settlement_date(d(2021, 6, 3)), d(2021, 6, 30));
    }

    #[test]
    fn test_same_day_and_closure_rules() {
        assert_eq!(SameDay.settlement_date(d(2021, 6, 3)), d(2021, 6, 3));
        let rule = |t: NaiveDateTime| t + Duration::days(2);
        assert_eq!(rule.settlement_date(d(2021, 6, 3)), d(2021, 6, 5));
    }

    #[test]
    fn test_discount_factor_value() {
        let engine = DiscountEngine::new(d(2021, 4, 1), flat_rates(0.05), SameDay);
        let df = engine.discount_factor(d(2022, 4, 1));
        assert_relative_eq!(df, (-0.05_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_settlement_on_or_before_valuation_is_undiscounted() {
        let engine = DiscountEngine::new(d(2021, 4, 10), flat_rates(0.05), SameDay);
        assert_eq!(engine.discount_factor(d(2021, 4, 10)), 1.0);
        assert_eq!(engine.discount_factor(d(2021, 4, 2)), 1.0);
    }

    #[test]
    fn test_rate_read_at_settlement_date() {
        let grid = TimeGrid::new(d(2021, 4, 1), d(2021, 8, 1), crate::types::Frequency::Daily)
            .unwrap();
        let rates = Curve::from_fn(grid, |t| if t < d(2021, 6, 1) { 0.0 } else { 0.1 }).unwrap();
        let engine = DiscountEngine::new(d(2021, 4, 1), rates, MonthEndOffset::new(20));
        // Delivery in April settles on 20 May, still at zero rate.
        assert_eq!(engine.discount_factor(d(2021, 4, 15)), 1.0);
        // Delivery in May settles on 20 June.
        let yf: f64 = 80.0 / 365.0;
        assert_relative_eq!(
            engine.discount_factor(d(2021, 5, 15)),
            (-0.1 * yf).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_act360_day_count() {
        let engine = DiscountEngine::new(d(2021, 4, 1), flat_rates(0.05), SameDay)
            .with_day_count(DayCountConvention::Actual360);
        let df = engine.discount_factor(d(2021, 7, 1));
        assert_relative_eq!(df, (-0.05_f64 * 91.0 / 360.0).exp(), epsilon = 1e-12);
    }
}
