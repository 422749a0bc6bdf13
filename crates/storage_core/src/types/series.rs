//! Dated numeric output series.

use chrono::NaiveDateTime;

use super::error::ConfigurationError;

/// Ordered `(date, value)` pairs, e.g. per-date deltas.
///
/// Dates are strictly increasing. The series is plain data with no
/// interpolation; use [`crate::market_data::curves::Curve`] for lookups
/// between points.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use storage_core::types::TimeSeries;
///
/// let d0 = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let d1 = NaiveDate::from_ymd_opt(2021, 4, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let series = TimeSeries::new(vec![d0, d1], vec![1.5, -0.5]).unwrap();
///
/// assert_eq!(series.get(d1), Some(-0.5));
/// assert_eq!(series.sum(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSeries {
    dates: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Builds a series from parallel vectors.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::LengthMismatch`] for vectors of different
    /// length, [`ConfigurationError::InvalidParameter`] for dates that are
    /// not strictly increasing.
    pub fn new(dates: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, ConfigurationError> {
        if dates.len() != values.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "time series values",
                expected: dates.len(),
                got: values.len(),
            });
        }
        if let Some(i) = dates.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ConfigurationError::invalid(
                "dates",
                format!("not strictly increasing at index {}", i + 1),
            ));
        }
        Ok(Self { dates, values })
    }

    /// Dates.
    #[inline]
    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    /// Values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True if the series holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value at exactly `date`.
    pub fn get(&self, date: NaiveDateTime) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// Iterator over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Sum of all values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 4, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_and_lookup() {
        let series = TimeSeries::new(vec![day(1), day(2), day(5)], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(day(5)), Some(3.0));
        assert_eq!(series.get(day(3)), None);
        assert_eq!(series.iter().count(), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let result = TimeSeries::new(vec![day(1)], vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ConfigurationError::LengthMismatch { expected: 1, got: 2, .. })
        ));
    }

    #[test]
    fn test_unsorted_dates_rejected() {
        let result = TimeSeries::new(vec![day(2), day(1)], vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidParameter { name: "dates", .. })
        ));
    }
}
