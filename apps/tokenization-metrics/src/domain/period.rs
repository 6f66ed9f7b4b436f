//! Period calendar for day and month granularity.
//!
//! A period is identified by its start date: the date itself for daily
//! series, the first of the month for monthly series. Periods are contiguous
//! and non-overlapping, so `next` and `truncate` fully describe a spine.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Granularity of a period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    /// One row per calendar day.
    Day,
    /// One row per calendar month, keyed by its first day.
    #[default]
    Month,
}

impl PeriodUnit {
    /// Start of the period containing `date`.
    #[must_use]
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the period after the one containing `date`.
    #[must_use]
    pub fn next(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Day => date.succ_opt(),
            Self::Month => self.truncate(date).checked_add_months(Months::new(1)),
        }
    }

    /// Whole periods from the period of `min` to the period of `max`.
    ///
    /// Negative when `max` precedes `min`.
    #[must_use]
    pub fn periods_between(self, min: NaiveDate, max: NaiveDate) -> i64 {
        let (min, max) = (self.truncate(min), self.truncate(max));
        match self {
            Self::Day => (max - min).num_days(),
            Self::Month => {
                i64::from(max.year() - min.year()) * 12 + i64::from(max.month())
                    - i64::from(min.month())
            }
        }
    }

    /// Every period start from `min` through `max`, inclusive and ascending.
    ///
    /// Empty when `max` precedes `min`.
    #[must_use]
    pub fn spine(self, min: NaiveDate, max: NaiveDate) -> Vec<NaiveDate> {
        let end = self.truncate(max);
        let count = usize::try_from(self.periods_between(min, max) + 1).unwrap_or(0);
        let mut periods = Vec::with_capacity(count);
        let mut current = Some(self.truncate(min));
        while let Some(period) = current {
            if period > end {
                break;
            }
            periods.push(period);
            current = self.next(period);
        }
        periods
    }

    /// Lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown period unit names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period unit '{0}' (expected day or month)")]
pub struct ParsePeriodUnitError(String);

impl FromStr for PeriodUnit {
    type Err = ParsePeriodUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" | "d" => Ok(Self::Day),
            "month" | "monthly" | "m" => Ok(Self::Month),
            other => Err(ParsePeriodUnitError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_truncate_and_next() {
        assert_eq!(PeriodUnit::Month.truncate(date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(PeriodUnit::Month.next(date(2024, 12, 15)), Some(date(2025, 1, 1)));
        assert_eq!(PeriodUnit::Day.next(date(2024, 2, 28)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_month_spine_crosses_year() {
        let spine = PeriodUnit::Month.spine(date(2023, 11, 20), date(2024, 2, 3));
        assert_eq!(
            spine,
            vec![
                date(2023, 11, 1),
                date(2023, 12, 1),
                date(2024, 1, 1),
                date(2024, 2, 1)
            ]
        );
    }

    #[test]
    fn test_inverted_spine_is_empty() {
        assert!(PeriodUnit::Day.spine(date(2024, 1, 2), date(2024, 1, 1)).is_empty());
        assert_eq!(
            PeriodUnit::Day.periods_between(date(2024, 1, 2), date(2024, 1, 1)),
            -1
        );
    }

    #[test_case("day", PeriodUnit::Day)]
    #[test_case("Daily", PeriodUnit::Day)]
    #[test_case("month", PeriodUnit::Month)]
    #[test_case(" monthly ", PeriodUnit::Month)]
    fn test_parse(input: &str, expected: PeriodUnit) {
        assert_eq!(input.parse::<PeriodUnit>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("week".parse::<PeriodUnit>().is_err());
    }

    proptest! {
        #[test]
        fn spine_len_matches_periods_between(
            start in 0i64..3000,
            span in 0i64..800,
            monthly in any::<bool>(),
        ) {
            let unit = if monthly { PeriodUnit::Month } else { PeriodUnit::Day };
            let min = date(2015, 1, 1) + chrono::Duration::days(start);
            let max = min + chrono::Duration::days(span);
            let spine = unit.spine(min, max);

            prop_assert_eq!(spine.len() as i64, unit.periods_between(min, max) + 1);
            prop_assert!(spine.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(spine[0], unit.truncate(min));
            prop_assert_eq!(*spine.last().unwrap(), unit.truncate(max));
        }
    }
}
