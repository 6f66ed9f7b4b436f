//! Daily close prices for one asset.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date-keyed close prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Asset identifier the prices belong to.
    pub asset: String,
    closes: BTreeMap<NaiveDate, Decimal>,
}

impl PriceSeries {
    /// Empty series for `asset`.
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            closes: BTreeMap::new(),
        }
    }

    /// Series built from `(date, close)` pairs. A later pair for the same
    /// date wins.
    pub fn from_closes(
        asset: impl Into<String>,
        closes: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    ) -> Self {
        Self {
            asset: asset.into(),
            closes: closes.into_iter().collect(),
        }
    }

    /// Record a close.
    pub fn insert(&mut self, date: NaiveDate, close: Decimal) {
        self.closes.insert(date, close);
    }

    /// Close observed exactly on `date`.
    #[must_use]
    pub fn close_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.closes.get(&date).copied()
    }

    /// Last close observed on or before `date`.
    ///
    /// `None` before the first observation.
    #[must_use]
    pub fn close_at_or_before(&self, date: NaiveDate) -> Option<Decimal> {
        self.closes.range(..=date).next_back().map(|(_, close)| *close)
    }

    /// Number of observed closes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    /// Whether nothing was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Observations in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.closes.iter().map(|(d, c)| (*d, *c))
    }

    /// Observations restricted to `[start, end]`.
    #[must_use]
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            return Self::new(self.asset.clone());
        }
        Self {
            asset: self.asset.clone(),
            closes: self
                .closes
                .range(start..=end)
                .map(|(d, c)| (*d, *c))
                .collect(),
        }
    }
}
