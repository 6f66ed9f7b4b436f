//! Headline KPI values and their period-over-period change.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::Table;
use crate::error::PipelineError;

/// Relative change between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeIndicator {
    /// Not enough rows to compare.
    NoData,
    /// The reference value is zero.
    Undefined,
    /// `current / reference - 1`.
    Ratio(Decimal),
}

impl ChangeIndicator {
    /// Change between `reference` and `current`.
    #[must_use]
    pub fn between(reference: Decimal, current: Decimal) -> Self {
        current
            .checked_div(reference)
            .map_or(Self::Undefined, |r| Self::Ratio(r - Decimal::ONE))
    }

    /// Change as a percentage, rounded to two places.
    #[must_use]
    pub fn as_percent(&self) -> Option<Decimal> {
        match self {
            Self::Ratio(r) => Some((r * Decimal::ONE_HUNDRED).round_dp(2)),
            Self::NoData | Self::Undefined => None,
        }
    }
}

/// A headline value with its change indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpi {
    /// Source column.
    pub column: String,
    /// Value on the last row, `None` for an empty table.
    pub latest: Option<Decimal>,
    /// Change against the reference row.
    pub change: ChangeIndicator,
}

impl Kpi {
    /// `latest` rendered with [`format_large_number`].
    #[must_use]
    pub fn display_value(&self) -> String {
        self.latest
            .map_or_else(|| "-".to_string(), format_large_number)
    }
}

/// Last row against the row before it.
pub fn latest_vs_previous(table: &Table, column: &str) -> Result<Kpi, PipelineError> {
    latest_vs_lookback(table, column, 1)
}

/// Last row against the row `rows_back` positions earlier.
///
/// `NoData` when the table has `rows_back` rows or fewer.
pub fn latest_vs_lookback(
    table: &Table,
    column: &str,
    rows_back: usize,
) -> Result<Kpi, PipelineError> {
    let values = table.numeric_column(column)?;
    let latest = values.last().copied();
    let reference = rows_back
        .checked_add(1)
        .and_then(|span| values.len().checked_sub(span));
    let change = match (latest, reference) {
        (Some(current), Some(idx)) if rows_back > 0 => {
            ChangeIndicator::between(values[idx], current)
        }
        _ => ChangeIndicator::NoData,
    };
    Ok(Kpi {
        column: column.to_string(),
        latest,
        change,
    })
}

/// Sum of the last `window` rows against the sum of the `window` rows before.
///
/// `latest` holds the current window's sum. `NoData` below `2 * window` rows.
pub fn trailing_window(table: &Table, column: &str, window: usize) -> Result<Kpi, PipelineError> {
    let values = table.numeric_column(column)?;
    let n = values.len();
    let current_sum = |from: usize| values[from..].iter().sum::<Decimal>();

    if window == 0 || n < window {
        return Ok(Kpi {
            column: column.to_string(),
            latest: (window > 0 && n > 0).then(|| current_sum(0)),
            change: ChangeIndicator::NoData,
        });
    }

    let current = current_sum(n - window);
    let change = window
        .checked_mul(2)
        .and_then(|span| n.checked_sub(span))
        .map_or(ChangeIndicator::NoData, |from| {
            let previous = values[from..n - window].iter().sum::<Decimal>();
            ChangeIndicator::between(previous, current)
        });

    Ok(Kpi {
        column: column.to_string(),
        latest: Some(current),
        change,
    })
}

/// Compact rendering with `K`, `M` and `B` suffixes, one decimal place.
/// Values below a thousand are shown as whole numbers.
#[must_use]
pub fn format_large_number(value: Decimal) -> String {
    const SCALES: [(i64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

    let magnitude = value.abs();
    for (scale, suffix) in SCALES {
        let scale = Decimal::from(scale);
        if magnitude >= scale {
            let scaled =
                (value / scale).round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven);
            return format!("{scaled:.1}{suffix}");
        }
    }
    format!(
        "{}",
        value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    )
}
