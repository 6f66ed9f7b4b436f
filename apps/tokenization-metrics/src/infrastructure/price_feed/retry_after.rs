//! `Retry-After` header parsing.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Delay used when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Parse a `Retry-After` value.
///
/// Supports both delta-seconds (`"120"`) and HTTP-date
/// (`"Wed, 21 Oct 2026 07:28:00 GMT"`) forms. A date in the past yields a
/// zero delay.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (at.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}
