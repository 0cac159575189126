//! Calendar-day resolution and date-key arithmetic.
//!
//! A date key is a `YYYY-MM-DD` string resolved in the participant's
//! timezone. It is the idempotency-key component for check-ins, so every
//! conversion here is explicit about which zone it happened in.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, Result};

/// Format of a date key.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Parse an IANA timezone name (e.g. `"Asia/Shanghai"`).
///
/// # Errors
/// `InvalidArgument` for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::InvalidArgument(format!("unknown timezone: {name}")))
}

/// Today's date key in the given timezone.
pub fn date_key_now(tz_name: &str) -> Result<String> {
    let tz = parse_timezone(tz_name)?;
    Ok(Utc::now().with_timezone(&tz).format(DATE_KEY_FORMAT).to_string())
}

/// Parse a `YYYY-MM-DD` date key.
///
/// # Errors
/// `InvalidArgument` for malformed keys.
pub fn parse_date_key(date_key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_key, DATE_KEY_FORMAT)
        .map_err(|_| CoreError::InvalidArgument(format!("invalid date key: {date_key}")))
}

/// Whole days from `start_date_key` to `date_key` (negative if earlier).
pub fn diff_days(start_date_key: &str, date_key: &str) -> Result<i64> {
    let start = parse_date_key(start_date_key)?;
    let end = parse_date_key(date_key)?;
    Ok((end - start).num_days())
}
