/// Normalization of heterogeneous timestamps into epoch milliseconds
use log::trace;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::models::RawTimestamp;

// Numbers below this magnitude are epoch seconds, anything else is already
// milliseconds. Producers depend on this exact boundary.
const SECONDS_THRESHOLD: f64 = 1e11;

// Largest instant a calendar date value can represent, in ms from the epoch.
const MAX_EPOCH_MS: i64 = 8_640_000_000_000_000;

// Upper bound for a single calendar component before rollover arithmetic.
const MAX_COMPONENT: i64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is missing or empty")]
    Missing,
    #[error("numeric timestamp {0} is not a valid instant")]
    InvalidNumber(f64),
    #[error("unrecognized timestamp {0:?}")]
    Unrecognized(String),
    #[error("timestamp {0:?} is outside the representable range")]
    OutOfRange(String),
}

/// Resolves any [`RawTimestamp`] into epoch milliseconds.
///
/// Textual forms without an explicit offset are read as local time, where
/// "local" is the offset the normalizer was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampNormalizer {
    offset: UtcOffset,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        TimestampNormalizer::new(UtcOffset::UTC)
    }
}

impl TimestampNormalizer {
    pub fn new(offset: UtcOffset) -> Self {
        TimestampNormalizer { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Parse one raw timestamp into epoch milliseconds.
    ///
    /// Forms are tried in a fixed order and the first structural match wins:
    /// 1. numbers (seconds below 1e11, milliseconds otherwise)
    /// 2. resolved instants
    /// 3. spreadsheet constructor text `Date(y, m0, d[, h, mi, s])`, month zero-based
    /// 4. day-first text `dd/mm/yyyy[ hh:mm[:ss]]` with `/` or `-`, `:` or `.`
    /// 5. ISO 8601, RFC 3339, RFC 2822, browser `Date` strings and a few
    ///    common local forms
    ///
    /// Forms 3 and 4 must precede 5 so that day-first dates are never read
    /// month-first.
    pub fn parse(&self, raw: &RawTimestamp) -> Result<i64, TimestampError> {
        match raw {
            RawTimestamp::Numeric(value) => from_number(*value),
            RawTimestamp::Instant(dt) => from_instant(*dt),
            RawTimestamp::Text(text) => self.parse_text(text),
            RawTimestamp::Missing => Err(TimestampError::Missing),
        }
    }

    fn parse_text(&self, text: &str) -> Result<i64, TimestampError> {
        let s = text.trim();
        if s.is_empty() {
            return Err(TimestampError::Missing);
        }

        if let Some(caps) = spreadsheet_pattern().captures(s) {
            trace!("Spreadsheet date form: {}", s);
            let [year, month0, day, hour, minute, second] = components(&caps, [1, 2, 3, 4, 5, 6])
                .ok_or_else(|| TimestampError::OutOfRange(s.to_string()))?;
            return self
                .local_instant(year, month0, day, hour, minute, second)
                .ok_or_else(|| TimestampError::OutOfRange(s.to_string()));
        }

        if let Some(caps) = day_first_pattern().captures(s) {
            trace!("Day-first date form: {}", s);
            let [day, month, year, hour, minute, second] = components(&caps, [1, 2, 3, 4, 5, 6])
                .ok_or_else(|| TimestampError::OutOfRange(s.to_string()))?;
            return self
                .local_instant(year, month - 1, day, hour, minute, second)
                .ok_or_else(|| TimestampError::OutOfRange(s.to_string()));
        }

        self.parse_generic(s)
    }

    /// Build a local instant the way calendar constructors do: out of range
    /// months, days and times roll over into the neighbouring units and two
    /// digit years belong to the 1900s.
    fn local_instant(
        &self,
        year: i64,
        month0: i64,
        day: i64,
        hour: i64,
        minute: i64,
        second: i64,
    ) -> Option<i64> {
        if [year, month0, day, hour, minute, second]
            .iter()
            .any(|c| c.abs() > MAX_COMPONENT)
        {
            return None;
        }

        let year = if (0..=99).contains(&year) {
            year + 1900
        } else {
            year
        };
        let year = i32::try_from(year + month0.div_euclid(12)).ok()?;
        let month = Month::try_from(u8::try_from(month0.rem_euclid(12) + 1).ok()?).ok()?;
        let first = Date::from_calendar_date(year, month, 1).ok()?;

        let elapsed = Duration::days(day - 1)
            + Duration::hours(hour)
            + Duration::minutes(minute)
            + Duration::seconds(second);
        let local = PrimitiveDateTime::new(first, Time::MIDNIGHT).checked_add(elapsed)?;

        from_instant(local.assume_offset(self.offset)).ok()
    }

    fn parse_generic(&self, s: &str) -> Result<i64, TimestampError> {
        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
            return from_instant(dt);
        }
        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
            return from_instant(dt);
        }
        if let Ok(dt) = OffsetDateTime::parse(s, &Iso8601::DEFAULT) {
            return from_instant(dt);
        }

        let local_forms = [
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]"),
            format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
            format_description!("[year]/[month]/[day] [hour]:[minute]"),
        ];
        for form in local_forms {
            if let Ok(local) = PrimitiveDateTime::parse(s, form) {
                return from_instant(local.assume_offset(self.offset));
            }
        }

        // A bare ISO date is an instant at UTC midnight, a slashed one is local.
        if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
            return from_instant(date.midnight().assume_utc());
        }
        if let Ok(date) = Date::parse(s, format_description!("[year]/[month]/[day]")) {
            return from_instant(date.midnight().assume_offset(self.offset));
        }

        // Browser `Date` string: `Mon Jan 15 2024 10:30:00 GMT+0700 (Zone Name)`.
        let without_zone_name = match s.rfind(" (") {
            Some(index) if s.ends_with(')') => &s[..index],
            _ => s,
        };
        if let Ok(dt) = OffsetDateTime::parse(
            without_zone_name,
            format_description!(
                "[weekday repr:short] [month repr:short] [day] [year] [hour]:[minute]:[second] GMT[offset_hour sign:mandatory][offset_minute]"
            ),
        ) {
            return from_instant(dt);
        }

        if let Ok(local) = PrimitiveDateTime::parse(
            s,
            format_description!("[month repr:long] [day padding:none], [year] [hour]:[minute]:[second]"),
        ) {
            return from_instant(local.assume_offset(self.offset));
        }

        // Unpadded ISO dates are local midnight, unlike the padded form.
        if let Ok(date) = Date::parse(
            s,
            format_description!("[year]-[month padding:none]-[day padding:none]"),
        ) {
            return from_instant(date.midnight().assume_offset(self.offset));
        }

        Err(TimestampError::Unrecognized(s.to_string()))
    }
}

fn from_number(value: f64) -> Result<i64, TimestampError> {
    if !value.is_finite() {
        return Err(TimestampError::InvalidNumber(value));
    }
    let ms = if value.abs() < SECONDS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    if ms.abs() > MAX_EPOCH_MS as f64 {
        return Err(TimestampError::InvalidNumber(value));
    }
    Ok(ms.floor() as i64)
}

fn from_instant(dt: OffsetDateTime) -> Result<i64, TimestampError> {
    let ms = dt.unix_timestamp_nanos().div_euclid(1_000_000);
    if ms.abs() > MAX_EPOCH_MS as i128 {
        return Err(TimestampError::OutOfRange(dt.to_string()));
    }
    Ok(ms as i64)
}

/// Numeric capture groups in the given order; absent optional groups are zero.
fn components(caps: &Captures<'_>, groups: [usize; 6]) -> Option<[i64; 6]> {
    let mut out = [0i64; 6];
    for (slot, group) in out.iter_mut().zip(groups) {
        if let Some(m) = caps.get(group) {
            *slot = m.as_str().parse().ok()?;
        }
    }
    Some(out)
}

fn spreadsheet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)Date\(\s*([0-9]+)\s*,\s*([0-9]+)\s*,\s*([0-9]+)(?:\s*,\s*([0-9]+)\s*,\s*([0-9]+)\s*,\s*([0-9]+))?\s*\)",
        )
        .expect("spreadsheet date pattern is valid")
    })
}

fn day_first_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\s*([0-9]{1,2})[/\-]([0-9]{1,2})[/\-]([0-9]{4})(?:[ ,T]+([0-9]{1,2})[:.]([0-9]{1,2})(?:[:.]([0-9]{1,2}))?)?\s*$",
        )
        .expect("day-first date pattern is valid")
    })
}
