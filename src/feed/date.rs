//! Date normalization for feed timestamps.
//!
//! Feeds routinely break their own date grammar, so both parsers are
//! fallback chains. Every successful parse yields a canonical instant:
//! a `DateTime<Utc>` truncated to whole seconds, which is what the post
//! store persists. The `to_*` functions render an instant back into the
//! two grammars; parsing a rendered value returns the same instant.
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use thiserror::Error;

const RFC822_RENDER: &str = "%a, %d %b %Y %H:%M:%S %z";
const RFC822_LENIENT: &str = "%d %b %Y %H:%M:%S";
const ISO8601_UTC: &str = "%Y-%m-%dT%H:%M:%SZ";
const ISO8601_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("Empty date")]
    Empty,

    #[error("Unrecognized RFC822 date: {0:?}")]
    Rfc822(String),

    #[error("Unrecognized ISO8601 date: {0:?}")]
    Iso8601(String),

    #[error("Invalid date format string: {0:?}")]
    InvalidFormat(String),
}

/// Parses an RSS `pubDate` (`%a, %d %b %Y %H:%M:%S` plus zone).
///
/// The zone is honored when chrono recognizes it (numeric offsets, `GMT`,
/// `UT`, US zone names), even if the weekday does not match the date.
/// Otherwise the day and time are read as UTC and the zone token is ignored.
pub fn parse_rfc822(input: &str) -> Result<DateTime<Utc>, DateError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DateError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(canonical(dt));
    }

    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.first().is_some_and(|t| t.ends_with(',')) {
        tokens.remove(0);
    }

    // The weekday is optional in RFC 2822, so a wrong one is dropped and the
    // zone still applies
    if let Ok(dt) = DateTime::parse_from_rfc2822(&tokens.join(" ")) {
        tracing::debug!(date = %s, "RFC822 weekday ignored");
        return Ok(canonical(dt));
    }

    if tokens.len() >= 4 {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&tokens[..4].join(" "), RFC822_LENIENT) {
            tracing::debug!(date = %s, "RFC822 zone not recognized, read as UTC");
            return Ok(naive.and_utc());
        }
    }

    Err(DateError::Rfc822(s.to_string()))
}

/// Parses an Atom `published`/`updated` timestamp.
///
/// Variants, each attempted only when the previous one fails:
/// 1. `YYYY-MM-DDTHH:MM:SSZ`
/// 2. `YYYY-MM-DDTHH:MM:SS±HH:MM`, with the offset colon dropped first
/// 3. fractional seconds, `YYYY-MM-DDTHH:MM:SS.fffZ` (or a numeric offset),
///    decomposed field by field
pub fn parse_iso8601(input: &str) -> Result<DateTime<Utc>, DateError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DateError::Empty);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, ISO8601_UTC) {
        return Ok(naive.and_utc());
    }

    let compact = compact_offset(s);
    if let Ok(dt) = DateTime::parse_from_str(&compact, ISO8601_OFFSET) {
        return Ok(canonical(dt));
    }

    decompose_fractional(&compact).ok_or_else(|| DateError::Iso8601(s.to_string()))
}

/// Renders an instant as an RSS date, e.g. `Fri, 01 Mar 2024 10:00:00 +0000`.
pub fn to_rfc822(dt: DateTime<Utc>) -> String {
    dt.format(RFC822_RENDER).to_string()
}

/// Renders an instant as an Atom date, e.g. `2024-03-01T10:00:00Z`.
pub fn to_iso8601(dt: DateTime<Utc>) -> String {
    dt.format(ISO8601_UTC).to_string()
}

/// Renders an instant in local time with a user-supplied strftime format.
pub fn format_local(dt: DateTime<Utc>, fmt: &str) -> Result<String, DateError> {
    let items = strftime_items(fmt)?;
    Ok(dt
        .with_timezone(&Local)
        .format_with_items(items.iter())
        .to_string())
}

/// Checks that a strftime format string contains no invalid specifiers.
pub fn validate_format(fmt: &str) -> Result<(), DateError> {
    strftime_items(fmt).map(|_| ())
}

fn strftime_items(fmt: &str) -> Result<Vec<Item<'_>>, DateError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateError::InvalidFormat(fmt.to_string()));
    }
    Ok(items)
}

fn canonical(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc).trunc_subsecs(0)
}

/// Rewrites a trailing `±HH:MM` offset to `±HHMM`.
fn compact_offset(s: &str) -> String {
    let bytes = s.as_bytes();
    let n = bytes.len();
    if n >= 6
        && matches!(bytes[n - 6], b'+' | b'-')
        && bytes[n - 3] == b':'
        && bytes[n - 5..n - 3].iter().all(u8::is_ascii_digit)
        && bytes[n - 2..].iter().all(u8::is_ascii_digit)
    {
        let mut out = String::with_capacity(n - 1);
        out.push_str(&s[..n - 3]);
        out.push_str(&s[n - 2..]);
        return out;
    }
    s.to_string()
}

/// Field-by-field parse of `YYYY-MM-DDTHH:MM:SS.fff` followed by `Z` or `±HHMM`.
/// The fraction is required and discarded.
fn decompose_fractional(s: &str) -> Option<DateTime<Utc>> {
    let (date, rest) = s.split_once('T')?;

    let mut ymd = date.splitn(3, '-');
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;

    let (time, offset_secs) = match rest.strip_suffix('Z') {
        Some(time) => (time, 0),
        None => {
            let split = rest.rfind(['+', '-'])?;
            let (time, offset) = rest.split_at(split);
            (time, parse_compact_offset(offset)?)
        }
    };

    let (hms, fraction) = time.split_once('.')?;
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut parts = hms.splitn(3, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let second: u32 = parts.next()?.parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = FixedOffset::east_opt(offset_secs)?;
    let local = naive.and_local_timezone(offset).single()?;
    Some(local.with_timezone(&Utc))
}

fn parse_compact_offset(offset: &str) -> Option<i32> {
    let (sign, digits) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}
