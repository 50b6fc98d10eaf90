// src/ingest/dates.rs
//! Date normalization for scraped event listings.
//!
//! Sources publish dates in whatever shape their CMS emits: RFC 3339 attributes,
//! RFC 2822 feed dates, bare ISO dates, or prose like `Nov 14, 2025 6:00 PM`.
//! Everything is folded into a UTC instant here. `None` means "unparseable";
//! callers substitute the retrieval time instead of dropping the record.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

/// Civil timezone used when a source omits the offset.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// "Nov 14, 2025", "November 14, 2025 6:00 PM", "Sat, Nov 15, 2025, 18:30"
static RE_MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([a-z]+)\.?\s+(\d{1,2}),\s*(\d{4})(?:,?\s+(?:at\s+)?(\d{1,2}):(\d{2})(?:\s*([ap])\.?m\.?\b)?)?",
    )
    .expect("month-day-year regex")
});

/// Normalize arbitrary date text to a UTC instant, or `None` if it cannot be read.
pub fn normalize_date(input: Option<&str>, tz: Tz) -> Option<DateTime<Utc>> {
    let s = input.map(str::trim).filter(|s| !s.is_empty())?;
    parse_direct(s, tz).or_else(|| parse_month_day_year(s, tz))
}

/// Generic date/time expressions: offset-carrying first, then civil forms.
fn parse_direct(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822(s) {
        return Some(dt);
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, tz);
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return localize(day.and_time(NaiveTime::MIN), tz);
        }
    }
    None
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

fn parse_month_day_year(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    RE_MONTH_DAY_YEAR
        .captures_iter(s)
        .find_map(|caps| {
            let month = month_from_name(caps.get(1)?.as_str())?;
            let day: u32 = caps.get(2)?.as_str().parse().ok()?;
            let year: i32 = caps.get(3)?.as_str().parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;

            let time = match (caps.get(4), caps.get(5)) {
                (Some(h), Some(m)) => {
                    let hour: u32 = h.as_str().parse().ok()?;
                    let minute: u32 = m.as_str().parse().ok()?;
                    let meridiem = caps.get(6).map(|x| x.as_str().to_ascii_lowercase());
                    let hour = to_24h(hour, meridiem.as_deref())?;
                    NaiveTime::from_hms_opt(hour, minute, 0)?
                }
                _ => NaiveTime::MIN,
            };
            Some(date.and_time(time))
        })
        .and_then(|naive| localize(naive, tz))
}

fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(name.as_str()))
        .map(|i| i as u32 + 1)
}

fn to_24h(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem {
        None if hour < 24 => Some(hour),
        Some("a") if (1..=12).contains(&hour) => Some(hour % 12),
        Some("p") if (1..=12).contains(&hour) => Some(hour % 12 + 12),
        _ => None,
    }
}

/// Resolve a civil time. Fall-back ambiguity takes the earlier instant,
/// spring-forward gaps are pushed one hour later.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
