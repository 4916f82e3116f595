//! Date and time handling shared by the DA, TM and DT codecs.
//!
//! Stored values use the DICOM forms
//! `YYYYMMDD`, `HHMMSS.FFFFFF` and `YYYYMMDDHHMMSS.FFFFFF&ZZXX`.
//! Parsing of stored values is lenient:
//! missing trailing fields read as zero.

use super::lexical::parse_integer;
use super::string::StringKind;
use crate::text::{validate_da, validate_dt, validate_tm, TextValidationOutcome};
use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use std::convert::TryFrom;

const SECONDS_PER_DAY: i64 = 86_400;

/// The broken down components of a date, time or date-time value.
///
/// Codecs which do not hold temporal values report all fields as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeParts {
    /// Calendar year, `0..=9999`
    pub year: i32,
    /// Month of the year, `1..=12`
    pub month: i32,
    /// Day of the month, `1..=31`
    pub day: i32,
    /// Hour of the day, `0..24`
    pub hour: i32,
    /// Minute of the hour, `0..60`
    pub minute: i32,
    /// Second of the minute, `0..60`
    pub second: i32,
    /// Fraction of the second in microseconds, `0..=999_999`
    pub microsecond: i32,
    /// Hours of the offset from UTC, `-12..=12`
    pub offset_hours: i32,
    /// Minutes of the offset from UTC, `-59..=59`,
    /// negative whenever the offset is negative
    pub offset_minutes: i32,
}

impl DateTimeParts {
    /// Create the parts of a calendar date.
    pub fn date(year: i32, month: i32, day: i32) -> Self {
        DateTimeParts {
            year,
            month,
            day,
            ..DateTimeParts::default()
        }
    }

    /// Create the parts of a time of day.
    pub fn time(hour: i32, minute: i32, second: i32, microsecond: i32) -> Self {
        DateTimeParts {
            hour,
            minute,
            second,
            microsecond,
            ..DateTimeParts::default()
        }
    }

    /// Set the offset from UTC.
    pub fn with_offset(mut self, hours: i32, minutes: i32) -> Self {
        self.offset_hours = hours;
        self.offset_minutes = minutes;
        self
    }

    /// Combine the date fields of `self` with the time fields of `time`.
    pub fn and_time(self, time: DateTimeParts) -> Self {
        DateTimeParts {
            year: self.year,
            month: self.month,
            day: self.day,
            ..time
        }
    }
}

/// Split on any of the given separator characters.
/// An empty text has no components.
pub(crate) fn split_any<'a>(text: &'a str, separators: &str) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(|c: char| separators.contains(c)).collect()
}

pub(crate) fn pad_left(text: &str, fill: char, len: usize) -> String {
    let count = text.chars().count();
    let mut padded: String = std::iter::repeat(fill)
        .take(len.saturating_sub(count))
        .collect();
    padded.push_str(text);
    padded
}

fn extend(chars: &mut Vec<char>, len: usize, fill: char) {
    if chars.len() < len {
        chars.resize(len, fill);
    }
}

fn field(chars: &[char], start: usize, len: usize) -> String {
    chars.iter().skip(start).take(len).collect()
}

/// Bring a date typed with separators (`2024-3-5`) into the `YYYYMMDD` form.
/// Text without separators is kept as is.
pub(crate) fn normalize_date(text: &str) -> String {
    let components = split_any(text, "./-");
    if components.len() == 1 {
        return components[0].to_string();
    }
    let mut normalized = String::new();
    for (component, width) in components.iter().zip(&[4, 2, 2]) {
        normalized.push_str(&pad_left(component, '0', *width));
    }
    normalized
}

/// Bring a time typed with colons (`9:20:40.5`) into the `HHMMSS.F` form.
/// Text without colons is kept as is.
pub(crate) fn normalize_time(text: &str) -> String {
    let components = split_any(text, ":");
    if components.len() == 1 {
        return components[0].to_string();
    }
    let mut normalized = String::new();
    for component in components.iter().take(2) {
        normalized.push_str(&pad_left(component, '0', 2));
    }
    if let Some(seconds) = components.get(2) {
        let seconds = split_any(seconds, ".");
        if let Some(whole) = seconds.first() {
            normalized.push_str(&pad_left(whole, '0', 2));
        }
        if let Some(fraction) = seconds.get(1) {
            normalized.push('.');
            normalized.push_str(fraction);
        }
    }
    normalized
}

/// Bring a date-time typed in display form (`2004-11-5 9:20:40+01:00`)
/// into the stored form.
/// Text without a space between date and time is kept as is.
pub(crate) fn normalize_date_time(text: &str) -> String {
    let (date, rest) = match text.split_once(' ') {
        Some(split) => split,
        None => return text.to_string(),
    };
    let rest = rest.trim_start();
    let (time, offset) = match rest.find(|c: char| c == '+' || c == '-') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    let mut normalized = normalize_date(date);
    normalized.push_str(&normalize_time(time));
    if let Some(sign) = offset.chars().next() {
        normalized.push(sign);
        let components = split_any(&offset[1..], ":");
        if components.len() == 1 {
            normalized.push_str(components[0]);
        } else {
            for component in components.iter().take(2) {
                normalized.push_str(&pad_left(component, '0', 2));
            }
        }
    }
    normalized
}

/// Whether a normalized value is acceptable in strict mode.
pub(crate) fn is_well_formed(kind: StringKind, value: &str) -> bool {
    fn leading_digits(value: &str, n: usize) -> bool {
        value.len() >= n && value.bytes().take(n).all(|b| b.is_ascii_digit())
    }

    if value.is_empty() {
        return true;
    }
    let bytes = value.as_bytes();
    match kind {
        StringKind::Date => value.len() == 8 && validate_da(bytes) == TextValidationOutcome::Ok,
        StringKind::Time => {
            leading_digits(value, 2) && validate_tm(bytes) == TextValidationOutcome::Ok
        }
        StringKind::DateTime => {
            leading_digits(value, 4) && validate_dt(bytes) == TextValidationOutcome::Ok
        }
        _ => true,
    }
}

/// Read the date fields of a stored `YYYYMMDD` value.
pub(crate) fn parse_date(stored: &str) -> DateTimeParts {
    let mut chars: Vec<char> = stored.chars().collect();
    extend(&mut chars, 8, '0');
    DateTimeParts::date(
        parse_integer(&field(&chars, 0, 4)) as i32,
        parse_integer(&field(&chars, 4, 2)) as i32,
        parse_integer(&field(&chars, 6, 2)) as i32,
    )
}

/// Read the time fields of a stored `HHMMSS.FFFFFF&ZZXX` value.
pub(crate) fn parse_time(stored: &str) -> DateTimeParts {
    let mut chars: Vec<char> = stored.chars().collect();
    extend(&mut chars, 6, '0');
    if chars.len() < 7 {
        chars.push('.');
    }
    extend(&mut chars, 13, '0');
    if chars.len() < 14 {
        chars.push('+');
    }
    extend(&mut chars, 18, '0');

    let offset_hours = parse_integer(&field(&chars, 13, 3)) as i32;
    let mut offset_minutes = parse_integer(&field(&chars, 16, 2)) as i32;
    if chars[13] == '-' {
        offset_minutes = -offset_minutes;
    }
    DateTimeParts::time(
        parse_integer(&field(&chars, 0, 2)) as i32,
        parse_integer(&field(&chars, 2, 2)) as i32,
        parse_integer(&field(&chars, 4, 2)) as i32,
        parse_integer(&field(&chars, 7, 6)) as i32,
    )
    .with_offset(offset_hours, offset_minutes)
}

/// Read a stored date-time value: a date of eight characters
/// directly followed by a time.
pub(crate) fn parse_date_time(stored: &str) -> DateTimeParts {
    let date: String = stored.chars().take(8).collect();
    let time: String = stored.chars().skip(8).collect();
    parse_date(&date).and_time(parse_time(&time))
}

/// Build the `YYYYMMDD` form; an invalid date becomes `00000000`.
pub(crate) fn build_date(parts: &DateTimeParts) -> String {
    let (mut year, mut month, mut day) = (parts.year, parts.month, parts.day);
    if !(0..=9999).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        year = 0;
        month = 0;
        day = 0;
    }
    format!("{:04}{:02}{:02}", year, month, day)
}

/// Build the `HHMMSS.FFFFFF&ZZXX` form;
/// any field out of range zeroes the whole time.
pub(crate) fn build_time(parts: &DateTimeParts) -> String {
    let valid = (0..24).contains(&parts.hour)
        && (0..60).contains(&parts.minute)
        && (0..60).contains(&parts.second)
        && (0..=999_999).contains(&parts.microsecond)
        && (-12..=12).contains(&parts.offset_hours)
        && (-59..=59).contains(&parts.offset_minutes);
    let parts = if valid {
        *parts
    } else {
        DateTimeParts::default()
    };
    let minus = parts.offset_hours < 0 || parts.offset_minutes < 0;
    format!(
        "{:02}{:02}{:02}.{:06}{}{:02}{:02}",
        parts.hour,
        parts.minute,
        parts.second,
        parts.microsecond,
        if minus { '-' } else { '+' },
        parts.offset_hours.abs(),
        parts.offset_minutes.abs()
    )
}

fn offset_suffix(parts: &DateTimeParts) -> String {
    if parts.offset_hours == 0 && parts.offset_minutes == 0 {
        return String::new();
    }
    let minus = parts.offset_hours < 0 || parts.offset_minutes < 0;
    format!(
        "{}{:02}:{:02}",
        if minus { '-' } else { '+' },
        parts.offset_hours.abs(),
        parts.offset_minutes.abs()
    )
}

pub(crate) fn display_date(parts: &DateTimeParts) -> String {
    format!("{:04}-{:02}-{:02}", parts.year, parts.month, parts.day)
}

pub(crate) fn display_time(parts: &DateTimeParts) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:06}{}",
        parts.hour,
        parts.minute,
        parts.second,
        parts.microsecond,
        offset_suffix(parts)
    )
}

pub(crate) fn display_date_time(parts: &DateTimeParts) -> String {
    format!("{} {}", display_date(parts), display_time(parts))
}

/// Interpret user input such as `2024-03-05`.
/// Anything but three components is rejected.
pub(crate) fn date_from_input(text: &str) -> Option<DateTimeParts> {
    match split_any(text, "-/.").as_slice() {
        [year, month, day] => Some(DateTimeParts::date(
            parse_integer(year) as i32,
            parse_integer(month) as i32,
            parse_integer(day) as i32,
        )),
        _ => None,
    }
}

/// Read numeric fields in order, then make the offset negative
/// unless the text has a `+` sign.
fn fields_from_input(text: &str, fields: &mut [&mut i32]) {
    let components = split_any(text, "-/.: +");
    for (component, field) in components.iter().zip(fields.iter_mut()) {
        **field = parse_integer(component) as i32;
    }
}

fn apply_input_sign(text: &str, parts: &mut DateTimeParts) {
    if !text.contains('+') {
        parts.offset_hours = -parts.offset_hours;
        parts.offset_minutes = -parts.offset_minutes;
    }
}

/// Interpret user input such as `09:20:40.005000`.
pub(crate) fn time_from_input(text: &str) -> DateTimeParts {
    let mut parts = DateTimeParts::default();
    let DateTimeParts {
        hour,
        minute,
        second,
        microsecond,
        offset_hours,
        offset_minutes,
        ..
    } = &mut parts;
    fields_from_input(
        text,
        &mut [hour, minute, second, microsecond, offset_hours, offset_minutes],
    );
    apply_input_sign(text, &mut parts);
    parts
}

/// Interpret user input such as `2005-12-06 10:21:41.005001-4:5`.
pub(crate) fn date_time_from_input(text: &str) -> DateTimeParts {
    let mut parts = DateTimeParts::date(0, 1, 1);
    let DateTimeParts {
        year,
        month,
        day,
        hour,
        minute,
        second,
        microsecond,
        offset_hours,
        offset_minutes,
    } = &mut parts;
    fields_from_input(
        text,
        &mut [
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
            offset_hours,
            offset_minutes,
        ],
    );
    apply_input_sign(text, &mut parts);
    parts
}

fn naive_time(parts: &DateTimeParts) -> Option<NaiveTime> {
    NaiveTime::from_hms_micro_opt(
        u32::try_from(parts.hour).ok()?,
        u32::try_from(parts.minute).ok()?,
        u32::try_from(parts.second).ok()?,
        u32::try_from(parts.microsecond).ok()?,
    )
}

fn naive_date(parts: &DateTimeParts) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        parts.year,
        u32::try_from(parts.month).ok()?,
        u32::try_from(parts.day).ok()?,
    )
}

/// Convert to whole seconds and microseconds:
/// since the Unix epoch for dates and date-times,
/// since midnight for times.
pub(crate) fn to_epoch(kind: StringKind, parts: &DateTimeParts) -> Option<(i64, u32)> {
    match kind {
        StringKind::Date => {
            let date = naive_date(parts)?;
            let midnight = date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?);
            Some((Utc.from_utc_datetime(&midnight).timestamp(), 0))
        }
        StringKind::Time => {
            let time = naive_time(parts)?;
            Some((
                i64::from(time.num_seconds_from_midnight()),
                time.nanosecond() / 1_000,
            ))
        }
        StringKind::DateTime => {
            let local = naive_date(parts)?.and_time(naive_time(parts)?);
            let offset = FixedOffset::east_opt(
                parts.offset_hours * 3_600 + parts.offset_minutes * 60,
            )?;
            let instant = offset.from_local_datetime(&local).single()?;
            Some((instant.timestamp(), instant.nanosecond() / 1_000))
        }
        _ => None,
    }
}

/// The inverse of [`to_epoch`], producing UTC values.
pub(crate) fn from_epoch(kind: StringKind, seconds: i64, micros: u32) -> DateTimeParts {
    match kind {
        StringKind::Time => {
            let of_day = seconds.rem_euclid(SECONDS_PER_DAY) as i32;
            DateTimeParts::time(
                of_day / 3_600,
                of_day / 60 % 60,
                of_day % 60,
                micros as i32,
            )
        }
        StringKind::Date | StringKind::DateTime => {
            let instant = match Utc.timestamp_opt(seconds, micros * 1_000).single() {
                Some(instant) => instant,
                None => return DateTimeParts::default(),
            };
            let date = DateTimeParts::date(
                instant.year(),
                instant.month() as i32,
                instant.day() as i32,
            );
            if kind == StringKind::Date {
                return date;
            }
            date.and_time(DateTimeParts::time(
                instant.hour() as i32,
                instant.minute() as i32,
                instant.second() as i32,
                (instant.nanosecond() / 1_000) as i32,
            ))
        }
        _ => DateTimeParts::default(),
    }
}
