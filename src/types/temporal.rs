//! # Temporal Values
//!
//! [`Temporal`] is the broken-down form every temporal column reads and
//! writes: a date, a signed time of day (hours may exceed 24), or both, with
//! microseconds.
//!
//! ## Binary Encodings
//!
//! Two generations coexist. Legacy encodings are little-endian and carry no
//! fraction; fractional encodings are big-endian and memcmp-ordered.
//!
//! | Encoding | Bytes | Layout |
//! |----------|-------|--------|
//! | date | 3 LE | `day | month << 5 | year << 9` |
//! | legacy time | 3 LE | signed `±HHMMSS` |
//! | legacy datetime | 8 LE | `YYYYMMDDHHMMSS` |
//! | legacy timestamp | 4 LE | seconds since the epoch |
//! | datetime2 | 5 BE + frac | see below, offset by `2^39` |
//! | time2 | 3 BE + frac | signed, offset by half the range |
//! | timestamp2 | 4 BE + frac | seconds since the epoch |
//!
//! ```text
//! datetime2 integer part (40 bits):
//!   ┌────────────────────┬───────┬───────┬────────┬────────┐
//!   │ year*13 + month    │ day   │ hour  │ minute │ second │
//!   │ 17 bits            │ 5     │ 5     │ 6      │ 6      │
//!   └────────────────────┴───────┴───────┴────────┴────────┘
//!
//! fraction bytes by precision:
//!   fsp 1-2: 1 byte  (micros / 10000)
//!   fsp 3-4: 2 bytes (micros / 100)
//!   fsp 5-6: 3 bytes (micros)
//! ```
//!
//! TIMESTAMP values are seconds since 1970-01-01 00:00:00 UTC; there is no
//! session time zone.

use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::config::{MAX_DATETIME_FSP, MAX_TIMESTAMP_SECONDS, MAX_TIME_HOURS};
use crate::error::{require, FieldError, FieldResult};

use super::decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemporalKind {
    Date,
    Time,
    #[default]
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Temporal {
    pub kind: TemporalKind,
    /// Only meaningful for `Time`.
    pub negative: bool,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u32,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

/// Result of parsing temporal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTemporal {
    pub value: Temporal,
    /// Bytes consumed, leading whitespace included.
    pub end: usize,
    /// Input carried more than the kind keeps (fraction digits beyond six,
    /// a clock part given for a date) and the excess was dropped.
    pub extra_digits: bool,
    /// A TIME magnitude above the limit was clamped.
    pub clamped: bool,
}

const FRACTION_SCALE: [u32; 7] = [1_000_000, 100_000, 10_000, 1_000, 100, 10, 1];

/// Bytes of fraction appended by fractional encodings at `fsp` digits.
pub fn fraction_bytes(fsp: u8) -> usize {
    usize::from(fsp).div_ceil(2)
}

pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn two_digit_year(y: u16) -> u16 {
    if y < 70 {
        2000 + y
    } else {
        1900 + y
    }
}

impl Temporal {
    pub fn date(year: u16, month: u8, day: u8) -> Self {
        Self {
            kind: TemporalKind::Date,
            year,
            month,
            day,
            ..Self::default()
        }
    }

    pub fn datetime(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8, micros: u32) -> Self {
        Self {
            kind: TemporalKind::DateTime,
            negative: false,
            year,
            month,
            day,
            hour: u32::from(hour),
            minute,
            second,
            micros,
        }
    }

    pub fn time(negative: bool, hour: u32, minute: u8, second: u8, micros: u32) -> Self {
        let mut t = Self {
            kind: TemporalKind::Time,
            negative,
            hour,
            minute,
            second,
            micros,
            ..Self::default()
        };
        if t.time_is_zero() {
            t.negative = false;
        }
        t
    }

    pub fn zero(kind: TemporalKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn is_zero_date(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    fn time_is_zero(&self) -> bool {
        self.hour == 0 && self.minute == 0 && self.second == 0 && self.micros == 0
    }

    /// Calendar fields are within range (zero parts allowed).
    pub fn is_valid_date(&self) -> bool {
        if self.year > 9999 || self.month > 12 || self.day > 31 {
            return false;
        }
        if self.month == 0 || self.day == 0 {
            return true;
        }
        self.day <= days_in_month(self.year, self.month)
    }

    fn is_valid_clock(&self) -> bool {
        self.minute < 60 && self.second < 60 && self.micros < 1_000_000
    }

    /// Signed microseconds of a TIME value.
    pub fn time_micros(&self) -> i64 {
        let mag = ((i64::from(self.hour) * 60 + i64::from(self.minute)) * 60 + i64::from(self.second))
            * 1_000_000
            + i64::from(self.micros);
        if self.negative {
            -mag
        } else {
            mag
        }
    }

    /// Drops sub-second digits beyond `fsp`. The flag reports a change.
    pub fn truncate_fraction(mut self, fsp: u8) -> (Self, bool) {
        let unit = FRACTION_SCALE[usize::from(fsp.min(MAX_DATETIME_FSP))];
        let kept = self.micros - self.micros % unit;
        let lost = kept != self.micros;
        self.micros = kept;
        if self.kind == TemporalKind::Time && self.time_is_zero() {
            self.negative = false;
        }
        (self, lost)
    }

    /// Reinterprets the value as `kind`.
    ///
    /// Returns `None` when no value of `kind` corresponds (a negative or
    /// 24h-plus time as a date). The flag reports dropped components.
    pub fn to_kind(self, kind: TemporalKind) -> Option<(Self, bool)> {
        use TemporalKind::*;
        match (self.kind, kind) {
            (a, b) if a == b => Some((self, false)),
            (DateTime, Date) => {
                let lost = !self.time_is_zero();
                Some((Self::date(self.year, self.month, self.day), lost))
            }
            (Date, DateTime) => Some((Self { kind: DateTime, ..self }, false)),
            (DateTime, Time) | (Date, Time) => {
                let lost = !self.is_zero_date();
                Some((
                    Self::time(false, self.hour, self.minute, self.second, self.micros),
                    lost,
                ))
            }
            (Time, Date) | (Time, DateTime) => {
                if self.negative || self.hour >= 24 {
                    return None;
                }
                let lost = kind == Date && !self.time_is_zero();
                let mut out = Self::zero(kind);
                if kind == DateTime {
                    out.hour = self.hour;
                    out.minute = self.minute;
                    out.second = self.second;
                    out.micros = self.micros;
                }
                Some((out, lost))
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Parses the longest temporal prefix of `src` as `kind`.
    pub fn parse(src: &[u8], kind: TemporalKind) -> Option<ParsedTemporal> {
        let mut cur = Cursor::new(src);
        cur.skip_ws();
        if kind == TemporalKind::Time {
            let save = cur.pos;
            if let Some(parsed) = parse_time(&mut cur) {
                return Some(parsed);
            }
            cur.pos = save;
            let dt = parse_datetime(&mut cur)?;
            let (value, _) = dt.value.to_kind(TemporalKind::Time)?;
            return Some(ParsedTemporal { value, ..dt });
        }
        let mut parsed = parse_datetime(&mut cur)?;
        parsed.value.kind = kind;
        if kind == TemporalKind::Date {
            parsed.value.kind = TemporalKind::DateTime;
            let (value, _) = parsed.value.to_kind(TemporalKind::Date)?;
            let had_time = parsed.value.hour != 0
                || parsed.value.minute != 0
                || parsed.value.second != 0
                || parsed.value.micros != 0;
            parsed.value = value;
            parsed.extra_digits |= had_time;
        }
        Some(parsed)
    }

    /// Interprets an integer (`YYYYMMDD[HHMMSS]` or `±HHMMSS`) as `kind`.
    ///
    /// The flag reports a clamped TIME magnitude or a clock part dropped
    /// from a DATE.
    pub fn from_number(n: i128, micros: u32, kind: TemporalKind) -> Option<(Self, bool)> {
        match kind {
            TemporalKind::Time => {
                let negative = n < 0;
                let mag = n.unsigned_abs();
                let hour = mag / 10_000;
                let minute = ((mag / 100) % 100) as u8;
                let second = (mag % 100) as u8;
                if minute > 59 || second > 59 || micros >= 1_000_000 {
                    return None;
                }
                if hour > u128::from(MAX_TIME_HOURS) {
                    return Some((Self::time(negative, MAX_TIME_HOURS, 59, 59, 0), true));
                }
                Some(clamp_time(Self::time(negative, hour as u32, minute, second, micros)))
            }
            TemporalKind::Date | TemporalKind::DateTime => {
                if n < 0 {
                    return None;
                }
                if n == 0 {
                    return Some((Self::zero(kind), false));
                }
                let (date, time) = if n <= 99_991_231 {
                    (n, 0)
                } else {
                    (n / 1_000_000, n % 1_000_000)
                };
                if date > 99_991_231 {
                    return None;
                }
                let mut year = (date / 10_000) as u16;
                if date <= 991_231 {
                    year = two_digit_year(year);
                }
                let month = ((date / 100) % 100) as u8;
                let day = (date % 100) as u8;
                let hour = (time / 10_000) as u8;
                let minute = ((time / 100) % 100) as u8;
                let second = (time % 100) as u8;
                let t = Self::datetime(year, month, day, hour, minute, second, micros);
                if !t.is_valid_date() || hour > 23 || !t.is_valid_clock() {
                    return None;
                }
                t.to_kind(kind)
                    .map(|(v, lost)| (v, lost && kind == TemporalKind::Date))
            }
        }
    }

    /// `YYYYMMDD`, `YYYYMMDDHHMMSS` or `±HHMMSS`.
    pub fn to_number(&self) -> i64 {
        match self.kind {
            TemporalKind::Date => {
                i64::from(self.year) * 10_000 + i64::from(self.month) * 100 + i64::from(self.day)
            }
            TemporalKind::DateTime => {
                (i64::from(self.year) * 10_000 + i64::from(self.month) * 100 + i64::from(self.day))
                    * 1_000_000
                    + self.clock_number()
            }
            TemporalKind::Time => {
                let v = self.clock_number();
                if self.negative {
                    -v
                } else {
                    v
                }
            }
        }
    }

    fn clock_number(&self) -> i64 {
        i64::from(self.hour) * 10_000 + i64::from(self.minute) * 100 + i64::from(self.second)
    }

    /// Numeric form with `fsp` fraction digits.
    pub fn to_decimal(&self, fsp: u8) -> Decimal {
        let mut text = self.to_number().to_string();
        if self.kind != TemporalKind::Date && fsp > 0 {
            if self.negative && self.to_number() == 0 {
                text.insert(0, '-');
            }
            let _ = write!(text, ".{:06}", self.micros);
            text.truncate(text.len() - usize::from(6 - fsp.min(6)));
        }
        Decimal::parse(&text).unwrap_or_default()
    }

    pub fn format(&self, fsp: u8) -> String {
        let mut out = String::with_capacity(26);
        match self.kind {
            TemporalKind::Date => {
                let _ = write!(out, "{:04}-{:02}-{:02}", self.year, self.month, self.day);
            }
            TemporalKind::DateTime => {
                let _ = write!(
                    out,
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    self.year, self.month, self.day, self.hour, self.minute, self.second
                );
            }
            TemporalKind::Time => {
                if self.negative {
                    out.push('-');
                }
                let _ = write!(out, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second);
            }
        }
        if self.kind != TemporalKind::Date && fsp > 0 {
            let fsp = usize::from(fsp.min(MAX_DATETIME_FSP));
            let digits = format!("{:06}", self.micros);
            out.push('.');
            out.push_str(&digits[..fsp]);
        }
        out
    }

    // ------------------------------------------------------------------
    // Epoch
    // ------------------------------------------------------------------

    /// Seconds since the epoch, for a valid non-zero datetime.
    pub fn to_epoch_seconds(&self) -> Option<i64> {
        if self.month == 0 || self.day == 0 {
            return None;
        }
        let days = days_from_civil(i64::from(self.year), u32::from(self.month), u32::from(self.day));
        Some(days * 86_400 + self.clock_number_seconds())
    }

    fn clock_number_seconds(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }

    pub fn from_epoch_seconds(secs: i64, micros: u32) -> Self {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400);
        let (y, m, d) = civil_from_days(days);
        Self::datetime(
            y as u16,
            m as u8,
            d as u8,
            (rem / 3600) as u8,
            ((rem / 60) % 60) as u8,
            (rem % 60) as u8,
            micros,
        )
    }

    /// Epoch seconds if the value lies in the TIMESTAMP range; zero dates
    /// map to 0.
    pub fn to_timestamp_seconds(&self) -> Option<i64> {
        if self.is_zero_date() && self.kind != TemporalKind::Time {
            return Some(0);
        }
        let secs = self.to_epoch_seconds()?;
        (1..=MAX_TIMESTAMP_SECONDS).contains(&secs).then_some(secs)
    }

    // ------------------------------------------------------------------
    // Binary encodings
    // ------------------------------------------------------------------

    pub fn write_newdate(&self, out: &mut Vec<u8>) {
        let v = u32::from(self.day) | (u32::from(self.month) << 5) | (u32::from(self.year) << 9);
        out.extend_from_slice(&v.to_le_bytes()[..3]);
    }

    pub fn read_newdate(src: &[u8]) -> FieldResult<Self> {
        require("date", src, 3)?;
        let v = u32::from_le_bytes([src[0], src[1], src[2], 0]);
        let t = Self::date((v >> 9) as u16, ((v >> 5) & 15) as u8, (v & 31) as u8);
        if !t.is_valid_date() {
            return Err(FieldError::malformed("date", format!("{v:#08x}")));
        }
        Ok(t)
    }

    pub fn write_time_legacy(&self, out: &mut Vec<u8>) {
        let v = self.to_number() as i32;
        out.extend_from_slice(&v.to_le_bytes()[..3]);
    }

    pub fn read_time_legacy(src: &[u8]) -> FieldResult<Self> {
        require("time", src, 3)?;
        let raw = i32::from_le_bytes([src[0], src[1], src[2], 0]);
        let v = (raw << 8) >> 8;
        Self::from_number(i128::from(v), 0, TemporalKind::Time)
            .filter(|(_, clamped)| !clamped)
            .map(|(t, _)| t)
            .ok_or_else(|| FieldError::malformed("time", format!("{v}")))
    }

    pub fn write_datetime_legacy(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_number().to_le_bytes());
    }

    pub fn read_datetime_legacy(src: &[u8]) -> FieldResult<Self> {
        require("datetime", src, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&src[..8]);
        let v = i64::from_le_bytes(raw);
        if v == 0 {
            return Ok(Self::zero(TemporalKind::DateTime));
        }
        let date = v / 1_000_000;
        let time = v % 1_000_000;
        let t = Self::datetime(
            (date / 10_000) as u16,
            ((date / 100) % 100) as u8,
            (date % 100) as u8,
            (time / 10_000) as u8,
            ((time / 100) % 100) as u8,
            (time % 100) as u8,
            0,
        );
        if v < 0 || !t.is_valid_date() || t.hour > 23 || !t.is_valid_clock() {
            return Err(FieldError::malformed("datetime", format!("{v}")));
        }
        Ok(t)
    }

    pub fn write_timestamp_legacy(secs: u32, out: &mut Vec<u8>) {
        out.extend_from_slice(&secs.to_le_bytes());
    }

    pub fn read_timestamp_legacy(src: &[u8]) -> FieldResult<u32> {
        require("timestamp", src, 4)?;
        Ok(u32::from_le_bytes([src[0], src[1], src[2], src[3]]))
    }

    pub fn write_datetime2(&self, fsp: u8, out: &mut Vec<u8>) {
        let ymd = ((u64::from(self.year) * 13 + u64::from(self.month)) << 5) | u64::from(self.day);
        let hms = (u64::from(self.hour) << 12) | (u64::from(self.minute) << 6) | u64::from(self.second);
        let int = ((ymd << 17) | hms) + DATETIME2_OFFSET;
        out.extend_from_slice(&int.to_be_bytes()[3..]);
        write_fraction(self.micros, fsp, out);
    }

    pub fn read_datetime2(src: &[u8], fsp: u8) -> FieldResult<Self> {
        let n = 5 + fraction_bytes(fsp);
        require("datetime", src, n)?;
        let mut raw = [0u8; 8];
        raw[3..].copy_from_slice(&src[..5]);
        let stored = u64::from_be_bytes(raw);
        if stored < DATETIME2_OFFSET {
            return Err(FieldError::malformed("datetime", "negative packed datetime"));
        }
        let int = stored - DATETIME2_OFFSET;
        let ymd = int >> 17;
        let hms = int & 0x1_FFFF;
        let ym = ymd >> 5;
        let t = Self::datetime(
            (ym / 13) as u16,
            (ym % 13) as u8,
            (ymd & 31) as u8,
            (hms >> 12) as u8,
            ((hms >> 6) & 63) as u8,
            (hms & 63) as u8,
            read_fraction(&src[5..n], fsp)?,
        );
        if !t.is_valid_date() || t.hour > 23 || !t.is_valid_clock() {
            return Err(FieldError::malformed("datetime", format!("{int:#x}")));
        }
        Ok(t)
    }

    pub fn write_time2(&self, fsp: u8, out: &mut Vec<u8>) {
        let fb = fraction_bytes(fsp);
        let int = (i64::from(self.hour) << 12) | (i64::from(self.minute) << 6) | i64::from(self.second);
        let frac = i64::from(scaled_fraction(self.micros, fsp));
        let mag = (int << (8 * fb)) + frac;
        let value = if self.negative { -mag } else { mag };
        let width = 3 + fb;
        let stored = (value + (1i64 << (8 * width - 1))) as u64;
        out.extend_from_slice(&stored.to_be_bytes()[8 - width..]);
    }

    pub fn read_time2(src: &[u8], fsp: u8) -> FieldResult<Self> {
        let fb = fraction_bytes(fsp);
        let width = 3 + fb;
        require("time", src, width)?;
        let mut raw = [0u8; 8];
        raw[8 - width..].copy_from_slice(&src[..width]);
        let value = u64::from_be_bytes(raw) as i64 - (1i64 << (8 * width - 1));
        let mag = value.unsigned_abs();
        let frac = (mag & ((1u64 << (8 * fb)) - 1)) as u32;
        let int = mag >> (8 * fb);
        let micros = unscaled_fraction(frac, fsp)
            .ok_or_else(|| FieldError::malformed("time", format!("fraction {frac}")))?;
        let t = Self::time(
            value < 0,
            (int >> 12) as u32,
            ((int >> 6) & 63) as u8,
            (int & 63) as u8,
            micros,
        );
        if t.hour > MAX_TIME_HOURS || !t.is_valid_clock() {
            return Err(FieldError::malformed("time", format!("{int:#x}")));
        }
        Ok(t)
    }

    pub fn write_timestamp2(secs: u32, micros: u32, fsp: u8, out: &mut Vec<u8>) {
        out.extend_from_slice(&secs.to_be_bytes());
        write_fraction(micros, fsp, out);
    }

    pub fn read_timestamp2(src: &[u8], fsp: u8) -> FieldResult<(u32, u32)> {
        let n = 4 + fraction_bytes(fsp);
        require("timestamp", src, n)?;
        let secs = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        Ok((secs, read_fraction(&src[4..n], fsp)?))
    }
}

const DATETIME2_OFFSET: u64 = 0x80_0000_0000;

fn scaled_fraction(micros: u32, fsp: u8) -> u32 {
    match fsp {
        0 => 0,
        1 | 2 => micros / 10_000,
        3 | 4 => micros / 100,
        _ => micros,
    }
}

fn unscaled_fraction(frac: u32, fsp: u8) -> Option<u32> {
    let (limit, unit) = match fsp {
        0 => (1, 1),
        1 | 2 => (100, 10_000),
        3 | 4 => (10_000, 100),
        _ => (1_000_000, 1),
    };
    (frac < limit).then_some(frac * unit)
}

fn write_fraction(micros: u32, fsp: u8, out: &mut Vec<u8>) {
    let fb = fraction_bytes(fsp);
    let v = scaled_fraction(micros, fsp);
    out.extend_from_slice(&v.to_be_bytes()[4 - fb..]);
}

fn read_fraction(src: &[u8], fsp: u8) -> FieldResult<u32> {
    let fb = fraction_bytes(fsp);
    let mut raw = [0u8; 4];
    raw[4 - fb..].copy_from_slice(&src[..fb]);
    let v = u32::from_be_bytes(raw);
    unscaled_fraction(v, fsp).ok_or_else(|| FieldError::malformed("fraction", format!("{v}")))
}

fn clamp_time(t: Temporal) -> (Temporal, bool) {
    if t.hour > MAX_TIME_HOURS || (t.hour == MAX_TIME_HOURS && t.micros > 0 && t.minute == 59 && t.second == 59) {
        return (Temporal::time(t.negative, MAX_TIME_HOURS, 59, 59, 0), true);
    }
    (t, false)
}

impl PartialOrd for Temporal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Temporal {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.kind == TemporalKind::Time && other.kind == TemporalKind::Time {
            return self.time_micros().cmp(&other.time_micros());
        }
        (self.year, self.month, self.day, self.hour, self.minute, self.second, self.micros).cmp(&(
            other.year,
            other.month,
            other.day,
            other.hour,
            other.minute,
            other.second,
            other.micros,
        ))
    }
}

// ----------------------------------------------------------------------
// Text parsing
// ----------------------------------------------------------------------

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Up to `max` digits; returns (value, count).
    fn digits(&mut self, max: usize) -> (u64, usize) {
        let mut v = 0u64;
        let mut n = 0;
        while n < max {
            match self.peek() {
                Some(b) if b.is_ascii_digit() => {
                    v = v.saturating_mul(10).saturating_add(u64::from(b - b'0'));
                    self.pos += 1;
                    n += 1;
                }
                _ => break,
            }
        }
        (v, n)
    }

    /// Fraction digits after a '.', scaled to microseconds.
    fn fraction(&mut self) -> (u32, bool) {
        let save = self.pos;
        if !self.eat(b'.') {
            return (0, false);
        }
        let (v, n) = self.digits(6);
        if n == 0 {
            self.pos = save;
            return (0, false);
        }
        let (_, extra) = self.digits(usize::MAX);
        (v as u32 * FRACTION_SCALE[n], extra > 0)
    }
}

fn is_date_separator(b: u8) -> bool {
    matches!(b, b'-' | b'/' | b'.' | b':')
}

fn parse_datetime(cur: &mut Cursor<'_>) -> Option<ParsedTemporal> {
    let start = cur.pos;
    let (run, n) = cur.digits(usize::MAX);
    if n == 0 {
        return None;
    }
    if cur.peek().is_some_and(is_date_separator) && n <= 4 {
        let year = if n <= 2 { two_digit_year(run as u16) } else { run as u16 };
        cur.pos += 1;
        let (month, mn) = cur.digits(2);
        if mn == 0 || !cur.peek().is_some_and(is_date_separator) {
            return None;
        }
        cur.pos += 1;
        let (day, dn) = cur.digits(2);
        if dn == 0 {
            return None;
        }
        let mut t = Temporal::datetime(year, month as u8, day as u8, 0, 0, 0, 0);
        let mut extra_digits = false;
        let save = cur.pos;
        if cur.eat(b' ') || cur.eat(b'T') {
            while cur.eat(b' ') {}
            let (h, hn) = cur.digits(2);
            if hn > 0 && cur.eat(b':') {
                let (mi, min) = cur.digits(2);
                if min > 0 {
                    t.hour = h as u32;
                    t.minute = mi as u8;
                    if cur.eat(b':') {
                        let (s, _) = cur.digits(2);
                        t.second = s as u8;
                        let (micros, extra) = cur.fraction();
                        t.micros = micros;
                        extra_digits = extra;
                    }
                } else {
                    cur.pos = save;
                }
            } else {
                cur.pos = save;
            }
        }
        if !t.is_valid_date() || t.hour > 23 || !t.is_valid_clock() {
            return None;
        }
        return Some(ParsedTemporal {
            value: t,
            end: cur.pos,
            extra_digits,
            clamped: false,
        });
    }

    // Compact digit run.
    let digits = &cur.src[start..cur.pos];
    let field = |from: usize, len: usize| -> u64 {
        digits[from..from + len]
            .iter()
            .fold(0u64, |acc, &b| acc * 10 + u64::from(b - b'0'))
    };
    let (year, rest) = match n {
        6 | 12 => (two_digit_year(field(0, 2) as u16), 2),
        8 | 14 => (field(0, 4) as u16, 4),
        _ => return None,
    };
    let month = field(rest, 2) as u8;
    let day = field(rest + 2, 2) as u8;
    let mut t = Temporal::datetime(year, month, day, 0, 0, 0, 0);
    let mut extra_digits = false;
    if n == 12 || n == 14 {
        t.hour = field(rest + 4, 2) as u32;
        t.minute = field(rest + 6, 2) as u8;
        t.second = field(rest + 8, 2) as u8;
        let (micros, extra) = cur.fraction();
        t.micros = micros;
        extra_digits = extra;
    }
    if !t.is_valid_date() || t.hour > 23 || !t.is_valid_clock() {
        return None;
    }
    Some(ParsedTemporal {
        value: t,
        end: cur.pos,
        extra_digits,
        clamped: false,
    })
}

fn parse_time(cur: &mut Cursor<'_>) -> Option<ParsedTemporal> {
    let negative = cur.eat(b'-');
    let start = cur.pos;
    let (first, n) = cur.digits(usize::MAX);
    if n == 0 {
        return None;
    }
    if cur.peek().is_some_and(|b| b == b'-' || b == b'/') {
        return None;
    }

    let (hour, minute, second) = if cur.peek() == Some(b' ') && cur.src.get(cur.pos + 1).is_some_and(u8::is_ascii_digit) {
        // "D HH[:MM[:SS]]"
        cur.pos += 1;
        let (h, _) = cur.digits(usize::MAX);
        let (mi, s) = clock_tail(cur);
        (first.saturating_mul(24).saturating_add(h), mi, s)
    } else if cur.peek() == Some(b':') {
        let (mi, s) = clock_tail(cur);
        (first, mi, s)
    } else {
        // Compact [H...]HHMMSS / MMSS / SS.
        let digits = &cur.src[start..cur.pos];
        let v = digits.iter().fold(0u64, |acc, &b| acc.saturating_mul(10).saturating_add(u64::from(b - b'0')));
        (v / 10_000, (v / 100) % 100, v % 100)
    };
    let (micros, extra_digits) = cur.fraction();
    if minute > 59 || second > 59 {
        return None;
    }
    let t = Temporal::time(negative, hour.min(u64::from(u32::MAX)) as u32, minute as u8, second as u8, micros);
    let (value, clamped) = clamp_time(t);
    Some(ParsedTemporal {
        value,
        end: cur.pos,
        extra_digits,
        clamped,
    })
}

fn clock_tail(cur: &mut Cursor<'_>) -> (u64, u64) {
    let mut minute = 0;
    let mut second = 0;
    if cur.eat(b':') {
        minute = cur.digits(2).0;
        if cur.eat(b':') {
            second = cur.digits(2).0;
        }
    }
    (minute, second)
}
