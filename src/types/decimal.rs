//! # Fixed-Point Decimal
//!
//! An exact decimal held as sign plus base-10 digit vectors, wide enough for
//! the 65-digit DECIMAL limit, with the packed binary format DECIMAL columns
//! store in a row.
//!
//! ## Binary Format
//!
//! Digits are split around the point and grouped nine at a time, outward
//! from the point. A full group takes 4 big-endian bytes; a leftover group of
//! `n` digits takes `DIG2BYTES[n]` bytes:
//!
//! ```text
//! DECIMAL(14,4)   value 1234567890.1234
//!
//!   int digits: 1 | 234567890        frac digits: 1234
//!   ┌────┬─────────────────┬──────────┐
//!   │ 01 │ 0D FB 38 D2     │ 04 D2    │
//!   └────┴─────────────────┴──────────┘
//!    1 B     4 B (9 dig)     2 B (4 dig)
//!   then byte[0] ^= 0x80
//! ```
//!
//! Negative values have every byte inverted before the final sign flip, so a
//! plain `memcmp` over two encodings of the same (precision, scale) orders
//! them numerically.
//!
//! ## Rounding
//!
//! Rounding to a scale is half away from zero. Values whose integer part
//! does not fit `precision - scale` digits overflow; callers clamp them to
//! [`Decimal::max_for`].

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::config::{decimal_binary_size, DIG2BYTES, DIG_PER_DEC};
use crate::error::{require, FieldError, FieldResult};

type Digits = SmallVec<[u8; 40]>;

/// Digits kept after the point when parsing; anything further only marks
/// the value as inexact.
const MAX_PARSED_FRACTION: usize = 160;

/// Integer digits kept when parsing; larger values overflow every column.
const MAX_PARSED_INTEGER: usize = 130;

const POW10: [u32; 10] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

#[derive(Debug, Clone, Default)]
pub struct Decimal {
    negative: bool,
    /// Integer digits, most significant first, no leading zeros.
    int: Digits,
    /// Fraction digits; length is the value's scale.
    frac: Digits,
}

/// How a value fared when fitted to a (precision, scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Exact,
    Rounded,
    Overflow,
}

/// Longest numeric prefix of a byte string.
#[derive(Debug, Clone)]
pub struct ParsedDecimal {
    pub value: Decimal,
    /// Bytes consumed, leading whitespace included.
    pub end: usize,
    /// At least one digit was consumed.
    pub has_digits: bool,
}

impl Decimal {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.int.is_empty() && self.frac.iter().all(|&d| d == 0)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn scale(&self) -> usize {
        self.frac.len()
    }

    /// Count of significant integer digits.
    pub fn int_digits(&self) -> usize {
        self.int.len()
    }

    pub fn neg(mut self) -> Self {
        if !self.is_zero() {
            self.negative = !self.negative;
        }
        self
    }

    pub fn abs(mut self) -> Self {
        self.negative = false;
        self
    }

    fn from_parts(negative: bool, int: Digits, frac: Digits) -> Self {
        let lead = int.iter().take_while(|&&d| d == 0).count();
        let int: Digits = int[lead..].iter().copied().collect();
        let mut out = Self {
            negative,
            int,
            frac,
        };
        if out.is_zero() {
            out.negative = false;
        }
        out
    }

    pub fn from_i128(v: i128) -> Self {
        let int = v.unsigned_abs().to_string().bytes().map(|b| b - b'0').collect();
        Self::from_parts(v < 0, int, Digits::new())
    }

    pub fn from_i64(v: i64) -> Self {
        Self::from_i128(i128::from(v))
    }

    pub fn from_u64(v: u64) -> Self {
        Self::from_i128(i128::from(v))
    }

    /// Exact decimal expansion of the shortest round-trip rendering of `v`.
    pub fn from_f64(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        let rendered = format!("{v}");
        Self::parse(&rendered)
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(0.0)
    }

    /// Parses a whole string; trailing bytes other than whitespace fail.
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = Self::parse_prefix(s.as_bytes());
        let rest = &s.as_bytes()[parsed.end..];
        if parsed.has_digits && rest.iter().all(u8::is_ascii_whitespace) {
            Some(parsed.value)
        } else {
            None
        }
    }

    /// Parses `[ws][sign]digits[.digits][e[sign]digits]` from the front of
    /// `src`.
    pub fn parse_prefix(src: &[u8]) -> ParsedDecimal {
        let mut i = 0;
        while i < src.len() && src[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut negative = false;
        if i < src.len() && (src[i] == b'-' || src[i] == b'+') {
            negative = src[i] == b'-';
            i += 1;
        }

        let mut int = Digits::new();
        while i < src.len() && src[i].is_ascii_digit() {
            int.push(src[i] - b'0');
            i += 1;
        }
        let mut frac = Digits::new();
        if i < src.len() && src[i] == b'.' {
            let mut j = i + 1;
            while j < src.len() && src[j].is_ascii_digit() {
                frac.push(src[j] - b'0');
                j += 1;
            }
            if !int.is_empty() || !frac.is_empty() {
                i = j;
            }
        }
        if int.is_empty() && frac.is_empty() {
            return ParsedDecimal {
                value: Decimal::zero(),
                end: 0,
                has_digits: false,
            };
        }

        let mut exponent: i64 = 0;
        if i < src.len() && (src[i] == b'e' || src[i] == b'E') {
            let mut j = i + 1;
            let mut exp_negative = false;
            if j < src.len() && (src[j] == b'-' || src[j] == b'+') {
                exp_negative = src[j] == b'-';
                j += 1;
            }
            let digits_start = j;
            let mut exp: i64 = 0;
            while j < src.len() && src[j].is_ascii_digit() {
                exp = (exp * 10 + i64::from(src[j] - b'0')).min(100_000);
                j += 1;
            }
            if j > digits_start {
                exponent = if exp_negative { -exp } else { exp };
                i = j;
            }
        }

        ParsedDecimal {
            value: Self::shifted(negative, int, frac, exponent),
            end: i,
            has_digits: true,
        }
    }

    fn shifted(negative: bool, int: Digits, frac: Digits, exponent: i64) -> Self {
        if exponent == 0 && int.len() <= MAX_PARSED_INTEGER && frac.len() <= MAX_PARSED_FRACTION {
            return Self::from_parts(negative, int, frac).bounded();
        }
        let mut all: Digits = int.iter().chain(frac.iter()).copied().collect();
        let mut point = int.len() as i64 + exponent;
        if point < 0 {
            let pad = (-point).min(MAX_PARSED_FRACTION as i64 + 1) as usize;
            let mut padded = Digits::from_elem(0, pad);
            padded.extend_from_slice(&all);
            all = padded;
            point = 0;
        }
        let point = point as usize;
        if point > all.len() {
            let grow = (point - all.len()).min(MAX_PARSED_INTEGER + 1);
            all.extend(std::iter::repeat(0).take(grow));
        }
        let point = point.min(all.len());
        let int = all[..point].iter().copied().collect();
        let frac = all[point..].iter().copied().collect();
        Self::from_parts(negative, int, frac).bounded()
    }

    /// Caps parsed digit vectors; dropped nonzero fraction digits leave a
    /// sticky 1 so rounding still reports the loss.
    fn bounded(mut self) -> Self {
        if self.int.len() > MAX_PARSED_INTEGER {
            self.int = Digits::from_elem(9, MAX_PARSED_INTEGER);
        }
        if self.frac.len() > MAX_PARSED_FRACTION {
            let lost = self.frac[MAX_PARSED_FRACTION..].iter().any(|&d| d != 0);
            self.frac.truncate(MAX_PARSED_FRACTION);
            if lost && self.frac[MAX_PARSED_FRACTION - 1] == 0 {
                self.frac[MAX_PARSED_FRACTION - 1] = 1;
            }
        }
        self
    }

    /// Rounds half away from zero to `scale` fraction digits.
    ///
    /// Returns the rounded value and whether any nonzero digit was dropped.
    pub fn round_to(&self, scale: usize) -> (Decimal, bool) {
        if self.frac.len() <= scale {
            let mut out = self.clone();
            out.frac.resize(scale, 0);
            return (out, false);
        }
        let lost = self.frac[scale..].iter().any(|&d| d != 0);
        let round_up = self.frac[scale] >= 5;
        let mut digits: Digits = self
            .int
            .iter()
            .chain(self.frac[..scale].iter())
            .copied()
            .collect();
        let mut int_len = self.int.len();
        if round_up {
            let mut carry = true;
            for d in digits.iter_mut().rev() {
                if *d == 9 {
                    *d = 0;
                } else {
                    *d += 1;
                    carry = false;
                    break;
                }
            }
            if carry {
                digits.insert(0, 1);
                int_len += 1;
            }
        }
        let int = digits[..int_len].iter().copied().collect();
        let frac = digits[int_len..].iter().copied().collect();
        (Self::from_parts(self.negative, int, frac), lost)
    }

    /// Largest magnitude representable in DECIMAL(precision, scale).
    pub fn max_for(precision: u8, scale: u8) -> Decimal {
        let int_len = usize::from(precision - scale);
        Self::from_parts(
            false,
            Digits::from_elem(9, int_len),
            Digits::from_elem(9, usize::from(scale)),
        )
    }

    /// Rounds to `scale` and clamps to the column's range.
    pub fn fit(&self, precision: u8, scale: u8) -> (Decimal, Fit) {
        let (rounded, lost) = self.round_to(usize::from(scale));
        if rounded.int.len() > usize::from(precision - scale) {
            let max = Self::max_for(precision, scale);
            let clamped = if self.negative { max.neg() } else { max };
            return (clamped, Fit::Overflow);
        }
        (rounded, if lost { Fit::Rounded } else { Fit::Exact })
    }

    /// Rounds to an integer. The flag is set when the result saturated.
    pub fn to_i128(&self) -> (i128, bool) {
        let (rounded, _) = self.round_to(0);
        if rounded.int.len() > 38 {
            let sat = if rounded.negative { i128::MIN } else { i128::MAX };
            return (sat, true);
        }
        let mut v: i128 = 0;
        for &d in rounded.int.iter() {
            v = v * 10 + i128::from(d);
        }
        (if rounded.negative { -v } else { v }, false)
    }

    /// Integer part (truncated toward zero) and the first six fraction
    /// digits as microseconds. The flag reports nonzero digits past six.
    pub fn int_and_micros(&self) -> (i128, u32, bool) {
        let mut v: i128 = 0;
        for &d in self.int.iter().take(38) {
            v = v * 10 + i128::from(d);
        }
        let mut micros = 0u32;
        for i in 0..6 {
            micros = micros * 10 + u32::from(self.frac.get(i).copied().unwrap_or(0));
        }
        let lost = self.frac.iter().skip(6).any(|&d| d != 0);
        (if self.negative { -v } else { v }, micros, lost)
    }

    /// Bytes taken by the binary form of DECIMAL(precision, scale).
    pub fn binary_size(precision: u8, scale: u8) -> usize {
        decimal_binary_size(precision, scale)
    }

    /// Appends the binary form for DECIMAL(precision, scale).
    ///
    /// The value must already fit; see [`Decimal::fit`].
    pub fn write_binary(&self, precision: u8, scale: u8, out: &mut Vec<u8>) {
        let intg = usize::from(precision - scale);
        let frac_len = usize::from(scale);
        let start = out.len();
        let mask: u32 = if self.negative { u32::MAX } else { 0 };

        let mut int_digits = Digits::from_elem(0, intg.saturating_sub(self.int.len()));
        let keep = self.int.len().min(intg);
        int_digits.extend_from_slice(&self.int[self.int.len() - keep..]);
        let mut frac_digits: Digits = self.frac.iter().copied().take(frac_len).collect();
        frac_digits.resize(frac_len, 0);

        let lead = intg % DIG_PER_DEC;
        let mut pos = 0;
        if lead > 0 {
            put_group(out, group_value(&int_digits[..lead]) ^ mask, DIG2BYTES[lead]);
            pos = lead;
        }
        while pos < intg {
            put_group(out, group_value(&int_digits[pos..pos + DIG_PER_DEC]) ^ mask, 4);
            pos += DIG_PER_DEC;
        }
        let mut pos = 0;
        while pos + DIG_PER_DEC <= frac_len {
            put_group(out, group_value(&frac_digits[pos..pos + DIG_PER_DEC]) ^ mask, 4);
            pos += DIG_PER_DEC;
        }
        let tail = frac_len - pos;
        if tail > 0 {
            put_group(out, group_value(&frac_digits[pos..]) ^ mask, DIG2BYTES[tail]);
        }
        if out.len() > start {
            out[start] ^= 0x80;
        }
    }

    /// Decodes the binary form for DECIMAL(precision, scale).
    ///
    /// Groups holding values outside their digit range are rejected as
    /// malformed rather than decoded.
    pub fn read_binary(src: &[u8], precision: u8, scale: u8) -> FieldResult<Decimal> {
        let size = Self::binary_size(precision, scale);
        require("decimal", src, size)?;
        if size == 0 {
            return Ok(Decimal::zero());
        }
        let mut buf: SmallVec<[u8; 32]> = SmallVec::from_slice(&src[..size]);
        let negative = buf[0] & 0x80 == 0;
        buf[0] ^= 0x80;
        let mask: u32 = if negative { u32::MAX } else { 0 };

        let intg = usize::from(precision - scale);
        let frac_len = usize::from(scale);
        let mut at = 0;
        let mut int = Digits::new();
        let lead = intg % DIG_PER_DEC;
        if lead > 0 {
            take_group(&buf, &mut at, DIG2BYTES[lead], lead, mask, &mut int)?;
        }
        for _ in 0..intg / DIG_PER_DEC {
            take_group(&buf, &mut at, 4, DIG_PER_DEC, mask, &mut int)?;
        }
        let mut frac = Digits::new();
        for _ in 0..frac_len / DIG_PER_DEC {
            take_group(&buf, &mut at, 4, DIG_PER_DEC, mask, &mut frac)?;
        }
        let tail = frac_len % DIG_PER_DEC;
        if tail > 0 {
            take_group(&buf, &mut at, DIG2BYTES[tail], tail, mask, &mut frac)?;
        }
        Ok(Self::from_parts(negative, int, frac))
    }

    fn cmp_magnitude(&self, other: &Decimal) -> Ordering {
        self.int
            .len()
            .cmp(&other.int.len())
            .then_with(|| self.int.cmp(&other.int))
            .then_with(|| {
                let n = self.frac.len().max(other.frac.len());
                let a = self.frac.iter().copied().chain(std::iter::repeat(0)).take(n);
                let b = other.frac.iter().copied().chain(std::iter::repeat(0)).take(n);
                a.cmp(b)
            })
    }
}

fn group_value(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, &d| acc * 10 + u32::from(d))
}

fn put_group(out: &mut Vec<u8>, value: u32, bytes: usize) {
    out.extend_from_slice(&value.to_be_bytes()[4 - bytes..]);
}

fn take_group(
    buf: &[u8],
    at: &mut usize,
    bytes: usize,
    digits: usize,
    mask: u32,
    out: &mut Digits,
) -> FieldResult<()> {
    let mut raw = [0u8; 4];
    raw[4 - bytes..].copy_from_slice(&buf[*at..*at + bytes]);
    *at += bytes;
    let field_mask = if bytes == 4 { u32::MAX } else { (1u32 << (8 * bytes)) - 1 };
    let value = (u32::from_be_bytes(raw) ^ mask) & field_mask;
    if value >= POW10[digits] {
        return Err(FieldError::malformed(
            "decimal",
            format!("group value {value} exceeds {digits} digits"),
        ));
    }
    for p in (0..digits).rev() {
        out.push(((value / POW10[p]) % 10) as u8);
    }
    Ok(())
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        if self.int.is_empty() {
            f.write_str("0")?;
        }
        for &d in self.int.iter() {
            write!(f, "{d}")?;
        }
        if !self.frac.is_empty() {
            f.write_str(".")?;
            for &d in self.frac.iter() {
                write!(f, "{d}")?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Decimal {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s).ok_or_else(|| FieldError::malformed("decimal", format!("'{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_DECIMAL_BINARY_SIZE, MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE};

    fn dec(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(dec("12345678.90").to_string(), "12345678.90");
        assert_eq!(dec("-0.5").to_string(), "-0.5");
        assert_eq!(dec("007").to_string(), "7");
        assert_eq!(dec("-0.00").to_string(), "0.00");
        assert_eq!(dec(".5").to_string(), "0.5");
    }

    #[test]
    fn exponent_shifts_the_point() {
        assert_eq!(dec("1.5e3"), dec("1500"));
        assert_eq!(dec("25e-3"), dec("0.025"));
        assert_eq!(dec("1E+2").to_string(), "100");
    }

    #[test]
    fn prefix_parse_stops_at_garbage() {
        let parsed = Decimal::parse_prefix(b"  12.5abc");
        assert!(parsed.has_digits);
        assert_eq!(parsed.end, 6);
        assert_eq!(parsed.value, dec("12.5"));

        let none = Decimal::parse_prefix(b"abc");
        assert!(!none.has_digits);
        assert_eq!(none.end, 0);

        let dangling_exp = Decimal::parse_prefix(b"3e");
        assert_eq!(dangling_exp.end, 1);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(dec("2.345").round_to(2).0.to_string(), "2.35");
        assert_eq!(dec("-2.345").round_to(2).0.to_string(), "-2.35");
        assert_eq!(dec("9.995").round_to(2).0.to_string(), "10.00");
        assert!(!dec("1.50").round_to(1).1);
        assert!(dec("1.51").round_to(1).1);
    }

    #[test]
    fn fit_clamps_overflow_to_max() {
        let (v, fit) = dec("123456789.00").fit(10, 2);
        assert_eq!(fit, Fit::Overflow);
        assert_eq!(v.to_string(), "99999999.99");
        let (v, fit) = dec("-1e20").fit(5, 0);
        assert_eq!(fit, Fit::Overflow);
        assert_eq!(v.to_string(), "-99999");
        assert_eq!(dec("12345678.90").fit(10, 2).1, Fit::Exact);
    }

    #[test]
    fn binary_size_matches_group_layout() {
        assert_eq!(Decimal::binary_size(10, 2), 5);
        assert_eq!(Decimal::binary_size(14, 4), 7);
        assert_eq!(Decimal::binary_size(20, 5), 10);
        assert_eq!(Decimal::binary_size(65, 30), 30);
        assert_eq!(Decimal::binary_size(1, 0), 1);
    }

    #[test]
    fn widest_binary_size_covers_every_scale() {
        assert_eq!(Decimal::binary_size(65, 0), 29);
        assert_eq!(MAX_DECIMAL_BINARY_SIZE, 30);
        for scale in 0..=MAX_DECIMAL_SCALE {
            assert!(Decimal::binary_size(MAX_DECIMAL_PRECISION, scale) <= MAX_DECIMAL_BINARY_SIZE);
        }
    }

    #[test]
    fn documented_layout_bytes() {
        let mut out = Vec::new();
        dec("1234567890.1234").write_binary(14, 4, &mut out);
        assert_eq!(out, vec![0x81, 0x0D, 0xFB, 0x38, 0xD2, 0x04, 0xD2]);
    }

    #[test]
    fn binary_order_matches_numeric_order() {
        let values = ["-99999999.99", "-1.5", "-0.01", "0", "0.01", "1.5", "12345678.90"];
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|s| {
                let mut out = Vec::new();
                dec(s).write_binary(10, 2, &mut out);
                out
            })
            .collect();
        for w in encoded.windows(2) {
            assert!(w[0] < w[1]);
        }
        for (s, bytes) in values.iter().zip(&encoded) {
            let back = Decimal::read_binary(bytes, 10, 2).unwrap();
            assert_eq!(back, dec(s));
            assert_eq!(back.scale(), 2);
        }
    }

    #[test]
    fn corrupt_group_is_malformed() {
        let bytes = [0x80 | 0x7F, 0xFF, 0xFF, 0xFF, 0xFF];
        let err = Decimal::read_binary(&bytes, 10, 2).unwrap_err();
        assert!(matches!(err, FieldError::Malformed { .. }));
    }

    #[test]
    fn short_input_is_truncated_not_malformed() {
        let err = Decimal::read_binary(&[0x80, 0, 0, 0, 0], 20, 5).unwrap_err();
        assert!(err.is_truncated_input());
    }

    #[test]
    fn integer_conversion_rounds_and_saturates() {
        assert_eq!(dec("2.5").to_i128(), (3, false));
        assert_eq!(dec("-2.5").to_i128(), (-3, false));
        assert!(dec("1e60").to_i128().1);
    }

    #[test]
    fn float_conversion_is_exact_on_shortest_rendering() {
        assert_eq!(Decimal::from_f64(0.1).unwrap(), dec("0.1"));
        assert_eq!(Decimal::from_f64(-1.25e3).unwrap(), dec("-1250"));
        assert!(Decimal::from_f64(f64::NAN).is_none());
        assert_eq!(dec("3.75").to_f64(), 3.75);
    }
}
