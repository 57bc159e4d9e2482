//! # String to Number Converters
//!
//! One parsing core shared by every numeric `store_str` path. Each converter
//! returns the parsed value together with the first unconsumed byte and a
//! [`ConvStatus`]; it never decides how loud to be about leftovers. That is
//! the caller's job, via [`check_edom_and_truncation`] and a [`WarnFilter`]
//! derived from the statement's settings:
//!
//! | Input | Status | Condition (filter on) |
//! |-------|--------|------------------------|
//! | `"12"` | `Ok` | none |
//! | `"12  "` | `Ok` | Note 1265 (trailing spaces) |
//! | `"12abc"` | `Ok` | Warning 1265 (garbage) |
//! | `"abc"` | `Edom` | Warning 1366 (incorrect value) |
//! | `""` | `Empty` | Warning 1366 (incorrect value) |
//!
//! All supported charsets are ASCII-compatible, so digits, signs and spaces
//! are recognised bytewise; the charset only matters for rendering the
//! offending input in messages.

use crate::charset::{self, Charset};
use crate::config::{CheckFields, FieldConfig};
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::types::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvStatus {
    Ok,
    /// Non-empty input without a leading number.
    Edom,
    /// Nothing but whitespace.
    Empty,
}

#[derive(Debug, Clone)]
pub struct Converted<T> {
    pub value: T,
    /// First unconsumed byte.
    pub end: usize,
    pub status: ConvStatus,
    /// The number did not fit the converter's value type and saturated.
    pub out_of_range: bool,
}

impl<T> Converted<T> {
    pub fn trailing<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.end.min(src.len())..]
    }
}

fn classify(src: &[u8], has_digits: bool) -> ConvStatus {
    if has_digits {
        ConvStatus::Ok
    } else if src.iter().all(u8::is_ascii_whitespace) {
        ConvStatus::Empty
    } else {
        ConvStatus::Edom
    }
}

/// Parses an integer, rounding any fraction or exponent half away from zero.
pub fn str_to_int(src: &[u8]) -> Converted<i128> {
    let parsed = Decimal::parse_prefix(src);
    let (value, out_of_range) = if parsed.has_digits {
        parsed.value.to_i128()
    } else {
        (0, false)
    };
    Converted {
        value,
        end: parsed.end,
        status: classify(src, parsed.has_digits),
        out_of_range,
    }
}

/// Parses a double; overflow saturates at `±f64::MAX`.
pub fn str_to_double(src: &[u8]) -> Converted<f64> {
    let parsed = Decimal::parse_prefix(src);
    let status = classify(src, parsed.has_digits);
    if !parsed.has_digits {
        return Converted {
            value: 0.0,
            end: 0,
            status,
            out_of_range: false,
        };
    }
    let text = std::str::from_utf8(&src[..parsed.end])
        .map(str::trim_start)
        .unwrap_or("0");
    let mut value = text.parse::<f64>().unwrap_or_else(|_| parsed.value.to_f64());
    let out_of_range = value.is_infinite();
    if out_of_range {
        value = if value.is_sign_negative() { f64::MIN } else { f64::MAX };
    }
    Converted {
        value,
        end: parsed.end,
        status,
        out_of_range,
    }
}

/// Parses an exact decimal. Scale and precision are left to the caller.
pub fn str_to_decimal(src: &[u8]) -> Converted<Decimal> {
    let parsed = Decimal::parse_prefix(src);
    Converted {
        status: classify(src, parsed.has_digits),
        value: parsed.value,
        end: parsed.end,
        out_of_range: false,
    }
}

/// Which conversion conditions the calling context wants recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarnFilter {
    pub want_warning_edom: bool,
    pub want_note_truncated_spaces: bool,
}

impl WarnFilter {
    pub fn new(want_warning_edom: bool, want_note_truncated_spaces: bool) -> Self {
        Self {
            want_warning_edom,
            want_note_truncated_spaces,
        }
    }

    pub fn all() -> Self {
        Self::new(true, true)
    }

    pub fn none() -> Self {
        Self::new(false, false)
    }

    pub fn from_config(config: &FieldConfig) -> Self {
        let warn = config.check_fields == CheckFields::Warn;
        Self::new(warn, warn && config.truncation_notes)
    }
}

/// Turns a converter outcome into conditions and a store status.
///
/// Out-of-range handling is not covered here; callers clamp and report it
/// themselves since the limit depends on the column.
pub fn check_edom_and_truncation<T>(
    converted: &Converted<T>,
    src: &[u8],
    cs: Charset,
    type_name: &str,
    filter: WarnFilter,
    scope: &mut StoreScope<'_>,
) -> StoreStatus {
    match converted.status {
        ConvStatus::Edom | ConvStatus::Empty => {
            if !filter.want_warning_edom {
                return StoreStatus::Truncated;
            }
            let mut shown = Vec::with_capacity(src.len());
            charset::convert(src, cs, Charset::Utf8mb4, &mut shown);
            scope.incorrect_value(type_name, &shown)
        }
        ConvStatus::Ok => {
            let rest = converted.trailing(src);
            if rest.iter().all(u8::is_ascii_whitespace) {
                if !rest.is_empty() && filter.want_note_truncated_spaces {
                    scope.note_truncated();
                }
                return StoreStatus::Exact;
            }
            if filter.want_warning_edom {
                scope.data_truncated()
            } else {
                StoreStatus::Truncated
            }
        }
    }
}
