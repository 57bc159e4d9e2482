//! Per-column wire metadata.
//!
//! Every type code has a fixed metadata length, so a decoder can skip or
//! interpret a column knowing nothing but its code:
//!
//! | Type code | Bytes | Content |
//! |-----------|-------|---------|
//! | integers | 1 | bit 0 = unsigned |
//! | YEAR, DATE, legacy temporal | 0 | |
//! | FLOAT, DOUBLE | 1 | pack length |
//! | NEWDECIMAL | 2 | precision, scale |
//! | STRING, VARCHAR | 2 | max byte length, LE |
//! | BLOB | 1 | length-prefix width |
//! | TIME2, DATETIME2, TIMESTAMP2 | 1 | sub-second digits |
//! | ENUM, SET | 3 | pack width, label count LE |
//! | BIT | 2 | whole bytes, extra bits |

use std::fmt;

use smallvec::SmallVec;

use crate::config::{MAX_DATETIME_FSP, MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE, MAX_SET_MEMBERS};
use crate::error::{require, FieldError, FieldResult};
use crate::field::{enum_width, length_prefix, set_width};
use crate::types::{fraction_bytes, Decimal, FieldType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireMetadata {
    field_type: FieldType,
    meta: SmallVec<[u8; 4]>,
}

impl WireMetadata {
    /// Builds metadata without validation; codecs only produce valid
    /// metadata. Use [`WireMetadata::decode`] for untrusted input.
    pub fn new(field_type: FieldType, meta: &[u8]) -> Self {
        Self {
            field_type,
            meta: SmallVec::from_slice(meta),
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.meta
    }

    /// Metadata length implied by a type code.
    pub fn meta_len(field_type: FieldType) -> usize {
        match field_type {
            FieldType::Tiny
            | FieldType::Short
            | FieldType::Int24
            | FieldType::Long
            | FieldType::LongLong
            | FieldType::Float
            | FieldType::Double
            | FieldType::Blob
            | FieldType::Time2
            | FieldType::Datetime2
            | FieldType::Timestamp2 => 1,
            FieldType::NewDecimal | FieldType::String | FieldType::Varchar | FieldType::Bit => 2,
            FieldType::Enum | FieldType::Set => 3,
            FieldType::Year
            | FieldType::NewDate
            | FieldType::Time
            | FieldType::Datetime
            | FieldType::Timestamp => 0,
        }
    }

    /// Appends `[type code][metadata]`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.field_type.code());
        out.extend_from_slice(&self.meta);
    }

    /// Reads `[type code][metadata]`, returning the metadata and the bytes
    /// consumed. Unknown codes and out-of-range metadata are rejected.
    pub fn decode(src: &[u8]) -> FieldResult<(WireMetadata, usize)> {
        require("wire metadata", src, 1)?;
        let field_type = FieldType::from_code(src[0])?;
        let len = Self::meta_len(field_type);
        require(field_type.name(), &src[1..], len)?;
        let meta = Self::new(field_type, &src[1..1 + len]);
        meta.validate()?;
        Ok((meta, 1 + len))
    }

    pub fn validate(&self) -> FieldResult<()> {
        let name = self.field_type.name();
        if self.meta.len() != Self::meta_len(self.field_type) {
            return Err(FieldError::bad_metadata(
                name,
                format!("expected {} bytes, got {}", Self::meta_len(self.field_type), self.meta.len()),
            ));
        }
        let m = &self.meta;
        match self.field_type {
            FieldType::Tiny | FieldType::Short | FieldType::Int24 | FieldType::Long | FieldType::LongLong => {
                if m[0] > 1 {
                    return Err(FieldError::bad_metadata(name, format!("flags {:#04x}", m[0])));
                }
            }
            FieldType::Float | FieldType::Double => {
                let want = if self.field_type == FieldType::Float { 4 } else { 8 };
                if m[0] != want {
                    return Err(FieldError::bad_metadata(name, format!("pack length {}", m[0])));
                }
            }
            FieldType::NewDecimal => {
                let (p, s) = (m[0], m[1]);
                if p == 0 || p > MAX_DECIMAL_PRECISION || s > MAX_DECIMAL_SCALE || s > p {
                    return Err(FieldError::bad_metadata(name, format!("precision {p}, scale {s}")));
                }
            }
            FieldType::String | FieldType::Varchar => {
                if self.max_bytes() == 0 {
                    return Err(FieldError::bad_metadata(name, "zero capacity"));
                }
            }
            FieldType::Blob => {
                if !(1..=4).contains(&m[0]) {
                    return Err(FieldError::bad_metadata(name, format!("length width {}", m[0])));
                }
            }
            FieldType::Time2 | FieldType::Datetime2 | FieldType::Timestamp2 => {
                if m[0] > MAX_DATETIME_FSP {
                    return Err(FieldError::bad_metadata(name, format!("fsp {}", m[0])));
                }
            }
            FieldType::Enum | FieldType::Set => {
                let (width, count) = self.typelib();
                let expected = if self.field_type == FieldType::Set {
                    if count > MAX_SET_MEMBERS {
                        return Err(FieldError::bad_metadata(name, format!("{count} members")));
                    }
                    set_width(count)
                } else {
                    enum_width(count)
                };
                if count == 0 || width != expected {
                    return Err(FieldError::bad_metadata(
                        name,
                        format!("width {width} for {count} labels"),
                    ));
                }
            }
            FieldType::Bit => {
                let (bytes, extra) = self.bit();
                let bits = usize::from(bytes) * 8 + usize::from(extra);
                if extra > 7 || bits == 0 || bits > 64 {
                    return Err(FieldError::bad_metadata(name, format!("{bytes} bytes + {extra} bits")));
                }
            }
            FieldType::Year | FieldType::NewDate | FieldType::Time | FieldType::Datetime | FieldType::Timestamp => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors; each assumes the matching type code.
    // ------------------------------------------------------------------

    pub fn is_unsigned(&self) -> bool {
        self.field_type.integer_width().is_some() && self.meta.first() == Some(&1)
    }

    pub fn precision_scale(&self) -> (u8, u8) {
        (self.meta[0], self.meta[1])
    }

    pub fn fsp(&self) -> u8 {
        if self.field_type.is_fractional_temporal() {
            self.meta[0]
        } else {
            0
        }
    }

    pub fn max_bytes(&self) -> usize {
        usize::from(u16::from_le_bytes([self.meta[0], self.meta[1]]))
    }

    pub fn packlength(&self) -> usize {
        usize::from(self.meta[0])
    }

    pub fn typelib(&self) -> (usize, usize) {
        (
            usize::from(self.meta[0]),
            usize::from(u16::from_le_bytes([self.meta[1], self.meta[2]])),
        )
    }

    pub fn bit(&self) -> (u8, u8) {
        (self.meta[0], self.meta[1])
    }

    /// Bit length of a BIT column.
    pub fn bit_length(&self) -> u8 {
        let (bytes, extra) = self.bit();
        bytes * 8 + extra
    }

    /// Length of the wire value at the start of `src`.
    pub fn value_size(&self, src: &[u8]) -> FieldResult<usize> {
        let name = self.field_type.name();
        let fixed = match self.field_type {
            FieldType::Tiny | FieldType::Year => 1,
            FieldType::Short => 2,
            FieldType::Int24 | FieldType::NewDate | FieldType::Time => 3,
            FieldType::Long | FieldType::Float | FieldType::Timestamp => 4,
            FieldType::LongLong | FieldType::Double | FieldType::Datetime => 8,
            FieldType::NewDecimal => {
                let (p, s) = self.precision_scale();
                Decimal::binary_size(p, s)
            }
            FieldType::Time2 => 3 + fraction_bytes(self.fsp()),
            FieldType::Datetime2 => 5 + fraction_bytes(self.fsp()),
            FieldType::Timestamp2 => 4 + fraction_bytes(self.fsp()),
            FieldType::Enum | FieldType::Set => self.typelib().0,
            FieldType::Bit => usize::from(self.bit_length()).div_ceil(8),
            FieldType::String | FieldType::Varchar | FieldType::Blob => {
                let prefix = if self.field_type == FieldType::Blob {
                    self.packlength()
                } else {
                    length_prefix(self.max_bytes())
                };
                require(name, src, prefix)?;
                let mut raw = [0u8; 8];
                raw[..prefix].copy_from_slice(&src[..prefix]);
                let total = prefix + u64::from_le_bytes(raw) as usize;
                require(name, src, total)?;
                return Ok(total);
            }
        };
        require(name, src, fixed)?;
        Ok(fixed)
    }
}

impl fmt::Display for WireMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.meta;
        match self.field_type {
            FieldType::NewDecimal => write!(f, "decimal({},{})", m[0], m[1]),
            FieldType::String => write!(f, "char({} bytes)", self.max_bytes()),
            FieldType::Varchar => write!(f, "varchar({} bytes)", self.max_bytes()),
            FieldType::Time2 | FieldType::Datetime2 | FieldType::Timestamp2 => {
                write!(f, "{}({})", self.field_type.name(), m[0])
            }
            FieldType::Bit => write!(f, "bit({})", self.bit_length()),
            ft if ft.integer_width().is_some() && self.is_unsigned() => {
                write!(f, "{} unsigned", ft.name())
            }
            ft => f.write_str(ft.name()),
        }
    }
}
