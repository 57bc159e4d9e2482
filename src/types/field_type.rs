//! # Wire Type Codes
//!
//! `FieldType` is the single-byte type tag carried on the replication wire
//! and used to select decoders. Codes follow the numbering MySQL-family
//! replication streams use, so a decoder is chosen purely by the byte.
//!
//! ## Families
//!
//! | Family | Codes | In-row size |
//! |--------|-------|-------------|
//! | **Integer** | Tiny 1, Short 2, Long 3, LongLong 8, Int24 9 | 1-8 bytes |
//! | **Year** | 13 | 1 byte |
//! | **Real** | Float 4, Double 5 | 4, 8 bytes |
//! | **Decimal** | NewDecimal 246 | derived from (precision, scale) |
//! | **String** | Varchar 15, String 254 | length-prefixed / padded |
//! | **Blob** | Blob 252 | 1-4 byte length + handle |
//! | **Legacy temporal** | Timestamp 7, Time 11, Datetime 12, NewDate 14 | 3-8 bytes |
//! | **Fractional temporal** | Timestamp2 17, Datetime2 18, Time2 19 | 3-8 bytes |
//! | **Enum / Set** | 247, 248 | 1-8 bytes |
//! | **Bit** | 16 | 0-8 bytes + up to 7 null-region bits |
//!
//! Codes the column family never produces (old 4-byte DATE, NULL, the
//! pre-5.0 DECIMAL, TINY/MEDIUM/LONG blob aliases) are rejected by
//! [`FieldType::from_code`].

use std::fmt;

use crate::error::{FieldError, FieldResult};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Tiny = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Timestamp = 7,
    LongLong = 8,
    Int24 = 9,
    Time = 11,
    Datetime = 12,
    Year = 13,
    NewDate = 14,
    Varchar = 15,
    Bit = 16,
    Timestamp2 = 17,
    Datetime2 = 18,
    Time2 = 19,
    NewDecimal = 246,
    Enum = 247,
    Set = 248,
    Blob = 252,
    String = 254,
}

/// Category a value takes when read generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    Int,
    Real,
    Decimal,
    String,
    Temporal,
}

/// Physical family used by the conversion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Integer,
    Year,
    Real,
    Decimal,
    String,
    Temporal,
    Enum,
    Set,
    Bit,
}

impl FieldType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> FieldResult<FieldType> {
        Ok(match code {
            1 => FieldType::Tiny,
            2 => FieldType::Short,
            3 => FieldType::Long,
            4 => FieldType::Float,
            5 => FieldType::Double,
            7 => FieldType::Timestamp,
            8 => FieldType::LongLong,
            9 => FieldType::Int24,
            11 => FieldType::Time,
            12 => FieldType::Datetime,
            13 => FieldType::Year,
            14 => FieldType::NewDate,
            15 => FieldType::Varchar,
            16 => FieldType::Bit,
            17 => FieldType::Timestamp2,
            18 => FieldType::Datetime2,
            19 => FieldType::Time2,
            246 => FieldType::NewDecimal,
            247 => FieldType::Enum,
            248 => FieldType::Set,
            252 => FieldType::Blob,
            254 => FieldType::String,
            other => return Err(FieldError::UnknownTypeCode(other)),
        })
    }

    /// SQL name used in condition messages and conversion errors.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Tiny => "tinyint",
            FieldType::Short => "smallint",
            FieldType::Int24 => "mediumint",
            FieldType::Long => "int",
            FieldType::LongLong => "bigint",
            FieldType::Year => "year",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::NewDecimal => "decimal",
            FieldType::String => "char",
            FieldType::Varchar => "varchar",
            FieldType::Blob => "blob",
            FieldType::NewDate => "date",
            FieldType::Time | FieldType::Time2 => "time",
            FieldType::Datetime | FieldType::Datetime2 => "datetime",
            FieldType::Timestamp | FieldType::Timestamp2 => "timestamp",
            FieldType::Enum => "enum",
            FieldType::Set => "set",
            FieldType::Bit => "bit",
        }
    }

    pub fn family(self) -> TypeFamily {
        match self {
            FieldType::Tiny
            | FieldType::Short
            | FieldType::Int24
            | FieldType::Long
            | FieldType::LongLong => TypeFamily::Integer,
            FieldType::Year => TypeFamily::Year,
            FieldType::Float | FieldType::Double => TypeFamily::Real,
            FieldType::NewDecimal => TypeFamily::Decimal,
            FieldType::String | FieldType::Varchar | FieldType::Blob => TypeFamily::String,
            FieldType::NewDate
            | FieldType::Time
            | FieldType::Time2
            | FieldType::Datetime
            | FieldType::Datetime2
            | FieldType::Timestamp
            | FieldType::Timestamp2 => TypeFamily::Temporal,
            FieldType::Enum => TypeFamily::Enum,
            FieldType::Set => TypeFamily::Set,
            FieldType::Bit => TypeFamily::Bit,
        }
    }

    pub fn result_category(self) -> ResultCategory {
        match self.family() {
            TypeFamily::Integer | TypeFamily::Year | TypeFamily::Bit => ResultCategory::Int,
            TypeFamily::Real => ResultCategory::Real,
            TypeFamily::Decimal => ResultCategory::Decimal,
            TypeFamily::String | TypeFamily::Enum | TypeFamily::Set => ResultCategory::String,
            TypeFamily::Temporal => ResultCategory::Temporal,
        }
    }

    /// Fixed in-row size for the integer types.
    pub fn integer_width(self) -> Option<usize> {
        match self {
            FieldType::Tiny => Some(1),
            FieldType::Short => Some(2),
            FieldType::Int24 => Some(3),
            FieldType::Long => Some(4),
            FieldType::LongLong => Some(8),
            _ => None,
        }
    }

    /// Legacy temporal encodings without sub-second digits.
    pub fn is_legacy_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Time | FieldType::Datetime | FieldType::Timestamp
        )
    }

    /// Fractional temporal encodings (big-endian, memcmp-ordered).
    pub fn is_fractional_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Time2 | FieldType::Datetime2 | FieldType::Timestamp2
        )
    }

    /// The other generation of the same temporal kind, if any.
    pub fn temporal_generation_peer(self) -> Option<FieldType> {
        match self {
            FieldType::Time => Some(FieldType::Time2),
            FieldType::Time2 => Some(FieldType::Time),
            FieldType::Datetime => Some(FieldType::Datetime2),
            FieldType::Datetime2 => Some(FieldType::Datetime),
            FieldType::Timestamp => Some(FieldType::Timestamp2),
            FieldType::Timestamp2 => Some(FieldType::Timestamp),
            _ => None,
        }
    }
}

impl TryFrom<u8> for FieldType {
    type Error = FieldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FieldType::from_code(value)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
