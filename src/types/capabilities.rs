//! # Per-Type Capability Records
//!
//! One immutable [`TypeCapabilities`] record per [`FieldType`], addressed by
//! tag. Column values and DDL read defaults from here instead of each type
//! re-declaring them.
//!
//! `binary_comparable` states whether raw in-row bytes compare with `memcmp`
//! in typed order. Types marked `false` still produce order-preserving sort
//! keys; they just cannot skip the key transform.

use super::field_type::{FieldType, ResultCategory, TypeFamily};
use crate::charset::Collation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCapabilities {
    pub field_type: FieldType,
    pub family: TypeFamily,
    pub category: ResultCategory,
    pub binary_comparable: bool,
    /// Widest rendering of any value of the type, at its widest declaration.
    pub max_display_length: u32,
    pub default_collation: Collation,
    /// Digits after the point; `None` where the type has no fixed scale.
    pub default_scale: Option<u8>,
    /// In-row bytes when independent of the declaration.
    pub fixed_pack_length: Option<usize>,
}

const fn caps(
    field_type: FieldType,
    family: TypeFamily,
    category: ResultCategory,
    binary_comparable: bool,
    max_display_length: u32,
    default_scale: Option<u8>,
    fixed_pack_length: Option<usize>,
) -> TypeCapabilities {
    TypeCapabilities {
        field_type,
        family,
        category,
        binary_comparable,
        max_display_length,
        default_collation: Collation::Binary,
        default_scale,
        fixed_pack_length,
    }
}

use FieldType as T;
use ResultCategory as C;
use TypeFamily as F;

static CAPABILITIES: [TypeCapabilities; 22] = [
    caps(T::Tiny, F::Integer, C::Int, false, 4, Some(0), Some(1)),
    caps(T::Short, F::Integer, C::Int, false, 6, Some(0), Some(2)),
    caps(T::Int24, F::Integer, C::Int, false, 9, Some(0), Some(3)),
    caps(T::Long, F::Integer, C::Int, false, 11, Some(0), Some(4)),
    caps(T::LongLong, F::Integer, C::Int, false, 20, Some(0), Some(8)),
    caps(T::Year, F::Year, C::Int, true, 4, Some(0), Some(1)),
    caps(T::Float, F::Real, C::Real, false, 12, None, Some(4)),
    caps(T::Double, F::Real, C::Real, false, 22, None, Some(8)),
    caps(T::NewDecimal, F::Decimal, C::Decimal, true, 67, Some(0), None),
    TypeCapabilities {
        default_collation: Collation::Utf8mb4GeneralCi,
        ..caps(T::String, F::String, C::String, false, 255, None, None)
    },
    TypeCapabilities {
        default_collation: Collation::Utf8mb4GeneralCi,
        ..caps(T::Varchar, F::String, C::String, false, 65532, None, None)
    },
    caps(T::Blob, F::String, C::String, false, u32::MAX, None, None),
    caps(T::NewDate, F::Temporal, C::Temporal, false, 10, Some(0), Some(3)),
    caps(T::Time, F::Temporal, C::Temporal, false, 10, Some(0), Some(3)),
    caps(T::Datetime, F::Temporal, C::Temporal, false, 19, Some(0), Some(8)),
    caps(T::Timestamp, F::Temporal, C::Temporal, false, 19, Some(0), Some(4)),
    caps(T::Time2, F::Temporal, C::Temporal, true, 17, Some(0), None),
    caps(T::Datetime2, F::Temporal, C::Temporal, true, 26, Some(0), None),
    caps(T::Timestamp2, F::Temporal, C::Temporal, true, 26, Some(0), None),
    TypeCapabilities {
        default_collation: Collation::Utf8mb4GeneralCi,
        ..caps(T::Enum, F::Enum, C::String, false, 255, None, None)
    },
    TypeCapabilities {
        default_collation: Collation::Utf8mb4GeneralCi,
        ..caps(T::Set, F::Set, C::String, false, 255, None, None)
    },
    caps(T::Bit, F::Bit, C::Int, false, 64, Some(0), None),
];

const fn slot(ft: FieldType) -> usize {
    match ft {
        T::Tiny => 0,
        T::Short => 1,
        T::Int24 => 2,
        T::Long => 3,
        T::LongLong => 4,
        T::Year => 5,
        T::Float => 6,
        T::Double => 7,
        T::NewDecimal => 8,
        T::String => 9,
        T::Varchar => 10,
        T::Blob => 11,
        T::NewDate => 12,
        T::Time => 13,
        T::Datetime => 14,
        T::Timestamp => 15,
        T::Time2 => 16,
        T::Datetime2 => 17,
        T::Timestamp2 => 18,
        T::Enum => 19,
        T::Set => 20,
        T::Bit => 21,
    }
}

pub fn capabilities(ft: FieldType) -> &'static TypeCapabilities {
    &CAPABILITIES[slot(ft)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_tag() {
        for entry in CAPABILITIES.iter() {
            assert_eq!(capabilities(entry.field_type), entry);
            assert_eq!(entry.family, entry.field_type.family());
            assert_eq!(entry.category, entry.field_type.result_category());
        }
    }

    #[test]
    fn fractional_temporals_and_decimal_are_binary_comparable() {
        assert!(capabilities(FieldType::NewDecimal).binary_comparable);
        assert!(capabilities(FieldType::Datetime2).binary_comparable);
        assert!(!capabilities(FieldType::Datetime).binary_comparable);
        assert!(!capabilities(FieldType::Long).binary_comparable);
    }

    #[test]
    fn integer_display_widths_include_sign() {
        assert_eq!(capabilities(FieldType::Tiny).max_display_length, 4);
        assert_eq!(capabilities(FieldType::LongLong).max_display_length, 20);
    }
}
