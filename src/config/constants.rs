//! # Limits and Wire Constants
//!
//! Every numeric limit the column family enforces lives here. Values that
//! derive from each other are co-located and tied together with compile-time
//! assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! DIG_PER_DEC (9 digits per 4-byte group)
//!       │
//!       └─> MAX_DECIMAL_PRECISION (65)
//!             ├─> MAX_DECIMAL_SCALE (38, must be <=)
//!             └─> MAX_DECIMAL_BINARY_SIZE (derived: 30 bytes)
//!
//! MAX_DATETIME_FSP (6)
//!       └─> MAX_FRACTION_BYTES (derived: 3)
//!
//! MAX_RECORD_LENGTH (65535)
//!       └─> MAX_VARCHAR_BYTES (65532, leaves room for a 2-byte prefix
//!             and a null byte)
//!
//! MAX_SET_MEMBERS (64) == MAX_BIT_LENGTH (64) == u64::BITS
//!
//! ROW_IMAGE_HEADER_SIZE (16)
//! ```

// ============================================================================
// DECIMAL
// ============================================================================

/// Decimal digits packed into one 4-byte group of the binary decimal format.
pub const DIG_PER_DEC: usize = 9;

/// Largest precision (total significant digits) of a DECIMAL column.
pub const MAX_DECIMAL_PRECISION: u8 = 65;

/// Largest scale (digits after the point) of a DECIMAL column.
pub const MAX_DECIMAL_SCALE: u8 = 38;

/// Bytes needed for a leftover group of 0..=8 digits.
pub const DIG2BYTES: [usize; DIG_PER_DEC + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Binary size of DECIMAL(precision, scale): whole 9-digit groups take
/// 4 bytes each on both sides of the point, leftovers take `DIG2BYTES`.
pub const fn decimal_binary_size(precision: u8, scale: u8) -> usize {
    let intg = (precision - scale) as usize;
    let frac = scale as usize;
    (intg / DIG_PER_DEC) * 4 + DIG2BYTES[intg % DIG_PER_DEC] + (frac / DIG_PER_DEC) * 4 + DIG2BYTES[frac % DIG_PER_DEC]
}

const fn widest_decimal_binary_size() -> usize {
    let mut widest = 0;
    let mut scale = 0;
    while scale <= MAX_DECIMAL_SCALE {
        let size = decimal_binary_size(MAX_DECIMAL_PRECISION, scale);
        if size > widest {
            widest = size;
        }
        scale += 1;
    }
    widest
}

/// Largest binary size over every DECIMAL(65, s); reached first at s = 1,
/// and also by DECIMAL(65, 30).
pub const MAX_DECIMAL_BINARY_SIZE: usize = widest_decimal_binary_size();

const _: () = assert!(
    MAX_DECIMAL_SCALE <= MAX_DECIMAL_PRECISION,
    "MAX_DECIMAL_SCALE must not exceed MAX_DECIMAL_PRECISION"
);

const _: () = assert!(
    MAX_DECIMAL_BINARY_SIZE == 30 && decimal_binary_size(65, 30) == 30 && decimal_binary_size(65, 0) == 29,
    "MAX_DECIMAL_BINARY_SIZE derivation mismatch"
);

// ============================================================================
// TEMPORAL
// ============================================================================

/// Largest number of sub-second digits a temporal column may keep.
pub const MAX_DATETIME_FSP: u8 = 6;

/// Fraction bytes appended by the fractional encodings at full precision.
pub const MAX_FRACTION_BYTES: usize = (MAX_DATETIME_FSP as usize).div_ceil(2);

/// Largest TIME magnitude in hours.
pub const MAX_TIME_HOURS: u32 = 838;

/// Largest legal TIMESTAMP in seconds since the epoch (2038-01-19 03:14:07 UTC).
pub const MAX_TIMESTAMP_SECONDS: i64 = i32::MAX as i64;

const _: () = assert!(MAX_FRACTION_BYTES == 3, "MAX_FRACTION_BYTES derivation mismatch");

// ============================================================================
// STRINGS
// ============================================================================

/// Largest CHAR(n) length in characters.
pub const MAX_CHAR_LENGTH: u16 = 255;

/// Largest VARCHAR byte capacity.
pub const MAX_VARCHAR_BYTES: u32 = 65532;

/// Largest number of bytes a 1-byte length prefix can describe.
pub const SHORT_PREFIX_MAX: u32 = 255;

// ============================================================================
// ENUM / SET / BIT
// ============================================================================

pub const MAX_ENUM_LABELS: usize = 65535;

pub const MAX_SET_MEMBERS: usize = 64;

pub const MAX_BIT_LENGTH: u8 = 64;

const _: () = assert!(
    MAX_SET_MEMBERS == u64::BITS as usize && MAX_BIT_LENGTH as u32 == u64::BITS,
    "SET and BIT values are held in a u64"
);

const _: () = assert!(
    MAX_ENUM_LABELS == u16::MAX as usize,
    "ENUM indexes are stored in at most two bytes"
);

// ============================================================================
// RECORD
// ============================================================================

/// Largest in-row record, null bitmap included.
pub const MAX_RECORD_LENGTH: usize = 65535;

const _: () = assert!(
    MAX_VARCHAR_BYTES as usize + 2 < MAX_RECORD_LENGTH,
    "a maximal VARCHAR plus its prefix must fit in a record"
);

/// Default cap on the bytes of a single column's sort key.
pub const DEFAULT_MAX_SORT_LENGTH: usize = 1024;

// ============================================================================
// ROW IMAGE
// ============================================================================

pub const ROW_IMAGE_MAGIC: [u8; 2] = *b"RF";

pub const ROW_IMAGE_VERSION: u8 = 1;

/// Size of [`crate::wire::RowImageHeader`].
pub const ROW_IMAGE_HEADER_SIZE: usize = 16;
