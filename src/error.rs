//! # Hard Failures
//!
//! Everything that is *not* a recoverable truncation. Recoverable conditions
//! (clamping, rounding, bad input under lenient settings) never surface here;
//! they are recorded as conditions in [`crate::diagnostics::Diagnostics`] and
//! reported through [`crate::diagnostics::StoreStatus`].
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `TruncatedInput` | every `unpack` path, wire metadata decode |
//! | `Malformed` | strict binary decode (corrupt decimal groups, bad dates) |
//! | `UnknownTypeCode` | wire decoder type-code dispatch |
//! | `BadMetadata` | wire metadata outside the type's limits |
//! | `ImpossibleConversion` | conversion matrix |
//! | `ConversionDisabled` | conversion policy switches |
//! | `LossyApply` / `StoreAborted` | replication apply escalation |
//! | `DanglingBlob` | large-object reads through a stale handle |
//! | `ChecksumMismatch` / `BadHeader` / `ColumnCountMismatch` | row images |
//!
//! Layout construction from column definitions is a DDL-time concern and
//! reports through `eyre` instead.

use thiserror::Error;

/// Hard failure of a single field, wire or row-image operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Fewer bytes were supplied than the type's metadata requires.
    #[error("truncated {type_name} value: need {needed} bytes, {available} available")]
    TruncatedInput {
        type_name: &'static str,
        needed: usize,
        available: usize,
    },

    /// Bytes were present but do not form a valid value of the type.
    #[error("malformed {type_name} value: {reason}")]
    Malformed {
        type_name: &'static str,
        reason: String,
    },

    #[error("unknown wire type code {0}")]
    UnknownTypeCode(u8),

    #[error("invalid wire metadata for {type_name}: {reason}")]
    BadMetadata {
        type_name: &'static str,
        reason: String,
    },

    #[error("column '{column}': cannot convert {from} to {to}")]
    ImpossibleConversion {
        column: String,
        from: String,
        to: String,
    },

    #[error("column '{column}': conversion from {from} to {to} is disabled by the conversion policy")]
    ConversionDisabled {
        column: String,
        from: String,
        to: String,
    },

    /// A lossy apply was escalated by `ConversionPolicy::fail_on_truncation`.
    #[error("column '{column}': value truncated while applying replicated row")]
    LossyApply { column: String },

    /// A store returned the fatal status under strict settings.
    #[error("column '{column}': store aborted: {message}")]
    StoreAborted { column: String, message: String },

    #[error("dangling large-object reference (heap {heap}, slot {slot})")]
    DanglingBlob { heap: u32, slot: u32 },

    #[error("row image checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("invalid row image header: {0}")]
    BadHeader(String),

    #[error("row image has {actual} columns, layout has {expected}")]
    ColumnCountMismatch { expected: usize, actual: usize },
}

impl FieldError {
    pub fn truncated(type_name: &'static str, needed: usize, available: usize) -> Self {
        FieldError::TruncatedInput {
            type_name,
            needed,
            available,
        }
    }

    pub fn malformed(type_name: &'static str, reason: impl Into<String>) -> Self {
        FieldError::Malformed {
            type_name,
            reason: reason.into(),
        }
    }

    pub fn bad_metadata(type_name: &'static str, reason: impl Into<String>) -> Self {
        FieldError::BadMetadata {
            type_name,
            reason: reason.into(),
        }
    }

    /// True for failures caused by the input being shorter than required.
    pub fn is_truncated_input(&self) -> bool {
        matches!(self, FieldError::TruncatedInput { .. })
    }
}

pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// Fails with `TruncatedInput` unless `src` holds at least `needed` bytes.
#[inline]
pub(crate) fn require(type_name: &'static str, src: &[u8], needed: usize) -> FieldResult<()> {
    if src.len() < needed {
        return Err(FieldError::truncated(type_name, needed, src.len()));
    }
    Ok(())
}
