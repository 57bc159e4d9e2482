//! # Value Types
//!
//! The typed values that cross the column boundary, and the per-type
//! descriptors shared by column values and DDL.
//!
//! ## Module Structure
//!
//! - `field_type`: wire type codes, families and result categories
//! - `capabilities`: immutable per-type capability records
//! - `decimal`: exact fixed-point decimal and its binary format
//! - `temporal`: broken-down dates and times and their binary formats
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `FieldType` | One-byte wire type tag |
//! | `TypeCapabilities` | Category, display width, default collation |
//! | `Decimal` | Up to 65 exact digits |
//! | `Temporal` | Date, time or datetime with microseconds |

mod capabilities;
mod decimal;
mod field_type;
mod temporal;

pub use capabilities::{capabilities, TypeCapabilities};
pub use decimal::{Decimal, Fit, ParsedDecimal};
pub use field_type::{FieldType, ResultCategory, TypeFamily};
pub use temporal::{
    civil_from_days, days_from_civil, days_in_month, fraction_bytes, ParsedTemporal, Temporal,
    TemporalKind,
};
