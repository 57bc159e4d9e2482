//! # Input Parsing
//!
//! Parsing primitives shared by the store paths of every numeric column.
//!
//! ## Module Structure
//!
//! - `number`: string to integer / double / decimal converters, the
//!   [`WarnFilter`] and the shared EDOM and truncation check
//!
//! Temporal text is parsed by [`crate::types::Temporal::parse`], next to the
//! binary formats it feeds.

mod number;

pub use number::{
    check_edom_and_truncation, str_to_decimal, str_to_double, str_to_int, ConvStatus, Converted,
    WarnFilter,
};
