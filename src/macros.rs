//! # Internal Macros
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields stored as
//! little-endian wrapper types (`U16`, `U32`).
//!
//! ```ignore
//! use zerocopy::little_endian::{U16, U32};
//!
//! #[repr(C)]
//! struct RowImageHeader {
//!     column_count: U16,
//!     checksum: U32,
//! }
//!
//! impl RowImageHeader {
//!     zerocopy_accessors! {
//!         column_count: u16,
//!         checksum: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn column_count(&self) -> u16 { self.column_count.get() }
//! // pub fn set_column_count(&mut self, val: u16) { self.column_count = U16::new(val); }
//! // pub fn checksum(&self) -> u32 { self.checksum.get() }
//! // pub fn set_checksum(&mut self, val: u32) { self.checksum = U32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
