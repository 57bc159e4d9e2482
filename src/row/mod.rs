//! # Rows
//!
//! Record buffers, the null region and the layouts that place columns in a
//! record.
//!
//! - `buffer`: [`RowBuffer`] and the out-of-row [`BlobHeap`]
//! - `null_bitmap`: null bits and BIT(M) leftover bits
//! - `layout`: [`RowLayout`] built from [`ColumnDefinition`]s

mod buffer;
mod layout;
mod null_bitmap;

pub use buffer::{BlobHandle, BlobHeap, RowBuffer};
pub use layout::{BlobSize, ColumnDefinition, ColumnKind, RowLayout, RowLayoutBuilder};
pub use null_bitmap::{null_bytes_for, NullBit, NullMode, UnevenBits};
