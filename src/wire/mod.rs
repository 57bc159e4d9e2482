//! # Wire Format
//!
//! Portable column values for replication: per-column metadata, the
//! row-image frame, the conversion matrix that decides how a value written
//! under one layout lands in another, and the cross-type copy dispatch used
//! both there and when copying rows between layouts.
//!
//! A column on the wire is `[type code][metadata][value]`. The decoder is
//! chosen by the type code alone; unknown codes are rejected.

mod codec;
mod conversion;
mod metadata;

pub use codec::{encode_row, image_columns, ImageColumn, RowApplier, RowImageHeader, FLAG_NULL_ROW};
pub use conversion::{classify, copy_field, ColumnConverter, ConvType, CopyRoute, FieldCopier, RowCopier};
pub use metadata::WireMetadata;
