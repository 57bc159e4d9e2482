//! # Row Images
//!
//! A row image frames one changed row for replication. Every present,
//! non-NULL column is self-describing, so a destination with a different
//! layout can still decode it:
//!
//! ```text
//! ┌──────────────────────── header (16 bytes) ────────────────────────┐
//! │ magic "RF" │ ver │ flags │ columns u16 │ bitmap len u16 │         │
//! │ payload len u32 │ CRC-32 of payload u32                           │
//! └───────────────────────────────────────────────────────────────────┘
//! payload:
//!   present bitmap  ceil(columns / 8) bytes, bit i = column i carried
//!   null bitmap     ceil(columns / 8) bytes, bit i = column i is NULL
//!   per present non-NULL column:  [type code][metadata][value]
//! ```
//!
//! All multi-byte header fields are little-endian. The applier checks the
//! magic, version, bounds and checksum before decoding any column.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{ConversionPolicy, FieldConfig, ROW_IMAGE_HEADER_SIZE, ROW_IMAGE_MAGIC, ROW_IMAGE_VERSION};
use crate::diagnostics::StoreContext;
use crate::error::{require, FieldError, FieldResult};
use crate::row::{null_bytes_for, NullBit, RowBuffer, RowLayout};

use super::{ColumnConverter, WireMetadata};

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// The row is an outer-join NULL-complemented row; no columns follow.
pub const FLAG_NULL_ROW: u8 = 0x01;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RowImageHeader {
    magic: [u8; 2],
    version: u8,
    flags: u8,
    column_count: U16,
    bitmap_len: U16,
    payload_len: U32,
    checksum: U32,
}

const _: () = assert!(std::mem::size_of::<RowImageHeader>() == ROW_IMAGE_HEADER_SIZE);

impl RowImageHeader {
    pub fn new(column_count: u16, flags: u8) -> Self {
        Self {
            magic: ROW_IMAGE_MAGIC,
            version: ROW_IMAGE_VERSION,
            flags,
            column_count: U16::new(column_count),
            bitmap_len: U16::new(null_bytes_for(usize::from(column_count)) as u16),
            payload_len: U32::new(0),
            checksum: U32::new(0),
        }
    }

    /// Parses and checks the fixed part of an image.
    pub fn from_bytes(bytes: &[u8]) -> FieldResult<&Self> {
        require("row image", bytes, ROW_IMAGE_HEADER_SIZE)?;
        let header = Self::ref_from_bytes(&bytes[..ROW_IMAGE_HEADER_SIZE])
            .map_err(|_| FieldError::BadHeader("header does not fit its layout".into()))?;
        if header.magic != ROW_IMAGE_MAGIC {
            return Err(FieldError::BadHeader(format!("bad magic {:02x?}", header.magic)));
        }
        if header.version != ROW_IMAGE_VERSION {
            return Err(FieldError::BadHeader(format!(
                "unsupported version {} (expected {ROW_IMAGE_VERSION})",
                header.version
            )));
        }
        let expected = null_bytes_for(usize::from(header.column_count()));
        if usize::from(header.bitmap_len()) != expected {
            return Err(FieldError::BadHeader(format!(
                "bitmap length {} for {} columns",
                header.bitmap_len(),
                header.column_count()
            )));
        }
        Ok(header)
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_null_row(&self) -> bool {
        self.flags & FLAG_NULL_ROW != 0
    }

    zerocopy_accessors! {
        column_count: u16,
        bitmap_len: u16,
        payload_len: u32,
        checksum: u32,
    }
}

/// Encodes `row` of `layout` as a row image. `present` selects the columns
/// carried (all when `None`; missing entries count as absent).
pub fn encode_row(layout: &RowLayout, row: &RowBuffer, present: Option<&[bool]>) -> Vec<u8> {
    let columns = layout.len();
    let bitmap_len = null_bytes_for(columns);
    let mut flags = 0;
    let mut payload = vec![0u8; 2 * bitmap_len];

    if layout.is_null_row(row) {
        flags |= FLAG_NULL_ROW;
    } else {
        for (i, field) in layout.fields().iter().enumerate() {
            let carried = present.map_or(true, |p| p.get(i).copied().unwrap_or(false));
            if !carried {
                continue;
            }
            NullBit::from_index(i).set(&mut payload[..bitmap_len]);
            if field.is_null(row) {
                NullBit::from_index(i).set(&mut payload[bitmap_len..]);
                continue;
            }
            field.wire_metadata().encode(&mut payload);
            field.pack(row, &mut payload);
        }
    }

    let mut header = RowImageHeader::new(columns as u16, flags);
    header.set_payload_len(payload.len() as u32);
    header.set_checksum(CRC32.checksum(&payload));

    let mut image = Vec::with_capacity(ROW_IMAGE_HEADER_SIZE + payload.len());
    image.extend_from_slice(header.as_bytes());
    image.extend_from_slice(&payload);
    image
}

/// One column of a row image, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageColumn<'i> {
    pub index: usize,
    /// `None` for a NULL value.
    pub metadata: Option<WireMetadata>,
    pub value: &'i [u8],
}

/// Checks `image` and splits it into its present columns without a
/// destination layout. A NULL-row image yields no columns.
pub fn image_columns(image: &[u8]) -> FieldResult<(RowImageHeader, Vec<ImageColumn<'_>>)> {
    let header = *RowImageHeader::from_bytes(image)?;
    let payload = checked_payload(&header, image)?;
    let mut columns = Vec::new();
    if header.is_null_row() {
        return Ok((header, columns));
    }
    let bitmap_len = usize::from(header.bitmap_len());
    require("row image bitmaps", payload, 2 * bitmap_len)?;
    let (present, rest) = payload.split_at(bitmap_len);
    let (nulls, values) = rest.split_at(bitmap_len);

    let mut pos = 0;
    for index in 0..usize::from(header.column_count()) {
        let bit = NullBit::from_index(index);
        if !bit.is_set(present) {
            continue;
        }
        if bit.is_set(nulls) {
            columns.push(ImageColumn {
                index,
                metadata: None,
                value: &[],
            });
            continue;
        }
        let (meta, used) = WireMetadata::decode(&values[pos..])?;
        pos += used;
        let size = meta.value_size(&values[pos..])?;
        columns.push(ImageColumn {
            index,
            metadata: Some(meta),
            value: &values[pos..pos + size],
        });
        pos += size;
    }
    if pos != values.len() {
        return Err(trailing(values.len() - pos));
    }
    Ok((header, columns))
}

fn checked_payload<'i>(header: &RowImageHeader, image: &'i [u8]) -> FieldResult<&'i [u8]> {
    let payload = &image[ROW_IMAGE_HEADER_SIZE..];
    if payload.len() != header.payload_len() as usize {
        return Err(FieldError::BadHeader(format!(
            "payload length {} but {} bytes follow the header",
            header.payload_len(),
            payload.len()
        )));
    }
    let computed = CRC32.checksum(payload);
    if computed != header.checksum() {
        return Err(FieldError::ChecksumMismatch {
            stored: header.checksum(),
            computed,
        });
    }
    Ok(payload)
}

fn trailing(extra: usize) -> FieldError {
    FieldError::BadHeader(format!("{extra} trailing bytes after the last column"))
}

/// Applies row images to rows of one destination layout, caching a
/// converter per column for as long as the incoming metadata stays the
/// same.
#[derive(Debug)]
pub struct RowApplier<'a> {
    layout: &'a RowLayout,
    policy: ConversionPolicy,
    converters: Vec<Option<ColumnConverter>>,
}

impl<'a> RowApplier<'a> {
    pub fn new(layout: &'a RowLayout, policy: ConversionPolicy) -> Self {
        Self {
            layout,
            policy,
            converters: (0..layout.len()).map(|_| None).collect(),
        }
    }

    /// Takes the conversion policy of the session's configuration.
    pub fn from_config(layout: &'a RowLayout, config: &FieldConfig) -> Self {
        Self::new(layout, config.conversion)
    }

    pub fn layout(&self) -> &RowLayout {
        self.layout
    }

    /// Converter currently cached for column `index`.
    pub fn converter(&self, index: usize) -> Option<&ColumnConverter> {
        self.converters.get(index)?.as_ref()
    }

    /// Decodes `image` into `dst_row`. Columns not carried keep their
    /// value. On error the columns applied so far stay written.
    pub fn apply(&mut self, image: &[u8], dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> FieldResult<()> {
        let layout = self.layout;
        let header = RowImageHeader::from_bytes(image)?;
        let columns = usize::from(header.column_count());
        if columns != layout.len() {
            return Err(FieldError::ColumnCountMismatch {
                expected: layout.len(),
                actual: columns,
            });
        }
        let payload = checked_payload(header, image)?;

        if header.is_null_row() {
            layout.set_null_row(dst_row, true);
            return Ok(());
        }
        layout.set_null_row(dst_row, false);

        let bitmap_len = usize::from(header.bitmap_len());
        require("row image bitmaps", payload, 2 * bitmap_len)?;
        let (present, rest) = payload.split_at(bitmap_len);
        let (nulls, values) = rest.split_at(bitmap_len);

        let mut pos = 0;
        for (i, field) in layout.fields().iter().enumerate() {
            let bit = NullBit::from_index(i);
            if !bit.is_set(present) {
                continue;
            }
            if bit.is_set(nulls) {
                if field.store_null(dst_row, ctx).is_fatal() {
                    return Err(FieldError::StoreAborted {
                        column: field.name().to_string(),
                        message: format!("column '{}' cannot be null", field.name()),
                    });
                }
                continue;
            }

            let (meta, used) = WireMetadata::decode(&values[pos..])?;
            pos += used;
            let slot = &mut self.converters[i];
            let converter = match slot {
                Some(c) if *c.source_metadata() == meta => c,
                _ => slot.insert(ColumnConverter::resolve(&meta, field, self.policy)?),
            };
            pos += converter.apply(&values[pos..], field, dst_row, ctx)?;
        }

        if pos != values.len() {
            return Err(trailing(values.len() - pos));
        }
        Ok(())
    }
}
