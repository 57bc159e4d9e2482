//! # Column Values
//!
//! A [`Field`] is one column bound to a position in a row layout. It owns
//! the column's name, byte offset and null handling, and delegates the
//! value format to a per-type codec implementing [`FieldCodec`].
//!
//! ## Codec Family
//!
//! | Codec | Types | In-row bytes |
//! |-------|-------|--------------|
//! | `IntegerCodec` | TINYINT..BIGINT | 1, 2, 3, 4, 8 LE |
//! | `YearCodec` | YEAR | 1 (`year - 1900`, 0 = `0000`) |
//! | `RealCodec` | FLOAT, DOUBLE | 4, 8 IEEE LE |
//! | `DecimalCodec` | DECIMAL(p,s) | packed binary, memcmp-ordered |
//! | `CharCodec` | CHAR(n) | `n * mbmaxlen`, pad-filled |
//! | `VarcharCodec` | VARCHAR(n) | 1/2-byte length + capacity |
//! | `BlobCodec` | TINYBLOB..LONGBLOB | 1-4 byte length + heap handle |
//! | `TemporalCodec` | DATE..TIMESTAMP(fsp) | per generation |
//! | `TypelibCodec` | ENUM, SET | 1/2 index, 1-4/8 bitmask |
//! | `BitCodec` | BIT(M) | `M / 8` BE + leftover bits in the null region |
//!
//! ## Contract
//!
//! Every `store_*` converts its input to the column's type, writes the
//! bytes, and returns a [`StoreStatus`]:
//!
//! ```text
//! Exact      value fit exactly
//! Truncated  value was clamped, rounded or cut; a condition was recorded
//! Fatal      strict mode turned the condition into an error
//! ```
//!
//! Even a `Fatal` store leaves a well-defined value (the clamped or zero
//! value) in the row. Reads never fail: a value that cannot be decoded is
//! logged and read as the type's zero. Decoding failures are only surfaced
//! by [`Field::unpack`], which validates its input.
//!
//! ## Comparison and Sort Keys
//!
//! `cmp` orders two rows of the same layout by this column's typed value
//! (NULL first). `make_sort_key` writes a key whose byte order matches
//! `cmp`: a 0/1 null prefix for nullable columns, then exactly
//! `min(sort_length, max_sort_length)` value bytes.

mod bit;
mod blob;
mod decimal;
mod integer;
mod real;
mod string;
mod temporal;
mod typelib;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use smallvec::SmallVec;

use crate::charset::{Charset, Collation};
use crate::diagnostics::{StoreContext, StoreScope, StoreStatus};
use crate::error::FieldResult;
use crate::row::{BlobHeap, NullMode, RowBuffer};
use crate::telemetry::Feature;
use crate::types::{capabilities, Decimal, FieldType, Temporal, TemporalKind, TypeCapabilities};
use crate::wire::WireMetadata;

pub use bit::BitCodec;
pub use blob::BlobCodec;
pub use decimal::DecimalCodec;
pub use integer::{IntegerCodec, YearCodec};
pub use real::RealCodec;
pub use string::{CharCodec, VarcharCodec};
pub use temporal::TemporalCodec;
pub use typelib::TypelibCodec;

pub(crate) use string::length_prefix;
pub(crate) use typelib::{enum_width, set_width};

/// Where [`FieldCodec::val_str`] renders text.
pub trait TextSink {
    fn put(&mut self, bytes: &[u8]);
}

impl TextSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl TextSink for bumpalo::collections::Vec<'_, u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// The value format of one column type.
///
/// `at` is the column's byte offset in the record. Codecs never touch the
/// null bit; [`Field`] handles nullness before delegating.
pub trait FieldCodec: std::fmt::Debug + Send + Sync {
    fn field_type(&self) -> FieldType;

    /// Bytes the value occupies in the record.
    fn pack_length(&self) -> usize;

    fn max_display_length(&self) -> u32 {
        capabilities(self.field_type()).max_display_length
    }

    fn binary_comparable(&self) -> bool {
        capabilities(self.field_type()).binary_comparable
    }

    fn collation(&self) -> Collation {
        Collation::Binary
    }

    fn temporal_kind(&self) -> Option<TemporalKind> {
        None
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus;

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus;

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus;

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus;

    /// Numeric columns store the value's `YYYYMMDDHHMMSS[.ffffff]` form.
    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let fsp = if value.micros == 0 { 0 } else { 6 };
        self.store_decimal(row, at, &value.to_decimal(fsp), scope)
    }

    /// Writes the type's zero value.
    fn reset(&self, row: &mut RowBuffer, at: usize) {
        row.as_bytes_mut()[at..at + self.pack_length()].fill(0);
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128;

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64;

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink);

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal;

    /// The value as a temporal of `kind`; numbers are read as
    /// `YYYYMMDD[HHMMSS]` or `±HHMMSS`.
    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        let (int, micros, _) = self.val_decimal(row, at).int_and_micros();
        Temporal::from_number(int, micros, kind).map(|(t, _)| t)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering;

    /// Full length of this column's sort key, before any prefix limit.
    fn sort_length(&self) -> usize;

    /// Appends exactly `key_len` bytes (at most `sort_length`).
    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize);

    /// Appends the compact wire form.
    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>);

    /// Reads a wire form written by `pack`, returning the bytes consumed.
    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize>;

    fn wire_metadata(&self) -> WireMetadata;

    /// Re-homes out-of-row bytes referenced from `row` into `row`'s own
    /// heap, reading them through `source`.
    fn rehome(&self, _row: &mut RowBuffer, _at: usize, _source: &BlobHeap) {}

    fn features(&self) -> SmallVec<[Feature; 2]> {
        SmallVec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Integer(IntegerCodec),
    Year(YearCodec),
    Real(RealCodec),
    Decimal(DecimalCodec),
    Char(CharCodec),
    Varchar(VarcharCodec),
    Blob(BlobCodec),
    Temporal(TemporalCodec),
    Typelib(TypelibCodec),
    Bit(BitCodec),
}

impl FieldKind {
    pub fn codec(&self) -> &dyn FieldCodec {
        match self {
            FieldKind::Integer(c) => c,
            FieldKind::Year(c) => c,
            FieldKind::Real(c) => c,
            FieldKind::Decimal(c) => c,
            FieldKind::Char(c) => c,
            FieldKind::Varchar(c) => c,
            FieldKind::Blob(c) => c,
            FieldKind::Temporal(c) => c,
            FieldKind::Typelib(c) => c,
            FieldKind::Bit(c) => c,
        }
    }
}

/// One column of a row layout.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    offset: usize,
    null: NullMode,
    kind: FieldKind,
}

impl Field {
    pub(crate) fn new(name: impl Into<String>, offset: usize, null: NullMode, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            offset,
            null,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn codec(&self) -> &dyn FieldCodec {
        self.kind.codec()
    }

    pub fn field_type(&self) -> FieldType {
        self.codec().field_type()
    }

    pub fn capabilities(&self) -> &'static TypeCapabilities {
        capabilities(self.field_type())
    }

    pub fn pack_length(&self) -> usize {
        self.codec().pack_length()
    }

    pub fn max_display_length(&self) -> u32 {
        self.codec().max_display_length()
    }

    pub fn binary_comparable(&self) -> bool {
        self.codec().binary_comparable()
    }

    pub fn collation(&self) -> Collation {
        self.codec().collation()
    }

    pub fn null_mode(&self) -> NullMode {
        self.null
    }

    pub fn is_nullable(&self) -> bool {
        self.null.is_nullable()
    }

    pub fn wire_metadata(&self) -> WireMetadata {
        self.codec().wire_metadata()
    }

    pub fn features(&self) -> SmallVec<[Feature; 2]> {
        self.codec().features()
    }

    /// The same column at another record offset.
    pub fn relocated(&self, offset: usize) -> Field {
        Field {
            offset,
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------
    // Nullness
    // ------------------------------------------------------------------

    pub fn is_null(&self, row: &RowBuffer) -> bool {
        self.null.is_null(row.as_bytes())
    }

    /// Sets the null bit. A no-op for NOT NULL columns.
    pub fn set_null(&self, row: &mut RowBuffer) {
        if let NullMode::Bit { bit, .. } = self.null {
            bit.set(row.as_bytes_mut());
        }
    }

    pub fn set_notnull(&self, row: &mut RowBuffer) {
        if let NullMode::Bit { bit, .. } = self.null {
            bit.clear(row.as_bytes_mut());
        }
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    pub fn store_str(&self, row: &mut RowBuffer, src: &[u8], cs: Charset, ctx: &mut StoreContext) -> StoreStatus {
        self.set_notnull(row);
        self.codec()
            .store_str(row, self.offset, src, cs, &mut ctx.scope(&self.name))
    }

    /// Stores UTF-8 text.
    pub fn store_text(&self, row: &mut RowBuffer, text: &str, ctx: &mut StoreContext) -> StoreStatus {
        self.store_str(row, text.as_bytes(), Charset::Utf8mb4, ctx)
    }

    pub fn store_real(&self, row: &mut RowBuffer, value: f64, ctx: &mut StoreContext) -> StoreStatus {
        self.set_notnull(row);
        self.codec()
            .store_real(row, self.offset, value, &mut ctx.scope(&self.name))
    }

    pub fn store_int(&self, row: &mut RowBuffer, value: impl Into<i128>, ctx: &mut StoreContext) -> StoreStatus {
        self.set_notnull(row);
        self.codec()
            .store_int(row, self.offset, value.into(), &mut ctx.scope(&self.name))
    }

    pub fn store_decimal(&self, row: &mut RowBuffer, value: &Decimal, ctx: &mut StoreContext) -> StoreStatus {
        self.set_notnull(row);
        self.codec()
            .store_decimal(row, self.offset, value, &mut ctx.scope(&self.name))
    }

    pub fn store_temporal(&self, row: &mut RowBuffer, value: &Temporal, ctx: &mut StoreContext) -> StoreStatus {
        self.set_notnull(row);
        self.codec()
            .store_temporal(row, self.offset, value, &mut ctx.scope(&self.name))
    }

    /// Stores NULL. A NOT NULL column takes its zero value and raises
    /// "cannot be null" instead.
    pub fn store_null(&self, row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
        if self.is_nullable() {
            self.set_null(row);
            return StoreStatus::Exact;
        }
        self.codec().reset(row, self.offset);
        ctx.scope(&self.name).bad_null()
    }

    /// Writes the zero value and clears the null bit.
    pub fn reset(&self, row: &mut RowBuffer) {
        self.set_notnull(row);
        self.codec().reset(row, self.offset);
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn val_int(&self, row: &RowBuffer) -> Option<i128> {
        (!self.is_null(row)).then(|| self.codec().val_int(row, self.offset))
    }

    pub fn val_real(&self, row: &RowBuffer) -> Option<f64> {
        (!self.is_null(row)).then(|| self.codec().val_real(row, self.offset))
    }

    pub fn val_decimal(&self, row: &RowBuffer) -> Option<Decimal> {
        (!self.is_null(row)).then(|| self.codec().val_decimal(row, self.offset))
    }

    /// The value as a temporal of this column's own kind, or as a
    /// datetime for non-temporal columns.
    pub fn val_temporal(&self, row: &RowBuffer) -> Option<Temporal> {
        let kind = self.codec().temporal_kind().unwrap_or_default();
        self.val_temporal_as(row, kind)
    }

    pub fn val_temporal_as(&self, row: &RowBuffer, kind: TemporalKind) -> Option<Temporal> {
        if self.is_null(row) {
            return None;
        }
        self.codec().val_temporal(row, self.offset, kind)
    }

    /// Appends the text form to `out`. Returns false (and appends nothing)
    /// for NULL.
    pub fn val_str(&self, row: &RowBuffer, out: &mut Vec<u8>) -> bool {
        if self.is_null(row) {
            return false;
        }
        self.codec().val_str(row, self.offset, out);
        true
    }

    pub fn val_bytes(&self, row: &RowBuffer) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        self.val_str(row, &mut out).then_some(out)
    }

    pub fn val_string(&self, row: &RowBuffer) -> Option<String> {
        self.val_bytes(row)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Text form rendered straight into `arena`, for scans that read many
    /// values and drop them together.
    pub fn val_str_in<'b>(&self, row: &RowBuffer, arena: &'b Bump) -> Option<&'b [u8]> {
        if self.is_null(row) {
            return None;
        }
        let mut out = BumpVec::new_in(arena);
        self.codec().val_str(row, self.offset, &mut out);
        Some(out.into_bump_slice())
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    /// Compares this column in two rows of the same layout. NULL sorts
    /// first.
    pub fn cmp(&self, a: &RowBuffer, b: &RowBuffer) -> Ordering {
        match (self.is_null(a), self.is_null(b)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.codec().cmp(a, b, self.offset),
        }
    }

    pub fn sort_length(&self) -> usize {
        self.codec().sort_length()
    }

    /// Bytes `make_sort_key` appends under a `max_sort_length` limit.
    pub fn sort_key_length(&self, max_sort_length: usize) -> usize {
        let value = self.sort_length().min(max_sort_length);
        value + usize::from(self.is_nullable())
    }

    pub fn make_sort_key(&self, row: &RowBuffer, out: &mut Vec<u8>, max_sort_length: usize) {
        let key_len = self.sort_length().min(max_sort_length);
        let null = self.is_null(row);
        if self.is_nullable() {
            out.push(u8::from(!null));
        }
        if null {
            out.resize(out.len() + key_len, 0);
            return;
        }
        self.codec().make_sort_key(row, self.offset, out, key_len);
    }

    // ------------------------------------------------------------------
    // Wire form
    // ------------------------------------------------------------------

    /// Appends the value's wire form. NULL is carried by the row image's
    /// null bitmap, so a NULL value appends nothing.
    pub fn pack(&self, row: &RowBuffer, out: &mut Vec<u8>) {
        if !self.is_null(row) {
            self.codec().pack(row, self.offset, out);
        }
    }

    pub fn unpack(&self, row: &mut RowBuffer, src: &[u8]) -> FieldResult<usize> {
        let used = self.codec().unpack(row, self.offset, src)?;
        self.set_notnull(row);
        Ok(used)
    }

    pub(crate) fn rehome(&self, row: &mut RowBuffer, source: &BlobHeap) {
        if !self.is_null(row) {
            self.codec().rehome(row, self.offset, source);
        }
    }
}

// ----------------------------------------------------------------------
// Shared helpers
// ----------------------------------------------------------------------

pub(crate) fn read_uint_le(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

pub(crate) fn write_uint_le(value: u64, out: &mut [u8]) {
    let n = out.len();
    out.copy_from_slice(&value.to_le_bytes()[..n]);
}

/// Left-pads a rendered number with zeros to `width` characters, keeping
/// any sign in front.
pub(crate) fn zero_fill(text: &mut Vec<u8>, width: usize) {
    if text.len() >= width {
        return;
    }
    let pad = width - text.len();
    let at = usize::from(text.first() == Some(&b'-'));
    text.splice(at..at, std::iter::repeat(b'0').take(pad));
}

/// Text form of a double: plain below 1e15, exponent notation beyond or
/// for tiny magnitudes.
pub(crate) fn format_real(value: f64) -> String {
    let abs = value.abs();
    if abs != 0.0 && !(1e-4..1e15).contains(&abs) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}
