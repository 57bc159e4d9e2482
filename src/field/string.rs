//! CHAR and VARCHAR columns.
//!
//! Input is converted to the column's character set, then cut to the
//! declared length in characters. Cutting anything but spaces raises
//! "Data truncated"; cutting trailing spaces from a VARCHAR only records a
//! note, and from a CHAR nothing at all, since CHAR drops them on read.
//!
//! ```text
//! CHAR(4) latin1     "ab"  -> 61 62 20 20
//! VARCHAR(4) latin1  "ab"  -> 02 61 62 00 00
//!                             └ length (1 byte while capacity <= 255)
//! ```

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::{self, trim_trailing_spaces, Charset, Collation};
use crate::config::SHORT_PREFIX_MAX;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldError, FieldResult};
use crate::parsing::{str_to_decimal, str_to_double, str_to_int};
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType, Temporal, TemporalKind};
use crate::wire::WireMetadata;

use super::{format_real, read_uint_le, write_uint_le, FieldCodec, TextSink};

/// Width of the length prefix for a capacity of `max_bytes`.
pub(crate) fn length_prefix(max_bytes: usize) -> usize {
    if max_bytes as u32 > SHORT_PREFIX_MAX {
        2
    } else {
        1
    }
}

/// Converts `src` into `to` and cuts it to `max_chars` characters and
/// `max_bytes` bytes, recording conditions.
///
/// `spaces_note` selects whether cutting only spaces records a note.
pub(crate) fn prepare_text(
    src: &[u8],
    from: Charset,
    to: Charset,
    max_chars: usize,
    max_bytes: usize,
    spaces_note: bool,
    scope: &mut StoreScope<'_>,
) -> (Vec<u8>, StoreStatus) {
    let mut text = Vec::with_capacity(src.len().min(max_bytes.saturating_mul(2)));
    let conversion = charset::convert(src, from, to, &mut text);
    let mut status = StoreStatus::Exact;
    if let Some(bad) = conversion.invalid_at {
        status = scope.invalid_string(from.name(), &src[bad..]);
        if status.is_fatal() {
            return (text, status);
        }
    } else if conversion.replaced {
        status = scope.invalid_string(from.name(), src);
        if status.is_fatal() {
            return (text, status);
        }
    }

    let by_chars = to.char_prefix_len(&text, max_chars);
    let mut keep = by_chars.min(max_bytes);
    if keep < by_chars {
        keep = to.well_formed_len(&text[..keep]);
    }
    if keep < text.len() {
        let cut = &text[keep..];
        if cut.iter().all(|&b| b == b' ') {
            if spaces_note && scope.config().truncation_notes {
                scope.note_truncated();
            }
        } else {
            status = status.merge(scope.data_truncated());
        }
        text.truncate(keep);
    }
    (text, status)
}

/// Text form of a typed value, as a string column stores it.
fn int_text(value: i128) -> String {
    value.to_string()
}

fn temporal_text(value: &Temporal) -> String {
    value.format(if value.micros == 0 { 0 } else { 6 })
}

fn parse_int(text: &[u8]) -> i128 {
    str_to_int(text).value
}

fn parse_real(text: &[u8]) -> f64 {
    str_to_double(text).value
}

fn parse_decimal(text: &[u8]) -> Decimal {
    str_to_decimal(text).value
}

fn parse_temporal(text: &[u8], kind: TemporalKind) -> Option<Temporal> {
    Temporal::parse(text, kind).map(|p| p.value)
}

// ----------------------------------------------------------------------
// CHAR
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharCodec {
    length: usize,
    byte_len: usize,
    collation: Collation,
}

impl CharCodec {
    /// `byte_len` overrides `length * mbmaxlen`, for columns rebuilt from
    /// wire metadata.
    pub fn new(length: usize, collation: Collation, byte_len: Option<usize>) -> Self {
        let byte_len = byte_len.unwrap_or(length * collation.charset().mbmaxlen());
        Self {
            length,
            byte_len,
            collation,
        }
    }

    pub fn char_length(&self) -> usize {
        self.length
    }

    fn charset(&self) -> Charset {
        self.collation.charset()
    }

    fn raw<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        &row.as_bytes()[at..at + self.byte_len]
    }

    /// Stored bytes with the padding removed.
    fn value<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        let raw = self.raw(row, at);
        match self.charset() {
            Charset::Binary => raw,
            _ => trim_trailing_spaces(raw),
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, text: &[u8]) {
        let dst = &mut row.as_bytes_mut()[at..at + self.byte_len];
        dst[..text.len()].copy_from_slice(text);
        dst[text.len()..].fill(self.charset().pad_byte());
    }

    fn store_text(&self, row: &mut RowBuffer, at: usize, text: &str, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_str(row, at, text.as_bytes(), Charset::Latin1, scope)
    }
}

impl FieldCodec for CharCodec {
    fn field_type(&self) -> FieldType {
        FieldType::String
    }

    fn pack_length(&self) -> usize {
        self.byte_len
    }

    fn max_display_length(&self) -> u32 {
        self.byte_len as u32
    }

    fn binary_comparable(&self) -> bool {
        self.collation.is_byte_ordered()
    }

    fn collation(&self) -> Collation {
        self.collation
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let (text, status) = prepare_text(src, cs, self.charset(), self.length, self.byte_len, false, scope);
        self.write(row, at, &text);
        status
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &format_real(value), scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &int_text(value), scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &value.to_string(), scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &temporal_text(value), scope)
    }

    fn reset(&self, row: &mut RowBuffer, at: usize) {
        self.write(row, at, &[]);
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        parse_int(self.value(row, at))
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        parse_real(self.value(row, at))
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        out.put(self.value(row, at));
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        parse_decimal(self.value(row, at))
    }

    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        parse_temporal(self.value(row, at), kind)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        if self.charset() == Charset::Binary {
            return self.raw(a, at).cmp(self.raw(b, at));
        }
        self.collation.compare(self.value(a, at), self.value(b, at))
    }

    fn sort_length(&self) -> usize {
        self.collation.weight_len(self.byte_len)
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let src = if self.charset() == Charset::Binary {
            self.raw(row, at)
        } else {
            self.value(row, at)
        };
        self.collation.make_weight_string(src, out, key_len);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        let raw = self.raw(row, at);
        let pad = self.charset().pad_byte();
        let end = raw.iter().rposition(|&b| b != pad).map_or(0, |p| p + 1);
        let prefix = length_prefix(self.byte_len);
        out.extend_from_slice(&(end as u16).to_le_bytes()[..prefix]);
        out.extend_from_slice(&raw[..end]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        let prefix = length_prefix(self.byte_len);
        require("char", src, prefix)?;
        let len = read_uint_le(&src[..prefix]) as usize;
        if len > self.byte_len {
            return Err(FieldError::malformed(
                "char",
                format!("length {len} exceeds capacity {}", self.byte_len),
            ));
        }
        require("char", src, prefix + len)?;
        let text = src[prefix..prefix + len].to_vec();
        self.write(row, at, &text);
        Ok(prefix + len)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::String, &(self.byte_len as u16).to_le_bytes())
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        smallvec![Feature::FixedString]
    }
}

// ----------------------------------------------------------------------
// VARCHAR
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarcharCodec {
    length: usize,
    max_bytes: usize,
    prefix: usize,
    collation: Collation,
}

impl VarcharCodec {
    pub fn new(length: usize, collation: Collation, max_bytes: Option<usize>) -> Self {
        let max_bytes = max_bytes.unwrap_or(length * collation.charset().mbmaxlen());
        Self {
            length,
            max_bytes,
            prefix: length_prefix(max_bytes),
            collation,
        }
    }

    pub fn char_length(&self) -> usize {
        self.length
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn charset(&self) -> Charset {
        self.collation.charset()
    }

    fn value<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        let b = row.as_bytes();
        let len = (read_uint_le(&b[at..at + self.prefix]) as usize).min(self.max_bytes);
        &b[at + self.prefix..at + self.prefix + len]
    }

    fn write(&self, row: &mut RowBuffer, at: usize, text: &[u8]) {
        let dst = &mut row.as_bytes_mut()[at..at + self.prefix + self.max_bytes];
        write_uint_le(text.len() as u64, &mut dst[..self.prefix]);
        dst[self.prefix..self.prefix + text.len()].copy_from_slice(text);
        dst[self.prefix + text.len()..].fill(0);
    }

    fn store_text(&self, row: &mut RowBuffer, at: usize, text: &str, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_str(row, at, text.as_bytes(), Charset::Latin1, scope)
    }
}

impl FieldCodec for VarcharCodec {
    fn field_type(&self) -> FieldType {
        FieldType::Varchar
    }

    fn pack_length(&self) -> usize {
        self.prefix + self.max_bytes
    }

    fn max_display_length(&self) -> u32 {
        self.max_bytes as u32
    }

    fn binary_comparable(&self) -> bool {
        false
    }

    fn collation(&self) -> Collation {
        self.collation
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let (text, status) = prepare_text(src, cs, self.charset(), self.length, self.max_bytes, true, scope);
        self.write(row, at, &text);
        status
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &format_real(value), scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &int_text(value), scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &value.to_string(), scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &temporal_text(value), scope)
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        parse_int(self.value(row, at))
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        parse_real(self.value(row, at))
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        out.put(self.value(row, at));
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        parse_decimal(self.value(row, at))
    }

    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        parse_temporal(self.value(row, at), kind)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.collation.compare(self.value(a, at), self.value(b, at))
    }

    fn sort_length(&self) -> usize {
        self.collation.weight_len(self.max_bytes)
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        self.collation.make_weight_string(self.value(row, at), out, key_len);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        let value = self.value(row, at);
        out.extend_from_slice(&(value.len() as u16).to_le_bytes()[..self.prefix]);
        out.extend_from_slice(value);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        require("varchar", src, self.prefix)?;
        let len = read_uint_le(&src[..self.prefix]) as usize;
        if len > self.max_bytes {
            return Err(FieldError::malformed(
                "varchar",
                format!("length {len} exceeds capacity {}", self.max_bytes),
            ));
        }
        require("varchar", src, self.prefix + len)?;
        let text = src[self.prefix..self.prefix + len].to_vec();
        self.write(row, at, &text);
        Ok(self.prefix + len)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::Varchar, &(self.max_bytes as u16).to_le_bytes())
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        smallvec![Feature::VarString]
    }
}
