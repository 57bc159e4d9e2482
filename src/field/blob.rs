//! TINYBLOB, BLOB, MEDIUMBLOB and LONGBLOB (and their TEXT flavours).
//!
//! The record holds a `packlength`-byte length and a [`BlobHandle`]; the
//! bytes live in the row's [`BlobHeap`]. An empty value never touches the
//! heap.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::{Charset, Collation};
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldError, FieldResult};
use crate::parsing::{str_to_decimal, str_to_double, str_to_int};
use crate::row::{BlobHandle, BlobHeap, RowBuffer};
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType, Temporal, TemporalKind};
use crate::wire::WireMetadata;

use super::string::prepare_text;
use super::{format_real, read_uint_le, write_uint_le, FieldCodec, TextSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobCodec {
    packlength: usize,
    collation: Collation,
}

impl BlobCodec {
    /// `packlength` is 1 (TINY), 2, 3 (MEDIUM) or 4 (LONG).
    pub fn new(packlength: u8, collation: Collation) -> Self {
        Self {
            packlength: usize::from(packlength.clamp(1, 4)),
            collation,
        }
    }

    pub fn packlength(&self) -> usize {
        self.packlength
    }

    /// Largest value in bytes.
    pub fn max_length(&self) -> usize {
        ((1u64 << (8 * self.packlength)) - 1) as usize
    }

    fn charset(&self) -> Charset {
        self.collation.charset()
    }

    fn length(&self, row: &RowBuffer, at: usize) -> usize {
        read_uint_le(&row.as_bytes()[at..at + self.packlength]) as usize
    }

    fn handle(&self, row: &RowBuffer, at: usize) -> BlobHandle {
        let start = at + self.packlength;
        BlobHandle::read(&row.as_bytes()[start..start + BlobHandle::SIZE])
    }

    /// The value bytes, or the dangling handle when the heap cannot resolve
    /// it.
    pub fn bytes<'r>(&self, row: &'r RowBuffer, at: usize) -> FieldResult<&'r [u8]> {
        let len = self.length(row, at);
        if len == 0 {
            return Ok(&[]);
        }
        let handle = self.handle(row, at);
        match row.blobs().get(handle) {
            Some(bytes) if bytes.len() >= len => Ok(&bytes[..len]),
            _ => Err(FieldError::DanglingBlob {
                heap: handle.heap,
                slot: handle.slot,
            }),
        }
    }

    fn value<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        match self.bytes(row, at) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = ?err, "blob handle does not resolve in the row's heap, reading empty");
                &[]
            }
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: &[u8]) {
        let old = self.handle(row, at);
        let (data, heap) = row.parts_mut();
        // Owned slots survive empty values; the row reuses them.
        let handle = if value.is_empty() && !heap.owns(old) {
            BlobHandle::NONE
        } else {
            heap.replace(old, value)
        };
        write_uint_le(value.len() as u64, &mut data[at..at + self.packlength]);
        handle.write(&mut data[at + self.packlength..at + self.packlength + BlobHandle::SIZE]);
    }

    fn store_text(&self, row: &mut RowBuffer, at: usize, text: &str, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_str(row, at, text.as_bytes(), Charset::Latin1, scope)
    }
}

impl FieldCodec for BlobCodec {
    fn field_type(&self) -> FieldType {
        FieldType::Blob
    }

    fn pack_length(&self) -> usize {
        self.packlength + BlobHandle::SIZE
    }

    fn max_display_length(&self) -> u32 {
        self.max_length().min(u32::MAX as usize) as u32
    }

    fn binary_comparable(&self) -> bool {
        false
    }

    fn collation(&self) -> Collation {
        self.collation
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let max = self.max_length();
        let (text, status) = prepare_text(src, cs, self.charset(), max, max, true, scope);
        self.write(row, at, &text);
        status
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &format_real(value), scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &value.to_string(), scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_text(row, at, &value.to_string(), scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let text = value.format(if value.micros == 0 { 0 } else { 6 });
        self.store_text(row, at, &text, scope)
    }

    fn reset(&self, row: &mut RowBuffer, at: usize) {
        self.write(row, at, &[]);
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        str_to_int(self.value(row, at)).value
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        str_to_double(self.value(row, at)).value
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        out.put(self.value(row, at));
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        str_to_decimal(self.value(row, at)).value
    }

    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        Temporal::parse(self.value(row, at), kind).map(|p| p.value)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.collation.compare(self.value(a, at), self.value(b, at))
    }

    fn sort_length(&self) -> usize {
        self.collation.weight_len(self.max_length())
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        self.collation.make_weight_string(self.value(row, at), out, key_len);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        let value = self.value(row, at);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes()[..self.packlength]);
        out.extend_from_slice(value);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        require("blob", src, self.packlength)?;
        let len = read_uint_le(&src[..self.packlength]) as usize;
        require("blob", src, self.packlength + len)?;
        self.write(row, at, &src[self.packlength..self.packlength + len]);
        Ok(self.packlength + len)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::Blob, &[self.packlength as u8])
    }

    fn rehome(&self, row: &mut RowBuffer, at: usize, source: &BlobHeap) {
        let len = self.length(row, at);
        if len == 0 {
            return;
        }
        let handle = self.handle(row, at);
        let (data, heap) = row.parts_mut();
        let new_handle = match source.get(handle) {
            Some(bytes) => heap.insert(&bytes[..len.min(bytes.len())]),
            None => {
                tracing::warn!(heap = handle.heap, slot = handle.slot, "dangling blob handle during row copy");
                write_uint_le(0, &mut data[at..at + self.packlength]);
                BlobHandle::NONE
            }
        };
        new_handle.write(&mut data[at + self.packlength..at + self.packlength + BlobHandle::SIZE]);
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        smallvec![Feature::Blob]
    }
}
