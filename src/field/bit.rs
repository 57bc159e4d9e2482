//! BIT(M) columns.
//!
//! The `M / 8` whole bytes are stored big-endian in the record; the
//! `M % 8` most significant bits live in the null region, right after the
//! column's null bit:
//!
//! ```text
//! BIT(10) value 0b11_0000_0101
//!
//!   null region:  ..[n][1 1]..        2 uneven bits
//!   record:       [0000_0101]         1 whole byte
//! ```
//!
//! Without an uneven-bit slot the leftover bits take one more record byte.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::Charset;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldError, FieldResult};
use crate::row::{RowBuffer, UnevenBits};
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType, Temporal};
use crate::wire::WireMetadata;

use super::{FieldCodec, TextSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitCodec {
    bits: u8,
    /// Record bytes.
    bytes: usize,
    uneven: Option<UnevenBits>,
}

impl BitCodec {
    pub fn new(bits: u8, uneven: Option<UnevenBits>) -> Self {
        let bits = bits.clamp(1, 64);
        let uneven = uneven.filter(|u| u.len == bits % 8 && u.len > 0);
        let bytes = match uneven {
            Some(_) => usize::from(bits / 8),
            None => usize::from(bits).div_ceil(8),
        };
        Self { bits, bytes, uneven }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn uneven(&self) -> Option<UnevenBits> {
        self.uneven
    }

    fn max_value(&self) -> u64 {
        if self.bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    fn read(&self, row: &RowBuffer, at: usize) -> u64 {
        let b = row.as_bytes();
        let mut value = 0u64;
        if let Some(u) = self.uneven {
            value = u64::from(u.get(b));
        }
        for &byte in &b[at..at + self.bytes] {
            value = (value << 8) | u64::from(byte);
        }
        value
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: u64) {
        let b = row.as_bytes_mut();
        let be = value.to_be_bytes();
        b[at..at + self.bytes].copy_from_slice(&be[8 - self.bytes..]);
        if let Some(u) = self.uneven {
            let high = if self.bytes == 8 { 0 } else { value >> (8 * self.bytes) };
            u.set(b, high as u8);
        }
    }

    fn store_value(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        if value < 0 || value > i128::from(self.max_value()) {
            let clamped = if value < 0 { 0 } else { self.max_value() };
            self.write(row, at, clamped);
            return scope.out_of_range();
        }
        self.write(row, at, value as u64);
        StoreStatus::Exact
    }

    /// Minimal big-endian bytes holding `bits` bits.
    fn value_bytes(&self) -> usize {
        usize::from(self.bits).div_ceil(8)
    }
}

impl FieldCodec for BitCodec {
    fn field_type(&self) -> FieldType {
        FieldType::Bit
    }

    fn pack_length(&self) -> usize {
        self.bytes
    }

    fn max_display_length(&self) -> u32 {
        u32::from(self.bits)
    }

    /// The input is taken as raw big-endian bytes.
    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], _cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let lead = src.iter().take_while(|&&b| b == 0).count();
        let digits = &src[lead..];
        if digits.len() > 8 {
            self.write(row, at, self.max_value());
            return scope.out_of_range();
        }
        let value = digits.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        self.store_value(row, at, i128::from(value), scope)
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        let rounded = if value.is_nan() { -1.0 } else { value.round() };
        self.store_value(row, at, rounded.clamp(-1.0, 2f64.powi(65)) as i128, scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_value(row, at, value, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_value(row, at, value.to_i128().0, scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_value(row, at, i128::from(value.to_number()), scope)
    }

    fn reset(&self, row: &mut RowBuffer, at: usize) {
        self.write(row, at, 0);
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        i128::from(self.read(row, at))
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at) as f64
    }

    /// Big-endian bytes, `ceil(M / 8)` of them.
    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        let be = self.read(row, at).to_be_bytes();
        out.put(&be[8 - self.value_bytes()..]);
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        Decimal::from_u64(self.read(row, at))
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.read(a, at).cmp(&self.read(b, at))
    }

    fn sort_length(&self) -> usize {
        self.value_bytes()
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let be = self.read(row, at).to_be_bytes();
        let key = &be[8 - self.value_bytes()..];
        out.extend_from_slice(&key[..key_len.min(key.len())]);
    }

    /// Leftover bits first (one byte, when `M % 8 != 0`), then the whole
    /// bytes.
    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        let be = self.read(row, at).to_be_bytes();
        out.extend_from_slice(&be[8 - self.value_bytes()..]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        let n = self.value_bytes();
        require("bit", src, n)?;
        let value = src[..n].iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        if value > self.max_value() {
            return Err(FieldError::malformed(
                "bit",
                format!("value needs more than {} bits", self.bits),
            ));
        }
        self.write(row, at, value);
        Ok(n)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::Bit, &[self.bits / 8, self.bits % 8])
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        match self.uneven {
            Some(_) => smallvec![Feature::UnevenBit],
            None => SmallVec::new(),
        }
    }
}
