//! DECIMAL(p, s) columns.
//!
//! Rounding to the column's scale records Note 1265; the store status is
//! still `Truncated`. Overflow clamps to `±max_for(p, s)` with "Out of
//! range value".

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::Charset;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldResult};
use crate::parsing::{check_edom_and_truncation, str_to_decimal, ConvStatus, WarnFilter};
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType, Fit};
use crate::wire::WireMetadata;

use super::{zero_fill, FieldCodec, TextSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalCodec {
    precision: u8,
    scale: u8,
    unsigned: bool,
    zerofill: bool,
    bin_size: usize,
}

impl DecimalCodec {
    pub fn new(precision: u8, scale: u8, unsigned: bool, zerofill: bool) -> Self {
        Self {
            precision,
            scale,
            unsigned: unsigned || zerofill,
            zerofill,
            bin_size: Decimal::binary_size(precision, scale),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    fn bytes<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        &row.as_bytes()[at..at + self.bin_size]
    }

    fn read(&self, row: &RowBuffer, at: usize) -> Decimal {
        match Decimal::read_binary(self.bytes(row, at), self.precision, self.scale) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(error = ?err, "corrupt decimal in record, reading zero");
                Decimal::zero()
            }
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: &Decimal) {
        let mut buf = Vec::with_capacity(self.bin_size);
        value.write_binary(self.precision, self.scale, &mut buf);
        row.as_bytes_mut()[at..at + self.bin_size].copy_from_slice(&buf);
    }
}

impl FieldCodec for DecimalCodec {
    fn field_type(&self) -> FieldType {
        FieldType::NewDecimal
    }

    fn pack_length(&self) -> usize {
        self.bin_size
    }

    fn max_display_length(&self) -> u32 {
        u32::from(self.precision)
            + u32::from(self.scale > 0)
            + u32::from(!self.unsigned)
            + u32::from(self.precision == self.scale)
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let conv = str_to_decimal(src);
        let filter = WarnFilter::from_config(scope.config());
        if matches!(conv.status, ConvStatus::Edom | ConvStatus::Empty) {
            self.write(row, at, &Decimal::zero());
            return check_edom_and_truncation(&conv, src, cs, "decimal", filter, scope);
        }
        let stored = self.store_decimal(row, at, &conv.value, scope);
        if stored.is_fatal() {
            return stored;
        }
        stored.merge(check_edom_and_truncation(&conv, src, cs, "decimal", filter, scope))
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        match Decimal::from_f64(value) {
            Some(d) => self.store_decimal(row, at, &d, scope),
            None => {
                let clamped = if value.is_nan() {
                    Decimal::zero()
                } else {
                    let max = Decimal::max_for(self.precision, self.scale);
                    if value < 0.0 && !self.unsigned {
                        max.neg()
                    } else if value < 0.0 {
                        Decimal::zero()
                    } else {
                        max
                    }
                };
                self.write(row, at, &clamped);
                scope.out_of_range()
            }
        }
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_decimal(row, at, &Decimal::from_i128(value), scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        if self.unsigned && value.is_negative() {
            self.write(row, at, &Decimal::zero());
            return scope.out_of_range();
        }
        let (fitted, fit) = value.fit(self.precision, self.scale);
        self.write(row, at, &fitted);
        match fit {
            Fit::Exact => StoreStatus::Exact,
            Fit::Rounded => {
                scope.note_truncated();
                StoreStatus::Truncated
            }
            Fit::Overflow => scope.out_of_range(),
        }
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        self.read(row, at).to_i128().0
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at).to_f64()
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        let mut text = self.read(row, at).to_string().into_bytes();
        if self.zerofill {
            zero_fill(&mut text, self.max_display_length() as usize);
        }
        out.put(&text);
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        self.read(row, at)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.bytes(a, at).cmp(self.bytes(b, at))
    }

    fn sort_length(&self) -> usize {
        self.bin_size
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        out.extend_from_slice(&self.bytes(row, at)[..key_len.min(self.bin_size)]);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(self.bytes(row, at));
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        require("decimal", src, self.bin_size)?;
        Decimal::read_binary(&src[..self.bin_size], self.precision, self.scale)?;
        row.as_bytes_mut()[at..at + self.bin_size].copy_from_slice(&src[..self.bin_size]);
        Ok(self.bin_size)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::NewDecimal, &[self.precision, self.scale])
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        let mut out = smallvec![Feature::Decimal];
        if self.zerofill {
            out.push(Feature::ZeroFill);
        }
        out
    }
}
