//! FLOAT and DOUBLE columns.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::Charset;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldError, FieldResult};
use crate::parsing::{check_edom_and_truncation, str_to_double, ConvStatus, WarnFilter};
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType};
use crate::wire::WireMetadata;

use super::{format_real, zero_fill, FieldCodec, TextSink};

#[derive(Debug, Clone, PartialEq)]
pub struct RealCodec {
    double: bool,
    unsigned: bool,
    zerofill: bool,
    /// Declared `(M, D)`; values are rounded to `D` places and limited to
    /// `M - D` integer digits.
    precision: Option<(u8, u8)>,
}

impl RealCodec {
    pub fn new(double: bool, unsigned: bool, zerofill: bool, precision: Option<(u8, u8)>) -> Self {
        Self {
            double,
            unsigned: unsigned || zerofill,
            zerofill,
            precision,
        }
    }

    pub fn is_double(&self) -> bool {
        self.double
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    fn width(&self) -> usize {
        if self.double {
            8
        } else {
            4
        }
    }

    fn read(&self, row: &RowBuffer, at: usize) -> f64 {
        let b = row.as_bytes();
        if self.double {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&b[at..at + 8]);
            f64::from_le_bytes(raw)
        } else {
            f64::from(f32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]]))
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: f64) {
        let value = if value == 0.0 { 0.0 } else { value };
        let out = row.as_bytes_mut();
        if self.double {
            out[at..at + 8].copy_from_slice(&value.to_le_bytes());
        } else {
            out[at..at + 4].copy_from_slice(&(value as f32).to_le_bytes());
        }
    }

    fn limit(&self) -> f64 {
        match self.precision {
            Some((m, d)) => 10f64.powi(i32::from(m - d)) - 10f64.powi(-i32::from(d)),
            None if self.double => f64::MAX,
            None => f64::from(f32::MAX),
        }
    }

    /// Applies rounding and range limits; the flag reports a clamp.
    fn truncate(&self, value: f64) -> (f64, bool) {
        if value.is_nan() {
            return (0.0, true);
        }
        if self.unsigned && value < 0.0 {
            return (0.0, true);
        }
        let mut v = value;
        if let Some((_, d)) = self.precision {
            let scale = 10f64.powi(i32::from(d));
            let scaled = (v * scale).round() / scale;
            if scaled.is_finite() {
                v = scaled;
            }
        }
        let limit = self.limit();
        if v > limit {
            return (limit, true);
        }
        if v < -limit {
            return (-limit, true);
        }
        (v, false)
    }

    fn render(&self, value: f64) -> String {
        match self.precision {
            Some((_, d)) => format!("{:.*}", usize::from(d), value),
            None if self.double => format_real(value),
            None => {
                let v = value as f32;
                if v != 0.0 && !(1e-4..1e15).contains(&v.abs()) {
                    format!("{v:e}")
                } else {
                    format!("{v}")
                }
            }
        }
    }

    /// Order-preserving bit pattern.
    fn sortable_bits(&self, value: f64) -> Vec<u8> {
        if self.double {
            let bits = value.to_bits();
            let key = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
            key.to_be_bytes().to_vec()
        } else {
            let bits = (value as f32).to_bits();
            let key = if bits >> 31 == 1 { !bits } else { bits ^ (1 << 31) };
            key.to_be_bytes().to_vec()
        }
    }
}

impl FieldCodec for RealCodec {
    fn field_type(&self) -> FieldType {
        if self.double {
            FieldType::Double
        } else {
            FieldType::Float
        }
    }

    fn pack_length(&self) -> usize {
        self.width()
    }

    fn max_display_length(&self) -> u32 {
        match self.precision {
            Some((m, d)) => u32::from(m) + u32::from(d > 0) + u32::from(!self.unsigned),
            None if self.double => 22,
            None => 12,
        }
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let conv = str_to_double(src);
        let filter = WarnFilter::from_config(scope.config());
        if matches!(conv.status, ConvStatus::Edom | ConvStatus::Empty) {
            self.write(row, at, 0.0);
            return check_edom_and_truncation(&conv, src, cs, "double", filter, scope);
        }
        let (v, clamped) = self.truncate(conv.value);
        self.write(row, at, v);
        if clamped || conv.out_of_range {
            return scope.out_of_range();
        }
        check_edom_and_truncation(&conv, src, cs, "double", filter, scope)
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        let (v, clamped) = self.truncate(value);
        self.write(row, at, v);
        if clamped {
            return scope.out_of_range();
        }
        StoreStatus::Exact
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_real(row, at, value as f64, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_real(row, at, value.to_f64(), scope)
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        let v = self.read(row, at).round_ties_even();
        v.clamp(i64::MIN as f64, u64::MAX as f64) as i128
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at)
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        let mut text = self.render(self.read(row, at)).into_bytes();
        if self.zerofill {
            zero_fill(&mut text, self.max_display_length() as usize);
        }
        out.put(&text);
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        let text = self.render(self.read(row, at));
        Decimal::parse(&text).unwrap_or_default()
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.read(a, at).total_cmp(&self.read(b, at))
    }

    fn sort_length(&self) -> usize {
        self.width()
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let key = self.sortable_bits(self.read(row, at));
        out.extend_from_slice(&key[..key_len.min(key.len())]);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&row.as_bytes()[at..at + self.width()]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        let n = self.width();
        let name = self.field_type().name();
        require(name, src, n)?;
        let value = if self.double {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&src[..8]);
            f64::from_le_bytes(raw)
        } else {
            f64::from(f32::from_le_bytes([src[0], src[1], src[2], src[3]]))
        };
        if value.is_nan() {
            return Err(FieldError::malformed(name, "NaN"));
        }
        row.as_bytes_mut()[at..at + n].copy_from_slice(&src[..n]);
        Ok(n)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(self.field_type(), &[self.width() as u8])
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        if self.zerofill {
            smallvec![Feature::ZeroFill]
        } else {
            SmallVec::new()
        }
    }
}
