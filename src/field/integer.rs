//! Integer columns and YEAR.
//!
//! Integers are stored little-endian in their declared width, two's
//! complement when signed. Out-of-range input clamps to the nearest limit
//! and raises "Out of range value".

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::Charset;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldResult};
use crate::parsing::{check_edom_and_truncation, str_to_int, ConvStatus, WarnFilter};
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{capabilities, Decimal, FieldType, Temporal, TemporalKind};
use crate::wire::WireMetadata;

use super::{read_uint_le, write_uint_le, zero_fill, FieldCodec, TextSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerCodec {
    field_type: FieldType,
    width: usize,
    unsigned: bool,
    zerofill: bool,
    display_width: u32,
}

impl IntegerCodec {
    /// `field_type` must be one of the five integer tags.
    pub fn new(field_type: FieldType, unsigned: bool, zerofill: bool, display_width: Option<u32>) -> Self {
        let width = field_type.integer_width().unwrap_or(8);
        let unsigned = unsigned || zerofill;
        let default_width = capabilities(field_type).max_display_length
            - u32::from(unsigned && field_type != FieldType::LongLong);
        Self {
            field_type,
            width,
            unsigned,
            zerofill,
            display_width: display_width.unwrap_or(default_width),
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn min_value(&self) -> i128 {
        if self.unsigned {
            0
        } else {
            -(1i128 << (self.width * 8 - 1))
        }
    }

    pub fn max_value(&self) -> i128 {
        if self.unsigned {
            (1i128 << (self.width * 8)) - 1
        } else {
            (1i128 << (self.width * 8 - 1)) - 1
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: i128) {
        write_uint_le(value as u64, &mut row.as_bytes_mut()[at..at + self.width]);
    }

    fn read(&self, row: &RowBuffer, at: usize) -> i128 {
        let raw = read_uint_le(&row.as_bytes()[at..at + self.width]);
        if self.unsigned {
            return i128::from(raw);
        }
        let shift = 64 - self.width * 8;
        i128::from(((raw << shift) as i64) >> shift)
    }

    /// Clamps and writes; raises out-of-range on a clamp.
    fn store_clamped(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        let clamped = value.clamp(self.min_value(), self.max_value());
        self.write(row, at, clamped);
        if clamped != value {
            return scope.out_of_range();
        }
        StoreStatus::Exact
    }
}

impl FieldCodec for IntegerCodec {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn pack_length(&self) -> usize {
        self.width
    }

    fn max_display_length(&self) -> u32 {
        self.display_width
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let conv = str_to_int(src);
        let filter = WarnFilter::from_config(scope.config());
        if matches!(conv.status, ConvStatus::Edom | ConvStatus::Empty) {
            self.write(row, at, 0);
            return check_edom_and_truncation(&conv, src, cs, "integer", filter, scope);
        }
        let clamped = conv.value.clamp(self.min_value(), self.max_value());
        if conv.out_of_range || clamped != conv.value {
            self.write(row, at, clamped);
            return scope.out_of_range();
        }
        self.write(row, at, clamped);
        check_edom_and_truncation(&conv, src, cs, "integer", filter, scope)
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        if value.is_nan() {
            self.write(row, at, 0);
            return scope.out_of_range();
        }
        let rounded = value.round_ties_even();
        let min = self.min_value() as f64;
        let max = self.max_value() as f64;
        if rounded < min {
            self.write(row, at, self.min_value());
            return scope.out_of_range();
        }
        if rounded > max {
            self.write(row, at, self.max_value());
            return scope.out_of_range();
        }
        self.store_clamped(row, at, rounded as i128, scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_clamped(row, at, value, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let (v, saturated) = value.to_i128();
        let status = self.store_clamped(row, at, v, scope);
        if saturated && status.is_exact() {
            return scope.out_of_range();
        }
        status
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        self.read(row, at)
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at) as f64
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        let mut text = self.read(row, at).to_string().into_bytes();
        if self.zerofill {
            zero_fill(&mut text, self.display_width as usize);
        }
        out.put(&text);
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        Decimal::from_i128(self.read(row, at))
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.read(a, at).cmp(&self.read(b, at))
    }

    fn sort_length(&self) -> usize {
        self.width
    }

    /// Big-endian with the sign bit flipped for signed columns.
    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let mut be: Vec<u8> = row.as_bytes()[at..at + self.width].iter().rev().copied().collect();
        if !self.unsigned {
            be[0] ^= 0x80;
        }
        out.extend_from_slice(&be[..key_len.min(self.width)]);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&row.as_bytes()[at..at + self.width]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        require(self.field_type.name(), src, self.width)?;
        row.as_bytes_mut()[at..at + self.width].copy_from_slice(&src[..self.width]);
        Ok(self.width)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(self.field_type, &[u8::from(self.unsigned)])
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        if self.zerofill {
            smallvec![Feature::ZeroFill]
        } else {
            SmallVec::new()
        }
    }
}

/// YEAR: one byte, `0` for year 0000 else `year - 1900` (1901..=2155).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YearCodec;

impl YearCodec {
    fn read(row: &RowBuffer, at: usize) -> u16 {
        match row.as_bytes()[at] {
            0 => 0,
            b => 1900 + u16::from(b),
        }
    }

    fn write(row: &mut RowBuffer, at: usize, year: u16) {
        row.as_bytes_mut()[at] = if year == 0 { 0 } else { (year - 1900) as u8 };
    }

    /// Four-digit form of a number; two-digit numbers map 1-69 to 20xx and
    /// 70-99 to 19xx.
    fn normalize(value: i128) -> Option<u16> {
        match value {
            0 => Some(0),
            1..=69 => Some(2000 + value as u16),
            70..=99 => Some(1900 + value as u16),
            1901..=2155 => Some(value as u16),
            _ => None,
        }
    }

    fn store_year(row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        match Self::normalize(value) {
            Some(year) => {
                Self::write(row, at, year);
                StoreStatus::Exact
            }
            None => {
                Self::write(row, at, 0);
                scope.out_of_range()
            }
        }
    }
}

impl FieldCodec for YearCodec {
    fn field_type(&self) -> FieldType {
        FieldType::Year
    }

    fn pack_length(&self) -> usize {
        1
    }

    /// Unlike numbers, the strings `"0"` and `"00"` mean 2000.
    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let conv = str_to_int(src);
        let filter = WarnFilter::from_config(scope.config());
        if matches!(conv.status, ConvStatus::Edom | ConvStatus::Empty) {
            Self::write(row, at, 0);
            return check_edom_and_truncation(&conv, src, cs, "year", filter, scope);
        }
        let digits = src[..conv.end].iter().filter(|b| b.is_ascii_digit()).count();
        let value = if conv.value == 0 && digits <= 2 { 2000 } else { conv.value };
        let status = Self::store_year(row, at, value, scope);
        if !status.is_exact() {
            return status;
        }
        check_edom_and_truncation(&conv, src, cs, "year", filter, scope)
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        if value.is_nan() {
            Self::write(row, at, 0);
            return scope.out_of_range();
        }
        let rounded = value.round_ties_even().clamp(-1e6, 1e6);
        Self::store_year(row, at, rounded as i128, scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        Self::store_year(row, at, value, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        Self::store_year(row, at, value.to_i128().0, scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        if value.kind == TemporalKind::Time {
            Self::write(row, at, 0);
            return scope.out_of_range();
        }
        Self::store_year(row, at, i128::from(value.year), scope)
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        i128::from(Self::read(row, at))
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        f64::from(Self::read(row, at))
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        out.put(format!("{:04}", Self::read(row, at)).as_bytes());
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        Decimal::from_i128(self.val_int(row, at))
    }

    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        if kind == TemporalKind::Time {
            return None;
        }
        let mut t = Temporal::date(Self::read(row, at), 0, 0);
        t.kind = kind;
        Some(t)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        a.as_bytes()[at].cmp(&b.as_bytes()[at])
    }

    fn sort_length(&self) -> usize {
        1
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        out.extend_from_slice(&row.as_bytes()[at..at + key_len.min(1)]);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.push(row.as_bytes()[at]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        require("year", src, 1)?;
        row.as_bytes_mut()[at] = src[0];
        Ok(1)
    }

    fn wire_metadata(&self) -> WireMetadata {
        WireMetadata::new(FieldType::Year, &[])
    }
}
