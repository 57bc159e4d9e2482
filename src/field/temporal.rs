//! Temporal columns in both storage generations.
//!
//! | Type | Kind | In-row bytes | Binary comparable |
//! |------|------|--------------|-------------------|
//! | DATE | date | 3 LE | no |
//! | TIME (legacy) | time | 3 LE | no |
//! | DATETIME (legacy) | datetime | 8 LE | no |
//! | TIMESTAMP (legacy) | datetime | 4 LE seconds | no |
//! | TIME(fsp) | time | 3 + frac | yes |
//! | DATETIME(fsp) | datetime | 5 + frac | yes |
//! | TIMESTAMP(fsp) | datetime | 4 + frac | yes |
//!
//! Sub-second digits beyond the column's precision are truncated with a
//! note; values outside the type's range store the zero value with a
//! warning.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use crate::charset::{self, Charset};
use crate::config::MAX_TIME_HOURS;
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldResult};
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{fraction_bytes, Decimal, FieldType, Temporal, TemporalKind};
use crate::wire::WireMetadata;

use super::{format_real, FieldCodec, TextSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalCodec {
    field_type: FieldType,
    fsp: u8,
}

impl TemporalCodec {
    /// `field_type` is one of the seven temporal tags; `fsp` is ignored for
    /// the legacy encodings and DATE.
    pub fn new(field_type: FieldType, fsp: u8) -> Self {
        let fsp = if field_type.is_fractional_temporal() { fsp } else { 0 };
        Self { field_type, fsp }
    }

    pub fn fsp(&self) -> u8 {
        self.fsp
    }

    pub fn kind(&self) -> TemporalKind {
        match self.field_type {
            FieldType::NewDate => TemporalKind::Date,
            FieldType::Time | FieldType::Time2 => TemporalKind::Time,
            _ => TemporalKind::DateTime,
        }
    }

    fn is_timestamp(&self) -> bool {
        matches!(self.field_type, FieldType::Timestamp | FieldType::Timestamp2)
    }

    fn type_name(&self) -> &'static str {
        self.field_type.name()
    }

    fn decode(&self, src: &[u8]) -> FieldResult<Temporal> {
        match self.field_type {
            FieldType::NewDate => Temporal::read_newdate(src),
            FieldType::Time => Temporal::read_time_legacy(src),
            FieldType::Datetime => Temporal::read_datetime_legacy(src),
            FieldType::Timestamp => {
                let secs = Temporal::read_timestamp_legacy(src)?;
                Ok(from_timestamp(secs, 0))
            }
            FieldType::Time2 => Temporal::read_time2(src, self.fsp),
            FieldType::Datetime2 => Temporal::read_datetime2(src, self.fsp),
            _ => {
                let (secs, micros) = Temporal::read_timestamp2(src, self.fsp)?;
                Ok(from_timestamp(secs, micros))
            }
        }
    }

    /// `value` must already be of this column's kind and range.
    fn encode(&self, value: &Temporal, out: &mut Vec<u8>) {
        match self.field_type {
            FieldType::NewDate => value.write_newdate(out),
            FieldType::Time => value.write_time_legacy(out),
            FieldType::Datetime => value.write_datetime_legacy(out),
            FieldType::Timestamp => {
                let secs = value.to_timestamp_seconds().unwrap_or(0) as u32;
                Temporal::write_timestamp_legacy(secs, out);
            }
            FieldType::Time2 => value.write_time2(self.fsp, out),
            FieldType::Datetime2 => value.write_datetime2(self.fsp, out),
            _ => {
                let secs = value.to_timestamp_seconds().unwrap_or(0) as u32;
                let micros = if secs == 0 { 0 } else { value.micros };
                Temporal::write_timestamp2(secs, micros, self.fsp, out);
            }
        }
    }

    fn raw<'r>(&self, row: &'r RowBuffer, at: usize) -> &'r [u8] {
        &row.as_bytes()[at..at + self.pack_length()]
    }

    fn read(&self, row: &RowBuffer, at: usize) -> Temporal {
        match self.decode(self.raw(row, at)) {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(error = ?err, column_type = self.type_name(), "corrupt temporal in record, reading zero");
                Temporal::zero(self.kind())
            }
        }
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: &Temporal) {
        let mut buf = Vec::with_capacity(8);
        self.encode(value, &mut buf);
        let n = self.pack_length();
        row.as_bytes_mut()[at..at + n].copy_from_slice(&buf[..n]);
    }

    fn store_zero(&self, row: &mut RowBuffer, at: usize) {
        self.write(row, at, &Temporal::zero(self.kind()));
    }

    /// Shows a rejected value in a condition message.
    fn reject(&self, row: &mut RowBuffer, at: usize, shown: &[u8], scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_zero(row, at);
        scope.wrong_value(self.type_name(), shown)
    }

    fn store_value(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let Some((mut t, dropped)) = value.to_kind(self.kind()) else {
            let shown = value.format(6);
            return self.reject(row, at, shown.as_bytes(), scope);
        };
        if !t.is_valid_date() {
            let shown = t.format(self.fsp);
            return self.reject(row, at, shown.as_bytes(), scope);
        }
        let mut status = StoreStatus::Exact;
        if t.kind == TemporalKind::Time && t.hour > MAX_TIME_HOURS {
            t = Temporal::time(t.negative, MAX_TIME_HOURS, 59, 59, 0);
            self.write(row, at, &t);
            return scope.out_of_range();
        }
        let (truncated, lost) = t.truncate_fraction(self.fsp);
        t = truncated;
        if self.is_timestamp() && t.to_timestamp_seconds().is_none() {
            self.store_zero(row, at);
            return scope.out_of_range();
        }
        if dropped || lost {
            scope.note_truncated();
            status = StoreStatus::Truncated;
        }
        self.write(row, at, &t);
        status
    }
}

fn from_timestamp(secs: u32, micros: u32) -> Temporal {
    if secs == 0 {
        return Temporal::zero(TemporalKind::DateTime);
    }
    Temporal::from_epoch_seconds(i64::from(secs), micros)
}

/// Order-preserving bytes for the legacy encodings.
fn legacy_sort_key(value: &Temporal, field_type: FieldType, out: &mut Vec<u8>) {
    match field_type {
        FieldType::NewDate => {
            let v = u32::from(value.day) | (u32::from(value.month) << 5) | (u32::from(value.year) << 9);
            out.extend_from_slice(&v.to_be_bytes()[1..]);
        }
        FieldType::Time => value.write_time2(0, out),
        FieldType::Datetime => value.write_datetime2(0, out),
        _ => {
            let secs = value.to_timestamp_seconds().unwrap_or(0) as u32;
            out.extend_from_slice(&secs.to_be_bytes());
        }
    }
}

impl FieldCodec for TemporalCodec {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn pack_length(&self) -> usize {
        let fb = fraction_bytes(self.fsp);
        match self.field_type {
            FieldType::NewDate | FieldType::Time => 3,
            FieldType::Datetime => 8,
            FieldType::Timestamp => 4,
            FieldType::Time2 => 3 + fb,
            FieldType::Datetime2 => 5 + fb,
            _ => 4 + fb,
        }
    }

    fn max_display_length(&self) -> u32 {
        let base = match self.kind() {
            TemporalKind::Date => 10,
            TemporalKind::Time => 10,
            TemporalKind::DateTime => 19,
        };
        base + if self.fsp > 0 { 1 + u32::from(self.fsp) } else { 0 }
    }

    fn temporal_kind(&self) -> Option<TemporalKind> {
        Some(self.kind())
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let mut text = Vec::with_capacity(src.len());
        charset::convert(src, cs, Charset::Latin1, &mut text);
        let Some(parsed) = Temporal::parse(&text, self.kind()) else {
            return self.reject(row, at, &text, scope);
        };
        let rest = &text[parsed.end..];
        let mut status = StoreStatus::Exact;
        if !rest.iter().all(u8::is_ascii_whitespace) {
            status = scope.data_truncated();
            if status.is_fatal() {
                self.store_zero(row, at);
                return status;
            }
        }
        if parsed.clamped {
            let stored = self.store_value(row, at, &parsed.value, scope);
            if stored.is_fatal() {
                return stored;
            }
            return status.merge(stored).merge(scope.out_of_range());
        }
        if parsed.extra_digits {
            scope.note_truncated();
            status = status.merge(StoreStatus::Truncated);
        }
        status.merge(self.store_value(row, at, &parsed.value, scope))
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        match Decimal::from_f64(value) {
            Some(d) => self.store_decimal(row, at, &d, scope),
            None => self.reject(row, at, format_real(value).as_bytes(), scope),
        }
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_number(row, at, value, 0, false, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let (int, micros, lost) = value.int_and_micros();
        let micros = if value.is_negative() && self.kind() != TemporalKind::Time {
            0
        } else {
            micros
        };
        self.store_number(row, at, int, micros, lost, scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_value(row, at, value, scope)
    }

    fn reset(&self, row: &mut RowBuffer, at: usize) {
        self.store_zero(row, at);
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        i128::from(self.read(row, at).to_number())
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at).to_decimal(self.fsp).to_f64()
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        out.put(self.read(row, at).format(self.fsp).as_bytes());
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        self.read(row, at).to_decimal(self.fsp)
    }

    fn val_temporal(&self, row: &RowBuffer, at: usize, kind: TemporalKind) -> Option<Temporal> {
        self.read(row, at).to_kind(kind).map(|(t, _)| t)
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        if self.field_type.is_fractional_temporal() {
            return self.raw(a, at).cmp(self.raw(b, at));
        }
        self.read(a, at).cmp(&self.read(b, at))
    }

    fn sort_length(&self) -> usize {
        match self.field_type {
            FieldType::NewDate | FieldType::Time => 3,
            FieldType::Datetime => 5,
            FieldType::Timestamp => 4,
            _ => self.pack_length(),
        }
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let start = out.len();
        if self.field_type.is_fractional_temporal() {
            out.extend_from_slice(self.raw(row, at));
        } else {
            legacy_sort_key(&self.read(row, at), self.field_type, out);
        }
        out.truncate(start + key_len);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(self.raw(row, at));
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        let n = self.pack_length();
        require(self.type_name(), src, n)?;
        self.decode(&src[..n])?;
        row.as_bytes_mut()[at..at + n].copy_from_slice(&src[..n]);
        Ok(n)
    }

    fn wire_metadata(&self) -> WireMetadata {
        if self.field_type.is_fractional_temporal() {
            WireMetadata::new(self.field_type, &[self.fsp])
        } else {
            WireMetadata::new(self.field_type, &[])
        }
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        if self.field_type.is_legacy_temporal() {
            smallvec![Feature::LegacyTemporal]
        } else if self.field_type.is_fractional_temporal() {
            smallvec![Feature::FractionalTemporal]
        } else {
            SmallVec::new()
        }
    }
}

impl TemporalCodec {
    fn store_number(
        &self,
        row: &mut RowBuffer,
        at: usize,
        int: i128,
        micros: u32,
        lost: bool,
        scope: &mut StoreScope<'_>,
    ) -> StoreStatus {
        let Some((t, clamped)) = Temporal::from_number(int, micros, self.kind()) else {
            return self.reject(row, at, int.to_string().as_bytes(), scope);
        };
        if clamped && self.kind() == TemporalKind::Time {
            self.write(row, at, &t);
            return scope.out_of_range();
        }
        let mut status = self.store_value(row, at, &t, scope);
        if (lost || clamped) && !status.is_fatal() {
            if status.is_exact() {
                scope.note_truncated();
            }
            status = status.merge(StoreStatus::Truncated);
        }
        status
    }
}
