//! ENUM and SET columns.
//!
//! An ENUM stores the 1-based index of its label (0 is the invalid-value
//! marker, read as the empty string) in 1 or 2 bytes. A SET stores a
//! bitmask over its members in 1, 2, 3, 4 or 8 bytes. Both compare by
//! the stored number, so values order by declaration position.

use std::cmp::Ordering;
use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::{smallvec, SmallVec};

use crate::charset::{self, Charset, Collation};
use crate::diagnostics::{StoreScope, StoreStatus};
use crate::error::{require, FieldError, FieldResult};
use crate::parsing::str_to_int;
use crate::row::RowBuffer;
use crate::telemetry::Feature;
use crate::types::{Decimal, FieldType, Temporal};
use crate::wire::WireMetadata;

use super::{read_uint_le, write_uint_le, FieldCodec, TextSink};

/// Storage bytes for a SET of `members` members.
pub(crate) fn set_width(members: usize) -> usize {
    match members.div_ceil(8) {
        0 | 1 => 1,
        n @ 2..=4 => n,
        _ => 8,
    }
}

/// Storage bytes for an ENUM of `labels` labels.
pub(crate) fn enum_width(labels: usize) -> usize {
    if labels < 256 {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone)]
pub struct TypelibCodec {
    set: bool,
    labels: Arc<[String]>,
    lookup: Arc<HashMap<Vec<u8>, usize>>,
    width: usize,
    collation: Collation,
}

impl TypelibCodec {
    /// Labels are given in declaration order; duplicates (under the
    /// collation) are rejected by the layout builder.
    pub fn new(set: bool, labels: Vec<String>, collation: Collation) -> Self {
        let lookup = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (collation.fold_key(&to_column_charset(label, collation)), i))
            .collect();
        let width = if set {
            set_width(labels.len())
        } else {
            enum_width(labels.len())
        };
        Self {
            set,
            labels: labels.into(),
            lookup: Arc::new(lookup),
            width,
            collation,
        }
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn count(&self) -> usize {
        self.labels.len()
    }

    /// Largest valid stored number.
    fn max_value(&self) -> u64 {
        if self.set {
            if self.count() >= 64 {
                u64::MAX
            } else {
                (1u64 << self.count()) - 1
            }
        } else {
            self.count() as u64
        }
    }

    fn read(&self, row: &RowBuffer, at: usize) -> u64 {
        read_uint_le(&row.as_bytes()[at..at + self.width])
    }

    fn write(&self, row: &mut RowBuffer, at: usize, value: u64) {
        write_uint_le(value, &mut row.as_bytes_mut()[at..at + self.width]);
    }

    fn find(&self, text: &[u8]) -> Option<usize> {
        self.lookup.get(&self.collation.fold_key(text)).copied()
    }

    fn store_number(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        if value < 0 || value > i128::from(self.max_value()) {
            let fallback = if self.set && value > 0 {
                self.max_value() & value as u64
            } else {
                0
            };
            self.write(row, at, fallback);
            return scope.data_truncated();
        }
        self.write(row, at, value as u64);
        StoreStatus::Exact
    }

    fn store_enum_text(&self, row: &mut RowBuffer, at: usize, text: &[u8], scope: &mut StoreScope<'_>) -> StoreStatus {
        if let Some(i) = self.find(text) {
            self.write(row, at, i as u64 + 1);
            return StoreStatus::Exact;
        }
        if let Some(n) = numeric(text) {
            if (1..=self.count() as i128).contains(&n) {
                self.write(row, at, n as u64);
                return StoreStatus::Exact;
            }
        }
        self.write(row, at, 0);
        scope.data_truncated()
    }

    fn store_set_text(&self, row: &mut RowBuffer, at: usize, text: &[u8], scope: &mut StoreScope<'_>) -> StoreStatus {
        if let Some(n) = numeric(text) {
            return self.store_number(row, at, n, scope);
        }
        let mut mask = 0u64;
        let mut unknown = false;
        let trimmed = charset::trim_trailing_spaces(text);
        if !trimmed.is_empty() {
            for part in trimmed.split(|&b| b == b',') {
                match self.find(part) {
                    Some(i) => mask |= 1 << i,
                    None => unknown = true,
                }
            }
        }
        self.write(row, at, mask);
        if unknown {
            return scope.data_truncated();
        }
        StoreStatus::Exact
    }

    fn render(&self, value: u64, out: &mut dyn TextSink) {
        if !self.set {
            if let Some(label) = (value as usize).checked_sub(1).and_then(|i| self.labels.get(i)) {
                out.put(&to_column_charset(label, self.collation));
            }
            return;
        }
        let mut first = true;
        for (i, label) in self.labels.iter().enumerate() {
            if value & (1 << i) != 0 {
                if !first {
                    out.put(b",");
                }
                out.put(&to_column_charset(label, self.collation));
                first = false;
            }
        }
    }
}

/// Labels are declared as UTF-8 and compared in the column's charset.
fn to_column_charset(label: &str, collation: Collation) -> Vec<u8> {
    let mut out = Vec::with_capacity(label.len());
    charset::convert(label.as_bytes(), Charset::Utf8mb4, collation.charset(), &mut out);
    out
}

/// The whole text as an integer, if it is one.
fn numeric(text: &[u8]) -> Option<i128> {
    let conv = str_to_int(text);
    let rest = conv.trailing(text);
    let whole = rest.iter().all(u8::is_ascii_whitespace);
    let integral = !text[..conv.end].iter().any(|&b| matches!(b, b'.' | b'e' | b'E'));
    (conv.status == crate::parsing::ConvStatus::Ok && whole && integral).then_some(conv.value)
}

impl PartialEq for TypelibCodec {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set && self.labels == other.labels && self.collation == other.collation
    }
}

impl Eq for TypelibCodec {}

impl FieldCodec for TypelibCodec {
    fn field_type(&self) -> FieldType {
        if self.set {
            FieldType::Set
        } else {
            FieldType::Enum
        }
    }

    fn pack_length(&self) -> usize {
        self.width
    }

    fn max_display_length(&self) -> u32 {
        let chars = |l: &String| l.chars().count();
        if self.set {
            let total: usize = self.labels.iter().map(chars).sum();
            (total + self.count().saturating_sub(1)) as u32
        } else {
            self.labels.iter().map(chars).max().unwrap_or(0) as u32
        }
    }

    fn collation(&self) -> Collation {
        self.collation
    }

    fn store_str(&self, row: &mut RowBuffer, at: usize, src: &[u8], cs: Charset, scope: &mut StoreScope<'_>) -> StoreStatus {
        let mut text = Vec::with_capacity(src.len());
        let conversion = charset::convert(src, cs, self.collation.charset(), &mut text);
        if let Some(bad) = conversion.invalid_at {
            let status = scope.invalid_string(cs.name(), &src[bad..]);
            if status.is_fatal() {
                self.write(row, at, 0);
                return status;
            }
        }
        if self.set {
            self.store_set_text(row, at, &text, scope)
        } else {
            self.store_enum_text(row, at, &text, scope)
        }
    }

    fn store_real(&self, row: &mut RowBuffer, at: usize, value: f64, scope: &mut StoreScope<'_>) -> StoreStatus {
        let rounded = if value.is_finite() { value.round() } else { -1.0 };
        self.store_number(row, at, rounded.clamp(-1.0, u64::MAX as f64) as i128, scope)
    }

    fn store_int(&self, row: &mut RowBuffer, at: usize, value: i128, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_number(row, at, value, scope)
    }

    fn store_decimal(&self, row: &mut RowBuffer, at: usize, value: &Decimal, scope: &mut StoreScope<'_>) -> StoreStatus {
        self.store_number(row, at, value.to_i128().0, scope)
    }

    fn store_temporal(&self, row: &mut RowBuffer, at: usize, value: &Temporal, scope: &mut StoreScope<'_>) -> StoreStatus {
        let text = value.format(if value.micros == 0 { 0 } else { 6 });
        self.store_str(row, at, text.as_bytes(), Charset::Latin1, scope)
    }

    fn val_int(&self, row: &RowBuffer, at: usize) -> i128 {
        i128::from(self.read(row, at))
    }

    fn val_real(&self, row: &RowBuffer, at: usize) -> f64 {
        self.read(row, at) as f64
    }

    fn val_str(&self, row: &RowBuffer, at: usize, out: &mut dyn TextSink) {
        self.render(self.read(row, at), out);
    }

    fn val_decimal(&self, row: &RowBuffer, at: usize) -> Decimal {
        Decimal::from_u64(self.read(row, at))
    }

    fn cmp(&self, a: &RowBuffer, b: &RowBuffer, at: usize) -> Ordering {
        self.read(a, at).cmp(&self.read(b, at))
    }

    fn sort_length(&self) -> usize {
        self.width
    }

    fn make_sort_key(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>, key_len: usize) {
        let be = self.read(row, at).to_be_bytes();
        let key = &be[8 - self.width..];
        out.extend_from_slice(&key[..key_len.min(self.width)]);
    }

    fn pack(&self, row: &RowBuffer, at: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&row.as_bytes()[at..at + self.width]);
    }

    fn unpack(&self, row: &mut RowBuffer, at: usize, src: &[u8]) -> FieldResult<usize> {
        let name = self.field_type().name();
        require(name, src, self.width)?;
        let value = read_uint_le(&src[..self.width]);
        if value > self.max_value() {
            return Err(FieldError::malformed(
                name,
                format!("value {value} outside {} members", self.count()),
            ));
        }
        self.write(row, at, value);
        Ok(self.width)
    }

    fn wire_metadata(&self) -> WireMetadata {
        let count = (self.count() as u16).to_le_bytes();
        WireMetadata::new(self.field_type(), &[self.width as u8, count[0], count[1]])
    }

    fn features(&self) -> SmallVec<[Feature; 2]> {
        if self.set {
            smallvec![Feature::Set]
        } else {
            smallvec![Feature::Enum]
        }
    }
}
