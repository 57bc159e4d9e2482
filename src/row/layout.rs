//! # Row Layouts
//!
//! A [`RowLayout`] is built once from column definitions (the DDL boundary)
//! and fixes every column's byte offset, null bit and codec for the life of
//! the table. Nothing here parses SQL; definitions arrive as
//! [`ColumnDefinition`] values.
//!
//! ## Record Layout
//!
//! ```text
//! ┌───────────────────────┬──────────┬──────────┬─────┬──────────┐
//! │ null region           │ column 0 │ column 1 │ ... │ column N │
//! │ ceil(bits / 8) bytes  │          │          │     │          │
//! └───────────────────────┴──────────┴──────────┴─────┴──────────┘
//!
//! null region bits, LSB first:
//!   [row flag?][null bit of each nullable column, in order,
//!               followed by a BIT(M) column's M % 8 leftover bits]
//! ```
//!
//! The optional null-row flag marks a whole row as NULL (the complemented
//! side of an outer join); with it set every column reads NULL, including
//! NOT NULL ones.

use std::cmp::Ordering;

use eyre::{ensure, Result, WrapErr};
use hashbrown::{HashMap, HashSet};

use crate::charset::Collation;
use crate::config::{
    FieldConfig, MAX_BIT_LENGTH, MAX_CHAR_LENGTH, MAX_DATETIME_FSP, MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE,
    MAX_ENUM_LABELS, MAX_RECORD_LENGTH, MAX_SET_MEMBERS, MAX_VARCHAR_BYTES,
};
use crate::field::{
    BitCodec, BlobCodec, CharCodec, DecimalCodec, Field, FieldKind, IntegerCodec, RealCodec,
    TemporalCodec, TypelibCodec, VarcharCodec, YearCodec,
};
use crate::telemetry::{Feature, FeatureCounters};
use crate::types::{capabilities, FieldType};

use super::buffer::RowBuffer;
use super::null_bitmap::{null_bytes_for, NullBit, NullMode, UnevenBits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobSize {
    Tiny,
    Regular,
    Medium,
    Long,
}

impl BlobSize {
    pub fn packlength(self) -> u8 {
        match self {
            BlobSize::Tiny => 1,
            BlobSize::Regular => 2,
            BlobSize::Medium => 3,
            BlobSize::Long => 4,
        }
    }

    pub fn from_packlength(len: usize) -> Option<BlobSize> {
        match len {
            1 => Some(BlobSize::Tiny),
            2 => Some(BlobSize::Regular),
            3 => Some(BlobSize::Medium),
            4 => Some(BlobSize::Long),
            _ => None,
        }
    }
}

/// The declared SQL type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Year,
    Float { precision: Option<(u8, u8)> },
    Double { precision: Option<(u8, u8)> },
    Decimal { precision: u8, scale: u8 },
    Char { length: u16 },
    Varchar { length: u32 },
    Blob(BlobSize),
    Date,
    Time { fsp: u8 },
    DateTime { fsp: u8 },
    Timestamp { fsp: u8 },
    Enum(Vec<String>),
    Set(Vec<String>),
    Bit { length: u8 },
}

impl ColumnKind {
    /// The type tag this kind stores as; `legacy` picks the pre-fraction
    /// temporal encodings.
    pub fn field_type(&self, legacy: bool) -> FieldType {
        match self {
            ColumnKind::TinyInt => FieldType::Tiny,
            ColumnKind::SmallInt => FieldType::Short,
            ColumnKind::MediumInt => FieldType::Int24,
            ColumnKind::Int => FieldType::Long,
            ColumnKind::BigInt => FieldType::LongLong,
            ColumnKind::Year => FieldType::Year,
            ColumnKind::Float { .. } => FieldType::Float,
            ColumnKind::Double { .. } => FieldType::Double,
            ColumnKind::Decimal { .. } => FieldType::NewDecimal,
            ColumnKind::Char { .. } => FieldType::String,
            ColumnKind::Varchar { .. } => FieldType::Varchar,
            ColumnKind::Blob(_) => FieldType::Blob,
            ColumnKind::Date => FieldType::NewDate,
            ColumnKind::Time { .. } if legacy => FieldType::Time,
            ColumnKind::Time { .. } => FieldType::Time2,
            ColumnKind::DateTime { .. } if legacy => FieldType::Datetime,
            ColumnKind::DateTime { .. } => FieldType::Datetime2,
            ColumnKind::Timestamp { .. } if legacy => FieldType::Timestamp,
            ColumnKind::Timestamp { .. } => FieldType::Timestamp2,
            ColumnKind::Enum(_) => FieldType::Enum,
            ColumnKind::Set(_) => FieldType::Set,
            ColumnKind::Bit { .. } => FieldType::Bit,
        }
    }

    fn is_textual(&self) -> bool {
        matches!(
            self,
            ColumnKind::Char { .. }
                | ColumnKind::Varchar { .. }
                | ColumnKind::Blob(_)
                | ColumnKind::Enum(_)
                | ColumnKind::Set(_)
        )
    }
}

/// One column as declared by DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unsigned: bool,
    pub zerofill: bool,
    /// `None` takes the type's default collation.
    pub collation: Option<Collation>,
    /// Use the legacy TIME/DATETIME/TIMESTAMP encodings.
    pub legacy_format: bool,
    pub display_width: Option<u32>,
    /// Byte capacity for string columns rebuilt from wire metadata.
    pub(crate) byte_length: Option<usize>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            unsigned: false,
            zerofill: false,
            collation: None,
            legacy_format: false,
            display_width: None,
            byte_length: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// ZEROFILL implies UNSIGNED.
    pub fn zerofill(mut self) -> Self {
        self.zerofill = true;
        self.unsigned = true;
        self
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    pub fn legacy_format(mut self) -> Self {
        self.legacy_format = true;
        self
    }

    pub fn with_display_width(mut self, width: u32) -> Self {
        self.display_width = Some(width);
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type(self.legacy_format)
    }

    pub fn effective_collation(&self) -> Collation {
        self.collation
            .unwrap_or_else(|| capabilities(self.field_type()).default_collation)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.name.is_empty(), "column name must not be empty");
        let name = &self.name;
        match &self.kind {
            ColumnKind::Float { precision } | ColumnKind::Double { precision } => {
                if let Some((m, d)) = precision {
                    ensure!(*m >= 1 && d <= m && *d <= 30, "column '{name}': bad (M,D) ({m},{d})");
                }
            }
            ColumnKind::Decimal { precision, scale } => {
                ensure!(
                    (1..=MAX_DECIMAL_PRECISION).contains(precision),
                    "column '{name}': decimal precision {precision} outside 1..={MAX_DECIMAL_PRECISION}"
                );
                ensure!(
                    scale <= precision && *scale <= MAX_DECIMAL_SCALE,
                    "column '{name}': decimal scale {scale} invalid for precision {precision}"
                );
            }
            ColumnKind::Char { length } => {
                ensure!(*length <= MAX_CHAR_LENGTH, "column '{name}': CHAR({length}) too long");
            }
            ColumnKind::Varchar { length } => {
                let bytes = *length as usize * self.effective_collation().charset().mbmaxlen();
                let max_bytes = self.byte_length.unwrap_or(bytes);
                ensure!(
                    max_bytes <= MAX_VARCHAR_BYTES as usize,
                    "column '{name}': VARCHAR({length}) needs {max_bytes} bytes, limit {MAX_VARCHAR_BYTES}"
                );
            }
            ColumnKind::Time { fsp } | ColumnKind::DateTime { fsp } | ColumnKind::Timestamp { fsp } => {
                ensure!(*fsp <= MAX_DATETIME_FSP, "column '{name}': fsp {fsp} > {MAX_DATETIME_FSP}");
                ensure!(
                    !self.legacy_format || *fsp == 0,
                    "column '{name}': legacy temporal format has no sub-second digits"
                );
            }
            ColumnKind::Enum(labels) => {
                ensure!(
                    (1..=MAX_ENUM_LABELS).contains(&labels.len()),
                    "column '{name}': ENUM needs 1..={MAX_ENUM_LABELS} labels"
                );
                self.ensure_unique_labels(labels)?;
            }
            ColumnKind::Set(members) => {
                ensure!(
                    (1..=MAX_SET_MEMBERS).contains(&members.len()),
                    "column '{name}': SET needs 1..={MAX_SET_MEMBERS} members"
                );
                ensure!(
                    members.iter().all(|m| !m.contains(',')),
                    "column '{name}': SET members cannot contain ','"
                );
                self.ensure_unique_labels(members)?;
            }
            ColumnKind::Bit { length } => {
                ensure!(
                    (1..=MAX_BIT_LENGTH).contains(length),
                    "column '{name}': BIT({length}) outside 1..={MAX_BIT_LENGTH}"
                );
            }
            _ => {}
        }
        ensure!(
            !self.legacy_format
                || matches!(
                    self.kind,
                    ColumnKind::Time { .. } | ColumnKind::DateTime { .. } | ColumnKind::Timestamp { .. }
                ),
            "column '{name}': only TIME, DATETIME and TIMESTAMP have a legacy format"
        );
        ensure!(
            self.collation.is_none() || self.kind.is_textual(),
            "column '{name}': collation given for a non-text column"
        );
        Ok(())
    }

    fn ensure_unique_labels(&self, labels: &[String]) -> Result<()> {
        let collation = self.effective_collation();
        let mut seen = HashSet::with_capacity(labels.len());
        for label in labels {
            ensure!(
                seen.insert(collation.fold_key(label.as_bytes())),
                "column '{}': duplicate label '{label}'",
                self.name
            );
        }
        Ok(())
    }

    fn codec(&self, uneven: Option<UnevenBits>) -> FieldKind {
        let ft = self.field_type();
        let collation = self.effective_collation();
        match &self.kind {
            ColumnKind::TinyInt
            | ColumnKind::SmallInt
            | ColumnKind::MediumInt
            | ColumnKind::Int
            | ColumnKind::BigInt => FieldKind::Integer(IntegerCodec::new(
                ft,
                self.unsigned,
                self.zerofill,
                self.display_width,
            )),
            ColumnKind::Year => FieldKind::Year(YearCodec),
            ColumnKind::Float { precision } => {
                FieldKind::Real(RealCodec::new(false, self.unsigned, self.zerofill, *precision))
            }
            ColumnKind::Double { precision } => {
                FieldKind::Real(RealCodec::new(true, self.unsigned, self.zerofill, *precision))
            }
            ColumnKind::Decimal { precision, scale } => FieldKind::Decimal(DecimalCodec::new(
                *precision,
                *scale,
                self.unsigned,
                self.zerofill,
            )),
            ColumnKind::Char { length } => {
                FieldKind::Char(CharCodec::new(usize::from(*length), collation, self.byte_length))
            }
            ColumnKind::Varchar { length } => {
                FieldKind::Varchar(VarcharCodec::new(*length as usize, collation, self.byte_length))
            }
            ColumnKind::Blob(size) => FieldKind::Blob(BlobCodec::new(size.packlength(), collation)),
            ColumnKind::Date => FieldKind::Temporal(TemporalCodec::new(ft, 0)),
            ColumnKind::Time { fsp } | ColumnKind::DateTime { fsp } | ColumnKind::Timestamp { fsp } => {
                FieldKind::Temporal(TemporalCodec::new(ft, *fsp))
            }
            ColumnKind::Enum(labels) => {
                FieldKind::Typelib(TypelibCodec::new(false, labels.clone(), collation))
            }
            ColumnKind::Set(members) => {
                FieldKind::Typelib(TypelibCodec::new(true, members.clone(), collation))
            }
            ColumnKind::Bit { length } => FieldKind::Bit(BitCodec::new(*length, uneven)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowLayoutBuilder {
    definitions: Vec<ColumnDefinition>,
    null_row_flag: bool,
}

impl RowLayoutBuilder {
    /// Reserves the first null bit as a whole-row NULL flag.
    pub fn with_null_row_flag(mut self) -> Self {
        self.null_row_flag = true;
        self
    }

    pub fn column(mut self, definition: ColumnDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<RowLayout> {
        ensure!(!self.definitions.is_empty(), "a row layout needs at least one column");
        let mut by_name = HashMap::with_capacity(self.definitions.len());
        for (i, def) in self.definitions.iter().enumerate() {
            def.validate()?;
            ensure!(
                by_name.insert(def.name.to_lowercase(), i).is_none(),
                "duplicate column name '{}'",
                def.name
            );
        }

        let mut next_bit = 0usize;
        let row_flag = self.null_row_flag.then(|| {
            next_bit = 1;
            NullBit::from_index(0)
        });
        let mut placement = Vec::with_capacity(self.definitions.len());
        for def in &self.definitions {
            let null = if def.nullable {
                let bit = NullBit::from_index(next_bit);
                next_bit += 1;
                NullMode::Bit { bit, row_flag }
            } else {
                row_flag.map_or(NullMode::NotNull, NullMode::RowFlag)
            };
            let uneven = match def.kind {
                ColumnKind::Bit { length } if length % 8 != 0 => {
                    let bits = UnevenBits {
                        start: next_bit,
                        len: length % 8,
                    };
                    next_bit += usize::from(length % 8);
                    Some(bits)
                }
                _ => None,
            };
            placement.push((null, uneven));
        }

        let null_bytes = null_bytes_for(next_bit);
        let mut offset = null_bytes;
        let mut fields = Vec::with_capacity(self.definitions.len());
        for (def, (null, uneven)) in self.definitions.iter().zip(placement) {
            let field = Field::new(def.name.clone(), offset, null, def.codec(uneven));
            offset += field.pack_length();
            fields.push(field);
        }
        ensure!(
            offset <= MAX_RECORD_LENGTH,
            "record length {offset} exceeds {MAX_RECORD_LENGTH} bytes"
        );

        tracing::debug!(
            columns = fields.len(),
            null_bytes,
            record_length = offset,
            null_row_flag = row_flag.is_some(),
            "built row layout"
        );

        Ok(RowLayout {
            fields,
            by_name,
            null_bytes,
            record_length: offset,
            null_row_flag: row_flag,
            definitions: self.definitions,
        })
    }
}

/// Column offsets, null bits and codecs for one physical record format.
#[derive(Debug, Clone)]
pub struct RowLayout {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    null_bytes: usize,
    record_length: usize,
    null_row_flag: Option<NullBit>,
    definitions: Vec<ColumnDefinition>,
}

impl RowLayout {
    pub fn builder(definitions: Vec<ColumnDefinition>) -> RowLayoutBuilder {
        RowLayoutBuilder {
            definitions,
            null_row_flag: false,
        }
    }

    pub fn new(definitions: Vec<ColumnDefinition>) -> Result<RowLayout> {
        Self::builder(definitions).build()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Column names match case-insensitively.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn definitions(&self) -> &[ColumnDefinition] {
        &self.definitions
    }

    pub fn null_bytes(&self) -> usize {
        self.null_bytes
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn has_null_row_flag(&self) -> bool {
        self.null_row_flag.is_some()
    }

    /// A fresh record: nullable columns NULL, the rest at their zero value.
    pub fn new_row(&self) -> RowBuffer {
        let mut row = RowBuffer::new(self.record_length);
        for field in &self.fields {
            field.reset(&mut row);
            field.set_null(&mut row);
        }
        row
    }

    /// Sets or clears the whole-row NULL flag. A no-op without one.
    pub fn set_null_row(&self, row: &mut RowBuffer, null: bool) {
        if let Some(flag) = self.null_row_flag {
            if null {
                flag.set(row.as_bytes_mut());
            } else {
                flag.clear(row.as_bytes_mut());
            }
        }
    }

    pub fn is_null_row(&self, row: &RowBuffer) -> bool {
        self.null_row_flag
            .is_some_and(|flag| flag.is_set(row.as_bytes()))
    }

    /// Copies a row of this layout, including the bytes behind every large
    /// object, into a record that owns them.
    pub fn copy_row(&self, src: &RowBuffer) -> Result<RowBuffer> {
        let mut dst = RowBuffer::new(self.record_length);
        dst.copy_bytes_from(src)
            .wrap_err("source row does not belong to this layout")?;
        for field in &self.fields {
            field.rehome(&mut dst, src.blobs());
        }
        Ok(dst)
    }

    /// Concatenated sort keys of `columns`; memcmp of two keys built with
    /// the same arguments orders the rows like [`RowLayout::cmp_rows`].
    pub fn make_sort_key(
        &self,
        row: &RowBuffer,
        columns: &[usize],
        max_sort_length: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        for &i in columns {
            let field = self
                .fields
                .get(i)
                .ok_or_else(|| eyre::eyre!("sort column {i} out of range ({} columns)", self.len()))?;
            field.make_sort_key(row, out, max_sort_length);
        }
        Ok(())
    }

    /// [`RowLayout::make_sort_key`] under the session's sort length limit.
    pub fn sort_key(&self, row: &RowBuffer, columns: &[usize], config: &FieldConfig) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.make_sort_key(row, columns, config.max_sort_length, &mut out)?;
        Ok(out)
    }

    pub fn cmp_rows(&self, a: &RowBuffer, b: &RowBuffer, columns: &[usize]) -> Ordering {
        for &i in columns {
            if let Some(field) = self.fields.get(i) {
                let ord = field.cmp(a, b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
        Ordering::Equal
    }

    pub fn record_features(&self, counters: &FeatureCounters) {
        if self.null_row_flag.is_some() {
            counters.bump(Feature::NullRowFlag);
        }
        for field in &self.fields {
            for feature in field.features() {
                counters.bump(feature);
            }
        }
    }
}
