//! # Conversion Matrix and Copy Dispatch
//!
//! Replicated rows carry the *source* server's column layout in their wire
//! metadata. Before applying a column, the destination classifies the pair:
//!
//! | Class | Meaning | Accepted when |
//! |-------|---------|---------------|
//! | `Precise` | identical code and metadata; unpack in place | always |
//! | `SubsetToSuperset` | destination holds every source value | `allow_non_lossy` |
//! | `Variant` | different encoding or family, common intermediate | always |
//! | `SupersetToSubset` | destination holds only some values; stores clamp | `allow_lossy` |
//! | `Impossible` | no representation; the apply fails | never |
//!
//! Anything but `Precise` is staged: the value is unpacked into a scratch
//! column rebuilt from the wire metadata alone, then copied into the
//! destination through the same store path a live insert uses, so the same
//! truncation conditions are recorded.
//!
//! ## Copy Dispatch
//!
//! A [`FieldCopier`] picks the copy routine for a (source, destination)
//! column pair once, from the two type families:
//!
//! ```text
//!                     destination
//! source      │ same kind │ string │ numeric │ temporal │ enum/set
//! ────────────┼───────────┼────────┼─────────┼──────────┼─────────
//! integer/bit │ raw       │ text   │ int     │ int      │ int
//! real        │ raw       │ text   │ real    │ real     │ real
//! decimal     │ raw       │ text   │ decimal │ decimal  │ decimal
//! temporal    │ raw       │ text   │ temporal│ temporal │ temporal
//! string      │ text      │ text   │ text    │ text     │ text
//! enum/set    │ raw       │ text   │ int     │ int      │ text
//! ```
//!
//! Large objects and BIT columns never take the raw route: their bytes
//! point outside the column's own range.

use std::cmp::Ordering;
use std::fmt;

use crate::charset::Collation;
use crate::config::ConversionPolicy;
use crate::diagnostics::{StoreContext, StoreStatus};
use crate::error::{FieldError, FieldResult};
use crate::field::{Field, FieldKind};
use crate::row::{BlobSize, ColumnDefinition, ColumnKind, RowBuffer, RowLayout};
use crate::types::{FieldType, TypeFamily};

use super::WireMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvType {
    Precise,
    SubsetToSuperset,
    SupersetToSubset,
    Variant,
    Impossible,
}

impl ConvType {
    pub fn is_allowed(self, policy: &ConversionPolicy) -> bool {
        match self {
            ConvType::Precise | ConvType::Variant => true,
            ConvType::SubsetToSuperset => policy.allow_non_lossy,
            ConvType::SupersetToSubset => policy.allow_lossy,
            ConvType::Impossible => false,
        }
    }

    fn by_capacity(source: usize, target: usize) -> ConvType {
        match source.cmp(&target) {
            Ordering::Less => ConvType::SubsetToSuperset,
            Ordering::Equal => ConvType::Precise,
            Ordering::Greater => ConvType::SupersetToSubset,
        }
    }
}

impl fmt::Display for ConvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConvType::Precise => "precise",
            ConvType::SubsetToSuperset => "subset-to-superset",
            ConvType::SupersetToSubset => "superset-to-subset",
            ConvType::Variant => "variant",
            ConvType::Impossible => "impossible",
        })
    }
}

/// Classifies replicating a column described by `source` into `target`.
pub fn classify(source: &WireMetadata, target: &Field) -> ConvType {
    let target_meta = target.wire_metadata();
    if *source == target_meta {
        return ConvType::Precise;
    }
    let (sft, tft) = (source.field_type(), target_meta.field_type());
    if sft == tft {
        return classify_same_type(source, &target_meta);
    }

    use TypeFamily::*;
    match (sft.family(), tft.family()) {
        (Integer, Integer) => integer_order(source, &target_meta),
        (Real, Real) if tft == FieldType::Double => ConvType::SubsetToSuperset,
        (Real, Real) => ConvType::SupersetToSubset,
        (Decimal, Real) | (Real, Decimal) => ConvType::SupersetToSubset,
        (String, String) => {
            match ConvType::by_capacity(string_capacity(source), string_capacity(&target_meta)) {
                ConvType::Precise => ConvType::SubsetToSuperset,
                order => order,
            }
        }
        (Temporal, Temporal) => temporal_order(source, &target_meta),
        (Integer | Year | Bit | Decimal | Real, Integer | Decimal | Real) => ConvType::Variant,
        (_, String) | (String, Enum | Set) => ConvType::Variant,
        _ => ConvType::Impossible,
    }
}

fn classify_same_type(source: &WireMetadata, target: &WireMetadata) -> ConvType {
    match source.field_type().family() {
        TypeFamily::Integer => integer_order(source, target),
        TypeFamily::Decimal => {
            let (sp, ss) = source.precision_scale();
            let (tp, ts) = target.precision_scale();
            if tp - ts >= sp - ss && ts >= ss {
                ConvType::SubsetToSuperset
            } else {
                ConvType::SupersetToSubset
            }
        }
        TypeFamily::String => ConvType::by_capacity(string_capacity(source), string_capacity(target)),
        TypeFamily::Temporal => ConvType::by_capacity(usize::from(source.fsp()), usize::from(target.fsp())),
        TypeFamily::Enum | TypeFamily::Set => ConvType::by_capacity(source.typelib().1, target.typelib().1),
        TypeFamily::Bit => {
            ConvType::by_capacity(usize::from(source.bit_length()), usize::from(target.bit_length()))
        }
        TypeFamily::Year | TypeFamily::Real => ConvType::Precise,
    }
}

fn integer_range(meta: &WireMetadata) -> (i128, i128) {
    let bits = 8 * meta.field_type().integer_width().unwrap_or(8) as u32;
    if meta.is_unsigned() {
        (0, (1i128 << bits) - 1)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    }
}

fn integer_order(source: &WireMetadata, target: &WireMetadata) -> ConvType {
    let (smin, smax) = integer_range(source);
    let (tmin, tmax) = integer_range(target);
    if tmin <= smin && tmax >= smax {
        ConvType::SubsetToSuperset
    } else {
        ConvType::SupersetToSubset
    }
}

/// Byte capacity of a string-family column.
fn string_capacity(meta: &WireMetadata) -> usize {
    match meta.field_type() {
        FieldType::Blob => (1usize << (8 * meta.packlength())) - 1,
        _ => meta.max_bytes(),
    }
}

fn temporal_order(source: &WireMetadata, target: &WireMetadata) -> ConvType {
    let (sft, tft) = (source.field_type(), target.field_type());
    if sft.temporal_generation_peer() == Some(tft) {
        // Legacy encodings carry no sub-second digits.
        return if source.fsp() == target.fsp() {
            ConvType::Variant
        } else {
            ConvType::Impossible
        };
    }
    match (sft, tft) {
        (FieldType::NewDate, FieldType::Datetime | FieldType::Datetime2) => ConvType::SubsetToSuperset,
        (FieldType::Datetime2, FieldType::NewDate) => ConvType::SupersetToSubset,
        _ => ConvType::Impossible,
    }
}

// ----------------------------------------------------------------------
// Source columns from wire metadata
// ----------------------------------------------------------------------

impl ColumnDefinition {
    /// Rebuilds a NOT NULL column able to hold any value described by
    /// `meta`. ENUM/SET labels are not replicated; they become `"1".."n"`.
    /// `collation` applies to text columns, whose character set is not
    /// replicated either.
    pub fn from_wire_metadata(
        name: impl Into<String>,
        meta: &WireMetadata,
        collation: Collation,
    ) -> FieldResult<ColumnDefinition> {
        meta.validate()?;
        let ft = meta.field_type();
        let mbmaxlen = collation.charset().mbmaxlen();
        let mut byte_length = None;
        let mut text_collation = None;
        let kind = match ft {
            FieldType::Tiny => ColumnKind::TinyInt,
            FieldType::Short => ColumnKind::SmallInt,
            FieldType::Int24 => ColumnKind::MediumInt,
            FieldType::Long => ColumnKind::Int,
            FieldType::LongLong => ColumnKind::BigInt,
            FieldType::Year => ColumnKind::Year,
            FieldType::Float => ColumnKind::Float { precision: None },
            FieldType::Double => ColumnKind::Double { precision: None },
            FieldType::NewDecimal => {
                let (precision, scale) = meta.precision_scale();
                ColumnKind::Decimal { precision, scale }
            }
            FieldType::String => {
                let bytes = meta.max_bytes();
                byte_length = Some(bytes);
                text_collation = Some(collation);
                let chars = bytes.div_ceil(mbmaxlen).clamp(1, 255);
                ColumnKind::Char { length: chars as u16 }
            }
            FieldType::Varchar => {
                let bytes = meta.max_bytes();
                byte_length = Some(bytes);
                text_collation = Some(collation);
                ColumnKind::Varchar {
                    length: bytes.div_ceil(mbmaxlen) as u32,
                }
            }
            FieldType::Blob => {
                text_collation = Some(collation);
                let size = BlobSize::from_packlength(meta.packlength())
                    .ok_or_else(|| FieldError::bad_metadata("blob", "length width"))?;
                ColumnKind::Blob(size)
            }
            FieldType::NewDate => ColumnKind::Date,
            FieldType::Time | FieldType::Time2 => ColumnKind::Time { fsp: meta.fsp() },
            FieldType::Datetime | FieldType::Datetime2 => ColumnKind::DateTime { fsp: meta.fsp() },
            FieldType::Timestamp | FieldType::Timestamp2 => ColumnKind::Timestamp { fsp: meta.fsp() },
            FieldType::Enum | FieldType::Set => {
                let count = meta.typelib().1;
                let labels = (1..=count).map(|i| i.to_string()).collect();
                text_collation = Some(Collation::Binary);
                if ft == FieldType::Set {
                    ColumnKind::Set(labels)
                } else {
                    ColumnKind::Enum(labels)
                }
            }
            FieldType::Bit => ColumnKind::Bit {
                length: meta.bit_length(),
            },
        };
        let mut def = ColumnDefinition::new(name, kind).not_null();
        def.unsigned = meta.is_unsigned();
        def.legacy_format = ft.is_legacy_temporal();
        def.collation = text_collation;
        def.byte_length = byte_length;
        Ok(def)
    }
}

// ----------------------------------------------------------------------
// Copy dispatch
// ----------------------------------------------------------------------

/// How a value travels from one column to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyRoute {
    /// In-row bytes copied as they are.
    Raw,
    Int,
    Real,
    Decimal,
    Temporal,
    Text,
}

type CopyFn = fn(&Field, &RowBuffer, &Field, &mut RowBuffer, &mut StoreContext) -> StoreStatus;

const COPY_FNS: [CopyFn; 6] = [
    copy_raw,
    copy_via_int,
    copy_via_real,
    copy_via_decimal,
    copy_via_temporal,
    copy_via_text,
];

fn copy_raw(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, _ctx: &mut StoreContext) -> StoreStatus {
    let n = src.pack_length();
    dst.set_notnull(dst_row);
    let from = &src_row.as_bytes()[src.offset()..src.offset() + n];
    dst_row.as_bytes_mut()[dst.offset()..dst.offset() + n].copy_from_slice(from);
    StoreStatus::Exact
}

fn copy_via_int(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
    let value = src.codec().val_int(src_row, src.offset());
    dst.store_int(dst_row, value, ctx)
}

fn copy_via_real(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
    let value = src.codec().val_real(src_row, src.offset());
    dst.store_real(dst_row, value, ctx)
}

fn copy_via_decimal(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
    let value = src.codec().val_decimal(src_row, src.offset());
    dst.store_decimal(dst_row, &value, ctx)
}

fn copy_via_temporal(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
    let codec = src.codec();
    let kind = codec.temporal_kind().unwrap_or_default();
    match codec.val_temporal(src_row, src.offset(), kind) {
        Some(value) => dst.store_temporal(dst_row, &value, ctx),
        None => copy_via_text(src, src_row, dst, dst_row, ctx),
    }
}

fn copy_via_text(src: &Field, src_row: &RowBuffer, dst: &Field, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
    let mut text: Vec<u8> = Vec::new();
    src.codec().val_str(src_row, src.offset(), &mut text);
    dst.store_str(dst_row, &text, src.collation().charset(), ctx)
}

/// Copy routine for one (source, destination) column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCopier {
    route: CopyRoute,
}

impl FieldCopier {
    pub fn resolve(src: &Field, dst: &Field) -> FieldCopier {
        let raw_safe = !matches!(src.kind(), FieldKind::Blob(_) | FieldKind::Bit(_));
        if raw_safe && src.kind() == dst.kind() {
            return FieldCopier { route: CopyRoute::Raw };
        }

        use TypeFamily::*;
        let route = match (src.field_type().family(), dst.field_type().family()) {
            (String, _) | (_, String) => CopyRoute::Text,
            (Enum | Set, Enum | Set) => CopyRoute::Text,
            (Enum | Set, _) => CopyRoute::Int,
            (Temporal, _) => CopyRoute::Temporal,
            (Real, _) => CopyRoute::Real,
            (Decimal, _) => CopyRoute::Decimal,
            (Integer | Year | Bit, _) => CopyRoute::Int,
        };
        FieldCopier { route }
    }

    /// Like [`FieldCopier::resolve`], but ENUM and SET values travel by
    /// index, for sources whose labels are unknown.
    pub fn positional(src: &Field, dst: &Field) -> FieldCopier {
        match (src.field_type(), dst.field_type()) {
            (FieldType::Enum, FieldType::Enum) | (FieldType::Set, FieldType::Set) => FieldCopier {
                route: CopyRoute::Int,
            },
            _ => Self::resolve(src, dst),
        }
    }

    pub fn route(&self) -> CopyRoute {
        self.route
    }

    /// Copies `src` in `src_row` into `dst` in `dst_row`. NULL stays NULL
    /// (or raises "cannot be null" on a NOT NULL destination).
    pub fn copy(
        &self,
        src: &Field,
        src_row: &RowBuffer,
        dst: &Field,
        dst_row: &mut RowBuffer,
        ctx: &mut StoreContext,
    ) -> StoreStatus {
        if src.is_null(src_row) {
            return dst.store_null(dst_row, ctx);
        }
        COPY_FNS[self.route as usize](src, src_row, dst, dst_row, ctx)
    }
}

/// Copies a column between rows of two layouts, resolving the route on the
/// fly.
pub fn copy_field(
    src: &Field,
    src_row: &RowBuffer,
    dst: &Field,
    dst_row: &mut RowBuffer,
    ctx: &mut StoreContext,
) -> StoreStatus {
    FieldCopier::resolve(src, dst).copy(src, src_row, dst, dst_row, ctx)
}

/// Copies rows between two layouts, column by column, matching columns by
/// name. Destination columns without a source keep their value.
#[derive(Debug)]
pub struct RowCopier<'a> {
    src: &'a RowLayout,
    dst: &'a RowLayout,
    pairs: Vec<(usize, usize, FieldCopier)>,
}

impl<'a> RowCopier<'a> {
    pub fn new(src: &'a RowLayout, dst: &'a RowLayout) -> Self {
        let pairs = dst
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(di, dst_field)| {
                let si = src.index_of(dst_field.name())?;
                let copier = FieldCopier::resolve(&src.fields()[si], dst_field);
                Some((si, di, copier))
            })
            .collect();
        Self { src, dst, pairs }
    }

    /// Number of columns present in both layouts.
    pub fn mapped_columns(&self) -> usize {
        self.pairs.len()
    }

    pub fn copy(&self, src_row: &RowBuffer, dst_row: &mut RowBuffer, ctx: &mut StoreContext) -> StoreStatus {
        let mut status = StoreStatus::Exact;
        for &(si, di, copier) in &self.pairs {
            let (src, dst) = (&self.src.fields()[si], &self.dst.fields()[di]);
            status = status.merge(copier.copy(src, src_row, dst, dst_row, ctx));
        }
        status
    }
}

// ----------------------------------------------------------------------
// Replication converters
// ----------------------------------------------------------------------

#[derive(Debug)]
enum ApplyPath {
    Direct,
    Staged {
        source: RowLayout,
        scratch: RowBuffer,
        copier: FieldCopier,
    },
}

/// Applies wire values described by one source metadata to one
/// destination column.
#[derive(Debug)]
pub struct ColumnConverter {
    conv: ConvType,
    source_meta: WireMetadata,
    policy: ConversionPolicy,
    path: ApplyPath,
}

impl ColumnConverter {
    /// Classifies the pair and, for anything but `Precise`, builds the
    /// scratch source column. Fails for impossible or disallowed
    /// conversions.
    pub fn resolve(source: &WireMetadata, target: &Field, policy: ConversionPolicy) -> FieldResult<ColumnConverter> {
        let conv = classify(source, target);
        let column = target.name().to_string();
        match conv {
            ConvType::Impossible => {
                return Err(FieldError::ImpossibleConversion {
                    column,
                    from: source.to_string(),
                    to: target.wire_metadata().to_string(),
                });
            }
            c if !c.is_allowed(&policy) => {
                return Err(FieldError::ConversionDisabled {
                    column,
                    from: source.to_string(),
                    to: target.wire_metadata().to_string(),
                });
            }
            _ => {}
        }

        let path = if conv == ConvType::Precise {
            ApplyPath::Direct
        } else {
            let def = ColumnDefinition::from_wire_metadata(target.name(), source, target.collation())?;
            let source_layout = RowLayout::new(vec![def])
                .map_err(|e| FieldError::bad_metadata(source.field_type().name(), format!("{e:#}")))?;
            let scratch = source_layout.new_row();
            let copier = FieldCopier::positional(&source_layout.fields()[0], target);
            ApplyPath::Staged {
                source: source_layout,
                scratch,
                copier,
            }
        };

        tracing::debug!(
            column = target.name(),
            source = %source,
            target = %target.wire_metadata(),
            conversion = %conv,
            "resolved column converter"
        );

        Ok(ColumnConverter {
            conv,
            source_meta: source.clone(),
            policy,
            path,
        })
    }

    pub fn conv_type(&self) -> ConvType {
        self.conv
    }

    pub fn source_metadata(&self) -> &WireMetadata {
        &self.source_meta
    }

    /// Reads one wire value from `src` into `target`, returning the bytes
    /// consumed.
    pub fn apply(
        &mut self,
        src: &[u8],
        target: &Field,
        dst_row: &mut RowBuffer,
        ctx: &mut StoreContext,
    ) -> FieldResult<usize> {
        let (source, scratch, copier) = match &mut self.path {
            ApplyPath::Direct => return target.unpack(dst_row, src),
            ApplyPath::Staged {
                source,
                scratch,
                copier,
            } => (&*source, scratch, *copier),
        };
        let field = &source.fields()[0];
        let used = field.unpack(scratch, src)?;
        let status = copier.copy(field, scratch, target, dst_row, ctx);
        if status.is_fatal() {
            let message = ctx
                .diagnostics()
                .last()
                .map(|c| c.message.clone())
                .unwrap_or_default();
            return Err(FieldError::StoreAborted {
                column: target.name().to_string(),
                message,
            });
        }
        if !status.is_exact() && self.policy.fail_on_truncation {
            return Err(FieldError::LossyApply {
                column: target.name().to_string(),
            });
        }
        Ok(used)
    }
}
