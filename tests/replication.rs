//! # Replication Test Suite
//!
//! Row images encoded under one layout and applied under another: the
//! conversion matrix, conversion policies, frame validation and the
//! layout-to-layout row copier.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test replication -- --nocapture
//! ```

use rowfield::wire::{
    classify, image_columns, ColumnConverter, CopyRoute, FieldCopier, RowCopier, FLAG_NULL_ROW,
};
use rowfield::{
    encode_row, BlobSize, Collation, ColumnDefinition, ColumnKind, ConvType, ConversionPolicy,
    FieldConfig, FieldError, FieldType, RowApplier, RowBuffer, RowLayout, StoreContext, StoreStatus,
    WarnCode, WireMetadata,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn one(def: ColumnDefinition) -> RowLayout {
    RowLayout::new(vec![def]).expect("valid layout")
}

fn col(kind: ColumnKind) -> ColumnDefinition {
    ColumnDefinition::new("c", kind)
}

fn conv(source: ColumnDefinition, target: ColumnDefinition) -> ConvType {
    let src = one(source);
    let dst = one(target);
    classify(&src.fields()[0].wire_metadata(), &dst.fields()[0])
}

/// Stores `text` into a single-column `source` row and returns its image.
fn image_of(source: &RowLayout, text: &str) -> Vec<u8> {
    let mut ctx = StoreContext::lenient();
    let mut row = source.new_row();
    let status = source.fields()[0].store_text(&mut row, text, &mut ctx);
    assert_eq!(status, StoreStatus::Exact, "source value {text:?}");
    encode_row(source, &row, None)
}

fn replicate(
    source: ColumnDefinition,
    target: ColumnDefinition,
    text: &str,
    policy: ConversionPolicy,
) -> (Result<(), FieldError>, Option<String>, StoreContext) {
    let src = one(source);
    let dst = one(target);
    let image = image_of(&src, text);
    let mut ctx = StoreContext::lenient();
    let mut row = dst.new_row();
    let result = RowApplier::new(&dst, policy).apply(&image, &mut row, &mut ctx);
    let value = dst.fields()[0].val_string(&row);
    (result, value, ctx)
}

// ============================================================================
// CONVERSION MATRIX
// ============================================================================

#[test]
fn identical_columns_are_precise() {
    assert_eq!(conv(col(ColumnKind::Int), col(ColumnKind::Int)), ConvType::Precise);
    assert_eq!(
        conv(col(ColumnKind::Decimal { precision: 9, scale: 3 }), col(ColumnKind::Decimal { precision: 9, scale: 3 })),
        ConvType::Precise
    );
}

#[test]
fn integer_widths_classify_by_range() {
    assert_eq!(conv(col(ColumnKind::SmallInt), col(ColumnKind::BigInt)), ConvType::SubsetToSuperset);
    assert_eq!(conv(col(ColumnKind::BigInt), col(ColumnKind::TinyInt)), ConvType::SupersetToSubset);
    assert_eq!(
        conv(col(ColumnKind::Int).unsigned(), col(ColumnKind::Int)),
        ConvType::SupersetToSubset
    );
    assert_eq!(
        conv(col(ColumnKind::SmallInt).unsigned(), col(ColumnKind::Int)),
        ConvType::SubsetToSuperset
    );
}

#[test]
fn decimal_and_real_pairs() {
    let d = |p, s| col(ColumnKind::Decimal { precision: p, scale: s });
    assert_eq!(conv(d(10, 2), d(12, 4)), ConvType::SubsetToSuperset);
    assert_eq!(conv(d(10, 2), d(10, 1)), ConvType::SupersetToSubset);
    assert_eq!(
        conv(col(ColumnKind::Float { precision: None }), col(ColumnKind::Double { precision: None })),
        ConvType::SubsetToSuperset
    );
    assert_eq!(
        conv(col(ColumnKind::Double { precision: None }), col(ColumnKind::Float { precision: None })),
        ConvType::SupersetToSubset
    );
    assert_eq!(conv(d(10, 2), col(ColumnKind::Double { precision: None })), ConvType::SupersetToSubset);
}

#[test]
fn strings_classify_by_capacity() {
    let v = |n| col(ColumnKind::Varchar { length: n });
    assert_eq!(conv(v(10), v(20)), ConvType::SubsetToSuperset);
    assert_eq!(conv(v(20), v(10)), ConvType::SupersetToSubset);
    assert_eq!(conv(col(ColumnKind::Char { length: 20 }), v(20)), ConvType::SubsetToSuperset);
    assert_eq!(
        conv(col(ColumnKind::Blob(BlobSize::Regular)), col(ColumnKind::Blob(BlobSize::Long))),
        ConvType::SubsetToSuperset
    );
    assert_eq!(conv(col(ColumnKind::Blob(BlobSize::Regular)), v(100)), ConvType::SupersetToSubset);
}

#[test]
fn temporal_generations_and_precisions() {
    let dt = |fsp| col(ColumnKind::DateTime { fsp });
    assert_eq!(conv(dt(3), dt(6)), ConvType::SubsetToSuperset);
    assert_eq!(conv(dt(6), dt(0)), ConvType::SupersetToSubset);
    assert_eq!(conv(dt(0).legacy_format(), dt(0)), ConvType::Variant);
    assert_eq!(conv(dt(0), dt(0).legacy_format()), ConvType::Variant);
    assert_eq!(conv(dt(0).legacy_format(), dt(3)), ConvType::Impossible);
    assert_eq!(conv(col(ColumnKind::Date), dt(0)), ConvType::SubsetToSuperset);
    assert_eq!(conv(dt(2), col(ColumnKind::Date)), ConvType::SupersetToSubset);
    assert_eq!(conv(col(ColumnKind::Time { fsp: 0 }), col(ColumnKind::Date)), ConvType::Impossible);
}

#[test]
fn cross_family_pairs() {
    assert_eq!(conv(col(ColumnKind::Int), col(ColumnKind::Varchar { length: 20 })), ConvType::Variant);
    assert_eq!(conv(col(ColumnKind::Bit { length: 8 }), col(ColumnKind::BigInt)), ConvType::Variant);
    assert_eq!(conv(col(ColumnKind::Int), col(ColumnKind::Decimal { precision: 12, scale: 0 })), ConvType::Variant);
    assert_eq!(conv(col(ColumnKind::Varchar { length: 20 }), col(ColumnKind::Int)), ConvType::Impossible);
    assert_eq!(conv(col(ColumnKind::Int), col(ColumnKind::Date)), ConvType::Impossible);
    assert_eq!(conv(col(ColumnKind::Year), col(ColumnKind::Enum(vec!["a".into()]))), ConvType::Impossible);
}

#[test]
fn policy_gates_each_class() {
    let empty = ConversionPolicy::empty();
    assert!(ConvType::Precise.is_allowed(&empty));
    assert!(ConvType::Variant.is_allowed(&empty));
    assert!(!ConvType::SubsetToSuperset.is_allowed(&empty));
    assert!(!ConvType::SupersetToSubset.is_allowed(&empty));

    let lossless = ConversionPolicy {
        allow_lossy: false,
        ..ConversionPolicy::default()
    };
    assert!(ConvType::SubsetToSuperset.is_allowed(&lossless));
    assert!(!ConvType::SupersetToSubset.is_allowed(&lossless));
    assert!(!ConvType::Impossible.is_allowed(&ConversionPolicy::default()));
}

// ============================================================================
// APPLYING IMAGES
// ============================================================================

#[test]
fn precise_image_round_trips_every_column() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("id", ColumnKind::BigInt).not_null(),
        ColumnDefinition::new("name", ColumnKind::Varchar { length: 40 }),
        ColumnDefinition::new("price", ColumnKind::Decimal { precision: 10, scale: 2 }),
        ColumnDefinition::new("body", ColumnKind::Blob(BlobSize::Regular)),
        ColumnDefinition::new("at", ColumnKind::Timestamp { fsp: 3 }),
        ColumnDefinition::new("flags", ColumnKind::Bit { length: 10 }),
        ColumnDefinition::new("missing", ColumnKind::Int),
    ])
    .unwrap();
    let mut ctx = StoreContext::lenient();
    let mut row = layout.new_row();
    let f = layout.fields();
    f[0].store_int(&mut row, 42, &mut ctx);
    f[1].store_text(&mut row, "naïve", &mut ctx);
    f[2].store_text(&mut row, "-17.50", &mut ctx);
    f[3].store_text(&mut row, &"z".repeat(500), &mut ctx);
    f[4].store_text(&mut row, "2021-03-04 05:06:07.890", &mut ctx);
    f[5].store_int(&mut row, 0x2A5, &mut ctx);
    assert!(ctx.diagnostics().is_empty());

    let image = encode_row(&layout, &row, None);
    let mut dst = layout.new_row();
    let mut applier = RowApplier::new(&layout, ConversionPolicy::empty());
    applier.apply(&image, &mut dst, &mut ctx).unwrap();

    for field in f {
        assert_eq!(field.val_bytes(&dst), field.val_bytes(&row), "column {}", field.name());
        assert_eq!(field.is_null(&dst), field.is_null(&row));
    }
    assert!(applier.converter(0).is_some());
    assert!(applier.converter(6).is_none());
}

#[test]
fn widening_conversions_apply_without_conditions() {
    let (result, value, ctx) = replicate(
        col(ColumnKind::SmallInt),
        col(ColumnKind::BigInt),
        "-300",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("-300"));
    assert!(ctx.diagnostics().is_empty());

    let (result, value, _) = replicate(
        col(ColumnKind::Decimal { precision: 6, scale: 2 }),
        col(ColumnKind::Decimal { precision: 12, scale: 4 }),
        "1234.56",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("1234.5600"));
}

#[test]
fn narrowing_conversion_clamps_and_warns() {
    let (result, value, ctx) = replicate(
        col(ColumnKind::BigInt),
        col(ColumnKind::TinyInt),
        "300",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("127"));
    assert!(ctx.diagnostics().has_code(WarnCode::OutOfRange));
}

#[test]
fn fail_on_truncation_rejects_lossy_values_only() {
    let policy = ConversionPolicy::default().with_fail_on_truncation(true);
    let (result, _, _) = replicate(col(ColumnKind::BigInt), col(ColumnKind::TinyInt), "300", policy);
    assert!(matches!(result, Err(FieldError::LossyApply { ref column }) if column == "c"));

    let (result, value, _) = replicate(col(ColumnKind::BigInt), col(ColumnKind::TinyInt), "100", policy);
    result.unwrap();
    assert_eq!(value.as_deref(), Some("100"));
}

#[test]
fn disabled_and_impossible_conversions_fail() {
    let (result, _, _) = replicate(
        col(ColumnKind::Int),
        col(ColumnKind::BigInt),
        "1",
        ConversionPolicy::empty(),
    );
    assert!(matches!(result, Err(FieldError::ConversionDisabled { .. })));

    let (result, value, _) = replicate(
        col(ColumnKind::Varchar { length: 10 }),
        col(ColumnKind::Date),
        "2020-01-01",
        ConversionPolicy::default(),
    );
    assert!(matches!(result, Err(FieldError::ImpossibleConversion { .. })));
    assert_eq!(value, None);
}

#[test]
fn variant_conversions_go_through_text_or_numbers() {
    let (result, value, _) = replicate(
        col(ColumnKind::Int),
        col(ColumnKind::Varchar { length: 12 }),
        "-123456",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("-123456"));

    let (result, value, _) = replicate(
        col(ColumnKind::DateTime { fsp: 0 }).legacy_format(),
        col(ColumnKind::DateTime { fsp: 0 }),
        "1998-07-06 05:04:03",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("1998-07-06 05:04:03"));
}

#[test]
fn variant_conversions_need_no_policy_switch() {
    let (result, value, ctx) = replicate(
        col(ColumnKind::DateTime { fsp: 0 }).legacy_format(),
        col(ColumnKind::DateTime { fsp: 0 }),
        "2003-04-05 06:07:08",
        ConversionPolicy::empty(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("2003-04-05 06:07:08"));
    assert!(ctx.diagnostics().is_empty());

    let (result, value, _) = replicate(
        col(ColumnKind::Int),
        col(ColumnKind::Varchar { length: 12 }),
        "77",
        ConversionPolicy::empty(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("77"));

    let dst = one(col(ColumnKind::DateTime { fsp: 0 }));
    let src = one(col(ColumnKind::DateTime { fsp: 0 }).legacy_format());
    let converter =
        ColumnConverter::resolve(&src.fields()[0].wire_metadata(), &dst.fields()[0], ConversionPolicy::empty()).unwrap();
    assert_eq!(converter.conv_type(), ConvType::Variant);
}

#[test]
fn fraction_is_cut_when_replicating_into_lower_precision() {
    let (result, value, ctx) = replicate(
        col(ColumnKind::Time { fsp: 6 }),
        col(ColumnKind::Time { fsp: 2 }),
        "10:11:12.345678",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("10:11:12.34"));
    assert!(ctx.diagnostics().has_code(WarnCode::DataTruncated));
}

#[test]
fn enum_values_replicate_by_position() {
    let source = col(ColumnKind::Enum(vec!["a".into(), "b".into(), "c".into()]));
    let target = col(ColumnKind::Enum(vec![
        "red".into(),
        "green".into(),
        "blue".into(),
        "cyan".into(),
    ]));
    let (result, value, _) = replicate(source, target, "b", ConversionPolicy::default());
    result.unwrap();
    assert_eq!(value.as_deref(), Some("green"));
}

#[test]
fn short_varchar_widens_into_a_longer_one() {
    let (result, value, ctx) = replicate(
        col(ColumnKind::Varchar { length: 4 }),
        col(ColumnKind::Varchar { length: 100 }),
        "café",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("café"));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn binary_strings_keep_their_bytes() {
    let (result, value, _) = replicate(
        col(ColumnKind::Char { length: 6 }).with_collation(Collation::Binary),
        col(ColumnKind::Varchar { length: 6 }).with_collation(Collation::Binary),
        "abc",
        ConversionPolicy::default(),
    );
    result.unwrap();
    assert_eq!(value.as_deref(), Some("abc\0\0\0"));
}

#[test]
fn converter_is_cached_until_metadata_changes() {
    let dst = one(col(ColumnKind::BigInt));
    let mut applier = RowApplier::new(&dst, ConversionPolicy::default());
    let mut ctx = StoreContext::lenient();
    let mut row = dst.new_row();

    let small = one(col(ColumnKind::SmallInt));
    applier.apply(&image_of(&small, "5"), &mut row, &mut ctx).unwrap();
    assert_eq!(applier.converter(0).unwrap().conv_type(), ConvType::SubsetToSuperset);
    assert_eq!(applier.converter(0).unwrap().source_metadata().field_type(), FieldType::Short);

    let same = one(col(ColumnKind::BigInt));
    applier.apply(&image_of(&same, "6"), &mut row, &mut ctx).unwrap();
    assert_eq!(applier.converter(0).unwrap().conv_type(), ConvType::Precise);
    assert_eq!(dst.fields()[0].val_int(&row), Some(6));
}

#[test]
fn reused_destination_rows_keep_their_blob_slots() {
    let target = one(col(ColumnKind::Blob(BlobSize::Regular)));
    for source in [one(col(ColumnKind::Blob(BlobSize::Regular))), one(col(ColumnKind::Blob(BlobSize::Tiny)))] {
        let images = [image_of(&source, "payload"), image_of(&source, "")];
        let mut applier = RowApplier::new(&target, ConversionPolicy::default());
        let mut row = target.new_row();
        let mut ctx = StoreContext::lenient();
        for i in 0..500 {
            applier.apply(&images[i % 2], &mut row, &mut ctx).unwrap();
        }
        assert_eq!(target.fields()[0].val_string(&row).as_deref(), Some(""));
        assert_eq!(row.blobs().len(), 1);
    }
}

#[test]
fn null_values_and_absent_columns() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("a", ColumnKind::Int),
        ColumnDefinition::new("b", ColumnKind::Int),
        ColumnDefinition::new("c", ColumnKind::Int),
    ])
    .unwrap();
    let f = layout.fields();
    let mut ctx = StoreContext::lenient();
    let mut src = layout.new_row();
    f[0].store_int(&mut src, 1, &mut ctx);
    f[2].store_int(&mut src, 3, &mut ctx);

    let image = encode_row(&layout, &src, Some(&[true, true, false]));
    let mut dst = layout.new_row();
    f[1].store_int(&mut dst, 20, &mut ctx);
    f[2].store_int(&mut dst, 30, &mut ctx);
    RowApplier::new(&layout, ConversionPolicy::default())
        .apply(&image, &mut dst, &mut ctx)
        .unwrap();

    assert_eq!(f[0].val_int(&dst), Some(1));
    assert_eq!(f[1].val_int(&dst), None);
    assert_eq!(f[2].val_int(&dst), Some(30));
}

#[test]
fn null_into_not_null_column_aborts_under_strict_settings() {
    let nullable = one(col(ColumnKind::Int));
    let not_null = one(col(ColumnKind::Int).not_null());
    let image = encode_row(&nullable, &nullable.new_row(), None);

    let mut row = not_null.new_row();
    let mut lenient = StoreContext::lenient();
    RowApplier::new(&not_null, ConversionPolicy::default())
        .apply(&image, &mut row, &mut lenient)
        .unwrap();
    assert!(lenient.diagnostics().has_code(WarnCode::BadNull));

    let mut strict = StoreContext::strict();
    let err = RowApplier::new(&not_null, ConversionPolicy::default())
        .apply(&image, &mut row, &mut strict)
        .unwrap_err();
    assert!(matches!(err, FieldError::StoreAborted { .. }));
}

#[test]
fn null_row_images_carry_no_columns() {
    let layout = RowLayout::builder(vec![col(ColumnKind::Int).not_null()])
        .with_null_row_flag()
        .build()
        .unwrap();
    let mut row = layout.new_row();
    layout.set_null_row(&mut row, true);

    let image = encode_row(&layout, &row, None);
    let (header, columns) = image_columns(&image).unwrap();
    assert_eq!(header.flags(), FLAG_NULL_ROW);
    assert!(columns.is_empty());

    let mut dst = layout.new_row();
    RowApplier::from_config(&layout, &FieldConfig::lenient())
        .apply(&image, &mut dst, &mut StoreContext::lenient())
        .unwrap();
    assert!(layout.is_null_row(&dst));
    assert!(layout.fields()[0].is_null(&dst));
}

// ============================================================================
// FRAME VALIDATION
// ============================================================================

fn sample_image() -> (RowLayout, Vec<u8>) {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("a", ColumnKind::Int),
        ColumnDefinition::new("b", ColumnKind::Varchar { length: 10 }),
    ])
    .unwrap();
    let mut ctx = StoreContext::lenient();
    let mut row = layout.new_row();
    layout.fields()[0].store_int(&mut row, 7, &mut ctx);
    layout.fields()[1].store_text(&mut row, "seven", &mut ctx);
    let image = encode_row(&layout, &row, None);
    (layout, image)
}

fn apply(layout: &RowLayout, image: &[u8]) -> Result<(), FieldError> {
    let mut row = layout.new_row();
    RowApplier::new(layout, ConversionPolicy::default()).apply(image, &mut row, &mut StoreContext::lenient())
}

#[test]
fn image_columns_expose_the_wire_values() {
    let (_, image) = sample_image();
    let (header, columns) = image_columns(&image).unwrap();
    assert_eq!(header.column_count(), 2);
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].value, &7i32.to_le_bytes()[..]);
    assert_eq!(columns[1].metadata.as_ref().map(WireMetadata::field_type), Some(FieldType::Varchar));
    assert_eq!(columns[1].value, b"\x05seven");
}

#[test]
fn corrupted_payload_fails_the_checksum() {
    let (layout, mut image) = sample_image();
    let last = image.len() - 1;
    image[last] ^= 0x01;
    assert!(matches!(apply(&layout, &image), Err(FieldError::ChecksumMismatch { .. })));
}

#[test]
fn bad_magic_and_version_are_rejected() {
    let (layout, image) = sample_image();
    let mut bad = image.clone();
    bad[0] = b'X';
    assert!(matches!(apply(&layout, &bad), Err(FieldError::BadHeader(_))));

    let mut bad = image;
    bad[2] = 99;
    assert!(matches!(apply(&layout, &bad), Err(FieldError::BadHeader(_))));
}

#[test]
fn short_images_are_truncated_input() {
    let (layout, image) = sample_image();
    assert!(matches!(apply(&layout, &image[..10]), Err(FieldError::TruncatedInput { .. })));
    assert!(matches!(apply(&layout, &image[..image.len() - 1]), Err(FieldError::BadHeader(_))));
}

#[test]
fn column_count_must_match_the_destination() {
    let (_, image) = sample_image();
    let other = one(col(ColumnKind::Int));
    assert!(matches!(
        apply(&other, &image),
        Err(FieldError::ColumnCountMismatch { expected: 1, actual: 2 })
    ));
}

#[test]
fn unknown_type_codes_are_rejected() {
    let mut payload = vec![0b01, 0b00];
    payload.push(200);
    assert!(matches!(
        WireMetadata::decode(&payload[2..]),
        Err(FieldError::UnknownTypeCode(200))
    ));
}

#[test]
fn converter_resolution_reports_both_sides() {
    let dst = one(col(ColumnKind::Date));
    let source = WireMetadata::new(FieldType::Long, &[0]);
    let err = ColumnConverter::resolve(&source, &dst.fields()[0], ConversionPolicy::default()).unwrap_err();
    let shown = err.to_string();
    assert!(shown.contains("'c'"), "{shown}");
}

// ============================================================================
// LAYOUT-TO-LAYOUT COPY
// ============================================================================

#[test]
fn row_copier_matches_columns_by_name() {
    let src = RowLayout::new(vec![
        ColumnDefinition::new("id", ColumnKind::Int),
        ColumnDefinition::new("price", ColumnKind::Decimal { precision: 8, scale: 3 }),
        ColumnDefinition::new("note", ColumnKind::Blob(BlobSize::Regular)),
        ColumnDefinition::new("gone", ColumnKind::Int),
    ])
    .unwrap();
    let dst = RowLayout::new(vec![
        ColumnDefinition::new("NOTE", ColumnKind::Varchar { length: 64 }),
        ColumnDefinition::new("price", ColumnKind::Double { precision: None }),
        ColumnDefinition::new("id", ColumnKind::BigInt),
        ColumnDefinition::new("extra", ColumnKind::Int),
    ])
    .unwrap();

    let mut ctx = StoreContext::lenient();
    let mut row = src.new_row();
    src.fields()[0].store_int(&mut row, 9, &mut ctx);
    src.fields()[1].store_text(&mut row, "2.125", &mut ctx);
    src.fields()[2].store_text(&mut row, "hello", &mut ctx);

    let copier = RowCopier::new(&src, &dst);
    assert_eq!(copier.mapped_columns(), 3);
    let mut out: RowBuffer = dst.new_row();
    assert_eq!(copier.copy(&row, &mut out, &mut ctx), StoreStatus::Exact);

    assert_eq!(dst.fields()[0].val_string(&out).as_deref(), Some("hello"));
    assert_eq!(dst.fields()[1].val_real(&out), Some(2.125));
    assert_eq!(dst.fields()[2].val_int(&out), Some(9));
    assert!(dst.fields()[3].is_null(&out));
}

#[test]
fn copy_routes_follow_the_type_families() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("i", ColumnKind::Int),
        ColumnDefinition::new("i2", ColumnKind::Int),
        ColumnDefinition::new("s", ColumnKind::Varchar { length: 4 }),
        ColumnDefinition::new("d", ColumnKind::Decimal { precision: 5, scale: 0 }),
        ColumnDefinition::new("t", ColumnKind::Date),
        ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Tiny)),
        ColumnDefinition::new("b2", ColumnKind::Blob(BlobSize::Tiny)),
    ])
    .unwrap();
    let f = layout.fields();
    assert_eq!(FieldCopier::resolve(&f[0], &f[1]).route(), CopyRoute::Raw);
    assert_eq!(FieldCopier::resolve(&f[0], &f[2]).route(), CopyRoute::Text);
    assert_eq!(FieldCopier::resolve(&f[3], &f[0]).route(), CopyRoute::Decimal);
    assert_eq!(FieldCopier::resolve(&f[4], &f[3]).route(), CopyRoute::Temporal);
    assert_eq!(FieldCopier::resolve(&f[5], &f[6]).route(), CopyRoute::Text);
}
