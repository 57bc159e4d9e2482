//! Tests for the field module

use bumpalo::Bump;

use super::*;
use crate::config::FieldConfig;
use crate::diagnostics::{Severity, StoreContext, StoreStatus, WarnCode};
use crate::error::FieldError;
use crate::row::{BlobSize, ColumnDefinition, ColumnKind, RowLayout};
use crate::types::{Temporal, TemporalKind};

fn single(def: ColumnDefinition) -> RowLayout {
    RowLayout::new(vec![def]).unwrap()
}

fn key(field: &Field, row: &RowBuffer) -> Vec<u8> {
    let mut out = Vec::new();
    field.make_sort_key(row, &mut out, 1024);
    out
}

// ----------------------------------------------------------------------
// Integers
// ----------------------------------------------------------------------

#[test]
fn int_stores_and_reads_every_representation() {
    let layout = single(ColumnDefinition::new("n", ColumnKind::Int));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "-42", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(-42));
    assert_eq!(field.val_real(&row), Some(-42.0));
    assert_eq!(field.val_string(&row).as_deref(), Some("-42"));
    assert_eq!(field.val_decimal(&row).unwrap().to_string(), "-42");
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn tinyint_clamps_and_warns_out_of_range() {
    let layout = single(ColumnDefinition::new("t", ColumnKind::TinyInt));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_int(&mut row, 300, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(127));
    let cond = ctx.diagnostics().last().unwrap();
    assert_eq!(cond.severity, Severity::Warning);
    assert_eq!(cond.code, WarnCode::OutOfRange);
    assert_eq!(cond.message, "Out of range value for column 't' at row 1");
}

#[test]
fn unsigned_rejects_negative_by_clamping_to_zero() {
    let layout = single(ColumnDefinition::new("u", ColumnKind::SmallInt).unsigned());
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_int(&mut row, -1, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(0));
    assert_eq!(field.store_int(&mut row, 65535, &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(65535));
}

#[test]
fn strict_context_turns_out_of_range_into_fatal() {
    let layout = single(ColumnDefinition::new("t", ColumnKind::TinyInt));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::strict();

    assert_eq!(field.store_int(&mut row, 1000, &mut ctx), StoreStatus::Fatal);
    assert_eq!(ctx.diagnostics().count(Severity::Error), 1);
}

#[test]
fn int_text_with_trailing_garbage_is_truncated() {
    let layout = single(ColumnDefinition::new("n", ColumnKind::Int));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "12abc", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(12));
    assert!(ctx.diagnostics().has_code(WarnCode::DataTruncated));
}

#[test]
fn signed_int_sort_keys_follow_numeric_order() {
    let layout = single(ColumnDefinition::new("n", ColumnKind::Int).not_null());
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();

    let keys: Vec<Vec<u8>> = [i32::MIN, -1, 0, 1, i32::MAX]
        .iter()
        .map(|&v| {
            let mut row = layout.new_row();
            field.store_int(&mut row, v, &mut ctx);
            key(field, &row)
        })
        .collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "{:02x?} !< {:02x?}", pair[0], pair[1]);
    }
}

#[test]
fn zerofill_pads_display_width() {
    let layout = single(
        ColumnDefinition::new("z", ColumnKind::Int)
            .zerofill()
            .with_display_width(5),
    );
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_int(&mut row, 42, &mut ctx);
    assert_eq!(field.val_string(&row).as_deref(), Some("00042"));
}

#[test]
fn year_maps_short_zero_to_2000() {
    let layout = single(ColumnDefinition::new("y", ColumnKind::Year));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "00", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("2000"));
    assert_eq!(field.store_text(&mut row, "1999", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(1999));
}

// ----------------------------------------------------------------------
// Decimal and real
// ----------------------------------------------------------------------

#[test]
fn decimal_keeps_declared_scale() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Decimal { precision: 10, scale: 2 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "12345678.90", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("12345678.90"));
    assert_eq!(field.val_real(&row), Some(12345678.9));
}

#[test]
fn decimal_overflow_clamps_to_column_maximum() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Decimal { precision: 10, scale: 2 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "123456789.00", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("99999999.99"));
    assert!(ctx.diagnostics().has_code(WarnCode::OutOfRange));

    field.store_text(&mut row, "-123456789", &mut ctx);
    assert_eq!(field.val_string(&row).as_deref(), Some("-99999999.99"));
}

#[test]
fn decimal_rounding_records_a_note() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Decimal { precision: 5, scale: 1 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "1.25", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("1.3"));
    assert_eq!(ctx.diagnostics().last().unwrap().severity, Severity::Note);
}

#[test]
fn decimal_sort_key_orders_negative_before_positive() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Decimal { precision: 8, scale: 3 }).not_null());
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();

    let keys: Vec<Vec<u8>> = ["-500.5", "-0.001", "0", "0.001", "12.345"]
        .iter()
        .map(|v| {
            let mut row = layout.new_row();
            field.store_text(&mut row, v, &mut ctx);
            key(field, &row)
        })
        .collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn decimal_unpack_rejects_short_input() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Decimal { precision: 20, scale: 5 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "123.45", &mut ctx);
    let mut packed = Vec::new();
    field.pack(&row, &mut packed);
    let half = &packed[..packed.len() / 2];

    let mut other = layout.new_row();
    assert!(matches!(
        field.unpack(&mut other, half),
        Err(FieldError::TruncatedInput { .. })
    ));
}

#[test]
fn double_round_trips_through_text() {
    let layout = single(ColumnDefinition::new("r", ColumnKind::Double { precision: None }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "2.5e3", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_real(&row), Some(2500.0));
    assert_eq!(field.val_int(&row), Some(2500));
}

#[test]
fn float_sort_keys_follow_numeric_order() {
    let layout = single(ColumnDefinition::new("f", ColumnKind::Float { precision: None }).not_null());
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();

    let keys: Vec<Vec<u8>> = [-1e10, -1.5, 0.0, 0.25, 3.0e20]
        .iter()
        .map(|&v| {
            let mut row = layout.new_row();
            field.store_real(&mut row, v, &mut ctx);
            key(field, &row)
        })
        .collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

// ----------------------------------------------------------------------
// Strings
// ----------------------------------------------------------------------

#[test]
fn char_pads_on_store_and_trims_on_read() {
    let layout = single(ColumnDefinition::new("c", ColumnKind::Char { length: 4 }).with_collation(Collation::Latin1Bin));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "ab", &mut ctx), StoreStatus::Exact);
    let at = field.offset();
    assert_eq!(&row.as_bytes()[at..at + 4], b"ab  ");
    assert_eq!(field.val_string(&row).as_deref(), Some("ab"));
}

#[test]
fn char_cut_warns_on_data_but_not_on_spaces() {
    let layout = single(ColumnDefinition::new("c", ColumnKind::Char { length: 3 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "abc   ", &mut ctx), StoreStatus::Exact);
    assert!(ctx.diagnostics().is_empty());

    assert_eq!(field.store_text(&mut row, "abcdef", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("abc"));
    assert!(ctx.diagnostics().has_code(WarnCode::DataTruncated));
}

#[test]
fn varchar_space_cut_records_a_note() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 3 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "ab    ", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("ab "));
    assert_eq!(ctx.diagnostics().last().unwrap().severity, Severity::Note);
}

#[test]
fn varchar_counts_characters_not_bytes() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 2 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "éü", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("éü"));
}

#[test]
fn general_ci_compares_pad_and_case_insensitively() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 10 }));
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();
    let mut a = layout.new_row();
    let mut b = layout.new_row();

    field.store_text(&mut a, "abc", &mut ctx);
    field.store_text(&mut b, "ABC ", &mut ctx);
    assert_eq!(field.cmp(&a, &b), Ordering::Equal);
    assert_eq!(key(field, &a), key(field, &b));

    field.store_text(&mut b, "abd", &mut ctx);
    assert_eq!(field.cmp(&a, &b), Ordering::Less);
    assert!(key(field, &a) < key(field, &b));
}

#[test]
fn binary_varchar_is_byte_exact() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 10 }).with_collation(Collation::Binary));
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();
    let mut a = layout.new_row();
    let mut b = layout.new_row();

    field.store_text(&mut a, "abc", &mut ctx);
    field.store_text(&mut b, "abc ", &mut ctx);
    assert_eq!(field.cmp(&a, &b), Ordering::Less);
}

#[test]
fn invalid_utf8_is_reported() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 10 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    let status = field.store_str(&mut row, b"ab\xff\xfe", Charset::Utf8mb4, &mut ctx);
    assert_eq!(status, StoreStatus::Truncated);
    assert!(ctx.diagnostics().has_code(WarnCode::InvalidCharacterString));
}

#[test]
fn varchar_pack_is_length_prefixed() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 10 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "hey", &mut ctx);
    let mut packed = Vec::new();
    field.pack(&row, &mut packed);
    assert_eq!(packed[0], 3);
    assert_eq!(&packed[1..], b"hey");

    let mut other = layout.new_row();
    assert_eq!(field.unpack(&mut other, &packed).unwrap(), 4);
    assert_eq!(field.val_string(&other).as_deref(), Some("hey"));
}

#[test]
fn varchar_unpack_rejects_length_beyond_capacity() {
    let layout = single(ColumnDefinition::new("v", ColumnKind::Varchar { length: 2 }).with_collation(Collation::Latin1Bin));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();

    assert!(field.unpack(&mut row, &[5, b'a', b'b', b'c', b'd', b'e']).is_err());
}

// ----------------------------------------------------------------------
// Blobs
// ----------------------------------------------------------------------

#[test]
fn blob_values_live_in_the_row_heap() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Regular)));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    let text = "x".repeat(1000);
    assert_eq!(field.store_text(&mut row, &text, &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some(text.as_str()));
    assert_eq!(row.blobs().len(), 1);

    field.store_text(&mut row, "short", &mut ctx);
    assert_eq!(field.val_string(&row).as_deref(), Some("short"));
}

#[test]
fn clearing_a_blob_keeps_its_heap_slot() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Regular)));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    for i in 0..1000 {
        field.store_text(&mut row, &format!("payload {i}"), &mut ctx);
        field.store_text(&mut row, "", &mut ctx);
        assert_eq!(field.val_string(&row).as_deref(), Some(""));
        field.store_null(&mut row, &mut ctx);
    }
    assert_eq!(row.blobs().len(), 1);

    field.store_text(&mut row, "back", &mut ctx);
    assert_eq!(field.val_string(&row).as_deref(), Some("back"));
    assert_eq!(row.blobs().len(), 1);
}

#[test]
fn tinyblob_cuts_to_255_bytes() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Tiny)).with_collation(Collation::Binary));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    let text = "y".repeat(300);
    assert_eq!(field.store_text(&mut row, &text, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_bytes(&row).unwrap().len(), 255);
}

#[test]
fn copied_row_owns_its_blobs() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Medium)));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "payload", &mut ctx);
    let copy = layout.copy_row(&row).unwrap();
    drop(row);
    assert_eq!(field.val_string(&copy).as_deref(), Some("payload"));
}

#[test]
fn blob_pack_round_trips() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Blob(BlobSize::Regular)));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "hello blob", &mut ctx);
    let mut packed = Vec::new();
    field.pack(&row, &mut packed);
    assert_eq!(packed.len(), 2 + 10);

    let mut other = layout.new_row();
    assert_eq!(field.unpack(&mut other, &packed).unwrap(), packed.len());
    assert_eq!(field.val_string(&other).as_deref(), Some("hello blob"));
}

// ----------------------------------------------------------------------
// Temporals
// ----------------------------------------------------------------------

#[test]
fn date_parses_and_formats() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Date));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "2024-02-29", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("2024-02-29"));
    assert_eq!(field.val_int(&row), Some(20240229));
}

#[test]
fn impossible_date_stores_zero_with_warning() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Date));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "2023-02-30", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("0000-00-00"));
    assert!(ctx.diagnostics().has_code(WarnCode::TruncatedWrongValue));
}

#[test]
fn datetime_drops_extra_fraction_digits_with_a_note() {
    let layout = single(ColumnDefinition::new("t", ColumnKind::DateTime { fsp: 3 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    let status = field.store_text(&mut row, "2024-01-15 10:20:30.123456", &mut ctx);
    assert_eq!(status, StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("2024-01-15 10:20:30.123"));
    assert_eq!(ctx.diagnostics().last().unwrap().severity, Severity::Note);
}

#[test]
fn time_clamps_beyond_838_hours() {
    let layout = single(ColumnDefinition::new("t", ColumnKind::Time { fsp: 0 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "-12:30:00", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("-12:30:00"));

    assert_eq!(field.store_int(&mut row, 9_000_000, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("838:59:59"));
}

#[test]
fn temporal_sort_keys_follow_chronology() {
    let layout = single(ColumnDefinition::new("t", ColumnKind::DateTime { fsp: 6 }).not_null());
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();

    let keys: Vec<Vec<u8>> = [
        "1999-12-31 23:59:59.999999",
        "2000-01-01 00:00:00",
        "2000-01-01 00:00:00.000001",
        "2038-01-19 03:14:07",
    ]
    .iter()
    .map(|v| {
        let mut row = layout.new_row();
        field.store_text(&mut row, v, &mut ctx);
        key(field, &row)
    })
    .collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn legacy_and_fractional_datetime_agree_on_values() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("old", ColumnKind::DateTime { fsp: 0 }).legacy_format(),
        ColumnDefinition::new("new", ColumnKind::DateTime { fsp: 0 }),
    ])
    .unwrap();
    let old = layout.field(0).unwrap();
    let new = layout.field(1).unwrap();
    assert_eq!(old.field_type(), FieldType::Datetime);
    assert_eq!(new.field_type(), FieldType::Datetime2);

    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();
    let value = Temporal::datetime(2021, 7, 4, 12, 0, 1, 0);
    old.store_temporal(&mut row, &value, &mut ctx);
    new.store_temporal(&mut row, &value, &mut ctx);
    assert_eq!(old.val_string(&row), new.val_string(&row));
    assert_eq!(old.val_temporal(&row), Some(value));
}

#[test]
fn timestamp_outside_range_stores_zero() {
    let layout = single(ColumnDefinition::new("ts", ColumnKind::Timestamp { fsp: 0 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "2040-01-01 00:00:00", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_string(&row).as_deref(), Some("0000-00-00 00:00:00"));

    assert_eq!(field.store_text(&mut row, "2020-06-01 08:00:00", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("2020-06-01 08:00:00"));
}

#[test]
fn date_read_as_datetime_has_midnight_clock() {
    let layout = single(ColumnDefinition::new("d", ColumnKind::Date));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "2022-03-04", &mut ctx);
    let dt = field.val_temporal_as(&row, TemporalKind::DateTime).unwrap();
    assert_eq!(dt, Temporal::datetime(2022, 3, 4, 0, 0, 0, 0));
}

// ----------------------------------------------------------------------
// ENUM, SET, BIT
// ----------------------------------------------------------------------

fn sizes() -> Vec<String> {
    ["small", "medium", "large"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn enum_matches_labels_case_insensitively() {
    let layout = single(ColumnDefinition::new("e", ColumnKind::Enum(sizes())));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "MEDIUM", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(2));
    assert_eq!(field.val_string(&row).as_deref(), Some("medium"));

    assert_eq!(field.store_text(&mut row, "3", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_string(&row).as_deref(), Some("large"));
}

#[test]
fn enum_unknown_label_stores_empty_index() {
    let layout = single(ColumnDefinition::new("e", ColumnKind::Enum(sizes())));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "huge", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(0));
    assert_eq!(field.val_string(&row).as_deref(), Some(""));
}

#[test]
fn set_builds_member_bitmask() {
    let members = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let layout = single(ColumnDefinition::new("s", ColumnKind::Set(members)));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_text(&mut row, "c,a", &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(0b101));
    assert_eq!(field.val_string(&row).as_deref(), Some("a,c"));

    assert_eq!(field.store_text(&mut row, "a,zz", &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(0b001));
}

#[test]
fn bit_reads_big_endian_bytes() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Bit { length: 12 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    assert_eq!(field.store_int(&mut row, 0xABC, &mut ctx), StoreStatus::Exact);
    assert_eq!(field.val_int(&row), Some(0xABC));
    assert_eq!(field.val_bytes(&row).unwrap(), vec![0x0A, 0xBC]);

    assert_eq!(field.store_int(&mut row, 0x1000, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(0xFFF));
}

#[test]
fn bit_pack_rejects_values_wider_than_the_column() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Bit { length: 4 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();

    assert_eq!(field.unpack(&mut row, &[0x0F]).unwrap(), 1);
    assert_eq!(field.val_int(&row), Some(15));
    assert!(field.unpack(&mut row, &[0x1F]).is_err());
}

#[test]
fn bit_leftover_bits_order_values_that_share_whole_bytes() {
    let layout = single(ColumnDefinition::new("b", ColumnKind::Bit { length: 10 }));
    let field = layout.field(0).unwrap();
    let FieldKind::Bit(codec) = field.kind() else {
        panic!("expected a BIT codec");
    };
    assert!(codec.uneven().is_some());
    assert_eq!(field.pack_length(), 1);

    let mut ctx = StoreContext::lenient();
    let mut low = layout.new_row();
    let mut high = layout.new_row();
    field.store_int(&mut low, 0x1AB, &mut ctx);
    field.store_int(&mut high, 0x2AB, &mut ctx);

    let at = field.offset();
    assert_eq!(&low.as_bytes()[at..], &high.as_bytes()[at..]);
    assert_ne!(&low.as_bytes()[..at], &high.as_bytes()[..at]);

    assert_eq!(field.cmp(&low, &high), std::cmp::Ordering::Less);
    assert_eq!(field.cmp(&high, &low), std::cmp::Ordering::Greater);
    assert_eq!(key(field, &low), vec![1, 0x01, 0xAB]);
    assert_eq!(key(field, &high), vec![1, 0x02, 0xAB]);

    let mut packed = Vec::new();
    field.pack(&high, &mut packed);
    assert_eq!(packed, vec![0x02, 0xAB]);
    let mut copy = layout.new_row();
    assert_eq!(field.unpack(&mut copy, &packed).unwrap(), 2);
    assert_eq!(field.val_int(&copy), Some(0x2AB));
    assert_eq!(field.cmp(&copy, &high), std::cmp::Ordering::Equal);
    assert!(!field.is_null(&copy));
}

// ----------------------------------------------------------------------
// NULL handling
// ----------------------------------------------------------------------

#[test]
fn new_row_starts_nullable_columns_as_null() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("a", ColumnKind::Int),
        ColumnDefinition::new("b", ColumnKind::Int).not_null(),
    ])
    .unwrap();
    let row = layout.new_row();
    assert!(layout.field(0).unwrap().is_null(&row));
    assert!(!layout.field(1).unwrap().is_null(&row));
    assert_eq!(layout.field(0).unwrap().val_int(&row), None);
    assert_eq!(layout.field(1).unwrap().val_int(&row), Some(0));
}

#[test]
fn storing_a_value_clears_the_null_bit() {
    let layout = single(ColumnDefinition::new("a", ColumnKind::Varchar { length: 5 }));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_text(&mut row, "x", &mut ctx);
    assert!(!field.is_null(&row));
    assert_eq!(field.store_null(&mut row, &mut ctx), StoreStatus::Exact);
    assert!(field.is_null(&row));
    assert!(!field.val_str(&row, &mut Vec::new()));
}

#[test]
fn null_into_not_null_column_resets_and_warns() {
    let layout = single(ColumnDefinition::new("a", ColumnKind::Int).not_null());
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();

    field.store_int(&mut row, 9, &mut ctx);
    assert_eq!(field.store_null(&mut row, &mut ctx), StoreStatus::Truncated);
    assert_eq!(field.val_int(&row), Some(0));
    assert_eq!(
        ctx.diagnostics().last().unwrap().message,
        "Column 'a' cannot be null"
    );

    let mut strict = StoreContext::strict();
    assert_eq!(field.store_null(&mut row, &mut strict), StoreStatus::Fatal);
}

#[test]
fn null_sorts_first_with_a_zero_marker() {
    let layout = single(ColumnDefinition::new("a", ColumnKind::Int));
    let field = layout.field(0).unwrap();
    let mut ctx = StoreContext::lenient();
    let null_row = layout.new_row();
    let mut row = layout.new_row();
    field.store_int(&mut row, i32::MIN, &mut ctx);

    let null_key = key(field, &null_row);
    let value_key = key(field, &row);
    assert_eq!(null_key, vec![0, 0, 0, 0, 0]);
    assert_eq!(value_key[0], 1);
    assert!(null_key < value_key);
    assert_eq!(field.cmp(&null_row, &row), Ordering::Less);
}

#[test]
fn silent_check_fields_records_nothing() {
    let config = FieldConfig {
        check_fields: crate::config::CheckFields::Ignore,
        ..FieldConfig::lenient()
    };
    let layout = single(ColumnDefinition::new("t", ColumnKind::TinyInt));
    let field = layout.field(0).unwrap();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::new(config);

    assert_eq!(field.store_int(&mut row, 1000, &mut ctx), StoreStatus::Truncated);
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn arena_text_matches_owned_text() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("i", ColumnKind::Int).zerofill(),
        ColumnDefinition::new("v", ColumnKind::Varchar { length: 20 }),
        ColumnDefinition::new("t", ColumnKind::DateTime { fsp: 2 }),
        ColumnDefinition::new("s", ColumnKind::Set(sizes())),
        ColumnDefinition::new("n", ColumnKind::Double { precision: None }),
    ])
    .unwrap();
    let f = layout.fields();
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();
    f[0].store_int(&mut row, 42, &mut ctx);
    f[1].store_text(&mut row, "grüße", &mut ctx);
    f[2].store_text(&mut row, "2020-02-29 23:59:59.5", &mut ctx);
    f[3].store_text(&mut row, "large,small", &mut ctx);

    let arena = Bump::new();
    for field in f {
        assert_eq!(field.val_str_in(&row, &arena).map(<[u8]>::to_vec), field.val_bytes(&row));
    }
    assert_eq!(f[0].val_str_in(&row, &arena), Some(&b"0000000042"[..]));
    assert_eq!(f[3].val_str_in(&row, &arena), Some(&b"small,large"[..]));
    assert_eq!(f[4].val_str_in(&row, &arena), None);
}

// ----------------------------------------------------------------------
// Metadata
// ----------------------------------------------------------------------

#[test]
fn wire_metadata_describes_the_column() {
    let layout = RowLayout::new(vec![
        ColumnDefinition::new("d", ColumnKind::Decimal { precision: 12, scale: 4 }),
        ColumnDefinition::new("v", ColumnKind::Varchar { length: 100 }),
        ColumnDefinition::new("t", ColumnKind::DateTime { fsp: 3 }),
    ])
    .unwrap();

    let d = layout.field(0).unwrap().wire_metadata();
    assert_eq!(d.field_type(), FieldType::NewDecimal);
    assert_eq!(d.precision_scale(), (12, 4));

    let v = layout.field(1).unwrap().wire_metadata();
    assert_eq!(v.field_type(), FieldType::Varchar);
    assert_eq!(v.max_bytes(), 400);

    let t = layout.field(2).unwrap().wire_metadata();
    assert_eq!(t.field_type(), FieldType::Datetime2);
    assert_eq!(t.fsp(), 3);
}

#[test]
fn relocated_field_reads_at_new_offset() {
    let layout = single(ColumnDefinition::new("a", ColumnKind::SmallInt).not_null());
    let field = layout.field(0).unwrap();
    let moved = field.relocated(field.offset() + 2);
    let mut row = RowBuffer::new(layout.record_length() + 2);
    let mut ctx = StoreContext::lenient();

    moved.store_int(&mut row, 777, &mut ctx);
    assert_eq!(moved.val_int(&row), Some(777));
    assert_eq!(moved.offset(), field.offset() + 2);
}
