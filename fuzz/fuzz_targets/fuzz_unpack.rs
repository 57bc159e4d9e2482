//! Fuzz testing for column unpacking.
//!
//! This fuzz target feeds arbitrary bytes to the `unpack` path of every
//! column kind to ensure truncated or corrupt wire values are rejected
//! without panicking or reading past the supplied slice, and that whatever
//! is accepted packs back to the same bytes.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use rowfield::{BlobSize, ColumnDefinition, ColumnKind, RowLayout};

#[derive(Debug, Arbitrary)]
struct UnpackInput {
    kind: FuzzKind,
    data: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzKind {
    TinyInt,
    MediumInt,
    BigInt,
    Year,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    Char { length: u8 },
    Varchar { length: u16 },
    TinyBlob,
    Blob,
    Date,
    Time { fsp: u8 },
    DateTime { fsp: u8 },
    LegacyDateTime,
    Timestamp { fsp: u8 },
    Enum { labels: u8 },
    Set { members: u8 },
    Bit { length: u8 },
}

fn labels(n: u8, cap: usize) -> Vec<String> {
    (1..=usize::from(n).clamp(1, cap)).map(|i| format!("l{i}")).collect()
}

impl FuzzKind {
    fn definition(self) -> ColumnDefinition {
        let kind = match self {
            FuzzKind::TinyInt => ColumnKind::TinyInt,
            FuzzKind::MediumInt => ColumnKind::MediumInt,
            FuzzKind::BigInt => ColumnKind::BigInt,
            FuzzKind::Year => ColumnKind::Year,
            FuzzKind::Float => ColumnKind::Float { precision: None },
            FuzzKind::Double => ColumnKind::Double { precision: None },
            FuzzKind::Decimal { precision, scale } => {
                let precision = precision % 65 + 1;
                ColumnKind::Decimal {
                    precision,
                    scale: scale % (precision.min(38) + 1),
                }
            }
            FuzzKind::Char { length } => ColumnKind::Char { length: u16::from(length) },
            FuzzKind::Varchar { length } => ColumnKind::Varchar {
                length: u32::from(length % 16_000),
            },
            FuzzKind::TinyBlob => ColumnKind::Blob(BlobSize::Tiny),
            FuzzKind::Blob => ColumnKind::Blob(BlobSize::Regular),
            FuzzKind::Date => ColumnKind::Date,
            FuzzKind::Time { fsp } => ColumnKind::Time { fsp: fsp % 7 },
            FuzzKind::DateTime { fsp } => ColumnKind::DateTime { fsp: fsp % 7 },
            FuzzKind::LegacyDateTime => {
                return ColumnDefinition::new("c", ColumnKind::DateTime { fsp: 0 }).legacy_format();
            }
            FuzzKind::Timestamp { fsp } => ColumnKind::Timestamp { fsp: fsp % 7 },
            FuzzKind::Enum { labels: n } => ColumnKind::Enum(labels(n, 255)),
            FuzzKind::Set { members: n } => ColumnKind::Set(labels(n, 64)),
            FuzzKind::Bit { length } => ColumnKind::Bit {
                length: length % 64 + 1,
            },
        };
        ColumnDefinition::new("c", kind)
    }
}

fuzz_target!(|input: UnpackInput| {
    let Ok(layout) = RowLayout::new(vec![input.kind.definition()]) else {
        return;
    };
    let field = &layout.fields()[0];
    let mut row = layout.new_row();
    let Ok(used) = field.unpack(&mut row, &input.data) else {
        return;
    };
    assert!(used <= input.data.len());

    let mut packed = Vec::new();
    field.pack(&row, &mut packed);
    let mut again = layout.new_row();
    let reused = field.unpack(&mut again, &packed).expect("packed value must unpack");
    assert_eq!(reused, packed.len());
    assert_eq!(field.val_bytes(&row), field.val_bytes(&again));
});
