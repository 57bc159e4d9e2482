//! Fuzz testing for the row image applier.
//!
//! Arbitrary frames are applied to a fixed destination layout, once as
//! they are and once with a valid header and checksum wrapped around the
//! fuzzed payload, so the column decoders are reached past the CRC check.

#![no_main]

use libfuzzer_sys::fuzz_target;

use rowfield::wire::image_columns;
use rowfield::{
    encode_row, BlobSize, ColumnDefinition, ColumnKind, ConversionPolicy, RowApplier, RowLayout,
    StoreContext,
};

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

fn destination() -> RowLayout {
    RowLayout::new(vec![
        ColumnDefinition::new("a", ColumnKind::BigInt),
        ColumnDefinition::new("b", ColumnKind::Varchar { length: 20 }),
        ColumnDefinition::new("c", ColumnKind::Decimal { precision: 12, scale: 3 }),
        ColumnDefinition::new("d", ColumnKind::DateTime { fsp: 4 }),
        ColumnDefinition::new("e", ColumnKind::Blob(BlobSize::Tiny)),
        ColumnDefinition::new("f", ColumnKind::Bit { length: 13 }),
    ])
    .expect("valid layout")
}

fn apply(layout: &RowLayout, image: &[u8]) {
    let mut row = layout.new_row();
    let mut ctx = StoreContext::lenient();
    let _ = RowApplier::new(layout, ConversionPolicy::default()).apply(image, &mut row, &mut ctx);
    let _ = image_columns(image);
}

fuzz_target!(|data: &[u8]| {
    let layout = destination();
    apply(&layout, data);

    let mut image = encode_row(&layout, &layout.new_row(), None);
    image.truncate(16);
    image[8..12].copy_from_slice(&(data.len() as u32).to_le_bytes());
    image[12..16].copy_from_slice(&CRC32.checksum(data).to_le_bytes());
    image.extend_from_slice(data);
    apply(&layout, &image);
});
