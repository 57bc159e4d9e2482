//! # rowfield - Typed Column Values over Fixed-Layout Rows
//!
//! rowfield is the value-encoding layer of a relational storage engine. Every
//! SQL column type gets one codec that knows how to:
//!
//! - **Store** a string, integer, double, decimal or temporal into its
//!   in-row bytes, clamping or truncating with a recorded condition instead
//!   of failing
//! - **Read** the bytes back as any of those representations
//! - **Compare** two rows and build **sort keys** whose raw byte order
//!   matches the typed order
//! - **Pack / unpack** a compact, self-describing wire form for replication
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowfield::{ColumnDefinition, ColumnKind, RowLayout, StoreContext};
//!
//! let layout = RowLayout::new(vec![
//!     ColumnDefinition::new("id", ColumnKind::Int).not_null(),
//!     ColumnDefinition::new("price", ColumnKind::Decimal { precision: 10, scale: 2 }),
//! ])?;
//!
//! let mut ctx = StoreContext::lenient();
//! let mut row = layout.new_row();
//! let price = layout.field_by_name("price").unwrap();
//! price.store_text(&mut row, "12345678.90", &mut ctx);
//! assert_eq!(price.val_string(&row).as_deref(), Some("12345678.90"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  wire: row images, conversion matrix, copy   │
//! ├──────────────────────────────────────────────┤
//! │  row: RowLayout (DDL) │ RowBuffer, BlobHeap   │
//! ├──────────────────────────────────────────────┤
//! │  field: Field + one FieldCodec per type      │
//! ├──────────────────────────────────────────────┤
//! │  parsing │ charset │ types (Decimal, Temporal)│
//! ├──────────────────────────────────────────────┤
//! │  diagnostics │ config │ error │ telemetry     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`field`]: the column value family
//! - [`row`]: record buffers, null bits, layouts built from column definitions
//! - [`wire`]: wire metadata, row images, replication conversion
//! - [`types`]: type codes, capability records, decimal and temporal values
//! - [`parsing`]: shared string-to-number converters
//! - [`charset`]: character sets, collations, weight strings
//! - [`diagnostics`]: store statuses and SQL-style conditions
//! - [`config`]: limits and per-statement settings
//! - [`telemetry`]: feature usage counters
//!
//! ## Concurrency
//!
//! Nothing here locks. A [`RowBuffer`] is written by one caller at a time;
//! layouts and codecs are immutable and shared freely across threads.

#[macro_use]
mod macros;

pub mod charset;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod parsing;
pub mod row;
pub mod telemetry;
pub mod types;
pub mod wire;

pub use charset::{Charset, Collation};
pub use config::{CheckFields, ConversionPolicy, FieldConfig};
pub use diagnostics::{Condition, Diagnostics, Severity, StoreContext, StoreStatus, WarnCode};
pub use error::{FieldError, FieldResult};
pub use field::{Field, FieldCodec, FieldKind, TextSink};
pub use row::{BlobSize, ColumnDefinition, ColumnKind, RowBuffer, RowLayout};
pub use telemetry::{Feature, FeatureCounters};
pub use types::{Decimal, FieldType, Temporal, TemporalKind};
pub use wire::{encode_row, ConvType, RowApplier, WireMetadata};
