//! # Feature Counters
//!
//! Process-wide usage counters, bumped once per layout that uses a feature.
//! Reads are relaxed snapshots; counts are advisory.
//!
//! ```ignore
//! let counters = FeatureCounters::new();
//! layout.record_features(&counters);
//! assert!(counters.get(Feature::Blob) > 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Feature {
    FixedString,
    VarString,
    Blob,
    Decimal,
    LegacyTemporal,
    FractionalTemporal,
    Enum,
    Set,
    UnevenBit,
    ZeroFill,
    NullRowFlag,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::FixedString,
        Feature::VarString,
        Feature::Blob,
        Feature::Decimal,
        Feature::LegacyTemporal,
        Feature::FractionalTemporal,
        Feature::Enum,
        Feature::Set,
        Feature::UnevenBit,
        Feature::ZeroFill,
        Feature::NullRowFlag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::FixedString => "fixed_string",
            Feature::VarString => "var_string",
            Feature::Blob => "blob",
            Feature::Decimal => "decimal",
            Feature::LegacyTemporal => "legacy_temporal",
            Feature::FractionalTemporal => "fractional_temporal",
            Feature::Enum => "enum",
            Feature::Set => "set",
            Feature::UnevenBit => "uneven_bit",
            Feature::ZeroFill => "zerofill",
            Feature::NullRowFlag => "null_row_flag",
        }
    }
}

#[derive(Debug, Default)]
pub struct FeatureCounters {
    counts: [AtomicU64; Feature::ALL.len()],
}

impl FeatureCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self, feature: Feature) {
        self.counts[feature as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, feature: Feature) -> u64 {
        self.counts[feature as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        Feature::ALL.iter().map(|&f| (f.name(), self.get(f))).collect()
    }
}
