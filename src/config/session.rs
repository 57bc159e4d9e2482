//! Statement-level settings that steer how stores report lossy input.

use super::constants::DEFAULT_MAX_SORT_LENGTH;

/// Whether conversion conditions are recorded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckFields {
    /// Store the best value silently.
    Ignore,
    /// Record a warning per lossy store.
    #[default]
    Warn,
}

/// Which replication conversions a destination accepts.
///
/// Precise and variant conversions are always accepted; impossible ones
/// never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPolicy {
    /// Accept subset-to-superset conversions.
    pub allow_non_lossy: bool,
    /// Accept superset-to-subset conversions.
    pub allow_lossy: bool,
    /// Turn any non-exact apply into [`crate::FieldError::LossyApply`].
    pub fail_on_truncation: bool,
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self {
            allow_non_lossy: true,
            allow_lossy: true,
            fail_on_truncation: false,
        }
    }
}

impl ConversionPolicy {
    /// No switch set: only precise and variant conversions replicate.
    pub fn empty() -> Self {
        Self {
            allow_non_lossy: false,
            allow_lossy: false,
            fail_on_truncation: false,
        }
    }

    pub fn with_fail_on_truncation(mut self, fail: bool) -> Self {
        self.fail_on_truncation = fail;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    /// Escalate warnings to errors (stores return the fatal status).
    pub strict: bool,
    pub check_fields: CheckFields,
    /// Record a note when trailing spaces are dropped from numeric input.
    pub truncation_notes: bool,
    pub max_sort_length: usize,
    pub conversion: ConversionPolicy,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::lenient()
    }
}

impl FieldConfig {
    /// Explicit CAST / DDL behaviour: warnings become errors.
    pub fn strict() -> Self {
        Self {
            strict: true,
            check_fields: CheckFields::Warn,
            truncation_notes: true,
            max_sort_length: DEFAULT_MAX_SORT_LENGTH,
            conversion: ConversionPolicy::default(),
        }
    }

    /// Implicit insert coercion: store the best value and warn.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            check_fields: CheckFields::Warn,
            truncation_notes: true,
            max_sort_length: DEFAULT_MAX_SORT_LENGTH,
            conversion: ConversionPolicy::default(),
        }
    }

    pub fn with_check_fields(mut self, check: CheckFields) -> Self {
        self.check_fields = check;
        self
    }

    pub fn with_truncation_notes(mut self, notes: bool) -> Self {
        self.truncation_notes = notes;
        self
    }

    pub fn with_max_sort_length(mut self, len: usize) -> Self {
        self.max_sort_length = len.max(4);
        self
    }

    pub fn with_conversion(mut self, policy: ConversionPolicy) -> Self {
        self.conversion = policy;
        self
    }
}
