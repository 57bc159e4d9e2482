//! # Store Diagnostics
//!
//! Lossy stores do not fail. They write the best representation they can,
//! record a SQL-style condition and return a [`StoreStatus`]:
//!
//! | Status | Code | Meaning |
//! |--------|------|---------|
//! | `Exact` | 0 | value stored as given |
//! | `Truncated` | 1 | clamped, rounded or partly parsed; condition recorded |
//! | `Fatal` | -1 | condition escalated by strict settings |
//!
//! A [`StoreContext`] lives for one statement. It owns the [`FieldConfig`],
//! the collected [`Diagnostics`] and the current row number. Each store
//! borrows it through a [`StoreScope`] naming the column so messages read
//! like "Out of range value for column 'a' at row 3".

use std::fmt;

use crate::config::{CheckFields, FieldConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "Note",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        })
    }
}

/// Condition codes, numbered as SQL clients expect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum WarnCode {
    BadNull = 1048,
    OutOfRange = 1264,
    DataTruncated = 1265,
    TruncatedWrongValue = 1292,
    InvalidCharacterString = 1300,
    IncorrectValue = 1366,
}

impl WarnCode {
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub severity: Severity,
    pub code: WarnCode,
    pub message: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code.code(), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    conditions: Vec<Condition>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        tracing::trace!(
            severity = %condition.severity,
            code = condition.code.code(),
            message = %condition.message,
            "store condition"
        );
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.conditions
            .iter()
            .filter(|c| c.severity == severity)
            .count()
    }

    pub fn has_code(&self, code: WarnCode) -> bool {
        self.conditions.iter().any(|c| c.code == code)
    }

    pub fn last(&self) -> Option<&Condition> {
        self.conditions.last()
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}

/// Outcome of a single store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreStatus {
    Exact,
    Truncated,
    Fatal,
}

impl StoreStatus {
    /// Numeric form: 0 exact, 1 truncated, -1 fatal.
    pub fn code(self) -> i32 {
        match self {
            StoreStatus::Exact => 0,
            StoreStatus::Truncated => 1,
            StoreStatus::Fatal => -1,
        }
    }

    pub fn is_exact(self) -> bool {
        self == StoreStatus::Exact
    }

    pub fn is_fatal(self) -> bool {
        self == StoreStatus::Fatal
    }

    /// The worse of two outcomes.
    pub fn merge(self, other: StoreStatus) -> StoreStatus {
        self.max(other)
    }
}

/// Statement-scoped sink for store conditions.
#[derive(Debug, Clone)]
pub struct StoreContext {
    config: FieldConfig,
    diagnostics: Diagnostics,
    row: u64,
}

impl StoreContext {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::new(),
            row: 1,
        }
    }

    pub fn strict() -> Self {
        Self::new(FieldConfig::strict())
    }

    pub fn lenient() -> Self {
        Self::new(FieldConfig::lenient())
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// 1-based row number used in condition messages.
    pub fn row(&self) -> u64 {
        self.row
    }

    pub fn next_row(&mut self) {
        self.row += 1;
    }

    pub fn scope<'a>(&'a mut self, column: &'a str) -> StoreScope<'a> {
        StoreScope { ctx: self, column }
    }
}

/// A [`StoreContext`] narrowed to one column.
pub struct StoreScope<'a> {
    ctx: &'a mut StoreContext,
    column: &'a str,
}

impl<'a> StoreScope<'a> {
    pub fn column(&self) -> &str {
        self.column
    }

    pub fn config(&self) -> &FieldConfig {
        &self.ctx.config
    }

    pub fn row(&self) -> u64 {
        self.ctx.row
    }

    /// Records a warning (an error under strict settings) and returns the
    /// matching status.
    pub fn warn(&mut self, code: WarnCode, message: String) -> StoreStatus {
        if self.ctx.config.strict {
            self.ctx.diagnostics.push(Condition {
                severity: Severity::Error,
                code,
                message,
            });
            return StoreStatus::Fatal;
        }
        if self.ctx.config.check_fields == CheckFields::Warn {
            self.ctx.diagnostics.push(Condition {
                severity: Severity::Warning,
                code,
                message,
            });
        }
        StoreStatus::Truncated
    }

    /// Records a note. Notes never escalate.
    pub fn note(&mut self, code: WarnCode, message: String) {
        if self.ctx.config.check_fields == CheckFields::Warn {
            self.ctx.diagnostics.push(Condition {
                severity: Severity::Note,
                code,
                message,
            });
        }
    }

    pub fn out_of_range(&mut self) -> StoreStatus {
        let message = format!(
            "Out of range value for column '{}' at row {}",
            self.column, self.ctx.row
        );
        self.warn(WarnCode::OutOfRange, message)
    }

    pub fn data_truncated(&mut self) -> StoreStatus {
        let message = format!(
            "Data truncated for column '{}' at row {}",
            self.column, self.ctx.row
        );
        self.warn(WarnCode::DataTruncated, message)
    }

    pub fn note_truncated(&mut self) {
        let message = format!(
            "Data truncated for column '{}' at row {}",
            self.column, self.ctx.row
        );
        self.note(WarnCode::DataTruncated, message);
    }

    pub fn incorrect_value(&mut self, type_name: &str, value: &[u8]) -> StoreStatus {
        let message = format!(
            "Incorrect {} value: '{}' for column '{}' at row {}",
            type_name,
            String::from_utf8_lossy(value),
            self.column,
            self.ctx.row
        );
        self.warn(WarnCode::IncorrectValue, message)
    }

    /// Temporal input that could not be interpreted.
    pub fn wrong_value(&mut self, type_name: &str, value: &[u8]) -> StoreStatus {
        let message = format!(
            "Incorrect {} value: '{}' for column '{}' at row {}",
            type_name,
            String::from_utf8_lossy(value),
            self.column,
            self.ctx.row
        );
        self.warn(WarnCode::TruncatedWrongValue, message)
    }

    pub fn invalid_string(&mut self, charset: &str, value: &[u8]) -> StoreStatus {
        let shown: String = value
            .iter()
            .take(6)
            .map(|b| format!("\\x{b:02X}"))
            .collect();
        let message = format!(
            "Invalid {} character string: '{}' for column '{}' at row {}",
            charset, shown, self.column, self.ctx.row
        );
        self.warn(WarnCode::InvalidCharacterString, message)
    }

    pub fn bad_null(&mut self) -> StoreStatus {
        let message = format!("Column '{}' cannot be null", self.column);
        self.warn(WarnCode::BadNull, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_warning_returns_truncated_and_records_condition() {
        let mut ctx = StoreContext::lenient();
        let status = ctx.scope("a").out_of_range();
        assert_eq!(status, StoreStatus::Truncated);
        assert_eq!(status.code(), 1);
        let cond = &ctx.diagnostics().conditions()[0];
        assert_eq!(cond.severity, Severity::Warning);
        assert_eq!(cond.code, WarnCode::OutOfRange);
        assert_eq!(cond.message, "Out of range value for column 'a' at row 1");
    }

    #[test]
    fn strict_warning_escalates_to_fatal() {
        let mut ctx = StoreContext::strict();
        let status = ctx.scope("a").data_truncated();
        assert_eq!(status, StoreStatus::Fatal);
        assert_eq!(status.code(), -1);
        assert_eq!(ctx.diagnostics().count(Severity::Error), 1);
    }

    #[test]
    fn notes_never_escalate() {
        let mut ctx = StoreContext::strict();
        ctx.scope("a").note_truncated();
        assert_eq!(ctx.diagnostics().count(Severity::Note), 1);
        assert_eq!(ctx.diagnostics().count(Severity::Error), 0);
    }

    #[test]
    fn ignore_mode_records_nothing_but_still_reports_truncation() {
        let mut ctx = StoreContext::new(FieldConfig::lenient().with_check_fields(CheckFields::Ignore));
        assert_eq!(ctx.scope("a").out_of_range(), StoreStatus::Truncated);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn row_number_advances_in_messages() {
        let mut ctx = StoreContext::lenient();
        ctx.next_row();
        ctx.next_row();
        ctx.scope("b").out_of_range();
        assert!(ctx.diagnostics().conditions()[0].message.ends_with("at row 3"));
    }

    #[test]
    fn merge_keeps_the_worst_status() {
        assert_eq!(StoreStatus::Exact.merge(StoreStatus::Truncated), StoreStatus::Truncated);
        assert_eq!(StoreStatus::Fatal.merge(StoreStatus::Truncated), StoreStatus::Fatal);
    }
}
