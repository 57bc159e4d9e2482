//! # Configuration
//!
//! Two kinds of configuration reach the column family:
//!
//! - [`constants`]: compile-time limits with their dependencies asserted
//! - [`session`]: per-statement strictness, warning filters and the
//!   replication conversion policy
//!
//! Nothing here is loaded from files; the embedding server builds a
//! [`FieldConfig`] from whatever settings it owns and hands it to a
//! [`crate::StoreContext`].

pub mod constants;
mod session;

pub use constants::*;
pub use session::{CheckFields, ConversionPolicy, FieldConfig};
