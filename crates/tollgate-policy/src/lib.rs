//! Tollgate Policy - Tier policy store
//!
//! Declarative quota policy: which limits each subscription tier grants each
//! metered feature, per window kind. The table is pure data loaded from TOML;
//! the store wraps it in a lock-free hot-swap cell so operators can reload
//! policy without restarting or stalling admissions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;
pub mod table;

pub use store::*;
pub use table::*;
