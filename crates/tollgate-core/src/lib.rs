//! Tollgate Core - Shared domain types for the quota engine
//!
//! This crate provides the vocabulary every other tollgate crate speaks:
//! - Value objects: validated feature/tier identifiers, subscriber ids
//! - Window kinds and the resolver that maps them to canonical UTC periods
//! - Limits with the unlimited sentinel
//! - Admission decisions and per-window standings
//! - The error taxonomy
//! - Lock-free engine counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decision;
pub mod error;
pub mod id;
pub mod limit;
pub mod metrics;
pub mod window;

pub use decision::*;
pub use error::*;
pub use id::*;
pub use limit::*;
pub use metrics::*;
pub use window::*;
