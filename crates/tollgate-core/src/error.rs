//! Error types for the quota engine

use thiserror::Error;
use uuid::Uuid;

/// Quota engine error type
///
/// A denied admission is not an error: it is a `Decision` with
/// `allowed = false`. Everything here is a genuine fault that fails closed
/// unless the engine is explicitly configured to fail open (see
/// `FailurePolicy` in the engine crate).
#[derive(Error, Debug, Clone)]
pub enum QuotaError {
    /// Tier absent from the policy table
    #[error("unknown tier: {0}")]
    UnknownTier(String),

    /// Feature absent from the configured feature catalog
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Subscriber absent from the directory
    #[error("unknown subscriber: {0}")]
    UnknownSubscriber(Uuid),

    /// Identifier failed value-object validation
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Policy file could not be read or parsed
    #[error("policy load error: {0}")]
    PolicyLoad(String),

    /// Counter storage unreachable or corrupt
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Result type for the quota engine
pub type QuotaResult<T> = Result<T, QuotaError>;
