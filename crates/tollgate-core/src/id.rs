//! Identifier value objects
//!
//! Identifiers are:
//! - Immutable
//! - Comparable by value (not identity)
//! - Self-validating

use crate::error::QuotaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscriber identifier
pub type SubscriberId = Uuid;

/// Metered feature identifier (Value Object)
///
/// # Invariants
/// - Must be non-empty
/// - Max 64 characters
/// - Alphanumeric with hyphens/underscores only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create new feature ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, QuotaError> {
        Ok(Self(validate_id(id.into(), "feature")?))
    }

    /// Get inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription tier identifier (Value Object)
///
/// Same invariants as [`FeatureId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TierId(String);

impl TierId {
    /// Create new tier ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, QuotaError> {
        Ok(Self(validate_id(id.into(), "tier")?))
    }

    /// Get inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_id(id: String, what: &str) -> Result<String, QuotaError> {
    if id.is_empty() {
        return Err(QuotaError::InvalidId(format!("{what} id cannot be empty")));
    }
    if id.len() > 64 {
        return Err(QuotaError::InvalidId(format!("{what} id max 64 characters")));
    }
    if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(QuotaError::InvalidId(format!(
            "{what} id must be alphanumeric with hyphens/underscores: {id:?}"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_ids() {
        assert_eq!(FeatureId::new("coach").unwrap().as_str(), "coach");
        assert_eq!(FeatureId::new("pitch_tank-2").unwrap().as_str(), "pitch_tank-2");
        assert_eq!(TierId::new("builder").unwrap().as_str(), "builder");
    }

    #[test]
    fn rejects_empty_id() {
        assert!(FeatureId::new("").is_err());
        assert!(TierId::new("").is_err());
    }

    #[test]
    fn rejects_overlong_id() {
        assert!(FeatureId::new("x".repeat(65)).is_err());
        assert!(FeatureId::new("x".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(FeatureId::new("coach session").is_err());
        assert!(FeatureId::new("coach/1").is_err());
        assert!(TierId::new("free!").is_err());
    }

    #[test]
    fn display_matches_inner() {
        let id = FeatureId::new("sprint").unwrap();
        assert_eq!(id.to_string(), "sprint");
    }
}
