//! Usage limits with the unlimited sentinel
//!
//! Limits are configured as plain integers; `-1` means unlimited. The enum
//! keeps the sentinel out of arithmetic while the serde impls preserve the
//! configuration wire format.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Per-window usage limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// No cap; admissions always succeed for this window
    Unlimited,
    /// At most this many admissions per period (0 = feature disabled)
    Finite(u64),
}

impl Limit {
    /// Build from the raw configured value (`-1` = unlimited)
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Limit::Unlimited
        } else {
            Limit::Finite(raw as u64)
        }
    }

    /// Raw wire representation (`-1` = unlimited)
    pub fn as_raw(&self) -> i64 {
        match self {
            Limit::Unlimited => -1,
            Limit::Finite(n) => *n as i64,
        }
    }

    /// Whether one more admission is allowed given the current count
    pub fn permits(&self, count: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Finite(cap) => count < *cap,
        }
    }

    /// Admissions left before exhaustion (`None` = unlimited)
    pub fn remaining(&self, count: u64) -> Option<u64> {
        match self {
            Limit::Unlimited => None,
            Limit::Finite(cap) => Some(cap.saturating_sub(count)),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => write!(f, "unlimited"),
            Limit::Finite(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Limit::from_raw(i64::deserialize(deserializer)?))
    }
}
