//! Declarative tier policy table
//!
//! Loaded from TOML:
//!
//! ```toml
//! features = ["coach", "tank", "sprint"]
//!
//! [tiers.free]
//! coach = { lifetime = 5 }
//! tank  = { lifetime = 2 }
//!
//! [tiers.builder]
//! coach  = { daily = 5 }
//! tank   = { weekly = 2 }
//! sprint = { monthly = 10 }
//!
//! [tiers.unlimited]
//! coach = { daily = -1 }   # -1 == unlimited
//! ```
//!
//! The `features` catalog is the source of truth for what exists: a feature
//! missing from a tier's section is unlimited for that tier, while a feature
//! missing from the catalog is an unknown feature. Absence of limits never
//! means "typo silently grants everything".

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tollgate_core::{FeatureId, Limit, QuotaError, QuotaResult, TierId, WindowKind};

/// Limits one tier grants one feature, by window kind
///
/// Window kinds absent from the map are unlimited (absence != zero).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowLimits {
    limits: BTreeMap<WindowKind, Limit>,
}

impl WindowLimits {
    /// Empty set: every window unlimited
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit for one window kind
    pub fn set(&mut self, kind: WindowKind, limit: Limit) {
        self.limits.insert(kind, limit);
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, kind: WindowKind, limit: Limit) -> Self {
        self.set(kind, limit);
        self
    }

    /// Explicitly configured limit for a kind, if any
    pub fn get(&self, kind: WindowKind) -> Option<Limit> {
        self.limits.get(&kind).copied()
    }

    /// Limit in force for a kind; unconfigured kinds are unlimited
    pub fn effective(&self, kind: WindowKind) -> Limit {
        self.get(kind).unwrap_or(Limit::Unlimited)
    }

    /// Whether no window kind is explicitly configured
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

/// Immutable policy table: tier -> feature -> window limits
///
/// Pure data, lookup only. Swapped wholesale by the store on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    features: BTreeSet<FeatureId>,
    tiers: HashMap<TierId, HashMap<FeatureId, WindowLimits>>,
}

impl PolicyTable {
    /// Parse and validate a policy table from TOML text
    pub fn from_toml_str(text: &str) -> QuotaResult<Self> {
        let raw: PolicyFile =
            toml::from_str(text).map_err(|e| QuotaError::PolicyLoad(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: PolicyFile) -> QuotaResult<Self> {
        let mut features = BTreeSet::new();
        for name in raw.features {
            let feature = FeatureId::new(name).map_err(|e| QuotaError::PolicyLoad(e.to_string()))?;
            if !features.insert(feature.clone()) {
                return Err(QuotaError::PolicyLoad(format!(
                    "duplicate feature in catalog: {feature}"
                )));
            }
        }

        let mut tiers = HashMap::new();
        for (tier_name, feature_limits) in raw.tiers {
            let tier = TierId::new(tier_name).map_err(|e| QuotaError::PolicyLoad(e.to_string()))?;
            let mut entries = HashMap::new();
            for (feature_name, windows) in feature_limits {
                let feature = FeatureId::new(feature_name)
                    .map_err(|e| QuotaError::PolicyLoad(e.to_string()))?;
                if !features.contains(&feature) {
                    return Err(QuotaError::PolicyLoad(format!(
                        "tier {tier} references feature {feature} missing from the catalog"
                    )));
                }
                let mut limits = WindowLimits::new();
                for (window_name, raw_limit) in windows {
                    let kind: WindowKind = window_name.parse()?;
                    if raw_limit < -1 {
                        return Err(QuotaError::PolicyLoad(format!(
                            "invalid limit {raw_limit} for {tier}/{feature}/{kind}: must be >= -1"
                        )));
                    }
                    limits.set(kind, Limit::from_raw(raw_limit));
                }
                entries.insert(feature, limits);
            }
            tiers.insert(tier, entries);
        }

        Ok(Self { features, tiers })
    }

    /// Limits `tier` grants `feature`
    ///
    /// A known feature with no entry under the tier is unlimited everywhere
    /// (empty [`WindowLimits`]). Unknown tiers and features fail closed.
    pub fn limits_for(&self, tier: &TierId, feature: &FeatureId) -> QuotaResult<WindowLimits> {
        if !self.features.contains(feature) {
            return Err(QuotaError::UnknownFeature(feature.to_string()));
        }
        let entries = self
            .tiers
            .get(tier)
            .ok_or_else(|| QuotaError::UnknownTier(tier.to_string()))?;
        Ok(entries.get(feature).cloned().unwrap_or_default())
    }

    /// Feature catalog, in stable order
    pub fn features(&self) -> impl Iterator<Item = &FeatureId> {
        self.features.iter()
    }

    /// Whether the tier is configured
    pub fn has_tier(&self, tier: &TierId) -> bool {
        self.tiers.contains_key(tier)
    }
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    features: Vec<String>,
    #[serde(default)]
    tiers: BTreeMap<String, BTreeMap<String, BTreeMap<String, i64>>>,
}
