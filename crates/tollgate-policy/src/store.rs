//! Lock-free policy store with hot-swapping

use crate::table::{PolicyTable, WindowLimits};
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tollgate_core::{FeatureId, QuotaError, QuotaResult, TierId};

/// Policy table behind an atomically swappable cell
///
/// Lookups never block; a reload publishes a whole new table and bumps the
/// version so callers can observe the swap.
pub struct PolicyStore {
    /// Current table (atomically swappable)
    table: ArcSwap<PolicyTable>,
    /// Version for cache invalidation and reload reporting
    version: AtomicU64,
}

impl PolicyStore {
    /// Create an empty store (no tiers, no features)
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(PolicyTable::default()),
            version: AtomicU64::new(0),
        }
    }

    /// Create with an initial table
    pub fn with_table(table: PolicyTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            version: AtomicU64::new(1),
        }
    }

    /// Load the initial table from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> QuotaResult<Self> {
        Ok(Self::with_table(read_table(path.as_ref())?))
    }

    /// Get current version
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Limits the tier grants the feature, from the current table
    #[inline]
    pub fn limits_for(&self, tier: &TierId, feature: &FeatureId) -> QuotaResult<WindowLimits> {
        self.table.load().limits_for(tier, feature)
    }

    /// Feature catalog of the current table
    pub fn features(&self) -> Vec<FeatureId> {
        self.table.load().features().cloned().collect()
    }

    /// Get the current table; lookups against it all see one version
    pub fn table(&self) -> Arc<PolicyTable> {
        self.table.load_full()
    }

    /// Atomically swap in a new table, returning the new version
    pub fn update(&self, new_table: PolicyTable) -> u64 {
        self.table.store(Arc::new(new_table));
        self.version.fetch_add(1, Ordering::Release) + 1
    }

    /// Re-read the TOML file and swap the table in one step
    ///
    /// A parse failure leaves the current table untouched.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> QuotaResult<u64> {
        Ok(self.update(read_table(path.as_ref())?))
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_table(path: &Path) -> QuotaResult<PolicyTable> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| QuotaError::PolicyLoad(format!("{}: {e}", path.display())))?;
    PolicyTable::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{Limit, WindowKind};

    const POLICY: &str = r#"
        features = ["coach"]

        [tiers.free]
        coach = { daily = 2 }
    "#;

    const POLICY_V2: &str = r#"
        features = ["coach"]

        [tiers.free]
        coach = { daily = 9 }
    "#;

    fn ids() -> (TierId, FeatureId) {
        (TierId::new("free").unwrap(), FeatureId::new("coach").unwrap())
    }

    #[test]
    fn starts_empty_at_version_zero() {
        let store = PolicyStore::new();
        let (tier, feature) = ids();
        assert_eq!(store.version(), 0);
        assert!(store.features().is_empty());
        assert!(store.limits_for(&tier, &feature).is_err());
    }

    #[test]
    fn update_swaps_table_and_bumps_version() {
        let store = PolicyStore::with_table(PolicyTable::from_toml_str(POLICY).unwrap());
        let (tier, feature) = ids();
        assert_eq!(store.version(), 1);
        assert_eq!(
            store.limits_for(&tier, &feature).unwrap().get(WindowKind::Daily),
            Some(Limit::Finite(2))
        );

        let version = store.update(PolicyTable::from_toml_str(POLICY_V2).unwrap());
        assert_eq!(version, 2);
        assert_eq!(store.version(), 2);
        assert_eq!(
            store.limits_for(&tier, &feature).unwrap().get(WindowKind::Daily),
            Some(Limit::Finite(9))
        );
    }

    #[test]
    fn reload_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("tollgate-policy-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, POLICY).unwrap();

        let store = PolicyStore::from_file(&path).unwrap();
        assert_eq!(store.version(), 1);

        std::fs::write(&path, POLICY_V2).unwrap();
        assert_eq!(store.reload_from_file(&path).unwrap(), 2);

        let (tier, feature) = ids();
        assert_eq!(
            store.limits_for(&tier, &feature).unwrap().get(WindowKind::Daily),
            Some(Limit::Finite(9))
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_reload_keeps_current_table() {
        let path = std::env::temp_dir().join(format!("tollgate-policy-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, POLICY).unwrap();
        let store = PolicyStore::from_file(&path).unwrap();

        std::fs::write(&path, "features = [not toml").unwrap();
        assert!(store.reload_from_file(&path).is_err());
        assert_eq!(store.version(), 1);

        let (tier, feature) = ids();
        assert_eq!(
            store.limits_for(&tier, &feature).unwrap().get(WindowKind::Daily),
            Some(Limit::Finite(2))
        );
        std::fs::remove_file(&path).ok();
    }
}
