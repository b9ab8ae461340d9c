//! Admission decisions and per-window standings

use crate::id::FeatureId;
use crate::limit::Limit;
use crate::window::WindowKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standing of one window at decision time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStanding {
    /// Window kind this standing covers
    pub window: WindowKind,
    /// Limit in force at decision time
    pub limit: Limit,
    /// Usage recorded in the current period
    pub count: u64,
    /// When the window resets, `None` for lifetime
    pub reset_at: Option<DateTime<Utc>>,
}

impl WindowStanding {
    /// Admissions left before this window exhausts (`None` = unlimited)
    pub fn remaining(&self) -> Option<u64> {
        self.limit.remaining(self.count)
    }

    /// Whether the window would reject the next attempt
    pub fn exhausted(&self) -> bool {
        !self.limit.permits(self.count)
    }
}

/// Result of one admission attempt
///
/// `allowed = false` is the normal quota-exceeded outcome, not an error.
/// Ephemeral; not persisted beyond logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the attempt was admitted across all windows
    pub allowed: bool,
    /// True when a storage fault was bridged by fail-open admission
    #[serde(default)]
    pub degraded: bool,
    /// Standing of every evaluated window, in evaluation order
    pub windows: Vec<WindowStanding>,
}

impl Decision {
    /// First exhausted window, the one that rejected the attempt
    pub fn binding(&self) -> Option<&WindowStanding> {
        if self.allowed {
            return None;
        }
        self.windows.iter().find(|w| w.exhausted())
    }

    /// Earliest reset among exhausted windows, when a retry could succeed
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        self.windows
            .iter()
            .filter(|w| w.exhausted())
            .filter_map(|w| w.reset_at)
            .min()
    }
}

/// Read-only allowance projection for one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStatus {
    /// Feature the standings cover
    pub feature: FeatureId,
    /// Standing of every window, in evaluation order
    pub windows: Vec<WindowStanding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn standing(window: WindowKind, limit: Limit, count: u64, reset_hour: Option<u32>) -> WindowStanding {
        WindowStanding {
            window,
            limit,
            count,
            reset_at: reset_hour.map(|h| Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()),
        }
    }

    #[test]
    fn remaining_and_exhausted() {
        let open = standing(WindowKind::Daily, Limit::Finite(5), 3, Some(0));
        assert_eq!(open.remaining(), Some(2));
        assert!(!open.exhausted());

        let full = standing(WindowKind::Daily, Limit::Finite(3), 3, Some(0));
        assert_eq!(full.remaining(), Some(0));
        assert!(full.exhausted());

        let unlimited = standing(WindowKind::Lifetime, Limit::Unlimited, 999, None);
        assert_eq!(unlimited.remaining(), None);
        assert!(!unlimited.exhausted());
    }

    #[test]
    fn binding_is_first_exhausted_window() {
        let decision = Decision {
            allowed: false,
            degraded: false,
            windows: vec![
                standing(WindowKind::Daily, Limit::Finite(5), 2, Some(0)),
                standing(WindowKind::Weekly, Limit::Finite(2), 2, Some(3)),
                standing(WindowKind::Monthly, Limit::Finite(2), 2, Some(6)),
            ],
        };
        assert_eq!(decision.binding().unwrap().window, WindowKind::Weekly);
    }

    #[test]
    fn allowed_decision_has_no_binding_window() {
        let decision = Decision {
            allowed: true,
            degraded: false,
            windows: vec![standing(WindowKind::Daily, Limit::Finite(5), 5, Some(0))],
        };
        assert_eq!(decision.binding(), None);
    }

    #[test]
    fn retry_at_is_earliest_exhausted_reset() {
        let decision = Decision {
            allowed: false,
            degraded: false,
            windows: vec![
                standing(WindowKind::Daily, Limit::Finite(1), 1, Some(9)),
                standing(WindowKind::Weekly, Limit::Finite(1), 1, Some(3)),
                standing(WindowKind::Lifetime, Limit::Finite(1), 1, None),
            ],
        };
        assert_eq!(
            decision.retry_at(),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap())
        );
    }
}
