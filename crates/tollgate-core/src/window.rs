//! Window kinds and period resolution
//!
//! Every metered feature is counted over four simultaneous windows:
//!
//! ```text
//!   daily    | calendar day, UTC midnight to midnight
//!   weekly   | rolling 7-day period from a fixed anchor
//!   monthly  | calendar month, UTC
//!   lifetime | account creation to +infinity, never resets
//! ```
//!
//! The resolver is pure: (kind, instant) in, canonical period bounds out.
//! Weekly periods are anchored to a reference epoch rather than calendar
//! Monday-Sunday, so resets roll over uniformly with no year-boundary
//! special cases.

use crate::error::QuotaError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WEEK_SECS: i64 = 7 * 86_400;

/// Default weekly anchor: 2024-01-01T00:00:00Z, as seconds since the epoch
pub const DEFAULT_WEEKLY_ANCHOR_SECS: i64 = 1_704_067_200;

/// Time scope over which usage is counted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Calendar day (UTC)
    Daily,
    /// Rolling 7-day period from the anchor
    Weekly,
    /// Calendar month (UTC)
    Monthly,
    /// Account creation to +infinity
    Lifetime,
}

impl WindowKind {
    /// Fixed evaluation order used by the admission engine
    pub const EVALUATION_ORDER: [WindowKind; 4] = [
        WindowKind::Daily,
        WindowKind::Weekly,
        WindowKind::Monthly,
        WindowKind::Lifetime,
    ];

    /// String form used in configuration and wire payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Daily => "daily",
            WindowKind::Weekly => "weekly",
            WindowKind::Monthly => "monthly",
            WindowKind::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WindowKind {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(WindowKind::Daily),
            "weekly" => Ok(WindowKind::Weekly),
            "monthly" => Ok(WindowKind::Monthly),
            "lifetime" => Ok(WindowKind::Lifetime),
            other => Err(QuotaError::PolicyLoad(format!(
                "unknown window kind: {other:?}"
            ))),
        }
    }
}

/// Canonical bounds of one counting period
///
/// Half-open: `start <= t < end`. `end = None` means +infinity (lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    /// First instant inside the period
    pub start: DateTime<Utc>,
    /// First instant after the period, `None` for never-ending windows
    pub end: Option<DateTime<Utc>>,
}

impl PeriodBounds {
    /// Whether `t` falls inside the period
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && self.end.map_or(true, |end| t < end)
    }

    /// Whether this period ever ends
    pub fn expires(&self) -> bool {
        self.end.is_some()
    }
}

/// Maps (window kind, instant) to canonical period bounds
///
/// Pure and side-effect free. The lifetime window is anchored at the
/// subscriber's account-creation instant, which is why `resolve` takes it
/// as an argument.
#[derive(Debug, Clone, Copy)]
pub struct WindowResolver {
    weekly_anchor: DateTime<Utc>,
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH + Duration::seconds(DEFAULT_WEEKLY_ANCHOR_SECS))
    }
}

impl WindowResolver {
    /// Create a resolver with a custom weekly anchor
    pub fn new(weekly_anchor: DateTime<Utc>) -> Self {
        Self { weekly_anchor }
    }

    /// Resolve the period containing `as_of` for the given window kind
    pub fn resolve(
        &self,
        kind: WindowKind,
        as_of: DateTime<Utc>,
        account_created: DateTime<Utc>,
    ) -> PeriodBounds {
        match kind {
            WindowKind::Daily => Self::daily(as_of),
            WindowKind::Weekly => self.weekly(as_of),
            WindowKind::Monthly => Self::monthly(as_of),
            WindowKind::Lifetime => PeriodBounds {
                start: account_created,
                end: None,
            },
        }
    }

    fn daily(as_of: DateTime<Utc>) -> PeriodBounds {
        let start = as_of.date_naive().and_time(NaiveTime::MIN).and_utc();
        PeriodBounds {
            start,
            end: Some(start + Duration::days(1)),
        }
    }

    fn weekly(&self, as_of: DateTime<Utc>) -> PeriodBounds {
        // div_euclid keeps instants before the anchor in well-formed
        // periods counting backwards.
        let elapsed = as_of.timestamp() - self.weekly_anchor.timestamp();
        let periods = elapsed.div_euclid(WEEK_SECS);
        let start = self.weekly_anchor + Duration::seconds(periods * WEEK_SECS);
        PeriodBounds {
            start,
            end: Some(start + Duration::seconds(WEEK_SECS)),
        }
    }

    fn monthly(as_of: DateTime<Utc>) -> PeriodBounds {
        let first = month_start(as_of.date_naive());
        // 31 days past the 1st always lands in the following month.
        let next = month_start(first + Duration::days(31));
        PeriodBounds {
            start: first.and_time(NaiveTime::MIN).and_utc(),
            end: Some(next.and_time(NaiveTime::MIN).and_utc()),
        }
    }
}

fn month_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}
