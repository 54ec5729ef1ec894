// Per-cadence due-state, seeded from the store and advanced on success

use crate::cadence::Cadence;
use crate::storage::{cadence_prefix, BackupStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Tracks when each cadence last completed a successful backup.
///
/// A cadence without a recorded success is treated as immediately due. The
/// state lives in memory only; on startup it is re-seeded from the object
/// timestamps already in the store.
#[derive(Debug, Default)]
pub struct DueTracker {
    last_success: HashMap<Cadence, DateTime<Utc>>,
}

impl DueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed due-state from the newest object under each cadence prefix.
    ///
    /// A cadence whose listing fails stays unknown and therefore due.
    #[instrument(skip(self, store), fields(subfolder = %subfolder))]
    pub async fn seed(&mut self, store: &dyn BackupStore, subfolder: &str) {
        for cadence in Cadence::ALL {
            let prefix = cadence_prefix(subfolder, cadence);
            match store.list(&prefix).await {
                Ok(objects) => match objects.iter().map(|o| o.last_modified).max() {
                    Some(newest) => {
                        info!(
                            cadence = %cadence,
                            last_success = %newest,
                            "Seeded due-state from store"
                        );
                        self.last_success.insert(cadence, newest);
                    }
                    None => {
                        info!(cadence = %cadence, "No prior archives found, cadence is due");
                    }
                },
                Err(e) => {
                    warn!(
                        cadence = %cadence,
                        error = %e,
                        "Seeding failed, cadence treated as due"
                    );
                }
            }
        }
    }

    /// Whether the cadence should trigger at `now`. Boundary inclusive:
    /// exactly one interval after the last success is due.
    pub fn is_due(&self, cadence: Cadence, now: DateTime<Utc>) -> bool {
        match self.last_success.get(&cadence) {
            None => true,
            Some(last) => now.signed_duration_since(*last) >= cadence.interval(),
        }
    }

    /// Record a successful cycle, re-arming the cadence for one full interval
    pub fn mark_succeeded(&mut self, cadence: Cadence, now: DateTime<Utc>) {
        self.last_success.insert(cadence, now);
    }

    /// Last successful run of a cadence, if one is known
    pub fn last_success(&self, cadence: Cadence) -> Option<DateTime<Utc>> {
        self.last_success.get(&cadence).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_cadence_is_due() {
        let tracker = DueTracker::new();
        for cadence in Cadence::ALL {
            assert!(tracker.is_due(cadence, t0()));
        }
    }

    #[test]
    fn test_fresh_success_is_not_due() {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(Cadence::Hourly, t0());
        assert!(!tracker.is_due(Cadence::Hourly, t0()));
        assert!(!tracker.is_due(Cadence::Hourly, t0() + Duration::minutes(59)));
    }

    #[test]
    fn test_due_exactly_at_interval_boundary() {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(Cadence::Hourly, t0());
        assert!(tracker.is_due(Cadence::Hourly, t0() + Duration::hours(1)));
        assert!(tracker.is_due(Cadence::Hourly, t0() + Duration::hours(2)));
    }

    #[test]
    fn test_mark_succeeded_only_affects_one_cadence() {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(Cadence::Weekly, t0());
        assert!(!tracker.is_due(Cadence::Weekly, t0()));
        assert!(tracker.is_due(Cadence::Daily, t0()));
        assert!(tracker.is_due(Cadence::Frequent, t0()));
    }

    #[test]
    fn test_last_success_round_trip() {
        let mut tracker = DueTracker::new();
        assert_eq!(tracker.last_success(Cadence::Daily), None);
        tracker.mark_succeeded(Cadence::Daily, t0());
        assert_eq!(tracker.last_success(Cadence::Daily), Some(t0()));
    }
}
