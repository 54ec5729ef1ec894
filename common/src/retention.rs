// Keep-N retention pruning for a cadence prefix

use crate::errors::StoreError;
use crate::storage::BackupStore;
use tracing::{debug, info, instrument, warn};

/// Result of one pruning pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Objects deleted
    pub deleted: usize,
    /// Delete attempts that failed and were skipped
    pub failed: usize,
}

/// Delete everything under the prefix except the `keep` newest objects.
///
/// Objects are ranked newest first by last_modified with ties broken by key,
/// so the ranking is total. A failed delete is logged and skipped while the
/// remaining candidates are still attempted. A listing failure aborts the
/// pass: without a listing there is nothing safe to delete.
#[instrument(skip(store), fields(prefix = %prefix, keep = keep))]
pub async fn prune(
    store: &dyn BackupStore,
    prefix: &str,
    keep: usize,
) -> Result<PruneOutcome, StoreError> {
    let mut objects = store.list(prefix).await?;
    if objects.len() <= keep {
        debug!(count = objects.len(), "Retention within limit, nothing to prune");
        return Ok(PruneOutcome::default());
    }

    objects.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });

    let mut outcome = PruneOutcome::default();
    for object in &objects[keep..] {
        match store.delete(&object.key).await {
            Ok(()) => {
                debug!(key = %object.key, "Pruned expired archive");
                outcome.deleted += 1;
            }
            Err(e) => {
                warn!(key = %object.key, error = %e, "Failed to delete expired archive");
                outcome.failed += 1;
            }
        }
    }

    info!(
        deleted = outcome.deleted,
        failed = outcome.failed,
        kept = keep,
        "Retention pruning finished"
    );
    Ok(outcome)
}
