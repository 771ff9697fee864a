//! Per-group write serialization.
//!
//! Every read-modify-write on one group's ledger or rates holds that group's
//! lock. Different groups never contend. Reads do not lock.

use std::sync::Arc;

use dashmap::DashMap;
use tally_shared::types::GroupId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per group.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: DashMap<GroupId, Arc<Mutex<()>>>,
}

impl GroupLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and returns the write guard of `group_id`.
    pub async fn acquire(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = Arc::clone(self.locks.entry(group_id).or_default().value());
        lock.lock_owned().await
    }
}
