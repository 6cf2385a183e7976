//! Per-run mutual exclusion inside one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::RunId;

/// Keyed async mutex: deliveries for one run id queue up, different ids never contend.
///
/// Entries are weak, so a lock lives only while someone holds or awaits it.
#[derive(Default)]
pub struct RunLocks {
    locks: Mutex<HashMap<RunId, Weak<AsyncMutex<()>>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `run_id`; released when the guard drops.
    pub async fn acquire(&self, run_id: &RunId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(run_id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let created = Arc::new(AsyncMutex::new(()));
                    locks.insert(run_id.clone(), Arc::downgrade(&created));
                    created
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of run ids with a live lock.
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
