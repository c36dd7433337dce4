use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<i32, Arc<Mutex<()>>>;

/// Keyed async locks serializing uploads per owner.
///
/// Entries are created on demand and removed once the last holder or waiter
/// for an owner is gone.
#[derive(Clone, Default)]
pub struct UploadLocks {
    inner: Arc<LockMap>,
}

/// Held while an upload mutates one owner's avatar.
pub struct UploadGuard {
    owner_id: i32,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other upload for `owner_id` is in flight.
    pub async fn acquire(&self, owner_id: i32) -> UploadGuard {
        // The map reference must be released before awaiting the mutex.
        let mutex = Arc::clone(&self.inner.entry(owner_id).or_default());
        let guard = mutex.lock_owned().await;

        UploadGuard {
            owner_id,
            locks: Arc::clone(&self.inner),
            guard: Some(guard),
        }
    }

    /// Number of owners with an upload in flight or waiting.
    pub fn active(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map still holds the mutex when nobody is waiting on it.
        self.locks
            .remove_if(&self.owner_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
