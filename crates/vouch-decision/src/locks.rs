use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use vouch_core::ContactId;

/// One async mutex per contact. Holding the guard makes a
/// load-modify-save of that contact's records atomic.
#[derive(Default)]
pub struct ContactLocks {
    locks: DashMap<ContactId, Arc<Mutex<()>>>,
}

/// Held lock on one contact. The contact's entry is dropped from the map
/// once nobody holds or waits on it.
pub struct ContactGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    contact: ContactId,
    locks: &'a DashMap<ContactId, Arc<Mutex<()>>>,
}

impl ContactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, contact: &ContactId) -> ContactGuard<'_> {
        let mutex = self
            .locks
            .entry(contact.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ContactGuard {
            guard: Some(mutex.lock_owned().await),
            contact: contact.clone(),
            locks: &self.locks,
        }
    }

    /// Number of contacts currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ContactGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: no holder, no waiter.
        self.locks
            .remove_if(&self.contact, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
