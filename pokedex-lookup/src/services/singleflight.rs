//! Per-key in-flight request coalescing
//!
//! Concurrent cold lookups for the same key queue on a per-key async mutex.
//! The first holder does the upstream fetch; every holder re-checks the
//! faster tiers before fetching, since an earlier holder may have released
//! the key just before it arrived.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<()>>;

/// Map of keys with a cold lookup in progress
#[derive(Default)]
pub struct InFlight {
    slots: StdMutex<HashMap<String, Slot>>,
}

/// Exclusive right to run the cold path for one key.
///
/// Dropping the guard releases the key and removes its map entry once no
/// other lookup is queued on it.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    waited: bool,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> InFlightGuard<'_> {
        let slot = {
            let mut slots = self.lock_slots();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        let (guard, waited) = match Arc::clone(&slot).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => {
                tracing::debug!(key = %key, "Joining in-flight lookup");
                (slot.lock_owned().await, true)
            }
        };

        InFlightGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
            waited,
        }
    }

    /// Keys currently held or queued on
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // The map holds no invariant a panicking holder could break
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InFlightGuard<'_> {
    /// Whether another lookup held this key when we arrived
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self.owner.lock_slots();
        // Only the map's own reference left: nobody is queued
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
