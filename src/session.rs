// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// TTL applied to advertisement sessions and on every refresh.
pub const SSDP_SESSION_DURATION: Duration = Duration::from_secs(2);

/// Cadence of the background eviction sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct Entry<V> {
    value: V,
    deadline: Instant,
}

/// A mutex-protected map whose entries expire.
///
/// Expiry is enforced twice: lazily on every access, and by a periodic
/// [`TimedMap::remove_expired`] sweep so abandoned keys do not
/// accumulate. Coarse granularity is fine at the session TTLs in use.
pub struct TimedMap<K, V> {
    inner: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TimedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        self.inner.lock().insert(key, Entry { value, deadline });
    }

    /// Returns a live entry's value, treating expired entries as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let guard = self.inner.lock();
        let entry = guard.get(key)?;
        if entry.deadline <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Pushes a live entry's deadline to `ttl` from now. Returns false
    /// when the key is absent or already expired.
    pub fn refresh(&self, key: &K, ttl: Duration) -> bool {
        let mut guard = self.inner.lock();
        match guard.get_mut(key) {
            Some(entry) if entry.deadline > Instant::now() => {
                entry.deadline = Instant::now() + ttl;
                true
            }
            _ => false,
        }
    }

    pub fn remove_expired(&self) {
        let now = Instant::now();
        self.inner.lock().retain(|_, entry| entry.deadline > now);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for TimedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
