//! De-duplicating cache of upstream fetches.
//!
//! The first caller for a key stores a shared, lazily-polled future under that
//! key before anything is awaited. Later callers, concurrent or not, await the
//! same future, so each key is fetched at most once for the lifetime of the
//! cache. Entries are never evicted.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

pub struct SingleFlight<K, V>
where
    V: Clone,
{
    entries: Mutex<HashMap<K, Shared<BoxFuture<'static, V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `fetch` only if no call for this key
    /// has been made before.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let shared = {
            // Never held across an await.
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                Some(existing) => {
                    trace!(target: "lookups.singleflight", ?key, "joining existing fetch");
                    existing.clone()
                }
                None => {
                    let pending = fetch().boxed().shared();
                    entries.insert(key, pending.clone());
                    pending
                }
            }
        };
        shared.await
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
