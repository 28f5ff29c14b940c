//! Capacity-bounded connection registry with LRU eviction.
//!
//! Connections are keyed by the canonical `host:port` address of the peer.
//! Every operation runs under one `parking_lot::Mutex`, so insertion and
//! eviction are a single step and the registry can never exceed its capacity.
//! The lock is never held across an `.await` and handles are released only
//! after it has been dropped.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// A value stored in the registry
pub trait RegistryHandle: Clone + Send + Sync {
    /// Called once the handle has been displaced from the registry
    fn release(&self);

    /// Whether two handles refer to the same underlying connection
    fn same_connection(&self, other: &Self) -> bool;
}

/// What a [`ConnectionRegistry::put`] pushed out
#[derive(Debug)]
pub enum Displaced<C> {
    /// Nothing was displaced
    Nothing,
    /// An entry under the same address was replaced
    Replaced(C),
    /// The least recently used entry was evicted to make room
    Evicted {
        /// Address of the evicted entry
        address: String,
        /// Evicted handle
        handle: C,
    },
}

/// Recency-ordered map from peer address to connection handle
pub struct ConnectionRegistry<C> {
    entries: Mutex<LruCache<String, C>>,
}

impl<C: RegistryHandle> ConnectionRegistry<C> {
    /// Create a registry holding at most `capacity` entries
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a handle and mark it most recently used
    pub fn get(&self, address: &str) -> Option<C> {
        self.entries.lock().get(address).cloned()
    }

    /// Look up a handle without touching recency
    pub fn peek(&self, address: &str) -> Option<C> {
        self.entries.lock().peek(address).cloned()
    }

    /// Whether `address` is registered
    pub fn contains(&self, address: &str) -> bool {
        self.entries.lock().contains(address)
    }

    /// Insert or replace `address`, making it most recently used.
    ///
    /// At capacity the least recently used entry is evicted. The displaced
    /// handle is released unless it is the connection being inserted.
    pub fn put(&self, address: String, handle: C) -> Displaced<C> {
        let displaced = {
            let mut entries = self.entries.lock();
            match entries.push(address.clone(), handle.clone()) {
                None => Displaced::Nothing,
                Some((key, old)) if key == address => Displaced::Replaced(old),
                Some((key, old)) => Displaced::Evicted {
                    address: key,
                    handle: old,
                },
            }
        };

        match &displaced {
            Displaced::Nothing => {}
            Displaced::Replaced(old) => {
                if !old.same_connection(&handle) {
                    old.release();
                }
            }
            Displaced::Evicted { handle: old, .. } => old.release(),
        }

        displaced
    }

    /// Remove `address`. No-op when absent.
    pub fn remove(&self, address: &str) -> Option<C> {
        self.entries.lock().pop(address)
    }

    /// Remove `address` only if its current handle satisfies `pred`.
    ///
    /// Connection teardown uses this so a stale connection never removes the
    /// connection that replaced it.
    pub fn remove_if(&self, address: &str, pred: impl FnOnce(&C) -> bool) -> Option<C> {
        let mut entries = self.entries.lock();
        if entries.peek(address).is_some_and(pred) {
            entries.pop(address)
        } else {
            None
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// All handles, most recently used first, without touching recency
    pub fn snapshot(&self) -> Vec<C> {
        self.entries.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    /// All addresses, most recently used first, without touching recency
    pub fn addresses(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Remove and return every entry
    pub fn drain(&self) -> Vec<(String, C)> {
        let mut entries = self.entries.lock();
        let mut drained = Vec::with_capacity(entries.len());
        while let Some(entry) = entries.pop_lru() {
            drained.push(entry);
        }
        drained
    }
}

impl<C> std::fmt::Debug for ConnectionRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ConnectionRegistry")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
