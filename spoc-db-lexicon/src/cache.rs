//! Concurrent term cache that never pins values
//!
//! Entries map a [`TermId`] to a weak reference to its [`TermValue`], keyed
//! by a value-less [`Iv`] handle. A value stays cached while anyone holds it:
//! a caller, or the cache's own bounded LRU of recently used values. Once the
//! last strong reference goes away, the entry is dead and is pruned on the
//! next lookup or insert of that identifier.
//!
//! Insertion is first-writer-wins: concurrent `put_if_absent` calls for one
//! identifier all return the same `Arc`.

use crate::config::TermCacheConfig;
use crate::term::{Iv, TermValue};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use spoc_db_core::TermId;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

struct Slot {
    /// Key handle; never carries the value
    iv: Iv,
    value: Weak<TermValue>,
}

impl Slot {
    fn new(iv: &Iv, value: &Arc<TermValue>) -> Self {
        Self {
            iv: iv.clone_without_value(),
            value: Arc::downgrade(value),
        }
    }

    fn is_live(&self) -> bool {
        self.value.strong_count() > 0
    }
}

/// Identifier to value cache shared by readers
pub struct TermCache {
    entries: DashMap<TermId, Slot, FxBuildHasher>,
    /// Recently used values held strongly; `None` when weak-only
    strong: Option<Mutex<LruCache<TermId, Arc<TermValue>>>>,
}

impl TermCache {
    /// Create a cache keeping up to `strong_capacity` recent values alive
    pub fn new(strong_capacity: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher::default()),
            strong: NonZeroUsize::new(strong_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn from_config(config: &TermCacheConfig) -> Self {
        Self::new(config.strong_capacity)
    }

    /// Cached value for `id`, if it is still alive
    pub fn get(&self, id: TermId) -> Option<Arc<TermValue>> {
        let hit = self.entries.get(&id)?.value.upgrade();
        match hit {
            Some(value) => {
                self.touch(id, &value);
                Some(value)
            }
            None => {
                self.entries.remove_if(&id, |_, slot| !slot.is_live());
                None
            }
        }
    }

    /// Cached handle for `id` with its value attached
    pub fn get_iv(&self, id: TermId) -> Option<Iv> {
        let mut iv = self.entries.get(&id)?.iv.clone();
        iv.set_value(self.get(id)?);
        Some(iv)
    }

    /// Insert `value` for `iv` unless a live value is already cached.
    ///
    /// Returns the value that ends up cached, which is the existing one when
    /// another writer got there first. The stored key is
    /// `iv.clone_without_value()`, whatever `iv` carries.
    pub fn put_if_absent(&self, iv: &Iv, value: Arc<TermValue>) -> Arc<TermValue> {
        let id = iv.id();
        let winner = match self.entries.entry(id) {
            Entry::Occupied(mut occupied) => match occupied.get().value.upgrade() {
                Some(existing) => existing,
                None => {
                    occupied.insert(Slot::new(iv, &value));
                    value
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(iv, &value));
                value
            }
        };
        self.touch(id, &winner);
        winner
    }

    pub fn contains(&self, id: TermId) -> bool {
        self.entries.get(&id).is_some_and(|slot| slot.is_live())
    }

    /// Number of entries, including dead ones not yet pruned
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every dead entry; returns how many were removed
    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "pruned dead term cache entries");
        }
        removed
    }

    pub fn clear(&self) {
        if let Some(strong) = &self.strong {
            strong.lock().clear();
        }
        self.entries.clear();
    }

    fn touch(&self, id: TermId, value: &Arc<TermValue>) {
        if let Some(strong) = &self.strong {
            strong.lock().put(id, Arc::clone(value));
        }
    }
}

impl Default for TermCache {
    fn default() -> Self {
        Self::from_config(&TermCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_value(s: &str) -> Arc<TermValue> {
        Arc::new(TermValue::uri(s))
    }

    #[test]
    fn weak_only_does_not_pin() {
        let cache = TermCache::new(0);
        let iv = Iv::with_value(TermId(1), make_value("http://x/a"));
        let value = make_value("http://x/a");
        let cached = cache.put_if_absent(&iv, Arc::clone(&value));
        assert!(Arc::ptr_eq(&cached, &value));
        drop(cached);
        // only the caller's handle and `iv` keep it alive
        assert_eq!(Arc::strong_count(&value), 1);
        assert!(cache.get(TermId(1)).is_some());

        drop(value);
        assert!(cache.get(TermId(1)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn first_writer_wins() {
        let cache = TermCache::new(4);
        let first = make_value("http://x/first");
        let a = cache.put_if_absent(&Iv::new(TermId(3)), Arc::clone(&first));
        let b = cache.put_if_absent(&Iv::new(TermId(3)), make_value("http://x/second"));
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&b, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn dead_entry_replaced() {
        let cache = TermCache::new(0);
        cache.put_if_absent(&Iv::new(TermId(3)), make_value("http://x/old"));
        let fresh = make_value("http://x/new");
        let got = cache.put_if_absent(&Iv::new(TermId(3)), Arc::clone(&fresh));
        assert!(Arc::ptr_eq(&got, &fresh));
    }

    #[test]
    fn strong_lru_keeps_recent_values() {
        let cache = TermCache::new(2);
        for i in 1..=3u64 {
            cache.put_if_absent(&Iv::new(TermId(i)), make_value(&format!("http://x/{}", i)));
        }
        // 1 was evicted from the LRU and nobody else holds it
        assert!(cache.get(TermId(1)).is_none());
        assert!(cache.get(TermId(2)).is_some());
        assert!(cache.get(TermId(3)).is_some());

        cache.clear();
        assert!(cache.get(TermId(3)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn get_iv_attaches_value() {
        let cache = TermCache::new(1);
        cache.put_if_absent(&Iv::new(TermId(9)), make_value("http://x/9"));
        let iv = cache.get_iv(TermId(9)).unwrap();
        assert_eq!(iv.id(), TermId(9));
        assert_eq!(iv.value().map(|v| v.to_string()), Some("<http://x/9>".to_string()));
        assert!(cache.get_iv(TermId(10)).is_none());
    }

    #[test]
    fn prune_drops_dead_entries() {
        let cache = TermCache::new(0);
        let keep = make_value("http://x/keep");
        cache.put_if_absent(&Iv::new(TermId(1)), Arc::clone(&keep));
        cache.put_if_absent(&Iv::new(TermId(2)), make_value("http://x/gone"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.prune(), 1);
        assert!(cache.contains(TermId(1)));
        assert!(!cache.contains(TermId(2)));
    }

    #[test]
    fn concurrent_writers_agree() {
        let cache = Arc::new(TermCache::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.put_if_absent(&Iv::new(TermId(1)), make_value(&format!("http://x/{}", i)))
                })
            })
            .collect();
        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }
}
