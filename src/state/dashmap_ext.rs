use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// Extension helpers for `DashMap` that avoid holding shard locks across `.await`.
///
/// `DashMap::get()` returns a guard that holds a shard lock. Awaiting while it
/// is alive can deadlock, so these helpers clone and drop the guard at once.
pub trait DashMapExt<K, V> {
    /// Clone the value for `key` (dropping the DashMap guard immediately).
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone;
}

impl<K, V> DashMapExt<K, V> for DashMap<K, V>
where
    K: Eq + Hash,
{
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).map(|r| r.value().clone())
    }
}
