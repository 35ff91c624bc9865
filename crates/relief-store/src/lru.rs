use std::collections::VecDeque;
use std::hash::Hash;

use hashbrown::HashMap;

/// Bounded least-recently-used map: an explicit order index over a flat
/// store. Eviction happens synchronously inside `insert`, handing each
/// victim to the caller's release callback.
pub struct BoundedLru<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> BoundedLru<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get_mut(key)
    }

    /// Insert without touching the recency order of other entries. Evicted
    /// entries are passed to `release` before this returns.
    pub fn insert(&mut self, key: K, value: V, mut release: impl FnMut(K, V)) {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
        }
        while self.map.len() > self.capacity {
            let Some(victim) = self.order.pop_front() else {
                break;
            };
            if let Some(value) = self.map.remove(&victim) {
                release(victim, value);
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.map.remove(key)
    }

    /// Drain everything, oldest first.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.map.len());
        while let Some(key) = self.order.pop_front() {
            if let Some(value) = self.map.remove(&key) {
                out.push((key, value));
            }
        }
        self.map.clear();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.map.iter_mut()
    }

    /// Remove entries matching a predicate, returning them without invoking
    /// any release path.
    pub fn remove_matching(&mut self, mut pred: impl FnMut(&K) -> bool) -> Vec<(K, V)> {
        let keys: Vec<K> = self.order.iter().filter(|k| pred(k)).cloned().collect();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.remove(&key) {
                out.push((key, value));
            }
        }
        out
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(entry) = self.order.remove(pos) {
                self.order.push_back(entry);
            }
        }
    }
}
