//! String-keyed map of sequences that never holds an empty sequence.
//!
//! [`BucketMap`] backs the by-query index. Removing entries from a bucket is
//! always followed by [`BucketMap::compact`], which drops the bucket once it is
//! empty, so "key present" always means "at least one entry".
//!
//! Keys are kept in a `BTreeMap`, which gives the prefix scan used by sub-query
//! scoring a deterministic, lexicographic order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Map from string key to a non-empty, insertion-ordered `Vec<V>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketMap<V> {
    buckets: BTreeMap<String, Vec<V>>,
}

impl<V> Default for BucketMap<V> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<V> BucketMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns `true` if `key` has a bucket.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    /// Entries stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[V]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Iterates buckets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterates every entry of every bucket mutably.
    ///
    /// Entries can be edited but not removed, so no bucket can become empty.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.buckets.values_mut().flat_map(|bucket| bucket.iter_mut())
    }

    /// Applies `f` to every bucket, then drops the buckets it emptied.
    pub fn retain_buckets<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&str, &mut Vec<V>),
    {
        for (key, bucket) in &mut self.buckets {
            f(key, bucket);
        }
        self.compact_all()
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Iterates, in key order, every bucket whose key starts with `prefix`.
    ///
    /// # Examples
    ///
    /// ```
    /// use frecent::storage::BucketMap;
    ///
    /// let mut map = BucketMap::new();
    /// map.push("shoes", 1);
    /// map.push("shirt", 2);
    /// map.push("sho", 3);
    ///
    /// let keys: Vec<&str> = map.with_prefix("sho").map(|(k, _)| k).collect();
    /// assert_eq!(keys, vec!["sho", "shoes"]);
    /// ```
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a [V])> {
        self.buckets
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Appends `value` to the bucket for `key`, creating the bucket if needed.
    pub fn push(&mut self, key: &str, value: V) {
        match self.buckets.get_mut(key) {
            Some(bucket) => bucket.push(value),
            None => {
                self.buckets.insert(key.to_string(), vec![value]);
            }
        }
    }

    /// First entry under `key` matching `pred`, mutably.
    pub fn find_mut<P>(&mut self, key: &str, pred: P) -> Option<&mut V>
    where
        P: FnMut(&&mut V) -> bool,
    {
        self.buckets.get_mut(key)?.iter_mut().find(pred)
    }

    /// Removes every entry under `key` matching `pred`, then compacts `key`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_where<P>(&mut self, key: &str, mut pred: P) -> usize
    where
        P: FnMut(&V) -> bool,
    {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return 0;
        };
        let before = bucket.len();
        bucket.retain(|v| !pred(v));
        let removed = before - bucket.len();
        self.compact(key);
        removed
    }

    /// Drops the bucket for `key` if it is empty. Returns whether it was dropped.
    pub fn compact(&mut self, key: &str) -> bool {
        if self.buckets.get(key).is_some_and(Vec::is_empty) {
            self.buckets.remove(key);
            true
        } else {
            false
        }
    }

    /// Drops every empty bucket. Returns how many were dropped.
    pub fn compact_all(&mut self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        before - self.buckets.len()
    }
}
