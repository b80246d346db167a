//! Bounded most-recently-selected-first list of candidate ids.
//!
//! [`RecencyList`] is both the recency signal and the eviction queue of the
//! frecency store. It is a doubly linked list threaded through a slab of nodes,
//! with a hash index from id to slot, so every operation the store needs is O(1):
//!
//! - membership test
//! - move an existing id to the front
//! - insert a new id at the front
//! - evict the least recently selected id from the back
//!
//! On disk it is a plain JSON array, most recent first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Node {
    id: String,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Outcome of [`RecencyList::touch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Touch {
    /// The id was already tracked and has been moved to the front.
    Promoted,
    /// The id was new and the list had room.
    Inserted,
    /// The id was new, the list was full, and this id fell off the back.
    Evicted(String),
}

/// Ordered set of ids, most recently selected first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RecencyList {
    slots: Vec<Node>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RecencyList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no id is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Most recently selected id.
    #[must_use]
    pub fn front(&self) -> Option<&str> {
        self.head.map(|idx| self.slots[idx].id.as_str())
    }

    /// Least recently selected id, the next eviction candidate.
    #[must_use]
    pub fn back(&self) -> Option<&str> {
        self.tail.map(|idx| self.slots[idx].id.as_str())
    }

    /// Iterates ids from most to least recently selected.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Copies the ids into a vector, most recent first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Records a selection of `id` under a capacity of `limit` ids.
    ///
    /// A tracked id moves to the front. A new id is prepended, evicting the back
    /// id first when the list already holds `limit` entries.
    pub fn touch(&mut self, id: &str, limit: usize) -> Touch {
        if let Some(&idx) = self.index.get(id) {
            if self.head != Some(idx) {
                self.unlink(idx);
                self.link_front(idx);
            }
            return Touch::Promoted;
        }

        let evicted = if self.len() >= limit.max(1) {
            self.pop_back()
        } else {
            None
        };

        let idx = self.alloc(id);
        self.link_front(idx);

        evicted.map_or(Touch::Inserted, Touch::Evicted)
    }

    /// Removes and returns the least recently selected id.
    pub fn pop_back(&mut self) -> Option<String> {
        let idx = self.tail?;
        Some(self.release(idx))
    }

    /// Removes `id` if tracked. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.index.get(id).copied() {
            Some(idx) => {
                self.release(idx);
                true
            }
            None => false,
        }
    }

    fn push_back(&mut self, id: &str) {
        if self.contains(id) {
            return;
        }
        let idx = self.alloc(id);
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = None;
        match self.tail {
            Some(t) => self.slots[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn alloc(&mut self, id: &str) -> usize {
        let node = Node {
            id: id.to_string(),
            prev: None,
            next: None,
        };
        let idx = if let Some(idx) = self.free.pop() {
            self.slots[idx] = node;
            idx
        } else {
            self.slots.push(node);
            self.slots.len() - 1
        };
        self.index.insert(id.to_string(), idx);
        idx
    }

    fn release(&mut self, idx: usize) -> String {
        self.unlink(idx);
        let id = std::mem::take(&mut self.slots[idx].id);
        self.index.remove(&id);
        self.free.push(idx);
        id
    }

    fn link_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        match self.head {
            Some(h) => self.slots[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }
}

/// Front-to-back iterator over a [`RecencyList`].
#[derive(Debug)]
pub struct Iter<'a> {
    list: &'a RecencyList,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.list.slots[idx];
        self.cursor = node.next;
        Some(node.id.as_str())
    }
}

impl<'a> IntoIterator for &'a RecencyList {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for RecencyList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for RecencyList {}

/// Builds a list from a most-recent-first sequence. Repeated ids keep their
/// first (most recent) position.
impl From<Vec<String>> for RecencyList {
    fn from(ids: Vec<String>) -> Self {
        let mut list = Self::new();
        for id in &ids {
            list.push_back(id);
        }
        list
    }
}

impl From<RecencyList> for Vec<String> {
    fn from(list: RecencyList) -> Self {
        list.to_vec()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RecencyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for id in iter {
            list.push_back(id.as_ref());
        }
        list
    }
}
