//! Order-statistics AVL table.
//!
//! An [`AvlTable<K, V>`] keeps rows `(K, V)` sorted by their key columns `K`
//! (one type, or a tuple for several columns) and allows duplicates. Every
//! node is augmented with its subtree size, so besides key lookups the table
//! answers "which row is at rank `i`" and "at which rank is this key" in
//! O(log n), in the same root-to-leaf descent.
//!
//! ```rust
//! use avlkv::AvlTable;
//!
//! let mut t: AvlTable<(u32, String), f64> = AvlTable::new();
//! t.insert((2, "b".into()), 0.5);
//! t.insert((1, "z".into()), 1.5);
//! t.insert((2, "a".into()), 2.5);
//!
//! assert_eq!(t.key_at(0).unwrap(), &(1, "z".to_string()));
//! assert_eq!(t.count(&(2u32,)), 2);
//! assert_eq!(t.lower(&(2u32,)).rank(), 1);
//! ```

mod cursor;
mod node;
mod prefix;

pub use cursor::Cursor;
pub use prefix::KeyPrefix;

pub(crate) use node::Node;

use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};

/// Balanced search tree over `(K, V)` rows with O(log n) rank queries.
#[derive(Clone)]
pub struct AvlTable<K, V> {
    pub(crate) nodes: Vec<Node<K, V>>,
    pub(crate) root: Option<usize>,
}

impl<K, V> AvlTable<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every row.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    fn out_of_range(&self, rank: usize) -> Error {
        Error::IndexOutOfRange {
            rank,
            len: self.len(),
        }
    }

    fn node_at(&self, rank: usize) -> Result<usize> {
        self.locate(rank).ok_or_else(|| self.out_of_range(rank))
    }

    /// Cursor at `rank`, spanning to the end of the table. `rank == len()`
    /// yields a cursor parked at the back.
    pub fn at(&self, rank: usize) -> Result<Cursor<'_, K, V>> {
        if rank > self.len() {
            return Err(self.out_of_range(rank));
        }
        Ok(Cursor::new(self, self.locate(rank), rank, self.len()))
    }

    /// Cursor over the rows with ranks in `ranks`.
    pub fn window(&self, ranks: Range<usize>) -> Result<Cursor<'_, K, V>> {
        if ranks.end > self.len() {
            return Err(self.out_of_range(ranks.end));
        }
        let start = ranks.start.min(ranks.end);
        Ok(Cursor::new(self, self.locate(start), start, ranks.end))
    }

    pub fn row_at(&self, rank: usize) -> Result<(&K, &V)> {
        let node = &self.nodes[self.node_at(rank)?];
        Ok((&node.key, &node.value))
    }

    pub fn key_at(&self, rank: usize) -> Result<&K> {
        Ok(&self.nodes[self.node_at(rank)?].key)
    }

    pub fn value_at(&self, rank: usize) -> Result<&V> {
        Ok(&self.nodes[self.node_at(rank)?].value)
    }

    pub fn value_at_mut(&mut self, rank: usize) -> Result<&mut V> {
        let i = self.node_at(rank)?;
        Ok(&mut self.nodes[i].value)
    }

    /// Replace the payload at `rank`, returning the old one.
    pub fn put_at(&mut self, rank: usize, value: V) -> Result<V> {
        let i = self.node_at(rank)?;
        Ok(std::mem::replace(&mut self.nodes[i].value, value))
    }

    /// Insert a row in front of the row currently at `rank` (at the end when
    /// `rank == len()`). The caller keeps the key order intact.
    pub fn insert_at(&mut self, rank: usize, key: K, value: V) -> Result<usize> {
        if rank > self.len() {
            return Err(self.out_of_range(rank));
        }
        let pivot = self.locate(rank);
        self.link_before(pivot, key, value);
        Ok(rank)
    }

    /// Remove the row at `rank` and hand it back.
    pub fn take_at(&mut self, rank: usize) -> Result<(K, V)> {
        let i = self.node_at(rank)?;
        Ok(self.unlink(i))
    }

    /// Remove up to `count` consecutive rows starting at `rank`. Returns the
    /// number of rows actually removed, which is smaller than `count` when
    /// the range runs past the end.
    pub fn remove_at(&mut self, rank: usize, count: usize) -> usize {
        for removed in 0..count {
            match self.locate(rank) {
                Some(i) => drop(self.unlink(i)),
                None => return removed,
            }
        }
        count
    }

    /// Cursor over every row.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self, self.leftmost(self.root), 0, self.len())
    }

    pub fn iter(&self) -> Cursor<'_, K, V> {
        self.begin()
    }

    /// First row whose leading key columns are `>= prefix`, spanning to the
    /// end of the table.
    pub fn lower<P>(&self, prefix: &P) -> Cursor<'_, K, V>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        Cursor::new(self, lo.node, lo.rank, self.len())
    }

    /// First row whose leading key columns are `> prefix`, spanning to the
    /// end of the table.
    pub fn upper<P>(&self, prefix: &P) -> Cursor<'_, K, V>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let hi = self.find_upper(prefix);
        Cursor::new(self, hi.node, hi.rank, self.len())
    }

    /// The first row equal to a full key. Partial keys and missing keys give
    /// an empty cursor.
    pub fn single<P>(&self, key: &P) -> Cursor<'_, K, V>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        if !key.is_full() {
            return Cursor::empty(self);
        }
        let lo = self.find_lower(key);
        if !lo.found {
            return Cursor::empty(self);
        }
        Cursor::new(self, lo.node, lo.rank, lo.rank + 1)
    }

    /// Every row matching `prefix`.
    pub fn all<P>(&self, prefix: &P) -> Cursor<'_, K, V>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        let hi = self.find_upper(prefix);
        Cursor::new(self, lo.node, lo.rank, hi.rank)
    }

    pub fn contains<P>(&self, prefix: &P) -> bool
    where
        P: KeyPrefix<K> + ?Sized,
    {
        self.find_lower(prefix).found
    }

    pub fn count<P>(&self, prefix: &P) -> usize
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        if !lo.found {
            return 0;
        }
        self.find_upper(prefix).rank - lo.rank
    }

    /// First row matching `prefix`.
    pub fn get<P>(&self, prefix: &P) -> Option<(&K, &V)>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        if !lo.found {
            return None;
        }
        let node = &self.nodes[lo.node?];
        Some((&node.key, &node.value))
    }

    pub fn get_mut<P>(&mut self, prefix: &P) -> Option<&mut V>
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        if !lo.found {
            return None;
        }
        Some(&mut self.nodes[lo.node?].value)
    }

    /// Remove the whole run of rows matching `prefix`.
    pub fn remove<P>(&mut self, prefix: &P) -> usize
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let lo = self.find_lower(prefix);
        let hi = self.find_upper(prefix);
        self.remove_at(lo.rank, hi.rank - lo.rank)
    }
}

impl<K: Ord, V> AvlTable<K, V> {
    /// Insert after any rows with an equal key. Returns the new row's rank.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        let hi = self.find_upper(&key);
        self.link_before(hi.node, key, value);
        hi.rank
    }

    /// Same as [`insert`](Self::insert).
    pub fn append(&mut self, key: K, value: V) -> usize {
        self.insert(key, value)
    }

    /// Insert before any rows with an equal key. Returns the new row's rank.
    pub fn prepend(&mut self, key: K, value: V) -> usize {
        let lo = self.find_lower(&key);
        self.link_before(lo.node, key, value);
        lo.rank
    }

    /// Overwrite the first row with an equal key in place, or insert a new
    /// row when there is none. Returns the row's rank.
    pub fn put(&mut self, key: K, value: V) -> usize {
        let lo = self.find_lower(&key);
        match lo.node.filter(|_| lo.found) {
            Some(i) => {
                let node = &mut self.nodes[i];
                node.key = key;
                node.value = value;
            }
            None => {
                self.link_before(lo.node, key, value);
            }
        }
        lo.rank
    }
}

impl<K, V> Default for AvlTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Cursor<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTable<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTable<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
