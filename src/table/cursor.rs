use std::fmt;
use std::ops::{AddAssign, SubAssign};

use super::AvlTable;

/// A position in an [`AvlTable`] together with a `[begin, end)` rank window.
///
/// Stepping with [`move_next`](Self::move_next) / [`move_prev`](Self::move_prev)
/// walks parent/child links; jumping with [`forward`](Self::forward),
/// [`backward`](Self::backward), `+=` or `-=` re-descends from the root.
/// As an [`Iterator`] it yields the rows from the current position up to the
/// end of the window.
pub struct Cursor<'a, K, V> {
    table: &'a AvlTable<K, V>,
    begin_rank: usize,
    end_rank: usize,
    cur: Option<usize>,
    rank: usize,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn new(
        table: &'a AvlTable<K, V>,
        cur: Option<usize>,
        rank: usize,
        end_rank: usize,
    ) -> Self {
        Self {
            table,
            begin_rank: rank,
            end_rank,
            cur,
            rank,
        }
    }

    /// Cursor over nothing, parked at the back of the table.
    pub(crate) fn empty(table: &'a AvlTable<K, V>) -> Self {
        let len = table.len();
        Self::new(table, None, len, len)
    }

    /// Rank of the current row (`len()` of the table when past the back).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of rows in the window.
    pub fn window_len(&self) -> usize {
        self.end_rank - self.begin_rank
    }

    pub fn begin_rank(&self) -> usize {
        self.begin_rank
    }

    pub fn end_rank(&self) -> usize {
        self.end_rank
    }

    pub fn is_begin(&self) -> bool {
        self.rank == self.begin_rank
    }

    pub fn is_end(&self) -> bool {
        self.rank >= self.end_rank
    }

    /// At the first row of the whole table.
    pub fn is_front(&self) -> bool {
        self.rank == 0
    }

    /// Past the last row of the whole table.
    pub fn is_back(&self) -> bool {
        self.cur.is_none()
    }

    pub fn key(&self) -> Option<&'a K> {
        let table = self.table;
        self.cur.map(|i| &table.nodes[i].key)
    }

    pub fn value(&self) -> Option<&'a V> {
        let table = self.table;
        self.cur.map(|i| &table.nodes[i].value)
    }

    pub fn row(&self) -> Option<(&'a K, &'a V)> {
        let table = self.table;
        self.cur.map(|i| {
            let node = &table.nodes[i];
            (&node.key, &node.value)
        })
    }

    /// Step to the in-order successor. Returns `false` if already past the back.
    pub fn move_next(&mut self) -> bool {
        match self.cur {
            Some(i) => {
                self.cur = self.table.successor(i);
                self.rank += 1;
                true
            }
            None => false,
        }
    }

    /// Step to the in-order predecessor. Returns `false` at the front.
    pub fn move_prev(&mut self) -> bool {
        if self.rank == 0 {
            return false;
        }
        self.cur = match self.cur {
            Some(i) => self.table.predecessor(i),
            None => self.table.rightmost(self.table.root),
        };
        self.rank -= 1;
        true
    }

    /// Jump `n` rows ahead. Overshooting parks the cursor at the back.
    pub fn forward(&mut self, n: usize) {
        self.seek(self.rank.checked_add(n));
    }

    /// Jump `n` rows back. Undershooting parks the cursor at the back.
    pub fn backward(&mut self, n: usize) {
        self.seek(self.rank.checked_sub(n));
    }

    fn seek(&mut self, target: Option<usize>) {
        let len = self.table.len();
        match target.filter(|&rank| rank <= len) {
            Some(rank) => {
                self.cur = self.table.locate(rank);
                self.rank = rank;
            }
            None => {
                self.cur = None;
                self.rank = len;
            }
        }
    }
}

impl<K, V> AddAssign<usize> for Cursor<'_, K, V> {
    fn add_assign(&mut self, n: usize) {
        self.forward(n);
    }
}

impl<K, V> SubAssign<usize> for Cursor<'_, K, V> {
    fn sub_assign(&mut self, n: usize) {
        self.backward(n);
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Cursor<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_end() {
            return None;
        }
        let row = self.row()?;
        self.move_next();
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end_rank.saturating_sub(self.rank);
        (remaining, Some(remaining))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("rank", &self.rank)
            .field("window", &(self.begin_rank..self.end_rank))
            .field("row", &self.row())
            .finish()
    }
}
