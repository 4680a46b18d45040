//! Node arena and AVL mechanics.
//!
//! Nodes live in `AvlTable::nodes` and link to each other by index. The
//! arena is kept dense: removing a node swap-removes it and repoints the
//! neighbours of the node that moved into its slot, so `nodes.len()` is
//! always the row count.
//!
//! Every node carries its subtree size (for rank queries) and its balance
//! factor `height(left) - height(right)`. Both are maintained incrementally;
//! nothing in here recounts a subtree.

use std::cmp::Ordering;

use super::prefix::KeyPrefix;
use super::AvlTable;

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// `height(left) - height(right)`; ±2 only while a rotation is pending.
    pub(crate) balance: i8,
    /// Number of nodes in the subtree rooted here, including this one.
    pub(crate) size: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            balance: 0,
            size: 0,
            parent: None,
            left: None,
            right: None,
        }
    }
}

/// Result of a bound search: the bounding node (if any), its rank (the row
/// count when there is none) and whether a row equal to the prefix was seen.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Probe {
    pub(crate) node: Option<usize>,
    pub(crate) rank: usize,
    pub(crate) found: bool,
}

impl<K, V> AvlTable<K, V> {
    #[inline]
    pub(crate) fn subtree_size(&self, link: Option<usize>) -> usize {
        link.map_or(0, |i| self.nodes[i].size)
    }

    pub(crate) fn leftmost(&self, from: Option<usize>) -> Option<usize> {
        let mut cur = from?;
        while let Some(next) = self.nodes[cur].left {
            cur = next;
        }
        Some(cur)
    }

    pub(crate) fn rightmost(&self, from: Option<usize>) -> Option<usize> {
        let mut cur = from?;
        while let Some(next) = self.nodes[cur].right {
            cur = next;
        }
        Some(cur)
    }

    pub(crate) fn successor(&self, n: usize) -> Option<usize> {
        if let Some(right) = self.nodes[n].right {
            return self.leftmost(Some(right));
        }
        let mut cur = n;
        while let Some(p) = self.nodes[cur].parent {
            if self.nodes[p].left == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    pub(crate) fn predecessor(&self, n: usize) -> Option<usize> {
        if let Some(left) = self.nodes[n].left {
            return self.rightmost(Some(left));
        }
        let mut cur = n;
        while let Some(p) = self.nodes[cur].parent {
            if self.nodes[p].right == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    /// Node at `rank`, or `None` when `rank >= len()`.
    pub(crate) fn locate(&self, mut rank: usize) -> Option<usize> {
        let mut cur = self.root;
        while let Some(i) = cur {
            let left = self.subtree_size(self.nodes[i].left);
            match rank.cmp(&left) {
                Ordering::Less => cur = self.nodes[i].left,
                Ordering::Equal => return Some(i),
                Ordering::Greater => {
                    rank -= left + 1;
                    cur = self.nodes[i].right;
                }
            }
        }
        None
    }

    /// First row whose leading columns are `>= prefix`.
    pub(crate) fn find_lower<P>(&self, prefix: &P) -> Probe
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let mut probe = Probe {
            node: None,
            rank: self.len(),
            found: false,
        };
        let mut base = 0;
        let mut cur = self.root;
        while let Some(i) = cur {
            let node = &self.nodes[i];
            let left = self.subtree_size(node.left);
            match P::cmp_key(prefix, &node.key) {
                Ordering::Greater => {
                    base += left + 1;
                    cur = node.right;
                }
                ord => {
                    probe.found |= ord == Ordering::Equal;
                    probe.node = Some(i);
                    probe.rank = base + left;
                    cur = node.left;
                }
            }
        }
        probe
    }

    /// First row whose leading columns are `> prefix`.
    pub(crate) fn find_upper<P>(&self, prefix: &P) -> Probe
    where
        P: KeyPrefix<K> + ?Sized,
    {
        let mut probe = Probe {
            node: None,
            rank: self.len(),
            found: false,
        };
        let mut base = 0;
        let mut cur = self.root;
        while let Some(i) = cur {
            let node = &self.nodes[i];
            let left = self.subtree_size(node.left);
            match P::cmp_key(prefix, &node.key) {
                Ordering::Less => {
                    probe.node = Some(i);
                    probe.rank = base + left;
                    cur = node.left;
                }
                ord => {
                    probe.found |= ord == Ordering::Equal;
                    base += left + 1;
                    cur = node.right;
                }
            }
        }
        probe
    }

    /// Point `parent`'s link to `old` (or the root, without a parent) at `new`.
    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    /// Rotate `n` (the right child of its parent `p`) up into `p`'s place.
    ///
    /// Sizes: with `s1 = |p.left|`, `s2 = |n.left|`, `s3 = |n.right|`, `p`
    /// ends up with `s1 + s2 + 1` and `n` with everything.
    ///
    /// Balances: heights are taken relative to the lower of `n`'s subtrees,
    /// `h2 = height(n.left)` and `h3 = height(n.right)`, so that
    /// `h1 = height(p.left) = max(h2, h3) + 1 + p.balance`. `p` ends up with
    /// `h1 - h2`, `n` with `max(h1, h2) + 1 - h3`. `p.balance` may be ±2 on
    /// entry.
    pub(crate) fn rotate_left(&mut self, n: usize) {
        let p = self.nodes[n].parent.expect("rotated node has a parent");
        let inner = self.nodes[n].left;

        let s3 = self.subtree_size(self.nodes[n].right);
        let s2 = self.nodes[n].size - s3 - 1;
        let s1 = self.nodes[p].size - s2 - s3 - 2;
        self.nodes[n].size = s1 + s2 + s3 + 2;
        self.nodes[p].size = s1 + s2 + 1;

        let nb = i32::from(self.nodes[n].balance);
        let pb = i32::from(self.nodes[p].balance);
        let (h2, h3) = if nb <= 0 { (0, -nb) } else { (nb, 0) };
        let h1 = h2.max(h3) + 1 + pb;
        self.nodes[p].balance = (h1 - h2) as i8;
        self.nodes[n].balance = (h1.max(h2) + 1 - h3) as i8;

        let grand = self.nodes[p].parent;
        self.replace_child(grand, p, Some(n));
        if let Some(c) = inner {
            self.nodes[c].parent = Some(p);
        }
        self.nodes[n].parent = grand;
        self.nodes[n].left = Some(p);
        self.nodes[p].right = inner;
        self.nodes[p].parent = Some(n);
    }

    /// Mirror of [`rotate_left`](Self::rotate_left): `n` is the left child of
    /// `p`, `h1 = height(n.left)`, `h2 = height(n.right)`,
    /// `h3 = height(p.right) = max(h1, h2) + 1 - p.balance`.
    pub(crate) fn rotate_right(&mut self, n: usize) {
        let p = self.nodes[n].parent.expect("rotated node has a parent");
        let inner = self.nodes[n].right;

        let s1 = self.subtree_size(self.nodes[n].left);
        let s2 = self.nodes[n].size - s1 - 1;
        let s3 = self.nodes[p].size - s1 - s2 - 2;
        self.nodes[n].size = s1 + s2 + s3 + 2;
        self.nodes[p].size = s2 + s3 + 1;

        let nb = i32::from(self.nodes[n].balance);
        let pb = i32::from(self.nodes[p].balance);
        let (h1, h2) = if nb <= 0 { (0, -nb) } else { (nb, 0) };
        let h3 = h1.max(h2) + 1 - pb;
        self.nodes[p].balance = (h2 - h3) as i8;
        self.nodes[n].balance = (h1 - h2.max(h3) - 1) as i8;

        let grand = self.nodes[p].parent;
        self.replace_child(grand, p, Some(n));
        if let Some(c) = inner {
            self.nodes[c].parent = Some(p);
        }
        self.nodes[n].parent = grand;
        self.nodes[n].right = Some(p);
        self.nodes[p].left = inner;
        self.nodes[p].parent = Some(n);
    }

    /// Account for the new leaf `n` and restore the AVL invariant above it.
    fn retrace_insert(&mut self, n: usize) {
        let mut cur = Some(n);
        while let Some(i) = cur {
            self.nodes[i].size += 1;
            cur = self.nodes[i].parent;
        }

        // `child`'s subtree just grew by one level.
        let mut child = n;
        while let Some(p) = self.nodes[child].parent {
            if self.nodes[p].left == Some(child) {
                match self.nodes[p].balance {
                    1 => {
                        self.nodes[p].balance = 2;
                        if self.nodes[child].balance == -1 {
                            let m = self.nodes[child]
                                .right
                                .expect("right-heavy node has a right child");
                            self.rotate_left(m);
                            self.rotate_right(m);
                        } else {
                            self.rotate_right(child);
                        }
                        break;
                    }
                    -1 => {
                        self.nodes[p].balance = 0;
                        break;
                    }
                    _ => self.nodes[p].balance = 1,
                }
            } else {
                match self.nodes[p].balance {
                    -1 => {
                        self.nodes[p].balance = -2;
                        if self.nodes[child].balance == 1 {
                            let m = self.nodes[child]
                                .left
                                .expect("left-heavy node has a left child");
                            self.rotate_right(m);
                            self.rotate_left(m);
                        } else {
                            self.rotate_left(child);
                        }
                        break;
                    }
                    1 => {
                        self.nodes[p].balance = 0;
                        break;
                    }
                    _ => self.nodes[p].balance = -1,
                }
            }
            child = p;
        }
    }

    /// Account for a removed node below `start` and restore the AVL invariant.
    /// `from_right` tells which of `start`'s subtrees lost a level.
    fn retrace_remove(&mut self, start: Option<usize>, mut from_right: bool) {
        let mut cur = start;
        while let Some(i) = cur {
            self.nodes[i].size -= 1;
            cur = self.nodes[i].parent;
        }

        let mut cur = start;
        while let Some(n) = cur {
            // Root of the subtree that is now one level lower.
            let top = if from_right {
                match self.nodes[n].balance {
                    1 => {
                        let c = self.nodes[n].left.expect("left-heavy node has a left child");
                        self.nodes[n].balance = 2;
                        match self.nodes[c].balance {
                            -1 => {
                                let m = self.nodes[c]
                                    .right
                                    .expect("right-heavy node has a right child");
                                self.rotate_left(m);
                                self.rotate_right(m);
                                m
                            }
                            0 => {
                                self.rotate_right(c);
                                break;
                            }
                            _ => {
                                self.rotate_right(c);
                                c
                            }
                        }
                    }
                    0 => {
                        self.nodes[n].balance = 1;
                        break;
                    }
                    _ => {
                        self.nodes[n].balance = 0;
                        n
                    }
                }
            } else {
                match self.nodes[n].balance {
                    -1 => {
                        let c = self.nodes[n].right.expect("right-heavy node has a right child");
                        self.nodes[n].balance = -2;
                        match self.nodes[c].balance {
                            1 => {
                                let m = self.nodes[c]
                                    .left
                                    .expect("left-heavy node has a left child");
                                self.rotate_right(m);
                                self.rotate_left(m);
                                m
                            }
                            0 => {
                                self.rotate_left(c);
                                break;
                            }
                            _ => {
                                self.rotate_left(c);
                                c
                            }
                        }
                    }
                    0 => {
                        self.nodes[n].balance = -1;
                        break;
                    }
                    _ => {
                        self.nodes[n].balance = 0;
                        n
                    }
                }
            };

            cur = self.nodes[top].parent;
            if let Some(p) = cur {
                from_right = self.nodes[p].right == Some(top);
            }
        }
    }

    /// Link a new row in front of `pivot` (at the very end without a pivot)
    /// and rebalance. Returns the new node's index.
    pub(crate) fn link_before(&mut self, pivot: Option<usize>, key: K, value: V) -> usize {
        let n = self.nodes.len();
        self.nodes.push(Node::new(key, value));

        let attach = match pivot {
            None => self.rightmost(self.root).map(|last| (last, false)),
            Some(p) => match self.nodes[p].left {
                None => Some((p, true)),
                Some(left) => self.rightmost(Some(left)).map(|last| (last, false)),
            },
        };
        match attach {
            None => self.root = Some(n),
            Some((parent, true)) => {
                self.nodes[parent].left = Some(n);
                self.nodes[n].parent = Some(parent);
            }
            Some((parent, false)) => {
                self.nodes[parent].right = Some(n);
                self.nodes[n].parent = Some(parent);
            }
        }

        self.retrace_insert(n);
        n
    }

    /// Unlink node `x`, rebalance, and release its slot. Returns its row.
    pub(crate) fn unlink(&mut self, x: usize) -> (K, V) {
        let parent = self.nodes[x].parent;
        let left = self.nodes[x].left;
        let right = self.nodes[x].right;

        let (retrace_from, from_right) = match (left, right) {
            (Some(l), Some(r)) => {
                // Replace x with its in-order predecessor y.
                let mut y = l;
                let from = if self.nodes[y].right.is_some() {
                    while let Some(next) = self.nodes[y].right {
                        y = next;
                    }
                    let yp = self.nodes[y].parent.expect("descended node has a parent");
                    let yl = self.nodes[y].left;
                    self.nodes[yp].right = yl;
                    if let Some(c) = yl {
                        self.nodes[c].parent = Some(yp);
                    }
                    self.nodes[y].left = Some(l);
                    self.nodes[l].parent = Some(y);
                    (Some(yp), true)
                } else {
                    (Some(y), false)
                };
                self.nodes[y].parent = parent;
                self.nodes[y].right = Some(r);
                self.nodes[y].balance = self.nodes[x].balance;
                self.nodes[y].size = self.nodes[x].size;
                self.nodes[r].parent = Some(y);
                self.replace_child(parent, x, Some(y));
                from
            }
            _ => {
                let child = left.or(right);
                let from_right = parent.map_or(true, |p| self.nodes[p].left != Some(x));
                self.replace_child(parent, x, child);
                if let Some(c) = child {
                    self.nodes[c].parent = parent;
                }
                (parent, from_right)
            }
        };

        self.retrace_remove(retrace_from, from_right);
        self.release(x)
    }

    /// Drop the (already unlinked) slot `x` from the arena.
    fn release(&mut self, x: usize) -> (K, V) {
        let last = self.nodes.len() - 1;
        if x != last {
            let moved = &self.nodes[last];
            let (parent, left, right) = (moved.parent, moved.left, moved.right);
            self.replace_child(parent, last, Some(x));
            if let Some(c) = left {
                self.nodes[c].parent = Some(x);
            }
            if let Some(c) = right {
                self.nodes[c].parent = Some(x);
            }
        }
        let node = self.nodes.swap_remove(x);
        (node.key, node.value)
    }
}
