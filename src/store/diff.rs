use std::cmp::Ordering;

use super::value::Value;
use super::Store;

/// One difference between two stores, reported by [`Store::diff`].
#[derive(Clone, Copy, Debug)]
pub enum Difference<'a> {
    /// Only the second store has `key`.
    Added { key: &'a [u8], value: &'a dyn Value },
    /// Only the first store has `key`.
    Removed { key: &'a [u8], value: &'a dyn Value },
    /// Both stores have `key`, with unequal values.
    Changed {
        key: &'a [u8],
        old: &'a dyn Value,
        new: &'a dyn Value,
    },
}

impl<'a> Difference<'a> {
    pub fn key(&self) -> &'a [u8] {
        match *self {
            Difference::Added { key, .. }
            | Difference::Removed { key, .. }
            | Difference::Changed { key, .. } => key,
        }
    }
}

impl Store {
    /// Walk `a` and `b` in key order and report every key whose presence or
    /// value differs, in key order.
    pub fn diff<'a, F>(a: &'a Store, b: &'a Store, mut f: F)
    where
        F: FnMut(Difference<'a>),
    {
        let mut left = a.iter().peekable();
        let mut right = b.iter().peekable();
        loop {
            let order = match (left.peek(), right.peek()) {
                (None, None) => return,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((lk, _)), Some((rk, _))) => lk.cmp(rk),
            };
            match order {
                Ordering::Less => {
                    if let Some((key, value)) = left.next() {
                        f(Difference::Removed { key, value });
                    }
                }
                Ordering::Greater => {
                    if let Some((key, value)) = right.next() {
                        f(Difference::Added { key, value });
                    }
                }
                Ordering::Equal => {
                    if let (Some((key, old)), Some((_, new))) = (left.next(), right.next()) {
                        if !old.eq_value(new) {
                            f(Difference::Changed { key, old, new });
                        }
                    }
                }
            }
        }
    }
}
