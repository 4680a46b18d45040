//! Partial keys.
//!
//! A table's key `K` may span several columns (a tuple). Lookups accept any
//! leading run of those columns: the full key, a shorter tuple, or `()` for
//! "every row". Comparison is lexicographic, column 0 first, over the columns
//! the prefix names.

use std::cmp::Ordering;

/// A (possibly partial) key that can be compared against full keys of type `K`.
pub trait KeyPrefix<K: ?Sized> {
    /// Ordering of this prefix relative to the leading columns of `key`.
    fn cmp_key(&self, key: &K) -> Ordering;

    /// Whether the prefix names every key column.
    fn is_full(&self) -> bool {
        true
    }
}

impl<K: Ord> KeyPrefix<K> for K {
    #[inline]
    fn cmp_key(&self, key: &K) -> Ordering {
        self.cmp(key)
    }
}

impl KeyPrefix<Vec<u8>> for [u8] {
    #[inline]
    fn cmp_key(&self, key: &Vec<u8>) -> Ordering {
        self.cmp(key.as_slice())
    }
}

impl<const N: usize> KeyPrefix<Vec<u8>> for [u8; N] {
    #[inline]
    fn cmp_key(&self, key: &Vec<u8>) -> Ordering {
        self.as_slice().cmp(key.as_slice())
    }
}

impl KeyPrefix<String> for str {
    #[inline]
    fn cmp_key(&self, key: &String) -> Ordering {
        self.cmp(key.as_str())
    }
}

macro_rules! impl_tuple_prefix {
    (($($k:ident),+) => ($($p:ident . $i:tt),*)) => {
        impl<$($k: Ord),+> KeyPrefix<($($k,)+)> for ($($p,)*) {
            #[allow(unused_variables)]
            #[inline]
            fn cmp_key(&self, key: &($($k,)+)) -> Ordering {
                Ordering::Equal $(.then_with(|| self.$i.cmp(&key.$i)))*
            }

            fn is_full(&self) -> bool {
                false
            }
        }
    };
}

impl_tuple_prefix!((A) => ());
impl_tuple_prefix!((A, B) => ());
impl_tuple_prefix!((A, B) => (A.0));
impl_tuple_prefix!((A, B, C) => ());
impl_tuple_prefix!((A, B, C) => (A.0));
impl_tuple_prefix!((A, B, C) => (A.0, B.1));
impl_tuple_prefix!((A, B, C, D) => ());
impl_tuple_prefix!((A, B, C, D) => (A.0));
impl_tuple_prefix!((A, B, C, D) => (A.0, B.1));
impl_tuple_prefix!((A, B, C, D) => (A.0, B.1, C.2));
