//! # avlkv
//!
//! An order-statistics AVL table and an ordered byte-key value store built
//! on top of it.
//!
//! - [`AvlTable<K, V>`] keeps `(K, V)` rows sorted by `K`, allows duplicate
//!   keys, and answers both key lookups (full or partial keys, see
//!   [`KeyPrefix`]) and rank lookups in O(log n).
//! - [`Store`] maps byte-string keys to boxed [`Value`]s with prefix ranges,
//!   key rename, bulk prefix deletion, id counters and mutation
//!   notifications for a [`Persistence`] collaborator.
//!
//! ## Example
//!
//! ```rust
//! use avlkv::{encoding::KeyWriter, Store};
//!
//! let mut store = Store::new();
//! for id in [3u32, 1, 2] {
//!     let mut key = KeyWriter::with_prefix(b"user/");
//!     key.push_u32(id);
//!     store.put(key.finish(), Box::new(u64::from(id) * 10)).unwrap();
//! }
//!
//! assert_eq!(store.prefix_count(b"user/"), 3);
//! assert_eq!(store.value_at(0).and_then(|v| v.downcast_ref::<u64>()), Some(&10));
//!
//! assert_eq!(store.prefix_erase(b"user/").unwrap(), 3);
//! assert!(store.is_empty());
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod store;
pub mod table;

pub use config::Config;
pub use error::{Error, Result};
pub use store::{Difference, IdType, IdWidth, Persistence, Schema, Store, Value, Visitor};
pub use table::{AvlTable, Cursor, KeyPrefix};

#[cfg(test)]
mod proptests;
