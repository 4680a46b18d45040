//! Collaborators a [`Store`] calls out to.

use super::value::Value;
use super::Store;
use crate::error::Result;

/// Resolves the value type a key maps to, for
/// [`Store::get_or_create`](Store::get_or_create).
pub trait Schema {
    /// A fresh default value for `key`, or `None` if the key does not map to
    /// any value type.
    fn create(&self, key: &[u8]) -> Option<Box<dyn Value>>;
}

impl<F> Schema for F
where
    F: Fn(&[u8]) -> Option<Box<dyn Value>>,
{
    fn create(&self, key: &[u8]) -> Option<Box<dyn Value>> {
        self(key)
    }
}

/// Backing storage kept in sync with a [`Store`].
///
/// `modify` and `erase` are called per entry unless the store is suspended;
/// `save` is called once when a suspended store resumes.
pub trait Persistence {
    /// Fill `store` from the backing storage. Runs with notifications
    /// suspended.
    fn load(&mut self, _store: &mut Store) -> Result<()> {
        Ok(())
    }

    /// Write the whole store back.
    fn save(&mut self, store: &Store) -> Result<()>;

    /// `key` was created or changed.
    fn modify(&mut self, key: &[u8], value: &dyn Value) -> Result<()>;

    /// `key` is about to be removed.
    fn erase(&mut self, key: &[u8], value: &dyn Value) -> Result<()>;
}
