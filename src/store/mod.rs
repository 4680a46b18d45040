//! Ordered byte-key value store.
//!
//! A [`Store`] maps byte-string keys to owned, polymorphic [`Value`]s, kept
//! sorted by unsigned byte comparison in an [`AvlTable`]. On top of exact
//! lookups it offers rank access, prefix ranges, atomic key rename, bulk
//! prefix deletion and per-type monotonic id counters.
//!
//! Mutations are reported to an optional [`Persistence`] collaborator entry
//! by entry. [`Store::suspend`] turns that off for bulk work and
//! [`Store::resume`] replaces the skipped notifications with one `save`.

mod diff;
mod hooks;
mod ids;
mod value;

pub use diff::Difference;
pub use hooks::{Persistence, Schema};
pub use ids::{IdType, IdWidth};
pub use value::{Value, Visitor};

use std::fmt;
use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::encoding::{display_key, prefix_end};
use crate::error::{Error, Result};
use crate::table::AvlTable;

/// Ordered map from byte keys to boxed values.
pub struct Store {
    table: AvlTable<Vec<u8>, Box<dyn Value>>,
    counters: Vec<u64>,
    suspended: bool,
    schema: Option<Box<dyn Schema>>,
    persistence: Option<Box<dyn Persistence>>,
}

fn entry<'a>((key, value): (&'a Vec<u8>, &'a Box<dyn Value>)) -> (&'a [u8], &'a dyn Value) {
    (key.as_slice(), &**value)
}

impl Store {
    /// Create a new empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new store with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            table: AvlTable::with_capacity(config.initial_capacity),
            counters: vec![0; config.id_types],
            suspended: config.start_suspended,
            schema: None,
            persistence: None,
        }
    }

    /// Attach the schema used by [`get_or_create`](Self::get_or_create).
    pub fn with_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.schema = Some(Box::new(schema));
        self
    }

    /// Attach the collaborator notified of mutations.
    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Some(Box::new(persistence));
        self
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Rank of the entry with exactly this key.
    fn rank_of(&self, key: &[u8]) -> Option<usize> {
        let cursor = self.table.single(key);
        (!cursor.is_end()).then(|| cursor.rank())
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.table.contains(key.as_ref())
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&dyn Value> {
        let (_, value) = self.table.get(key.as_ref())?;
        Some(&**value)
    }

    /// Mutable access to a value. Call [`modified`](Self::modified) afterwards
    /// so the change reaches the persistence collaborator.
    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut dyn Value> {
        let value = self.table.get_mut(key.as_ref())?;
        Some(&mut **value)
    }

    /// The value at `key` as a `T`. `Ok(None)` if the key is absent.
    pub fn get_as<T: Value>(&self, key: impl AsRef<[u8]>) -> Result<Option<&T>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.downcast_ref::<T>() {
            Some(typed) => Ok(Some(typed)),
            None => Err(Error::WrongValueType {
                expected: std::any::type_name::<T>(),
                found: value.type_name(),
            }),
        }
    }

    pub fn get_as_mut<T: Value>(&mut self, key: impl AsRef<[u8]>) -> Result<Option<&mut T>> {
        let Some(value) = self.table.get_mut(key.as_ref()) else {
            return Ok(None);
        };
        let found = value.type_name();
        match value.downcast_mut::<T>() {
            Some(typed) => Ok(Some(typed)),
            None => Err(Error::WrongValueType {
                expected: std::any::type_name::<T>(),
                found,
            }),
        }
    }

    /// The value at `key`, created from the schema if it does not exist yet.
    ///
    /// Fails with [`Error::InvalidKey`] when there is no schema or the schema
    /// maps the key to no value type. If the `modify` notification for a new
    /// value fails, the value is dropped again.
    pub fn get_or_create(&mut self, key: impl AsRef<[u8]>) -> Result<&mut dyn Value> {
        let key = key.as_ref();
        let rank = self.table.lower(key).rank();
        if !self.key_matches(rank, key) {
            let value = self
                .schema
                .as_ref()
                .and_then(|schema| schema.create(key))
                .ok_or_else(|| Error::InvalidKey(display_key(key)))?;
            debug!(key = %display_key(key), ty = value.type_name(), "creating value");
            self.table.insert_at(rank, key.to_vec(), value)?;
            if let Err(err) = self.notify_modify(rank) {
                self.table.take_at(rank)?;
                return Err(err);
            }
        }
        let value = self.table.value_at_mut(rank)?;
        Ok(&mut **value)
    }

    fn key_matches(&self, rank: usize, key: &[u8]) -> bool {
        self.table.key_at(rank).map_or(false, |k| k.as_slice() == key)
    }

    /// Insert or replace the value at `key`. Returns the replaced value.
    ///
    /// A failed `modify` notification restores the previous state: the old
    /// value goes back in place, or the new entry is removed.
    pub fn put(
        &mut self,
        key: impl AsRef<[u8]>,
        value: Box<dyn Value>,
    ) -> Result<Option<Box<dyn Value>>> {
        let key = key.as_ref();
        let rank = self.table.lower(key).rank();
        let old = if self.key_matches(rank, key) {
            Some(self.table.put_at(rank, value)?)
        } else {
            self.table.insert_at(rank, key.to_vec(), value)?;
            None
        };
        if let Err(err) = self.notify_modify(rank) {
            match old {
                Some(old) => drop(self.table.put_at(rank, old)?),
                None => drop(self.table.take_at(rank)?),
            }
            warn!(key = %display_key(key), %err, "put rolled back");
            return Err(err);
        }
        trace!(key = %display_key(key), replaced = old.is_some(), "put value");
        Ok(old)
    }

    /// Report an entry changed through [`get_mut`](Self::get_mut). A missing
    /// key is ignored.
    pub fn modified(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        match self.rank_of(key.as_ref()) {
            Some(rank) => self.notify_modify(rank),
            None => Ok(()),
        }
    }

    /// Remove the entry at `key`, notifying the persistence collaborator
    /// first. A failed notification leaves the entry in place.
    pub fn erase(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Box<dyn Value>>> {
        let key = key.as_ref();
        let Some(rank) = self.rank_of(key) else {
            return Ok(None);
        };
        self.notify_erase(rank)?;
        let (_, value) = self.table.take_at(rank)?;
        debug!(key = %display_key(key), "erased value");
        Ok(Some(value))
    }

    /// Move the value at `old` to `new`.
    ///
    /// Fails with [`Error::NoSuchValue`] if `old` is absent and with
    /// [`Error::DuplicateKey`] if `new` is taken. Renaming a key to itself
    /// succeeds without doing anything.
    ///
    /// The persistence collaborator sees `erase(old)` then `modify(new)`
    /// before the entry moves, so a failed notification leaves the store
    /// unchanged. When only `modify(new)` fails, `old` is reported again.
    pub fn rename(&mut self, old: impl AsRef<[u8]>, new: impl AsRef<[u8]>) -> Result<()> {
        let (old, new) = (old.as_ref(), new.as_ref());
        let Some(from) = self.rank_of(old) else {
            return Err(Error::NoSuchValue(display_key(old)));
        };
        if old == new {
            return Ok(());
        }
        if self.table.contains(new) {
            return Err(Error::DuplicateKey(display_key(new)));
        }

        if !self.suspended {
            if let Some(persistence) = self.persistence.as_deref_mut() {
                let value = self.table.value_at(from)?;
                persistence.erase(old, &**value)?;
                if let Err(err) = persistence.modify(new, &**value) {
                    if let Err(undo) = persistence.modify(old, &**value) {
                        warn!(key = %display_key(old), %undo, "could not restore renamed key");
                    }
                    return Err(err);
                }
            }
        }

        let (_, value) = self.table.take_at(from)?;
        self.table.insert(new.to_vec(), value);
        debug!(old = %display_key(old), new = %display_key(new), "renamed value");
        Ok(())
    }

    /// Remove every entry whose key starts with `prefix`. Returns the number
    /// of entries removed.
    ///
    /// Entries are reported to the persistence collaborator from the last one
    /// down, all before anything is removed. A failed notification leaves
    /// every entry in place.
    pub fn prefix_erase(&mut self, prefix: impl AsRef<[u8]>) -> Result<usize> {
        let prefix = prefix.as_ref();
        let range = self.prefix_range(prefix);
        for rank in range.clone().rev() {
            self.notify_erase(rank)?;
        }
        let count = self.table.remove_at(range.start, range.len());
        debug!(prefix = %display_key(prefix), count, "erased prefix");
        Ok(count)
    }

    /// Rank of the first entry with key `>= key`.
    pub fn lower(&self, key: impl AsRef<[u8]>) -> usize {
        self.table.lower(key.as_ref()).rank()
    }

    /// Rank of the first entry with key `> key`.
    pub fn upper(&self, key: impl AsRef<[u8]>) -> usize {
        self.table.upper(key.as_ref()).rank()
    }

    /// Exclusive upper bound of the ranks of keys starting with `prefix`.
    ///
    /// An empty prefix, or one made only of `0xFF` bytes, has no finite
    /// successor and bounds at `len()`.
    pub fn prefix_upper(&self, prefix: impl AsRef<[u8]>) -> usize {
        match prefix_end(prefix.as_ref()) {
            Some(end) => self.lower(end),
            None => self.len(),
        }
    }

    /// Ranks of the entry with exactly this key (empty or one entry).
    pub fn range(&self, key: impl AsRef<[u8]>) -> Range<usize> {
        let key = key.as_ref();
        self.lower(key)..self.upper(key)
    }

    /// Ranks of every entry whose key starts with `prefix`.
    pub fn prefix_range(&self, prefix: impl AsRef<[u8]>) -> Range<usize> {
        let prefix = prefix.as_ref();
        self.lower(prefix)..self.prefix_upper(prefix)
    }

    pub fn prefix_count(&self, prefix: impl AsRef<[u8]>) -> usize {
        self.prefix_range(prefix).len()
    }

    /// Entries whose key starts with `prefix`, in key order.
    pub fn prefix_iter(
        &self,
        prefix: impl AsRef<[u8]>,
    ) -> impl Iterator<Item = (&[u8], &dyn Value)> + '_ {
        let range = self.prefix_range(prefix);
        self.table.window(range).into_iter().flatten().map(entry)
    }

    /// Key at rank `pos`, `None` past the end.
    pub fn key_at(&self, pos: usize) -> Option<&[u8]> {
        self.table.key_at(pos).ok().map(Vec::as_slice)
    }

    /// Value at rank `pos`, `None` past the end.
    pub fn value_at(&self, pos: usize) -> Option<&dyn Value> {
        let value = self.table.value_at(pos).ok()?;
        Some(&**value)
    }

    /// Every entry in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &dyn Value)> + '_ {
        self.table.iter().map(entry)
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&[u8], &dyn Value),
    {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    /// Drop every entry. Nothing is reported to the persistence collaborator.
    pub fn clear(&mut self) {
        debug!(count = self.len(), "clearing store");
        self.table.clear();
    }

    /// Next id of `ty`. Ids start at 1.
    ///
    /// Fails with [`Error::IdExhausted`] once the next id no longer fits
    /// `ty.width`; the counter is left unchanged so a wider type can retry.
    pub fn acquire(&mut self, ty: &IdType) -> Result<u64> {
        let counter = self
            .counters
            .get_mut(ty.slot)
            .ok_or_else(|| Error::UnknownIdType(ty.name.clone()))?;
        let max = ty.width.max();
        match counter.checked_add(1).filter(|&id| id <= max) {
            Some(id) => {
                *counter = id;
                trace!(ty = %ty.name, id, "acquired id");
                Ok(id)
            }
            None => {
                warn!(ty = %ty.name, max, "id type exhausted");
                Err(Error::IdExhausted {
                    name: ty.name.clone(),
                    max,
                })
            }
        }
    }

    /// Last id handed out for `ty` (0 if none).
    pub fn id_counter(&self, ty: &IdType) -> Result<u64> {
        self.counters
            .get(ty.slot)
            .copied()
            .ok_or_else(|| Error::UnknownIdType(ty.name.clone()))
    }

    /// Set the counter of `ty`, e.g. from persisted state.
    pub fn restore_id_counter(&mut self, ty: &IdType, value: u64) -> Result<()> {
        let counter = self
            .counters
            .get_mut(ty.slot)
            .ok_or_else(|| Error::UnknownIdType(ty.name.clone()))?;
        *counter = value;
        Ok(())
    }

    /// Stop per-entry notifications.
    pub fn suspend(&mut self) {
        if !self.suspended {
            debug!("suspending notifications");
        }
        self.suspended = true;
    }

    /// Restart per-entry notifications. If the store was suspended, the
    /// persistence collaborator saves the whole store once.
    pub fn resume(&mut self) -> Result<()> {
        if !self.suspended {
            return Ok(());
        }
        self.suspended = false;
        debug!(len = self.len(), "resuming notifications");
        match self.persistence.take() {
            Some(mut persistence) => {
                let saved = persistence.save(self);
                self.persistence = Some(persistence);
                saved
            }
            None => Ok(()),
        }
    }

    /// Fill the store from the persistence collaborator with notifications
    /// suspended. The previous suspend state is restored afterwards.
    pub fn load(&mut self) -> Result<()> {
        let Some(mut persistence) = self.persistence.take() else {
            return Ok(());
        };
        let suspended = self.suspended;
        self.suspended = true;
        let loaded = persistence.load(self);
        self.suspended = suspended;
        self.persistence = Some(persistence);
        debug!(len = self.len(), ok = loaded.is_ok(), "loaded store");
        loaded
    }

    fn notify_modify(&mut self, rank: usize) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        if let Some(persistence) = self.persistence.as_deref_mut() {
            let (key, value) = self.table.row_at(rank)?;
            persistence.modify(key, &**value)?;
        }
        Ok(())
    }

    fn notify_erase(&mut self, rank: usize) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        if let Some(persistence) = self.persistence.as_deref_mut() {
            let (key, value) = self.table.row_at(rank)?;
            persistence.erase(key, &**value)?;
        }
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

struct Entries<'a>(&'a Store);

impl fmt::Debug for Entries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(key, value)| (display_key(key), value)))
            .finish()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entries", &Entries(self))
            .field("counters", &self.counters)
            .field("suspended", &self.suspended)
            .finish_non_exhaustive()
    }
}
