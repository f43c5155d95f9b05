//! Write-through key/value overlay for one entity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kissen_meta::{MetaData, ObjectMeta};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{Result, SavableError};
use crate::list::{ListAction, ListExecution, SavableList};
use crate::record::SavableRecordList;

/// In-memory view of everything stored under one total id.
///
/// `put*` methods change memory only. `set*` methods change memory and
/// write through to the meta. Lists created by `set_list*` (or loaded from
/// storage) persist every later mutation; lists created by `put_list*` stay
/// transient, even when later touched through a `set*` method.
///
/// Scalar keys must not start with [`kissen_meta::LIST_PREFIX`]; writing
/// one fails with [`kissen_meta::MetaError::ReservedKey`].
pub struct SavableMap {
    id: String,
    meta: Arc<ObjectMeta>,
    values: BTreeMap<String, String>,
    lists: BTreeMap<String, SavableList>,
}

impl fmt::Debug for SavableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavableMap")
            .field("id", &self.id)
            .field("values", &self.values)
            .field("lists", &self.lists)
            .finish_non_exhaustive()
    }
}

fn persist_action(meta: &Arc<ObjectMeta>, id: &str, key: &str) -> ListAction<String> {
    let meta = Arc::clone(meta);
    let id = id.to_string();
    let key = key.to_string();
    Box::new(
        move |_execution: ListExecution, _before: &[String], after: &[String]| -> Result<()> {
            meta.set_string_list(&id, &key, Some(after))?;
            Ok(())
        },
    )
}

impl SavableMap {
    /// Empty map for `id`; nothing is read from storage.
    pub fn new(id: impl Into<String>, meta: Arc<ObjectMeta>) -> Self {
        Self {
            id: id.into(),
            meta,
            values: BTreeMap::new(),
            lists: BTreeMap::new(),
        }
    }

    /// Builds the map from loaded data; loaded lists persist their changes.
    pub fn from_data(id: impl Into<String>, meta: Arc<ObjectMeta>, data: MetaData) -> Self {
        let mut map = Self::new(id, meta);
        map.values = data.values;
        for (key, items) in data.lists {
            let list = SavableList::from(items).with_action(persist_action(&map.meta, &map.id, &key));
            map.lists.insert(key, list);
        }
        map
    }

    /// Total id this map is stored under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The meta every write-through goes to.
    pub fn meta(&self) -> &Arc<ObjectMeta> {
        &self.meta
    }

    /// Number of scalar entries plus lists.
    pub fn len(&self) -> usize {
        self.values.len() + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.lists.is_empty()
    }

    /// Scalar keys in sorted order. List keys are not included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Snapshot of the in-memory contents.
    pub fn to_data(&self) -> MetaData {
        MetaData {
            values: self.values.clone(),
            lists: self
                .lists
                .iter()
                .map(|(key, list)| (key.clone(), list.to_vec()))
                .collect(),
        }
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// In-memory value of a scalar key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`SavableMap::get`], failing with [`SavableError::MissingKey`].
    pub fn get_not_null(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| SavableError::MissingKey {
            id: self.id.clone(),
            key: key.to_string(),
        })
    }

    /// Whether `key` holds a scalar or a list.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.lists.contains_key(key)
    }

    /// Memory-only write; `None` removes the key. Returns the old value.
    pub fn put(&mut self, key: &str, value: Option<String>) -> Option<String> {
        match value {
            Some(value) => self.values.insert(key.to_string(), value),
            None => self.values.remove(key),
        }
    }

    /// Write-through; `None` removes the key from memory and storage.
    ///
    /// Writing the value already held is a no-op. Storage is written first,
    /// so a failed write leaves memory untouched.
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<Option<String>> {
        match value {
            Some(value) => {
                if self.get(key) == Some(value) {
                    return Ok(Some(value.to_string()));
                }
                self.meta.set_string(&self.id, key, Some(value))?;
                Ok(self.values.insert(key.to_string(), value.to_string()))
            }
            None => {
                self.meta.delete(&self.id, key)?;
                Ok(self.values.remove(key))
            }
        }
    }

    /// Writes `value` only if `key` is unset; returns whether it wrote.
    pub fn set_if_absent(&mut self, key: &str, value: &str) -> Result<bool> {
        if self.values.contains_key(key) {
            return Ok(false);
        }
        self.set(key, Some(value))?;
        Ok(true)
    }

    /// Removes a scalar from memory and storage.
    pub fn delete(&mut self, key: &str) -> Result<Option<String>> {
        self.set(key, None)
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// In-memory list under `key`, transient or persisted.
    pub fn get_list(&self, key: &str) -> Option<&SavableList> {
        self.lists.get(key)
    }

    /// Mutable access; mutations persist only if the list has an action.
    pub fn get_list_mut(&mut self, key: &str) -> Option<&mut SavableList> {
        self.lists.get_mut(key)
    }

    /// Like [`SavableMap::get_list`], failing with [`SavableError::MissingKey`].
    pub fn get_list_not_null(&self, key: &str) -> Result<&SavableList> {
        self.get_list(key).ok_or_else(|| SavableError::MissingKey {
            id: self.id.clone(),
            key: key.to_string(),
        })
    }

    pub fn contains_list(&self, key: &str) -> bool {
        self.lists.contains_key(key)
    }

    /// Memory-only list; it does not persist later mutations.
    pub fn put_list(&mut self, key: &str, items: Vec<String>) -> Option<SavableList> {
        self.lists.insert(key.to_string(), SavableList::from(items))
    }

    /// Transient list under `key` unless one exists; returns whether it was added.
    pub fn put_list_if_absent(&mut self, key: &str, items: Vec<String>) -> bool {
        if self.lists.contains_key(key) {
            return false;
        }
        self.put_list(key, items);
        true
    }

    /// Appends to a list in memory only.
    pub fn put_list_value(&mut self, key: &str, value: String) {
        self.lists
            .entry(key.to_string())
            .or_default()
            .silent_mut()
            .push(value);
    }

    /// Removes `value` from a list in memory only.
    pub fn remove_list_value(&mut self, key: &str, value: &str) -> bool {
        let Some(list) = self.lists.get_mut(key) else {
            return false;
        };
        let items = list.silent_mut();
        match items.iter().position(|item| item == value) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops the list from memory only; storage keeps it.
    pub fn remove_list(&mut self, key: &str) -> Option<SavableList> {
        self.lists.remove(key)
    }

    /// Write-through list; later mutations persist too.
    pub fn set_list(&mut self, key: &str, items: Vec<String>) -> Result<()> {
        self.meta.set_string_list(&self.id, key, Some(items.as_slice()))?;
        let list = SavableList::from(items).with_action(persist_action(&self.meta, &self.id, key));
        self.lists.insert(key.to_string(), list);
        Ok(())
    }

    /// Write-through list under `key` unless one exists.
    pub fn set_list_if_absent(&mut self, key: &str, items: Vec<String>) -> Result<bool> {
        if self.lists.contains_key(key) {
            return Ok(false);
        }
        self.set_list(key, items)?;
        Ok(true)
    }

    /// The list under `key`.
    ///
    /// An absent key gets a new empty list that persists its mutations. An
    /// existing list keeps its mode: a transient list is never upgraded.
    pub fn list_entry(&mut self, key: &str) -> &mut SavableList {
        let meta = &self.meta;
        let id = &self.id;
        self.lists
            .entry(key.to_string())
            .or_insert_with(|| SavableList::default().with_action(persist_action(meta, id, key)))
    }

    /// Appends to a list; persisted unless the list is transient.
    pub fn set_list_value(&mut self, key: &str, value: String) -> Result<bool> {
        self.list_entry(key).add(value)
    }

    /// Removes `value` from a list; persisted unless the list is transient.
    pub fn delete_list_value(&mut self, key: &str, value: &str) -> Result<bool> {
        match self.lists.get_mut(key) {
            Some(list) => list.remove(&value.to_string()),
            None => Ok(false),
        }
    }

    /// Removes the list from memory and storage.
    pub fn delete_list(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        self.meta.set_string_list(&self.id, key, None)?;
        Ok(self.lists.remove(key).map(SavableList::into_inner))
    }

    /// Typed record view over the list under `key`, as [`SavableMap::list_entry`].
    pub fn record_list<T: Serialize + DeserializeOwned>(&mut self, key: &str) -> SavableRecordList<'_, T> {
        SavableRecordList::new(self.list_entry(key))
    }

    /// Decodes the records under `key` without creating the list.
    pub fn records<T: Serialize + DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.lists.get(key) {
            Some(list) => list
                .iter()
                .map(|raw| kissen_types::from_json(raw).map_err(Into::into))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Persists the whole map in one batch, transient lists included.
    pub fn flush(&self) -> Result<u64> {
        Ok(self.meta.insert_data(&self.id, &self.to_data())?)
    }

    /// Clears memory and purges storage; returns the number of entries dropped.
    pub fn purge(&mut self) -> Result<usize> {
        let count = self.len();
        self.values.clear();
        self.lists.clear();
        let rows = self.meta.purge(&self.id)?;
        debug!(id = %self.id, entries = count, rows, "Purged savable");
        Ok(count)
    }
}
