//! Typed views over string lists holding JSON records.

use std::marker::PhantomData;

use kissen_types::{from_json, to_json};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::Result;
use crate::list::SavableList;

/// A [`SavableList`] viewed as a list of `T` records.
///
/// Mutations go through the underlying list, so its action (if any) sees
/// every change. Entries that do not decode as `T` are left untouched by
/// predicate-based operations.
pub struct SavableRecordList<'a, T> {
    list: &'a mut SavableList,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Serialize + DeserializeOwned> SavableRecordList<'a, T> {
    pub fn new(list: &'a mut SavableList) -> Self {
        Self {
            list,
            _record: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn decode(raw: &str) -> Option<T> {
        match from_json(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable record");
                None
            }
        }
    }

    pub fn add(&mut self, record: &T) -> Result<bool> {
        let json = to_json(record)?;
        self.list.add(json)
    }

    pub fn insert(&mut self, index: usize, record: &T) -> Result<()> {
        let json = to_json(record)?;
        self.list.insert(index, json)
    }

    pub fn add_all_records<'r>(&mut self, records: impl IntoIterator<Item = &'r T>) -> Result<bool>
    where
        T: 'r,
    {
        let encoded = records
            .into_iter()
            .map(to_json)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.list.add_all(encoded)
    }

    /// Removes the first entry whose JSON equals `record`'s.
    pub fn remove(&mut self, record: &T) -> Result<bool> {
        let json = to_json(record)?;
        self.list.remove(&json)
    }

    pub fn remove_all_records<'r>(&mut self, records: impl IntoIterator<Item = &'r T>) -> Result<bool>
    where
        T: 'r,
    {
        let encoded = records
            .into_iter()
            .map(to_json)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.list.remove_all(&encoded)
    }

    pub fn remove_if_record(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Result<bool> {
        self.list
            .remove_if(|raw| Self::decode(raw).is_some_and(|record| predicate(&record)))
    }

    /// Replaces the single record matching `predicate`.
    ///
    /// Exactly one match is expected. With none the list is unchanged; with
    /// several, all of them are replaced. Both cases are logged.
    pub fn replace_record(&mut self, mut predicate: impl FnMut(&T) -> bool, record: &T) -> Result<usize> {
        let matching: Vec<bool> = self
            .list
            .iter()
            .map(|raw| Self::decode(raw).is_some_and(|r| predicate(&r)))
            .collect();
        let count = matching.iter().filter(|m| **m).count();

        match count {
            0 => {
                warn!("No record matched the replacement predicate");
                return Ok(0);
            }
            1 => {}
            n => warn!(matches = n, "Replacement predicate matched several records, replacing all"),
        }

        let json = to_json(record)?;
        let mut index = 0;
        self.list.replace(
            |_| {
                let hit = matching.get(index).copied().unwrap_or(false);
                index += 1;
                hit
            },
            json,
        )
    }

    pub fn contains(&self, record: &T) -> Result<bool> {
        let json = to_json(record)?;
        Ok(self.list.contains(&json))
    }

    /// Decodes every entry.
    pub fn to_record_list(&self) -> Result<Vec<T>> {
        self.list
            .iter()
            .map(|raw| from_json(raw).map_err(Into::into))
            .collect()
    }
}
