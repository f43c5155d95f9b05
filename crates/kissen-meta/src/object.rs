//! Object meta: bulk loading of whole entities.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use kissen_types::{from_json, to_json};
use tracing::{debug, warn};

use crate::backend::MetaBackend;
use crate::codec::ValueKind;
use crate::error::{MetaError, Result};
use crate::meta::{LIST_PREFIX, Meta, list_key};
use crate::query::{Column, FilterBuilder, FilterType, MetaRow, QueryInsert};

/// Everything stored for one total id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    pub values: BTreeMap<String, String>,
    pub lists: BTreeMap<String, Vec<String>>,
}

impl MetaData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.lists.is_empty()
    }

    /// Number of scalar entries plus list entries.
    pub fn len(&self) -> usize {
        self.values.len() + self.lists.len()
    }

    fn absorb(&mut self, total_id: &str, key: String, value: String) {
        match key.strip_prefix(LIST_PREFIX) {
            Some(list) => match from_json::<Vec<String>>(&value) {
                Ok(items) => {
                    self.lists.insert(list.to_string(), items);
                }
                Err(e) => warn!(total_id, key = %key, error = %e, "Skipping unreadable list"),
            },
            None => {
                self.values.insert(key, value);
            }
        }
    }
}

/// Meta over an object table, with entity-level bulk operations.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    meta: Meta,
}

impl ObjectMeta {
    pub fn new(backend: Arc<dyn MetaBackend>) -> Self {
        Self {
            meta: Meta::new(backend),
        }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Loads everything stored for `total_id`.
    ///
    /// A failing backend is logged and reads as no data.
    pub fn get_data(&self, total_id: &str) -> MetaData {
        match self.try_get_data(total_id) {
            Ok(data) => data,
            Err(e) => {
                warn!(table = self.table().name(), total_id, error = %e, "Failed to load object data");
                MetaData::default()
            }
        }
    }

    pub fn try_get_data(&self, total_id: &str) -> Result<MetaData> {
        let rows = self
            .select([Column::Key, Column::Value])
            .where_eq(Column::TotalId, total_id)
            .execute()?;

        let mut data = MetaData::default();
        for row in rows {
            let mut fields = row.into_iter();
            if let (Some(key), Some(value)) = (fields.next(), fields.next()) {
                data.absorb(total_id, key, value);
            }
        }
        Ok(data)
    }

    /// Loads every entity whose total id starts with `prefix`, keyed by total id.
    pub fn get_data_by_prefix(&self, prefix: &str) -> Result<BTreeMap<String, MetaData>> {
        let rows = self
            .select([Column::TotalId, Column::Key, Column::Value])
            .where_filter(Column::TotalId, prefix, FilterType::StartsWith)
            .execute()?;

        let mut entities: BTreeMap<String, MetaData> = BTreeMap::new();
        for row in rows {
            let mut fields = row.into_iter();
            if let (Some(total_id), Some(key), Some(value)) =
                (fields.next(), fields.next(), fields.next())
            {
                let data = entities.entry(total_id.clone()).or_default();
                data.absorb(&total_id, key, value);
            }
        }
        debug!(table = self.table().name(), prefix, entities = entities.len(), "Loaded objects by prefix");
        Ok(entities)
    }

    /// Writes all of `data` for `total_id` in one batch.
    pub fn insert_data(&self, total_id: &str, data: &MetaData) -> Result<u64> {
        let mut insert = QueryInsert::default();
        for (key, value) in &data.values {
            if key.starts_with(LIST_PREFIX) {
                return Err(MetaError::ReservedKey(key.clone()));
            }
            insert = insert.row(MetaRow::new(total_id, key.clone(), ValueKind::String, value.clone()));
        }
        for (key, items) in &data.lists {
            if items.is_empty() {
                continue;
            }
            insert = insert.row(MetaRow::new(total_id, list_key(key), ValueKind::List, to_json(items)?));
        }
        if insert.rows().is_empty() {
            return Ok(0);
        }
        Ok(self.backend().execute_insert(&insert)?)
    }
}

impl Deref for ObjectMeta {
    type Target = Meta;

    fn deref(&self) -> &Self::Target {
        &self.meta
    }
}
