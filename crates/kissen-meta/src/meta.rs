//! The meta handle and its scoped views.

use std::fmt;
use std::sync::Arc;

use kissen_types::{from_json, to_json};
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::backend::MetaBackend;
use crate::codec::{MetaValue, ValueKind};
use crate::error::{MetaError, Result};
use crate::query::{
    Column, FilterBuilder, FilterQuery, MetaRow, QueryDelete, QuerySelect, QueryUpdate,
    QueryUpdateDirective,
};
use crate::table::Table;

/// Total id used by unscoped (global) values.
pub const UNDEFINED: &str = "_UNDEFINED_";

/// First character of every stored list key.
pub const LIST_PREFIX: char = '_';

/// Storage key of the list stored under `key`.
pub fn list_key(key: &str) -> String {
    format!("{LIST_PREFIX}{key}")
}

/// Typed key/value access to one meta table.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct Meta {
    backend: Arc<dyn MetaBackend>,
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("table", &self.backend.table().name())
            .finish()
    }
}

impl Meta {
    /// Wraps a backend; the table layout comes from the backend.
    pub fn new(backend: Arc<dyn MetaBackend>) -> Self {
        Self { backend }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn MetaBackend> {
        &self.backend
    }

    /// Layout of the underlying table.
    pub fn table(&self) -> &Table {
        self.backend.table()
    }

    /// Physical name of a logical column.
    pub fn column(&self, column: Column) -> &str {
        self.table().column(column)
    }

    // ========================================================================
    // Raw strings
    // ========================================================================

    /// Raw stored text of `key`, whatever kind it was written as.
    pub fn get_string(&self, total_id: &str, key: &str) -> Result<Option<String>> {
        let rows = self
            .select([Column::Value])
            .where_eq(Column::TotalId, total_id)
            .and_eq(Column::Key, key)
            .execute()?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }

    /// Stores `value`, or deletes the key when `value` is `None`.
    pub fn set_string(&self, total_id: &str, key: &str, value: Option<&str>) -> Result<()> {
        self.write(total_id, key, ValueKind::String, value.map(str::to_string))
    }

    fn write(&self, total_id: &str, key: &str, kind: ValueKind, value: Option<String>) -> Result<()> {
        if kind != ValueKind::List && key.starts_with(LIST_PREFIX) {
            return Err(MetaError::ReservedKey(key.to_string()));
        }
        trace!(table = self.table().name(), total_id, key, %kind, delete = value.is_none(), "Meta write");
        let row = value.map(|value| MetaRow::new(total_id, key, kind, value));
        self.backend.replace(total_id, key, row)?;
        Ok(())
    }

    /// Whether a row exists for `(total_id, key)`.
    pub fn contains(&self, total_id: &str, key: &str) -> Result<bool> {
        Ok(self.get_string(total_id, key)?.is_some())
    }

    /// Removes a scalar key. Lists are removed with [`Meta::set_string_list`].
    pub fn delete(&self, total_id: &str, key: &str) -> Result<()> {
        self.write(total_id, key, ValueKind::String, None)
    }

    /// Deletes every row of `total_id`, returning how many were removed.
    pub fn purge(&self, total_id: &str) -> Result<u64> {
        let removed = self
            .backend
            .execute_delete(&QueryDelete::new().where_eq(Column::TotalId, total_id))?;
        Ok(removed)
    }

    // ========================================================================
    // Typed values
    // ========================================================================

    /// Decodes the stored text as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Codec`] when the stored text is not a valid `T`.
    pub fn get<T: MetaValue>(&self, total_id: &str, key: &str) -> Result<Option<T>> {
        self.get_string(total_id, key)?
            .map(|raw| T::decode(&raw))
            .transpose()
            .map_err(Into::into)
    }

    /// Encodes and stores `value` with its kind; `None` deletes.
    pub fn set<T: MetaValue>(&self, total_id: &str, key: &str, value: Option<&T>) -> Result<()> {
        self.write(total_id, key, T::KIND, value.map(MetaValue::encode))
    }

    // Named shorthands for the typed accessors.

    pub fn get_long(&self, total_id: &str, key: &str) -> Result<Option<i64>> {
        self.get(total_id, key)
    }

    pub fn set_long(&self, total_id: &str, key: &str, value: Option<i64>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_int(&self, total_id: &str, key: &str) -> Result<Option<i32>> {
        self.get(total_id, key)
    }

    pub fn set_int(&self, total_id: &str, key: &str, value: Option<i32>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_short(&self, total_id: &str, key: &str) -> Result<Option<i16>> {
        self.get(total_id, key)
    }

    pub fn set_short(&self, total_id: &str, key: &str, value: Option<i16>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_byte(&self, total_id: &str, key: &str) -> Result<Option<i8>> {
        self.get(total_id, key)
    }

    pub fn set_byte(&self, total_id: &str, key: &str, value: Option<i8>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_double(&self, total_id: &str, key: &str) -> Result<Option<f64>> {
        self.get(total_id, key)
    }

    pub fn set_double(&self, total_id: &str, key: &str, value: Option<f64>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_float(&self, total_id: &str, key: &str) -> Result<Option<f32>> {
        self.get(total_id, key)
    }

    pub fn set_float(&self, total_id: &str, key: &str, value: Option<f32>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    pub fn get_boolean(&self, total_id: &str, key: &str) -> Result<Option<bool>> {
        self.get(total_id, key)
    }

    pub fn set_boolean(&self, total_id: &str, key: &str, value: Option<bool>) -> Result<()> {
        self.set(total_id, key, value.as_ref())
    }

    // ========================================================================
    // Records and lists
    // ========================================================================

    /// Decodes a JSON record stored under `key`.
    pub fn get_record<T: DeserializeOwned>(&self, total_id: &str, key: &str) -> Result<Option<T>> {
        self.get_string(total_id, key)?
            .map(|json| from_json(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Stores `value` as a JSON record; `None` deletes.
    pub fn set_record<T: Serialize>(&self, total_id: &str, key: &str, value: Option<&T>) -> Result<()> {
        let json = value.map(to_json).transpose()?;
        self.write(total_id, key, ValueKind::Record, json)
    }

    /// The list stored under `key`; the list prefix is added here.
    pub fn get_string_list(&self, total_id: &str, key: &str) -> Result<Option<Vec<String>>> {
        self.get_record(total_id, &list_key(key))
    }

    /// Stores the list as one row; `None` or an empty list deletes it.
    pub fn set_string_list(&self, total_id: &str, key: &str, value: Option<&[String]>) -> Result<()> {
        let json = match value {
            Some(list) if !list.is_empty() => Some(to_json(&list)?),
            _ => None,
        };
        self.write(total_id, &list_key(key), ValueKind::List, json)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Starts a select over `columns`; add filters, then call `execute`.
    ///
    /// ```ignore
    /// let rows = meta
    ///     .select([Column::Key, Column::Value])
    ///     .where_eq(Column::TotalId, "player1")
    ///     .execute()?;
    /// ```
    pub fn select(&self, columns: impl Into<Vec<Column>>) -> BoundSelect<'_> {
        BoundSelect {
            meta: self,
            query: QuerySelect::new(columns),
        }
    }

    /// Starts an update applying `directives` to every matching row.
    pub fn update(&self, directives: impl Into<Vec<QueryUpdateDirective>>) -> BoundUpdate<'_> {
        BoundUpdate {
            meta: self,
            query: QueryUpdate::new(directives),
        }
    }

    /// View over values not owned by any entity.
    pub fn unscoped(&self) -> MetaScope<'_> {
        self.scope(UNDEFINED)
    }

    /// View over the values of one total id.
    pub fn scope(&self, total_id: impl Into<String>) -> MetaScope<'_> {
        MetaScope {
            meta: self,
            total_id: total_id.into(),
        }
    }
}

/// A select bound to the meta it runs against.
pub struct BoundSelect<'a> {
    meta: &'a Meta,
    query: QuerySelect,
}

impl BoundSelect<'_> {
    /// The query built so far.
    pub fn query(&self) -> &QuerySelect {
        &self.query
    }

    /// Runs the select; each row holds the requested columns in order.
    pub fn execute(self) -> Result<Vec<Vec<String>>> {
        Ok(self.meta.backend.execute_select(&self.query)?)
    }
}

impl FilterBuilder for BoundSelect<'_> {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery> {
        self.query.filters_mut()
    }
}

/// An update bound to the meta it runs against.
pub struct BoundUpdate<'a> {
    meta: &'a Meta,
    query: QueryUpdate,
}

impl BoundUpdate<'_> {
    /// The query built so far.
    pub fn query(&self) -> &QueryUpdate {
        &self.query
    }

    /// Runs the update, returning the number of rows changed.
    pub fn execute(self) -> Result<u64> {
        Ok(self.meta.backend.execute_update(&self.query)?)
    }
}

impl FilterBuilder for BoundUpdate<'_> {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery> {
        self.query.filters_mut()
    }
}

/// Accessors with the total id fixed.
pub struct MetaScope<'a> {
    meta: &'a Meta,
    total_id: String,
}

impl MetaScope<'_> {
    /// The total id every accessor is bound to.
    pub fn total_id(&self) -> &str {
        &self.total_id
    }

    /// See [`Meta::get_string`].
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.meta.get_string(&self.total_id, key)
    }

    /// See [`Meta::set_string`].
    pub fn set_string(&self, key: &str, value: Option<&str>) -> Result<()> {
        self.meta.set_string(&self.total_id, key, value)
    }

    pub fn get<T: MetaValue>(&self, key: &str) -> Result<Option<T>> {
        self.meta.get(&self.total_id, key)
    }

    pub fn set<T: MetaValue>(&self, key: &str, value: Option<&T>) -> Result<()> {
        self.meta.set(&self.total_id, key, value)
    }

    pub fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.meta.get_record(&self.total_id, key)
    }

    pub fn set_record<T: Serialize>(&self, key: &str, value: Option<&T>) -> Result<()> {
        self.meta.set_record(&self.total_id, key, value)
    }

    pub fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        self.meta.get_string_list(&self.total_id, key)
    }

    /// See [`Meta::set_string_list`].
    pub fn set_string_list(&self, key: &str, value: Option<&[String]>) -> Result<()> {
        self.meta.set_string_list(&self.total_id, key, value)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        self.meta.contains(&self.total_id, key)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.meta.delete(&self.total_id, key)
    }
}
