use crate::error::BackendError;
use crate::query::{
    Column, FilterBuilder, MetaRow, QueryDelete, QueryInsert, QuerySelect, QueryUpdate,
};
use crate::table::Table;

/// Storage backend for a single meta table.
///
/// Backends translate the column query model into their native form and
/// hand back raw text; typing and encoding live in [`crate::Meta`].
pub trait MetaBackend: Send + Sync {
    fn table(&self) -> &Table;

    /// Rows of the requested columns, in the requested order.
    fn execute_select(&self, query: &QuerySelect) -> Result<Vec<Vec<String>>, BackendError>;

    /// Number of rows changed.
    fn execute_update(&self, query: &QueryUpdate) -> Result<u64, BackendError>;

    fn execute_insert(&self, query: &QueryInsert) -> Result<u64, BackendError>;

    fn execute_delete(&self, query: &QueryDelete) -> Result<u64, BackendError>;

    /// Replaces the `(total_id, key)` row, or removes it when `row` is `None`.
    fn replace(&self, total_id: &str, key: &str, row: Option<MetaRow>) -> Result<(), BackendError> {
        self.execute_delete(
            &QueryDelete::new()
                .where_eq(Column::TotalId, total_id)
                .and_eq(Column::Key, key),
        )?;
        if let Some(row) = row {
            self.execute_insert(&QueryInsert::new([row]))?;
        }
        Ok(())
    }
}
