//! In-process document backend.
//!
//! Rows are kept as documents keyed by `(total_id, key)` and filters are
//! evaluated natively. Used for tests, development setups and servers that
//! do not need durable storage.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::backend::MetaBackend;
use crate::codec::ValueKind;
use crate::error::BackendError;
use crate::query::{
    Column, FilterQuery, MetaRow, QueryDelete, QueryInsert, QuerySelect, QueryUpdate,
};
use crate::table::Table;

type DocumentKey = (String, String);

#[derive(Debug, Clone)]
struct Document {
    kind: ValueKind,
    value: String,
}

/// Meta backend holding its table in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    table: Table,
    documents: RwLock<BTreeMap<DocumentKey, Document>>,
}

impl MemoryBackend {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type discriminator stored for a row.
    pub fn kind_of(&self, total_id: &str, key: &str) -> Option<ValueKind> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(total_id.to_string(), key.to_string()))
            .map(|doc| doc.kind)
    }

    fn matches(filters: &[FilterQuery], key: &DocumentKey, doc: &Document) -> bool {
        FilterQuery::evaluate(filters, |column| match column {
            Column::TotalId => key.0.as_str(),
            Column::Key => key.1.as_str(),
            Column::Value => doc.value.as_str(),
        })
    }
}

impl MetaBackend for MemoryBackend {
    fn table(&self) -> &Table {
        &self.table
    }

    fn execute_select(&self, query: &QuerySelect) -> Result<Vec<Vec<String>>, BackendError> {
        if query.columns().is_empty() {
            return Err(BackendError::Unsupported {
                table: self.table.name().to_string(),
                reason: "select without columns".to_string(),
            });
        }

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let rows = documents
            .iter()
            .filter(|(key, doc)| Self::matches(query.filters(), key, doc))
            .map(|(key, doc)| {
                query
                    .columns()
                    .iter()
                    .map(|column| match column {
                        Column::TotalId => key.0.clone(),
                        Column::Key => key.1.clone(),
                        Column::Value => doc.value.clone(),
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }

    fn execute_update(&self, query: &QueryUpdate) -> Result<u64, BackendError> {
        if query.directives().is_empty() {
            return Err(BackendError::Unsupported {
                table: self.table.name().to_string(),
                reason: "update without directives".to_string(),
            });
        }

        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let matched: Vec<DocumentKey> = documents
            .iter()
            .filter(|(key, doc)| Self::matches(query.filters(), key, doc))
            .map(|(key, _)| key.clone())
            .collect();

        // Take every match out first so re-keyed rows cannot clobber pending ones.
        let taken: Vec<(DocumentKey, Document)> = matched
            .into_iter()
            .filter_map(|key| documents.remove(&key).map(|doc| (key, doc)))
            .collect();
        let changed = taken.len() as u64;

        for (mut key, mut doc) in taken {
            for directive in query.directives() {
                match directive.column {
                    Column::TotalId => key.0.clone_from(&directive.value),
                    Column::Key => key.1.clone_from(&directive.value),
                    Column::Value => doc.value.clone_from(&directive.value),
                }
            }
            documents.insert(key, doc);
        }
        Ok(changed)
    }

    fn execute_insert(&self, query: &QueryInsert) -> Result<u64, BackendError> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        for MetaRow {
            total_id,
            key,
            kind,
            value,
        } in query.rows().iter().cloned()
        {
            documents.insert((total_id, key), Document { kind, value });
        }
        Ok(query.rows().len() as u64)
    }

    fn execute_delete(&self, query: &QueryDelete) -> Result<u64, BackendError> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let before = documents.len();
        documents.retain(|key, doc| !Self::matches(query.filters(), key, doc));
        let removed = (before - documents.len()) as u64;
        if removed > 0 {
            debug!(table = self.table.name(), removed, "Deleted documents");
        }
        Ok(removed)
    }

    /// Swaps the row under one write lock; readers never observe it missing.
    fn replace(&self, total_id: &str, key: &str, row: Option<MetaRow>) -> Result<(), BackendError> {
        let document_key = (total_id.to_string(), key.to_string());
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        match row {
            Some(MetaRow { kind, value, .. }) => {
                documents.insert(document_key, Document { kind, value });
            }
            None => {
                documents.remove(&document_key);
            }
        }
        Ok(())
    }
}
