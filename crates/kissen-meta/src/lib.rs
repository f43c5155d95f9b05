//! # kissen-meta: Key/value metadata persistence
//!
//! Every persistent Kissen entity is a set of `(total_id, key) → value`
//! rows in a meta table. This crate provides:
//! - The column query model ([`QuerySelect`], [`QueryUpdate`], filters)
//! - Typed access through a fixed codec table ([`MetaValue`])
//! - [`Meta`] and its scoped views, and [`ObjectMeta`] for whole entities
//! - Backends: [`MemoryBackend`] and the DuckDB-backed [`sql::DuckDbBackend`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Meta / ObjectMeta                            │
//! │  ├─ typed get/set (MetaValue codec table)     │
//! │  ├─ records and string lists (JSON)           │
//! │  └─ select / update builders                  │
//! └─────────────────┬────────────────────────────┘
//!                   │  QuerySelect, QueryUpdate,
//!                   │  QueryInsert, QueryDelete
//!                   ▼
//! ┌──────────────────────────────────────────────┐
//! │  dyn MetaBackend                              │
//! │  ├─ MemoryBackend (documents, native filters) │
//! │  └─ DuckDbBackend (parameterised SQL)         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use kissen_meta::{Meta, MemoryBackend, Table};
//!
//! let meta = Meta::new(Arc::new(MemoryBackend::new(Table::object("meta"))));
//! meta.set_long("player1", "coins", Some(250))?;
//! assert_eq!(meta.get_long("player1", "coins")?, Some(250));
//!
//! meta.set_long("player1", "coins", None)?;
//! assert!(!meta.contains("player1", "coins")?);
//! # Ok::<(), kissen_meta::MetaError>(())
//! ```

mod backend;
mod codec;
mod error;
mod memory;
mod meta;
mod object;
mod query;
mod table;

pub mod sql;

pub use backend::MetaBackend;
pub use codec::{MetaValue, ValueKind};
pub use error::{BackendError, CodecError, MetaError, Result};
pub use memory::MemoryBackend;
pub use meta::{BoundSelect, BoundUpdate, LIST_PREFIX, Meta, MetaScope, UNDEFINED, list_key};
pub use object::{MetaData, ObjectMeta};
pub use query::{
    Column, FilterBuilder, FilterOperator, FilterQuery, FilterType, MetaRow, QueryDelete,
    QueryInsert, QuerySelect, QueryUpdate, QueryUpdateDirective,
};
pub use table::Table;

#[cfg(test)]
mod tests;
