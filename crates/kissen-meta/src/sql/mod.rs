//! SQL backends.
//!
//! ```text
//! QuerySelect / QueryUpdate / QueryInsert / QueryDelete
//!            │
//!            ▼
//!      SqlStatements ── SqlDialect (quoting, upsert verb, DDL)
//!            │
//!            ▼  Statement { sql, params }
//!      DuckDbBackend ── Mutex<Option<Connection>>
//! ```

mod backend;
mod dialect;
mod statements;

pub use backend::{DbLocation, DuckDbBackend};
pub use dialect::SqlDialect;
pub use statements::{SqlStatements, Statement, decode_value};
