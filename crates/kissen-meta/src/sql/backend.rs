//! DuckDB-backed meta storage.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use duckdb::{Connection, params_from_iter};
use tracing::{info, warn};

use crate::backend::MetaBackend;
use crate::error::BackendError;
use crate::query::{
    Column, FilterBuilder, MetaRow, QueryDelete, QueryInsert, QuerySelect, QueryUpdate,
};
use crate::sql::dialect::SqlDialect;
use crate::sql::statements::{SqlStatements, Statement, decode_value};
use crate::table::Table;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    InMemory,
    File(PathBuf),
}

impl DbLocation {
    fn describe(&self) -> String {
        match self {
            DbLocation::InMemory => ":memory:".to_string(),
            DbLocation::File(path) => path.display().to_string(),
        }
    }
}

enum Failure {
    Prepare(duckdb::Error),
    Execute(duckdb::Error),
}

impl From<Failure> for BackendError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Prepare(e) | Failure::Execute(e) => BackendError::Database(e),
        }
    }
}

/// Meta backend over a DuckDB connection.
///
/// The connection is opened lazily. When a statement cannot be prepared on
/// a file database the connection is reopened and the statement retried
/// once; there is no backoff.
pub struct DuckDbBackend {
    statements: SqlStatements,
    location: DbLocation,
    conn: Mutex<Option<Connection>>,
}

impl DuckDbBackend {
    /// Opens the database and creates the table if it does not exist.
    pub fn open(table: Table, location: DbLocation) -> Result<Self, BackendError> {
        let backend = Self {
            statements: SqlStatements::new(table, SqlDialect::DuckDb),
            location,
            conn: Mutex::new(None),
        };
        let conn = backend.connect()?;
        *backend.conn.lock().unwrap_or_else(PoisonError::into_inner) = Some(conn);
        Ok(backend)
    }

    pub fn in_memory(table: Table) -> Result<Self, BackendError> {
        Self::open(table, DbLocation::InMemory)
    }

    pub fn statements(&self) -> &SqlStatements {
        &self.statements
    }

    fn connect(&self) -> Result<Connection, BackendError> {
        let conn = match &self.location {
            DbLocation::InMemory => Connection::open_in_memory(),
            DbLocation::File(path) => Connection::open(path),
        }
        .map_err(|source| BackendError::Connect {
            location: self.location.describe(),
            source,
        })?;

        conn.execute_batch(&self.statements.create_table())?;
        info!(
            table = self.statements.table().name(),
            location = %self.location.describe(),
            "Meta table ready"
        );
        Ok(conn)
    }

    fn run_on<T>(
        conn: &Connection,
        statement: &Statement,
        run: &impl Fn(&mut duckdb::Statement<'_>, &Statement) -> duckdb::Result<T>,
    ) -> Result<T, Failure> {
        let mut prepared = conn.prepare(&statement.sql).map_err(Failure::Prepare)?;
        run(&mut prepared, statement).map_err(Failure::Execute)
    }

    fn with_statement<T>(
        &self,
        statement: &Statement,
        run: impl Fn(&mut duckdb::Statement<'_>, &Statement) -> duckdb::Result<T>,
    ) -> Result<T, BackendError> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        match Self::run_on(&conn, statement, &run) {
            Ok(value) => {
                *guard = Some(conn);
                Ok(value)
            }
            Err(Failure::Prepare(e)) if matches!(self.location, DbLocation::File(_)) => {
                warn!(
                    table = self.statements.table().name(),
                    error = %e,
                    "Statement preparation failed, reconnecting"
                );
                drop(conn);
                let conn = self.connect()?;
                let result = Self::run_on(&conn, statement, &run);
                *guard = Some(conn);
                Ok(result?)
            }
            Err(failure) => {
                *guard = Some(conn);
                Err(failure.into())
            }
        }
    }
}

impl MetaBackend for DuckDbBackend {
    fn table(&self) -> &Table {
        self.statements.table()
    }

    fn execute_select(&self, query: &QuerySelect) -> Result<Vec<Vec<String>>, BackendError> {
        if query.columns().is_empty() {
            return Err(BackendError::Unsupported {
                table: self.table().name().to_string(),
                reason: "select without columns".to_string(),
            });
        }

        let statement = self.statements.select(query);
        let columns = query.columns().to_vec();
        self.with_statement(&statement, |prepared, statement| {
            let mut rows = prepared.query(params_from_iter(&statement.params))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut fields = Vec::with_capacity(columns.len());
                for (index, column) in columns.iter().enumerate() {
                    let raw: String = row.get(index)?;
                    fields.push(match column {
                        Column::Value => decode_value(raw),
                        Column::TotalId | Column::Key => raw,
                    });
                }
                out.push(fields);
            }
            Ok(out)
        })
    }

    fn execute_update(&self, query: &QueryUpdate) -> Result<u64, BackendError> {
        if query.directives().is_empty() {
            return Err(BackendError::Unsupported {
                table: self.table().name().to_string(),
                reason: "update without directives".to_string(),
            });
        }
        let statement = self.statements.update(query);
        self.with_statement(&statement, |prepared, statement| {
            prepared
                .execute(params_from_iter(&statement.params))
                .map(|n| n as u64)
        })
    }

    fn execute_insert(&self, query: &QueryInsert) -> Result<u64, BackendError> {
        if query.rows().is_empty() {
            return Ok(0);
        }
        let statement = self.statements.insert(query);
        self.with_statement(&statement, |prepared, statement| {
            prepared
                .execute(params_from_iter(&statement.params))
                .map(|n| n as u64)
        })
    }

    fn execute_delete(&self, query: &QueryDelete) -> Result<u64, BackendError> {
        let statement = self.statements.delete(query);
        self.with_statement(&statement, |prepared, statement| {
            prepared
                .execute(params_from_iter(&statement.params))
                .map(|n| n as u64)
        })
    }

    fn replace(&self, total_id: &str, key: &str, row: Option<MetaRow>) -> Result<(), BackendError> {
        match row {
            Some(row) => self.execute_insert(&QueryInsert::new([row])).map(|_| ()),
            None => self
                .execute_delete(
                    &QueryDelete::new()
                        .where_eq(Column::TotalId, total_id)
                        .and_eq(Column::Key, key),
                )
                .map(|_| ()),
        }
    }
}
