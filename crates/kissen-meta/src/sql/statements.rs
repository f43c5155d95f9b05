//! Parameterised SQL generation for the column query model.
//!
//! Values are bound as `?` parameters in the order they appear in the
//! statement text: update assignments first, then filters. The value column
//! holds JSON string literals, so value parameters are JSON-encoded before
//! binding and decoded after reading.

use crate::query::{
    Column, FilterOperator, FilterQuery, FilterType, QueryDelete, QueryInsert, QuerySelect,
    QueryUpdate,
};
use crate::sql::dialect::SqlDialect;
use crate::table::Table;

const LIKE_ESCAPE: char = '!';

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

/// Statement builder for one table and dialect.
#[derive(Debug, Clone)]
pub struct SqlStatements {
    table: Table,
    dialect: SqlDialect,
}

impl SqlStatements {
    pub fn new(table: Table, dialect: SqlDialect) -> Self {
        Self { table, dialect }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn column(&self, column: Column) -> String {
        self.dialect.quote(self.table.column(column))
    }

    fn table_name(&self) -> String {
        self.dialect.quote(self.table.name())
    }

    pub fn create_table(&self) -> String {
        self.dialect.create_table(&self.table)
    }

    pub fn select(&self, query: &QuerySelect) -> Statement {
        let columns = query
            .columns()
            .iter()
            .map(|c| self.column(*c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = Vec::new();
        let filter = self.where_clause(query.filters(), &mut params);
        Statement {
            sql: format!("SELECT {columns} FROM {}{filter}", self.table_name()),
            params,
        }
    }

    pub fn update(&self, query: &QueryUpdate) -> Statement {
        let mut params = Vec::new();
        let assignments = query
            .directives()
            .iter()
            .map(|directive| {
                params.push(encode_param(directive.column, &directive.value));
                format!("{} = ?", self.column(directive.column))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let filter = self.where_clause(query.filters(), &mut params);
        Statement {
            sql: format!("UPDATE {} SET {assignments}{filter}", self.table_name()),
            params,
        }
    }

    pub fn insert(&self, query: &QueryInsert) -> Statement {
        let mut params = Vec::with_capacity(query.rows().len() * 4);
        let mut tuples = Vec::with_capacity(query.rows().len());
        for row in query.rows() {
            params.push(row.total_id.clone());
            params.push(row.key.clone());
            params.push(row.kind.as_str().to_string());
            params.push(encode_param(Column::Value, &row.value));
            tuples.push("(?, ?, ?, ?)");
        }
        Statement {
            sql: format!(
                "{} {} ({}, {}, {}, {}) VALUES {}",
                self.dialect.upsert_verb(),
                self.table_name(),
                self.column(Column::TotalId),
                self.column(Column::Key),
                self.dialect.quote(self.table.type_column()),
                self.column(Column::Value),
                tuples.join(", "),
            ),
            params,
        }
    }

    pub fn delete(&self, query: &QueryDelete) -> Statement {
        let mut params = Vec::new();
        let filter = self.where_clause(query.filters(), &mut params);
        Statement {
            sql: format!("DELETE FROM {}{filter}", self.table_name()),
            params,
        }
    }

    fn where_clause(&self, filters: &[FilterQuery], params: &mut Vec<String>) -> String {
        if filters.is_empty() {
            return String::new();
        }

        let mut sql = String::from(" WHERE ");
        for (index, filter) in filters.iter().enumerate() {
            if index > 0 {
                sql.push_str(match filter.operator {
                    FilterOperator::And => " AND ",
                    FilterOperator::Or => " OR ",
                });
            }
            let column = self.column(filter.column);
            match filter.filter_type {
                FilterType::Equals => {
                    sql.push_str(&format!("{column} = ?"));
                    params.push(encode_param(filter.column, &filter.value));
                }
                FilterType::StartsWith => {
                    sql.push_str(&format!("{column} LIKE ? ESCAPE '{LIKE_ESCAPE}'"));
                    let mut prefix = encode_param(filter.column, &filter.value);
                    if filter.column == Column::Value {
                        prefix.pop();
                    }
                    params.push(format!("{}%", escape_like(&prefix)));
                }
                FilterType::EndsWith => {
                    sql.push_str(&format!("{column} LIKE ? ESCAPE '{LIKE_ESCAPE}'"));
                    let encoded = encode_param(filter.column, &filter.value);
                    let suffix = if filter.column == Column::Value {
                        &encoded[1..]
                    } else {
                        encoded.as_str()
                    };
                    params.push(format!("%{}", escape_like(suffix)));
                }
            }
        }
        sql
    }
}

/// Parameter text for `column`; values become JSON string literals.
fn encode_param(column: Column, value: &str) -> String {
    match column {
        Column::Value => serde_json::Value::String(value.to_string()).to_string(),
        Column::TotalId | Column::Key => value.to_string(),
    }
}

/// Reverses the JSON encoding of a stored value.
///
/// Text that is not a JSON string (written by another tool) is returned as is.
pub fn decode_value(stored: String) -> String {
    match serde_json::from_str::<String>(&stored) {
        Ok(value) => value,
        Err(_) => stored,
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
