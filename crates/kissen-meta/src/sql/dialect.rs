use crate::table::Table;

/// SQL flavour used for identifier quoting, upserts and DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    MySql,
    Sqlite,
    #[default]
    DuckDb,
}

impl SqlDialect {
    pub fn quote(self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", ident.replace('`', "``")),
            SqlDialect::Sqlite | SqlDialect::DuckDb => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Insert verb that overwrites a row with the same primary key.
    pub fn upsert_verb(self) -> &'static str {
        match self {
            SqlDialect::MySql => "REPLACE INTO",
            SqlDialect::Sqlite | SqlDialect::DuckDb => "INSERT OR REPLACE INTO",
        }
    }

    /// DDL for a meta table.
    ///
    /// Values are stored as JSON text; MySQL and SQLite enforce that with a
    /// check constraint.
    pub fn create_table(self, table: &Table) -> String {
        use crate::query::Column;

        let name = self.quote(table.name());
        let total_id = self.quote(table.column(Column::TotalId));
        let key = self.quote(table.column(Column::Key));
        let kind = self.quote(table.type_column());
        let value = self.quote(table.column(Column::Value));

        match self {
            SqlDialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {name} ({total_id} VARCHAR(255) NOT NULL, \
                 {key} VARCHAR(255) NOT NULL, {kind} VARCHAR(32) NOT NULL, \
                 {value} JSON NOT NULL CHECK (JSON_VALID({value})), \
                 PRIMARY KEY ({total_id}, {key}))"
            ),
            SqlDialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {name} ({total_id} TEXT NOT NULL, \
                 {key} TEXT NOT NULL, {kind} TEXT NOT NULL, \
                 {value} TEXT NOT NULL CHECK (json_valid({value})), \
                 PRIMARY KEY ({total_id}, {key}))"
            ),
            SqlDialect::DuckDb => format!(
                "CREATE TABLE IF NOT EXISTS {name} ({total_id} VARCHAR NOT NULL, \
                 {key} VARCHAR NOT NULL, {kind} VARCHAR NOT NULL, \
                 {value} VARCHAR NOT NULL, \
                 PRIMARY KEY ({total_id}, {key}))"
            ),
        }
    }
}
