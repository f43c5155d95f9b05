use crate::query::Column;

/// Physical layout of a meta table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    total_id_column: String,
    key_column: String,
    type_column: String,
    value_column: String,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        total_id_column: impl Into<String>,
        key_column: impl Into<String>,
        type_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            total_id_column: total_id_column.into(),
            key_column: key_column.into(),
            type_column: type_column.into(),
            value_column: value_column.into(),
        }
    }

    /// Layout used by object meta tables: `uuid`, `identifier`, `type`, `value`.
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, "uuid", "identifier", "type", "value")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical name of a logical column.
    pub fn column(&self, column: Column) -> &str {
        match column {
            Column::TotalId => &self.total_id_column,
            Column::Key => &self.key_column,
            Column::Value => &self.value_column,
        }
    }

    pub fn type_column(&self) -> &str {
        &self.type_column
    }
}
