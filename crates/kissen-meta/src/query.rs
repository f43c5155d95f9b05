//! Column query model.
//!
//! Queries are described against three logical columns ([`Column`]) and
//! translated by each backend into its native form. Filters are combined
//! with SQL precedence: `AND` binds tighter than `OR`, so
//! `a OR b AND c` reads as `a OR (b AND c)`. An empty filter list selects
//! every row.

use std::fmt::{self, Display};

use crate::codec::ValueKind;

/// Logical column of a meta table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    TotalId,
    Key,
    Value,
}

impl Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::TotalId => write!(f, "total_id"),
            Column::Key => write!(f, "key"),
            Column::Value => write!(f, "value"),
        }
    }
}

/// How a filter compares the column with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    Equals,
    StartsWith,
    EndsWith,
}

impl FilterType {
    /// Evaluates this comparison natively.
    pub fn matches(self, candidate: &str, value: &str) -> bool {
        match self {
            FilterType::Equals => candidate == value,
            FilterType::StartsWith => candidate.starts_with(value),
            FilterType::EndsWith => candidate.ends_with(value),
        }
    }
}

/// How a filter joins the filter before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    And,
    Or,
}

/// A single column predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub column: Column,
    pub value: String,
    pub filter_type: FilterType,
    pub operator: FilterOperator,
}

impl FilterQuery {
    pub fn new(column: Column, value: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            column,
            value: value.into(),
            filter_type,
            operator: FilterOperator::And,
        }
    }

    pub fn equals(column: Column, value: impl Into<String>) -> Self {
        Self::new(column, value, FilterType::Equals)
    }

    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Evaluates `filters` against a row, `field` yielding each column's text.
    ///
    /// The leading filter's operator is ignored.
    pub fn evaluate<'a>(filters: &[FilterQuery], field: impl Fn(Column) -> &'a str) -> bool {
        if filters.is_empty() {
            return true;
        }

        let mut any_group = false;
        let mut group = true;
        for (index, filter) in filters.iter().enumerate() {
            if index > 0 && filter.operator == FilterOperator::Or {
                any_group |= group;
                group = true;
            }
            group &= filter.filter_type.matches(field(filter.column), &filter.value);
        }
        any_group || group
    }
}

/// Shared filter-chaining methods for every query builder.
pub trait FilterBuilder: Sized {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery>;

    /// Adds a filter joined with `AND`; also used for the leading filter.
    fn where_filter(self, column: Column, value: impl Into<String>, filter_type: FilterType) -> Self {
        self.and(column, value, filter_type)
    }

    fn where_eq(self, column: Column, value: impl Into<String>) -> Self {
        self.and(column, value, FilterType::Equals)
    }

    fn and(mut self, column: Column, value: impl Into<String>, filter_type: FilterType) -> Self {
        self.filters_mut()
            .push(FilterQuery::new(column, value, filter_type));
        self
    }

    fn and_eq(self, column: Column, value: impl Into<String>) -> Self {
        self.and(column, value, FilterType::Equals)
    }

    fn or(mut self, column: Column, value: impl Into<String>, filter_type: FilterType) -> Self {
        self.filters_mut().push(
            FilterQuery::new(column, value, filter_type).with_operator(FilterOperator::Or),
        );
        self
    }

    fn or_eq(self, column: Column, value: impl Into<String>) -> Self {
        self.or(column, value, FilterType::Equals)
    }

    fn with_filter(mut self, filter: FilterQuery) -> Self {
        self.filters_mut().push(filter);
        self
    }
}

/// Projection of `columns` over the rows matching `filters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySelect {
    columns: Vec<Column>,
    filters: Vec<FilterQuery>,
}

impl QuerySelect {
    pub fn new(columns: impl Into<Vec<Column>>) -> Self {
        Self {
            columns: columns.into(),
            filters: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn filters(&self) -> &[FilterQuery] {
        &self.filters
    }
}

impl FilterBuilder for QuerySelect {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery> {
        &mut self.filters
    }
}

/// Assignment of `value` to `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUpdateDirective {
    pub column: Column,
    pub value: String,
}

impl QueryUpdateDirective {
    pub fn new(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Bulk assignment over the rows matching `filters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUpdate {
    directives: Vec<QueryUpdateDirective>,
    filters: Vec<FilterQuery>,
}

impl QueryUpdate {
    pub fn new(directives: impl Into<Vec<QueryUpdateDirective>>) -> Self {
        Self {
            directives: directives.into(),
            filters: Vec::new(),
        }
    }

    pub fn directives(&self) -> &[QueryUpdateDirective] {
        &self.directives
    }

    pub fn filters(&self) -> &[FilterQuery] {
        &self.filters
    }
}

impl FilterBuilder for QueryUpdate {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery> {
        &mut self.filters
    }
}

/// A complete stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRow {
    pub total_id: String,
    pub key: String,
    pub kind: ValueKind,
    pub value: String,
}

impl MetaRow {
    pub fn new(
        total_id: impl Into<String>,
        key: impl Into<String>,
        kind: ValueKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            total_id: total_id.into(),
            key: key.into(),
            kind,
            value: value.into(),
        }
    }

    /// Text of one logical column.
    pub fn field(&self, column: Column) -> &str {
        match column {
            Column::TotalId => &self.total_id,
            Column::Key => &self.key,
            Column::Value => &self.value,
        }
    }
}

/// Insertion of whole rows; an existing `(total_id, key)` row is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryInsert {
    rows: Vec<MetaRow>,
}

impl QueryInsert {
    pub fn new(rows: impl Into<Vec<MetaRow>>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn row(mut self, row: MetaRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(&self) -> &[MetaRow] {
        &self.rows
    }
}

/// Removal of the rows matching `filters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDelete {
    filters: Vec<FilterQuery>,
}

impl QueryDelete {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[FilterQuery] {
        &self.filters
    }
}

impl FilterBuilder for QueryDelete {
    fn filters_mut(&mut self) -> &mut Vec<FilterQuery> {
        &mut self.filters
    }
}
