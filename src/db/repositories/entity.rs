//! Entity shape shared by every stored record
//!
//! A type implementing [`Entity`] describes its table, the select list used
//! to read it (including the join that attaches the parent's display name),
//! its writable columns and the optional parent and search columns. With that
//! description [`SqlxRepository`](super::SqlxRepository) can serve it on
//! either driver.
//!
//! Select lists alias the entity's own table as `t`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    mysql::{MySql, MySqlArguments, MySqlRow},
    query::Query,
    sqlite::{Sqlite, SqliteArguments, SqliteRow},
    ColumnIndex, Decode, Row, Type,
};

/// A record stored in its own table with a numeric identity.
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    /// Table holding the records
    const TABLE: &'static str;

    /// `SELECT ... FROM <TABLE> t [JOIN ...]`, without WHERE or ORDER BY
    const SELECT: &'static str;

    /// Writable columns, in the order [`Entity::values`] returns them
    const COLUMNS: &'static [&'static str];

    /// Foreign key to the single parent, if the entity has one
    const PARENT_COLUMN: Option<&'static str> = None;

    /// Column matched by substring search, if the entity is searchable
    const SEARCH_COLUMN: Option<&'static str> = None;

    /// Identity, 0 until storage assigns one
    fn id(&self) -> i64;

    /// Values for [`Entity::COLUMNS`]
    fn values(&self) -> Vec<SqlValue>;

    /// Build the entity from a row produced by [`Entity::SELECT`]
    fn from_row(row: &dyn RowReader) -> Result<Self>;
}

/// A value bound to a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    OptInt(Option<i64>),
    Text(String),
    OptText(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;
pub(crate) type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

impl SqlValue {
    pub(crate) fn bind_sqlite<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        match self {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::OptInt(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::OptText(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        }
    }

    pub(crate) fn bind_mysql<'q>(self, query: MySqlQuery<'q>) -> MySqlQuery<'q> {
        match self {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::OptInt(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::OptText(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        }
    }
}

/// Bind every parameter in order
pub(crate) fn bind_all_sqlite<'q>(
    query: SqliteQuery<'q>,
    params: Vec<SqlValue>,
) -> SqliteQuery<'q> {
    params.into_iter().fold(query, |query, value| value.bind_sqlite(query))
}

pub(crate) fn bind_all_mysql<'q>(query: MySqlQuery<'q>, params: Vec<SqlValue>) -> MySqlQuery<'q> {
    params.into_iter().fold(query, |query, value| value.bind_mysql(query))
}

/// Driver-independent access to the columns of a result row
pub trait RowReader {
    fn int(&self, column: &str) -> Result<i64>;
    fn opt_int(&self, column: &str) -> Result<Option<i64>>;
    fn text(&self, column: &str) -> Result<String>;
    fn opt_text(&self, column: &str) -> Result<Option<String>>;
    fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>>;
}

fn read_column<'r, R, T>(row: &'r R, column: &str) -> Result<T>
where
    R: Row,
    T: Decode<'r, R::Database> + Type<R::Database>,
    for<'c> &'c str: ColumnIndex<R>,
{
    row.try_get(column)
        .with_context(|| format!("Failed to read column '{}'", column))
}

impl RowReader for SqliteRow {
    fn int(&self, column: &str) -> Result<i64> {
        read_column(self, column)
    }

    fn opt_int(&self, column: &str) -> Result<Option<i64>> {
        read_column(self, column)
    }

    fn text(&self, column: &str) -> Result<String> {
        read_column(self, column)
    }

    fn opt_text(&self, column: &str) -> Result<Option<String>> {
        read_column(self, column)
    }

    fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        read_column(self, column)
    }
}

impl RowReader for MySqlRow {
    fn int(&self, column: &str) -> Result<i64> {
        read_column(self, column)
    }

    fn opt_int(&self, column: &str) -> Result<Option<i64>> {
        read_column(self, column)
    }

    fn text(&self, column: &str) -> Result<String> {
        read_column(self, column)
    }

    fn opt_text(&self, column: &str) -> Result<Option<String>> {
        read_column(self, column)
    }

    fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        read_column(self, column)
    }
}
