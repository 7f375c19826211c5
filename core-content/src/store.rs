//! SQLite-backed [`RecordStore`].
//!
//! One `SqliteRecordStore` serves one table described by a [`TableSchema`].
//! Column names are taken from the schema only, so caller-supplied field
//! names never reach the SQL text unchecked.
//!
//! Slug uniqueness is enforced by a UNIQUE index; violations surface as
//! `BridgeError::UniqueViolation`.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{Clock, FieldValue, Record, RecordFilter, RecordStore, SystemClock};
use chrono::{TimeZone, Utc};
use sqlx::error::ErrorKind;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, instrument, warn};

use crate::schema::{admin_schema, canonical_schema, Column, ColumnKind, TableSchema};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Record store over a single SQLite table
pub struct SqliteRecordStore {
    pool: SqlitePool,
    schema: TableSchema,
    clock: Arc<dyn Clock>,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, schema: TableSchema) -> Self {
        Self {
            pool,
            schema,
            clock: Arc::new(SystemClock),
        }
    }

    /// Store over `canonical_blogs`
    pub fn canonical(pool: SqlitePool) -> Self {
        Self::new(pool, canonical_schema())
    }

    /// Store over `admin_blogs`
    pub fn admin(pool: SqlitePool) -> Self {
        Self::new(pool, admin_schema())
    }

    /// Use `clock` for store-managed timestamps and generated keys
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.schema.column(name).ok_or_else(|| BridgeError::InvalidInput {
            field: name.to_string(),
            message: format!("unknown field for {}", self.schema.table),
        })
    }

    fn select_sql(&self) -> String {
        let columns: Vec<&str> = self.schema.column_names().collect();
        format!("SELECT {} FROM {}", columns.join(", "), self.schema.table)
    }

    async fn fetch_one_by(&self, key: &str, value: &FieldValue) -> Result<Option<Record>> {
        let column = self.column(key)?;
        if column.kind == ColumnKind::TextSet {
            return Err(BridgeError::InvalidInput {
                field: key.to_string(),
                message: "set-valued fields cannot be used as lookup keys".to_string(),
            });
        }

        let sql = format!("{} WHERE {} = ? LIMIT 1", self.select_sql(), column.name);
        let query = bind_value(sqlx::query(&sql), column, value)?;
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_sqlx_error(e))?;

        row.map(|row| self.decode_row(&row)).transpose()
    }

    fn decode_row(&self, row: &SqliteRow) -> Result<Record> {
        let mut record = Record::new();
        for column in &self.schema.columns {
            let value = decode_column(row, column).map_err(|e| self.map_sqlx_error(e))?;
            if !value.is_null() {
                record.set(column.name, value);
            }
        }
        Ok(record)
    }

    /// Check field names, value kinds and required columns
    fn check_fields(&self, fields: &Record, inserting: bool) -> Result<()> {
        for (name, value) in fields.iter() {
            let column = self.column(name)?;
            if !value.is_null() && !kind_matches(column.kind, value) {
                return Err(BridgeError::InvalidInput {
                    field: name.to_string(),
                    message: format!("expected {:?}, got {}", column.kind, value.kind()),
                });
            }
            if column.required && value.is_blank() {
                return Err(BridgeError::InvalidInput {
                    field: name.to_string(),
                    message: "required field cannot be empty".to_string(),
                });
            }
        }

        if inserting {
            if let Some(missing) = self
                .schema
                .columns
                .iter()
                .find(|c| c.required && !fields.contains(c.name))
            {
                return Err(BridgeError::InvalidInput {
                    field: missing.name.to_string(),
                    message: "required field is missing".to_string(),
                });
            }
        }

        Ok(())
    }

    fn map_sqlx_error(&self, err: sqlx::Error) -> BridgeError {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => BridgeError::UniqueViolation(format!(
                    "{}: {}",
                    self.schema.table,
                    db_err.message()
                )),
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    BridgeError::InvalidInput {
                        field: self.schema.table.to_string(),
                        message: db_err.message().to_string(),
                    }
                }
                _ => BridgeError::DatabaseError(err.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                BridgeError::NotAvailable(format!("{}: {}", self.schema.table, err))
            }
            _ => BridgeError::DatabaseError(err.to_string()),
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn name(&self) -> &'static str {
        self.schema.table
    }

    #[instrument(skip(self, value), fields(store = self.schema.table))]
    async fn find_by_key(&self, key: &str, value: &FieldValue) -> Result<Option<Record>> {
        self.fetch_one_by(key, value).await
    }

    #[instrument(skip(self, fields), fields(store = self.schema.table))]
    async fn insert(&self, mut fields: Record) -> Result<Record> {
        let now = self.clock.now();
        let primary_key = self.schema.primary_key;

        if !fields.contains(primary_key) {
            fields.set(primary_key, self.schema.key_strategy.generate(now));
        }
        for stamp in [self.schema.created_at, self.schema.updated_at]
            .into_iter()
            .flatten()
        {
            if !fields.contains(stamp) {
                fields.set(stamp, now);
            }
        }

        self.check_fields(&fields, true)?;

        let mut names = Vec::new();
        let mut values = Vec::new();
        for (name, value) in fields.iter() {
            if value.is_null() {
                continue;
            }
            names.push(self.column(name)?);
            values.push(value);
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let column_list: Vec<&str> = names.iter().map(|c| c.name).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table,
            column_list.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for (column, value) in names.iter().zip(values) {
            query = bind_value(query, column, value)?;
        }

        query.execute(&self.pool).await.map_err(|e| {
            let mapped = self.map_sqlx_error(e);
            warn!(error = %mapped, "Insert rejected");
            mapped
        })?;

        let key_value = fields
            .get(primary_key)
            .cloned()
            .unwrap_or(FieldValue::Null);
        debug!(key = ?key_value, "Inserted record");

        self.fetch_one_by(primary_key, &key_value)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                store: self.schema.table.to_string(),
                key: format!("{:?}", key_value),
            })
    }

    #[instrument(skip(self, existing, patch), fields(store = self.schema.table))]
    async fn update(&self, existing: &Record, mut patch: Record) -> Result<Record> {
        let primary_key = self.schema.primary_key;
        let key_value = existing
            .get(primary_key)
            .cloned()
            .ok_or_else(|| BridgeError::InvalidInput {
                field: primary_key.to_string(),
                message: "existing record has no primary key".to_string(),
            })?;

        // Identity is immutable once assigned
        patch.remove(primary_key);
        if let Some(stamp) = self.schema.updated_at {
            if patch.raw(stamp).is_none() {
                patch.set(stamp, self.clock.now());
            }
        }

        self.check_fields(&patch, false)?;

        if !patch.is_empty() {
            let mut assignments = Vec::new();
            let mut bindings = Vec::new();
            for (name, value) in patch.iter() {
                let column = self.column(name)?;
                assignments.push(format!("{} = ?", column.name));
                bindings.push((column, value));
            }

            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.schema.table,
                assignments.join(", "),
                primary_key
            );

            let mut query = sqlx::query(&sql);
            for (column, value) in bindings {
                query = bind_value(query, column, value)?;
            }
            let key_column = self.column(primary_key)?;
            query = bind_value(query, key_column, &key_value)?;

            let result = query.execute(&self.pool).await.map_err(|e| {
                let mapped = self.map_sqlx_error(e);
                warn!(error = %mapped, "Update rejected");
                mapped
            })?;

            if result.rows_affected() == 0 {
                return Err(BridgeError::NotFound {
                    store: self.schema.table.to_string(),
                    key: format!("{:?}", key_value),
                });
            }
        }

        self.fetch_one_by(primary_key, &key_value)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                store: self.schema.table.to_string(),
                key: format!("{:?}", key_value),
            })
    }

    #[instrument(skip(self), fields(store = self.schema.table))]
    async fn list_all(&self, filter: Option<RecordFilter>) -> Result<Vec<Record>> {
        let rows = match &filter {
            Some(filter) => {
                let column = self.column(&filter.field)?;
                if filter.value.is_null() {
                    let sql = format!(
                        "{} WHERE {} IS NULL ORDER BY rowid",
                        self.select_sql(),
                        column.name
                    );
                    sqlx::query(&sql).fetch_all(&self.pool).await
                } else {
                    let sql = format!(
                        "{} WHERE {} = ? ORDER BY rowid",
                        self.select_sql(),
                        column.name
                    );
                    bind_value(sqlx::query(&sql), column, &filter.value)?
                        .fetch_all(&self.pool)
                        .await
                }
            }
            None => {
                let sql = format!("{} ORDER BY rowid", self.select_sql());
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| self.map_sqlx_error(e))?;

        rows.iter().map(|row| self.decode_row(row)).collect()
    }
}

fn kind_matches(kind: ColumnKind, value: &FieldValue) -> bool {
    matches!(
        (kind, value),
        (ColumnKind::Text, FieldValue::Text(_))
            | (ColumnKind::Bool, FieldValue::Bool(_))
            | (ColumnKind::Integer, FieldValue::Integer(_))
            | (ColumnKind::TextSet, FieldValue::TextSet(_))
            | (ColumnKind::Timestamp, FieldValue::Timestamp(_))
    )
}

fn bind_value<'q>(
    query: SqliteQuery<'q>,
    column: &Column,
    value: &FieldValue,
) -> Result<SqliteQuery<'q>> {
    let query = match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Bool(b) => query.bind(*b),
        FieldValue::Integer(i) => query.bind(*i),
        FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::TextSet(set) => {
            let encoded =
                serde_json::to_string(set).map_err(|e| BridgeError::InvalidInput {
                    field: column.name.to_string(),
                    message: e.to_string(),
                })?;
            query.bind(encoded)
        }
        FieldValue::Timestamp(ts) => query.bind(ts.timestamp_millis()),
    };
    Ok(query)
}

fn decode_column(row: &SqliteRow, column: &Column) -> std::result::Result<FieldValue, sqlx::Error> {
    let value = match column.kind {
        ColumnKind::Text => row.try_get::<Option<String>, _>(column.name)?.into(),
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(column.name)?.into(),
        ColumnKind::Integer => row.try_get::<Option<i64>, _>(column.name)?.into(),
        ColumnKind::TextSet => match row.try_get::<Option<String>, _>(column.name)? {
            Some(raw) => {
                let set: BTreeSet<String> =
                    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
                        index: column.name.to_string(),
                        source: Box::new(e),
                    })?;
                FieldValue::TextSet(set)
            }
            None => FieldValue::Null,
        },
        ColumnKind::Timestamp => match row.try_get::<Option<i64>, _>(column.name)? {
            Some(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .map(FieldValue::Timestamp)
                .unwrap_or(FieldValue::Null),
            None => FieldValue::Null,
        },
    };
    Ok(value)
}
