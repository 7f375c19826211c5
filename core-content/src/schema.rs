//! Table schemas for the two blog stores.
//!
//! Field names in records are the column names below. The reconciliation
//! engine refers to fields only through these constants.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Field names of canonical (public-facing) blog records
pub mod canonical {
    pub const TABLE: &str = "canonical_blogs";

    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const SLUG: &str = "slug";
    pub const BODY: &str = "body";
    pub const SUMMARY: &str = "summary";
    pub const TAGS: &str = "tags";
    pub const PUBLISHED: &str = "published";
    pub const AUTHOR_REF: &str = "author_ref";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Field names of admin (workflow-facing) blog records
pub mod admin {
    pub const TABLE: &str = "admin_blogs";

    pub const EXTERNAL_ID: &str = "external_id";
    pub const TITLE: &str = "title";
    pub const SLUG: &str = "slug";
    pub const BODY: &str = "body";
    pub const TAGS: &str = "tags";
    pub const AUTHOR_ID: &str = "author_id";
    pub const STATUS: &str = "status";
    pub const PUBLISHED_AT: &str = "published_at";
    pub const LAST_UPDATED_AT: &str = "last_updated_at";
    pub const CREATED_AT: &str = "created_at";

    /// Prefix of independently assigned external ids
    pub const EXTERNAL_ID_PREFIX: &str = "BLOG";
}

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Bool,
    Integer,
    /// JSON array of strings
    TextSet,
    /// Unix milliseconds
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Must be present and non-blank on insert, and never blanked on update
    pub required: bool,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnKind, required: bool) -> Self {
        Self {
            name,
            kind,
            required,
        }
    }
}

/// How a store assigns a primary key when the caller does not supply one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Random UUID v4
    Uuid,
    /// `<prefix><unix-millis><4 random digits>`
    Prefixed(&'static str),
}

impl KeyStrategy {
    pub fn generate(&self, now: DateTime<Utc>) -> String {
        match self {
            KeyStrategy::Uuid => Uuid::new_v4().to_string(),
            KeyStrategy::Prefixed(prefix) => prefixed_id(prefix, now),
        }
    }
}

/// Build an id of the form `BLOG1717243200000` + 4 random digits
pub fn prefixed_id(prefix: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().as_u128() % 10_000;
    format!("{}{}{:04}", prefix, now.timestamp_millis(), random)
}

/// Describes one table backing a record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub key_strategy: KeyStrategy,
    pub columns: Vec<Column>,
    /// Column stamped by the store on insert
    pub created_at: Option<&'static str>,
    /// Column stamped by the store on every write unless the caller sets it
    pub updated_at: Option<&'static str>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

/// Schema of the canonical store
pub fn canonical_schema() -> TableSchema {
    use canonical::*;
    TableSchema {
        table: TABLE,
        primary_key: ID,
        key_strategy: KeyStrategy::Uuid,
        columns: vec![
            Column::new(ID, ColumnKind::Text, true),
            Column::new(TITLE, ColumnKind::Text, true),
            Column::new(SLUG, ColumnKind::Text, true),
            Column::new(BODY, ColumnKind::Text, true),
            Column::new(SUMMARY, ColumnKind::Text, false),
            Column::new(TAGS, ColumnKind::TextSet, false),
            Column::new(PUBLISHED, ColumnKind::Bool, false),
            Column::new(AUTHOR_REF, ColumnKind::Text, false),
            Column::new(CREATED_AT, ColumnKind::Timestamp, false),
            Column::new(UPDATED_AT, ColumnKind::Timestamp, false),
        ],
        created_at: Some(CREATED_AT),
        updated_at: Some(UPDATED_AT),
    }
}

/// Schema of the admin store
pub fn admin_schema() -> TableSchema {
    use admin::*;
    TableSchema {
        table: TABLE,
        primary_key: EXTERNAL_ID,
        key_strategy: KeyStrategy::Prefixed(EXTERNAL_ID_PREFIX),
        columns: vec![
            Column::new(EXTERNAL_ID, ColumnKind::Text, true),
            Column::new(TITLE, ColumnKind::Text, true),
            Column::new(SLUG, ColumnKind::Text, true),
            Column::new(BODY, ColumnKind::Text, true),
            Column::new(TAGS, ColumnKind::TextSet, false),
            Column::new(AUTHOR_ID, ColumnKind::Text, false),
            Column::new(STATUS, ColumnKind::Text, false),
            Column::new(PUBLISHED_AT, ColumnKind::Timestamp, false),
            Column::new(LAST_UPDATED_AT, ColumnKind::Timestamp, false),
            Column::new(CREATED_AT, ColumnKind::Timestamp, false),
        ],
        created_at: Some(CREATED_AT),
        // last_updated_at is owned by reconciliation writes, not the store
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_prefixed_id_shape() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let id = prefixed_id("BLOG", now);

        assert!(id.starts_with("BLOG1717243200000"));
        assert_eq!(id.len(), "BLOG".len() + 13 + 4);
        assert!(id["BLOG".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_uuid_strategy() {
        let id = KeyStrategy::Uuid.generate(Utc::now());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_schema_lookup() {
        let schema = admin_schema();
        assert_eq!(schema.primary_key, admin::EXTERNAL_ID);
        assert_eq!(
            schema.column(admin::TAGS).map(|c| c.kind),
            Some(ColumnKind::TextSet)
        );
        assert!(schema.column("summary").is_none());
        assert!(canonical_schema().column(canonical::SUMMARY).is_some());
    }
}
