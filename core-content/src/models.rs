//! Domain models for blog content
//!
//! Typed views over the records held by the two stores. The sync engine works
//! on [`Record`]s directly; these models are for hosts that seed, inspect or
//! render content.

use bridge_traits::{FieldValue, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ContentError, Result};
use crate::schema::{admin, canonical};

// =============================================================================
// Admin Status
// =============================================================================

/// Workflow status of an admin blog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl AdminStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminStatus::Draft => "draft",
            AdminStatus::Published => "published",
            AdminStatus::Archived => "archived",
        }
    }

    /// Whether the canonical side should show this entry as published
    pub fn is_published(&self) -> bool {
        matches!(self, AdminStatus::Published)
    }
}

impl fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminStatus {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(AdminStatus::Draft),
            "published" => Ok(AdminStatus::Published),
            "archived" => Ok(AdminStatus::Archived),
            other => Err(ContentError::invalid(
                admin::STATUS,
                format!("unknown status '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Canonical Entity
// =============================================================================

/// Public-facing blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    /// Empty until the store assigns one
    pub id: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub summary: Option<String>,
    pub tags: BTreeSet<String>,
    pub published: bool,
    pub author_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CanonicalEntity {
    /// New unsaved post
    pub fn new(title: impl Into<String>, slug: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            slug: slug.into(),
            body: body.into(),
            summary: None,
            tags: BTreeSet::new(),
            published: false,
            author_ref: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<()> {
        require(canonical::TITLE, &self.title)?;
        require(canonical::SLUG, &self.slug)?;
        require(canonical::BODY, &self.body)?;
        Ok(())
    }

    /// Convert into a store record. An empty id is left out so the store
    /// assigns one.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(canonical::TITLE, self.title.as_str())
            .with(canonical::SLUG, self.slug.as_str())
            .with(canonical::BODY, self.body.as_str())
            .with(canonical::SUMMARY, self.summary.clone())
            .with(canonical::TAGS, FieldValue::TextSet(self.tags.clone()))
            .with(canonical::PUBLISHED, self.published)
            .with(canonical::AUTHOR_REF, self.author_ref.clone())
            .with(canonical::CREATED_AT, self.created_at)
            .with(canonical::UPDATED_AT, self.updated_at);
        if !self.id.is_empty() {
            record.set(canonical::ID, self.id.as_str());
        }
        record
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: required_text(record, canonical::ID)?,
            title: required_text(record, canonical::TITLE)?,
            slug: required_text(record, canonical::SLUG)?,
            body: required_text(record, canonical::BODY)?,
            summary: record.get_str(canonical::SUMMARY).map(str::to_string),
            tags: record.get_set(canonical::TAGS).cloned().unwrap_or_default(),
            published: record.get_bool(canonical::PUBLISHED).unwrap_or(false),
            author_ref: record.get_str(canonical::AUTHOR_REF).map(str::to_string),
            created_at: record.get_timestamp(canonical::CREATED_AT),
            updated_at: record.get_timestamp(canonical::UPDATED_AT),
        })
    }
}

// =============================================================================
// Admin Entity
// =============================================================================

/// Workflow-facing blog entry managed in the admin console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEntity {
    /// Empty until the store assigns a `BLOG...` id
    pub external_id: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub author_id: Option<String>,
    pub status: AdminStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AdminEntity {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            external_id: String::new(),
            title: title.into(),
            slug: slug.into(),
            body: body.into(),
            tags: BTreeSet::new(),
            author_id: None,
            status: AdminStatus::Draft,
            published_at: None,
            last_updated_at: None,
            created_at: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require(admin::TITLE, &self.title)?;
        require(admin::SLUG, &self.slug)?;
        require(admin::BODY, &self.body)?;
        Ok(())
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(admin::TITLE, self.title.as_str())
            .with(admin::SLUG, self.slug.as_str())
            .with(admin::BODY, self.body.as_str())
            .with(admin::TAGS, FieldValue::TextSet(self.tags.clone()))
            .with(admin::AUTHOR_ID, self.author_id.clone())
            .with(admin::STATUS, self.status.as_str())
            .with(admin::PUBLISHED_AT, self.published_at)
            .with(admin::LAST_UPDATED_AT, self.last_updated_at)
            .with(admin::CREATED_AT, self.created_at);
        if !self.external_id.is_empty() {
            record.set(admin::EXTERNAL_ID, self.external_id.as_str());
        }
        record
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        let status = match record.get_str(admin::STATUS) {
            Some(raw) => raw.parse()?,
            None => AdminStatus::default(),
        };

        Ok(Self {
            external_id: required_text(record, admin::EXTERNAL_ID)?,
            title: required_text(record, admin::TITLE)?,
            slug: required_text(record, admin::SLUG)?,
            body: required_text(record, admin::BODY)?,
            tags: record.get_set(admin::TAGS).cloned().unwrap_or_default(),
            author_id: record.get_str(admin::AUTHOR_ID).map(str::to_string),
            status,
            published_at: record.get_timestamp(admin::PUBLISHED_AT),
            last_updated_at: record.get_timestamp(admin::LAST_UPDATED_AT),
            created_at: record.get_timestamp(admin::CREATED_AT),
        })
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ContentError::invalid(field, "cannot be empty"));
    }
    Ok(())
}

fn required_text(record: &Record, field: &str) -> Result<String> {
    record
        .get_str(field)
        .map(str::to_string)
        .ok_or_else(|| ContentError::invalid(field, "missing from record"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("published".parse::<AdminStatus>().unwrap(), AdminStatus::Published);
        assert_eq!(AdminStatus::Archived.to_string(), "archived");
        assert!("deleted".parse::<AdminStatus>().is_err());
        assert!(!AdminStatus::Archived.is_published());
    }

    #[test]
    fn test_canonical_record_conversion() {
        let mut post = CanonicalEntity::new("Future of AI", "future-of-ai", "Body");
        post.tags.insert("ai".to_string());
        post.published = true;

        let record = post.to_record();
        assert!(!record.contains(canonical::ID));
        assert!(record.get(canonical::AUTHOR_REF).is_none());

        let mut stored = record.clone();
        stored.set(canonical::ID, "c-1");
        let back = CanonicalEntity::from_record(&stored).unwrap();
        assert_eq!(back.id, "c-1");
        assert_eq!(back.tags, post.tags);
        assert!(back.published);
    }

    #[test]
    fn test_admin_from_record_defaults() {
        let record = Record::new()
            .with(admin::EXTERNAL_ID, "BLOG17172432000001234")
            .with(admin::TITLE, "Hello")
            .with(admin::SLUG, "hello")
            .with(admin::BODY, "Body");

        let entity = AdminEntity::from_record(&record).unwrap();
        assert_eq!(entity.status, AdminStatus::Draft);
        assert!(entity.tags.is_empty());
        assert!(entity.author_id.is_none());
    }

    #[test]
    fn test_admin_from_record_rejects_missing_title() {
        let record = Record::new()
            .with(admin::EXTERNAL_ID, "BLOG1")
            .with(admin::SLUG, "hello")
            .with(admin::BODY, "Body");

        assert!(AdminEntity::from_record(&record).is_err());
    }

    #[test]
    fn test_admin_to_record_keeps_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut entity = AdminEntity::new("T", "t", "B");
        entity.status = AdminStatus::Published;
        entity.published_at = Some(now);

        let record = entity.to_record();
        assert_eq!(record.get_str(admin::STATUS), Some("published"));
        assert_eq!(record.get_timestamp(admin::PUBLISHED_AT), Some(now));
    }

    #[test]
    fn test_validate_rejects_blank_body() {
        let post = CanonicalEntity::new("Title", "title", "   ");
        assert!(post.validate().is_err());
        assert!(AdminEntity::new("Title", "title", "Body").validate().is_ok());
    }
}
