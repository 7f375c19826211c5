//! # Field Mapping
//!
//! Declarative translation of a source record into a target patch.
//!
//! ## Overview
//!
//! A [`MappingTable`] describes one direction of reconciliation: which keys
//! identify a record on each side, which target fields reconciliation owns and
//! how each is computed from the source ([`Transform`]). The mapper is pure: it
//! reads the source record, the existing target record (if any) and the
//! current time, and returns the fields to write.
//!
//! Fields not named by a rule are never touched, so data owned only by the
//! target (store timestamps, ids) survives every sync.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::mapping::MappingTable;
//!
//! let table = MappingTable::admin_to_canonical();
//! let patch = table.map_fields(&admin_record, existing.as_ref(), clock.now());
//! table.validate(&patch, existing.as_ref())?;
//! ```

use bridge_traits::{FieldValue, Record};
use chrono::{DateTime, Utc};
use core_content::schema::{admin, canonical};
use core_runtime::config::{DEFAULT_SUMMARY_LENGTH, DEFAULT_UNKNOWN_AUTHOR};

use crate::direction::Direction;
use crate::error::{Result, SyncError};
use crate::slug;

const SUMMARY_SUFFIX: &str = "...";

// ============================================================================
// Rules
// ============================================================================

/// How one target field is computed
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Verbatim copy; an absent source clears the target
    Copy { source: String },

    /// Copy, substituting `default` for an absent source
    CopyOr { source: String, default: FieldValue },

    /// Author reference. Absent, blank or `sentinel` values clear the target.
    Author { source: String, sentinel: String },

    /// Value translation through `table`; unmatched values map to `fallback`
    Lookup {
        source: String,
        table: Vec<(FieldValue, FieldValue)>,
        fallback: FieldValue,
    },

    /// First `max_chars` characters of the source followed by `suffix`
    Summary {
        source: String,
        max_chars: usize,
        suffix: String,
    },

    /// Source slug when non-blank, otherwise derived from the title
    Slug { slug: String, title: String },

    /// Current time, written only when the source equals `equals` and the
    /// target has no value yet
    StampOnce { source: String, equals: FieldValue },
}

impl Transform {
    /// `None` means the field is left out of the patch
    fn apply(
        &self,
        source: &Record,
        target_field: &str,
        existing: Option<&Record>,
        now: DateTime<Utc>,
    ) -> Option<FieldValue> {
        match self {
            Transform::Copy { source: key } => {
                Some(source.get(key).cloned().unwrap_or(FieldValue::Null))
            }
            Transform::CopyOr {
                source: key,
                default,
            } => Some(source.get(key).cloned().unwrap_or_else(|| default.clone())),
            Transform::Author {
                source: key,
                sentinel,
            } => {
                let value = source
                    .get_str(key)
                    .map(str::trim)
                    .filter(|author| !author.is_empty() && *author != sentinel.as_str());
                Some(value.map(FieldValue::text).unwrap_or(FieldValue::Null))
            }
            Transform::Lookup {
                source: key,
                table,
                fallback,
            } => {
                let value = source.get(key);
                let mapped = table
                    .iter()
                    .find(|(from, _)| Some(from) == value)
                    .map(|(_, to)| to.clone())
                    .unwrap_or_else(|| fallback.clone());
                Some(mapped)
            }
            Transform::Summary {
                source: key,
                max_chars,
                suffix,
            } => {
                let summary = source.get_str(key).map(|body| {
                    let mut preview: String = body.chars().take(*max_chars).collect();
                    preview.push_str(suffix);
                    preview
                });
                Some(summary.map(FieldValue::Text).unwrap_or(FieldValue::Null))
            }
            Transform::Slug { slug, title } => Some(
                resolve_slug(source, slug, title)
                    .map(FieldValue::Text)
                    .unwrap_or(FieldValue::Null),
            ),
            Transform::StampOnce {
                source: key,
                equals,
            } => {
                let entered = source.get(key) == Some(equals);
                let already_set = existing.is_some_and(|record| record.contains(target_field));
                (entered && !already_set).then_some(FieldValue::Timestamp(now))
            }
        }
    }
}

fn resolve_slug(source: &Record, slug_key: &str, title_key: &str) -> Option<String> {
    match source.get_str(slug_key).map(str::trim) {
        Some(explicit) if !explicit.is_empty() => Some(explicit.to_string()),
        _ => source
            .get_str(title_key)
            .map(slug::derive)
            .filter(|derived| !derived.is_empty()),
    }
}

/// A target field and the transform producing it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub target: String,
    pub transform: Transform,
}

/// How the target identity key is filled when a record is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityAssignment {
    /// Target key takes the source identity value, linking the pair for good
    CopySource,
    /// Target store assigns its own key
    StoreAssigned,
}

/// Tunables baked into the built-in tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOptions {
    pub summary_length: usize,
    pub unknown_author_sentinel: String,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            summary_length: DEFAULT_SUMMARY_LENGTH,
            unknown_author_sentinel: DEFAULT_UNKNOWN_AUTHOR.to_string(),
        }
    }
}

// ============================================================================
// Mapping Table
// ============================================================================

/// Field mapping for one direction
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable {
    pub name: String,
    /// Identity key on the source side
    pub source_identity: String,
    /// Identity key on the target side
    pub target_identity: String,
    pub source_slug: String,
    pub target_slug: String,
    pub identity_assignment: IdentityAssignment,
    /// Stamped with the write time on every reconciliation write
    pub touch_field: Option<String>,
    /// Target fields that must be non-blank after the write
    pub required: Vec<String>,
    pub rules: Vec<FieldRule>,
}

impl MappingTable {
    pub fn new(
        name: impl Into<String>,
        source_identity: impl Into<String>,
        target_identity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_identity: source_identity.into(),
            target_identity: target_identity.into(),
            source_slug: canonical::SLUG.to_string(),
            target_slug: admin::SLUG.to_string(),
            identity_assignment: IdentityAssignment::CopySource,
            touch_field: None,
            required: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn slug_keys(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_slug = source.into();
        self.target_slug = target.into();
        self
    }

    pub fn identity_assignment(mut self, assignment: IdentityAssignment) -> Self {
        self.identity_assignment = assignment;
        self
    }

    pub fn touch(mut self, field: impl Into<String>) -> Self {
        self.touch_field = Some(field.into());
        self
    }

    pub fn require<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn rule(mut self, target: impl Into<String>, transform: Transform) -> Self {
        self.rules.push(FieldRule {
            target: target.into(),
            transform,
        });
        self
    }

    /// Built-in table for `direction`
    pub fn for_direction(direction: Direction, options: &MappingOptions) -> Self {
        match direction {
            Direction::CanonicalToAdmin => Self::canonical_to_admin_with(options),
            Direction::AdminToCanonical => Self::admin_to_canonical_with(options),
        }
    }

    /// Canonical post to admin entry, with default options
    pub fn canonical_to_admin() -> Self {
        Self::canonical_to_admin_with(&MappingOptions::default())
    }

    /// Admin entry to canonical post, with default options
    pub fn admin_to_canonical() -> Self {
        Self::admin_to_canonical_with(&MappingOptions::default())
    }

    fn canonical_to_admin_with(options: &MappingOptions) -> Self {
        Self::new(
            Direction::CanonicalToAdmin.as_str(),
            canonical::ID,
            admin::EXTERNAL_ID,
        )
        .slug_keys(canonical::SLUG, admin::SLUG)
        .touch(admin::LAST_UPDATED_AT)
        .require([admin::TITLE, admin::BODY, admin::SLUG])
        .rule(admin::TITLE, copy(canonical::TITLE))
        .rule(admin::BODY, copy(canonical::BODY))
        .rule(
            admin::SLUG,
            Transform::Slug {
                slug: canonical::SLUG.to_string(),
                title: canonical::TITLE.to_string(),
            },
        )
        .rule(
            admin::TAGS,
            Transform::CopyOr {
                source: canonical::TAGS.to_string(),
                default: FieldValue::empty_set(),
            },
        )
        .rule(
            admin::AUTHOR_ID,
            Transform::Author {
                source: canonical::AUTHOR_REF.to_string(),
                sentinel: options.unknown_author_sentinel.clone(),
            },
        )
        .rule(
            admin::STATUS,
            Transform::Lookup {
                source: canonical::PUBLISHED.to_string(),
                table: vec![
                    (FieldValue::Bool(true), FieldValue::text("published")),
                    (FieldValue::Bool(false), FieldValue::text("draft")),
                ],
                fallback: FieldValue::text("draft"),
            },
        )
        .rule(
            admin::PUBLISHED_AT,
            Transform::StampOnce {
                source: canonical::PUBLISHED.to_string(),
                equals: FieldValue::Bool(true),
            },
        )
    }

    fn admin_to_canonical_with(options: &MappingOptions) -> Self {
        Self::new(
            Direction::AdminToCanonical.as_str(),
            admin::EXTERNAL_ID,
            canonical::ID,
        )
        .slug_keys(admin::SLUG, canonical::SLUG)
        .touch(canonical::UPDATED_AT)
        .require([canonical::TITLE, canonical::BODY, canonical::SLUG])
        .rule(canonical::TITLE, copy(admin::TITLE))
        .rule(canonical::BODY, copy(admin::BODY))
        .rule(
            canonical::SLUG,
            Transform::Slug {
                slug: admin::SLUG.to_string(),
                title: admin::TITLE.to_string(),
            },
        )
        .rule(
            canonical::TAGS,
            Transform::CopyOr {
                source: admin::TAGS.to_string(),
                default: FieldValue::empty_set(),
            },
        )
        .rule(
            canonical::AUTHOR_REF,
            Transform::Author {
                source: admin::AUTHOR_ID.to_string(),
                sentinel: options.unknown_author_sentinel.clone(),
            },
        )
        .rule(
            canonical::PUBLISHED,
            Transform::Lookup {
                source: admin::STATUS.to_string(),
                table: vec![(FieldValue::text("published"), FieldValue::Bool(true))],
                fallback: FieldValue::Bool(false),
            },
        )
        .rule(
            canonical::SUMMARY,
            Transform::Summary {
                source: admin::BODY.to_string(),
                max_chars: options.summary_length,
                suffix: SUMMARY_SUFFIX.to_string(),
            },
        )
    }

    /// Identity value of a source record, if it has one
    pub fn source_id(&self, source: &Record) -> Option<String> {
        identity_string(source, &self.source_identity)
    }

    /// Identity value of a target record, if it has one
    pub fn target_id(&self, target: &Record) -> Option<String> {
        identity_string(target, &self.target_identity)
    }

    /// The slug the target record will carry for this source
    pub fn target_slug_for(&self, source: &Record) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| rule.target == self.target_slug)
            .and_then(|rule| match &rule.transform {
                Transform::Slug { slug, title } => resolve_slug(source, slug, title),
                Transform::Copy { source: key } | Transform::CopyOr { source: key, .. } => {
                    source.get_str(key).map(str::to_string)
                }
                _ => None,
            })
    }

    /// Compute the fields reconciliation writes for `source`.
    ///
    /// `existing` is the located target record, if any. The target identity
    /// key is never part of the result.
    pub fn map_fields(
        &self,
        source: &Record,
        existing: Option<&Record>,
        now: DateTime<Utc>,
    ) -> Record {
        let mut patch: Record = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.transform
                    .apply(source, &rule.target, existing, now)
                    .map(|value| (rule.target.clone(), value))
            })
            .collect();

        patch.remove(&self.target_identity);
        patch
    }

    /// Check required fields on the record that results from writing `patch`,
    /// and that a written slug is URL-safe
    pub fn validate(&self, patch: &Record, existing: Option<&Record>) -> Result<()> {
        for field in &self.required {
            let value = match patch.raw(field) {
                Some(value) => Some(value),
                None => existing.and_then(|record| record.get(field)),
            };

            if value.map_or(true, FieldValue::is_blank) {
                return Err(SyncError::ValidationFailure {
                    field: field.clone(),
                    message: "required field is missing or empty".to_string(),
                });
            }
        }

        if let Some(value) = patch.get_str(&self.target_slug) {
            if !slug::is_valid(value) {
                return Err(SyncError::ValidationFailure {
                    field: self.target_slug.clone(),
                    message: format!("'{value}' is not a URL-safe slug"),
                });
            }
        }
        Ok(())
    }
}

fn copy(source: &str) -> Transform {
    Transform::Copy {
        source: source.to_string(),
    }
}

fn identity_string(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        FieldValue::Text(s) if !s.is_empty() => Some(s.clone()),
        FieldValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn admin_entry() -> Record {
        Record::new()
            .with(admin::EXTERNAL_ID, "BLOG17172432000001234")
            .with(admin::TITLE, "Future of AI")
            .with(admin::SLUG, "future-of-ai")
            .with(admin::BODY, "Machines that learn.")
            .with(admin::TAGS, FieldValue::set(["ai"]))
            .with(admin::STATUS, "published")
    }

    #[test]
    fn test_admin_to_canonical_fields() {
        let table = MappingTable::admin_to_canonical();
        let patch = table.map_fields(&admin_entry(), None, now());

        assert_eq!(patch.get_str(canonical::TITLE), Some("Future of AI"));
        assert_eq!(patch.get_bool(canonical::PUBLISHED), Some(true));
        assert_eq!(
            patch.get_str(canonical::SUMMARY),
            Some("Machines that learn....")
        );
        assert!(patch.raw(canonical::ID).is_none());
        assert_eq!(patch.raw(canonical::AUTHOR_REF), Some(&FieldValue::Null));
    }

    #[test]
    fn test_summary_truncates_by_characters() {
        let body: String = "é".repeat(250);
        let source = admin_entry().with(admin::BODY, body);
        let patch = MappingTable::admin_to_canonical().map_fields(&source, None, now());

        let summary = patch.get_str(canonical::SUMMARY).unwrap();
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_status_lookup_is_lossy() {
        let table = MappingTable::admin_to_canonical();
        for status in ["draft", "archived", "something-else"] {
            let source = admin_entry().with(admin::STATUS, status);
            let patch = table.map_fields(&source, None, now());
            assert_eq!(patch.get_bool(canonical::PUBLISHED), Some(false));
        }
    }

    #[test]
    fn test_canonical_defaults() {
        let source = Record::new()
            .with(canonical::ID, "c-1")
            .with(canonical::TITLE, "Exam Week")
            .with(canonical::BODY, "Tips")
            .with(canonical::AUTHOR_REF, "unknown");

        let patch = MappingTable::canonical_to_admin().map_fields(&source, None, now());

        assert_eq!(patch.get_str(admin::SLUG), Some("exam-week"));
        assert_eq!(patch.get(admin::TAGS), Some(&FieldValue::empty_set()));
        assert!(patch.get(admin::AUTHOR_ID).is_none());
        assert_eq!(patch.get_str(admin::STATUS), Some("draft"));
        assert!(patch.raw(admin::PUBLISHED_AT).is_none());
    }

    #[test]
    fn test_published_at_stamped_once() {
        let table = MappingTable::canonical_to_admin();
        let source = Record::new()
            .with(canonical::ID, "c-1")
            .with(canonical::TITLE, "T")
            .with(canonical::BODY, "B")
            .with(canonical::PUBLISHED, true);

        let created = table.map_fields(&source, None, now());
        assert_eq!(created.get_timestamp(admin::PUBLISHED_AT), Some(now()));

        let existing = Record::new()
            .with(admin::EXTERNAL_ID, "c-1")
            .with(admin::PUBLISHED_AT, now());
        let later = now() + chrono::Duration::days(3);
        let updated = table.map_fields(&source, Some(&existing), later);
        assert!(updated.raw(admin::PUBLISHED_AT).is_none());
        assert!(updated.raw(admin::EXTERNAL_ID).is_none());
    }

    #[test]
    fn test_author_passes_through() {
        let source = admin_entry().with(admin::AUTHOR_ID, "user-7");
        let patch = MappingTable::admin_to_canonical().map_fields(&source, None, now());
        assert_eq!(patch.get_str(canonical::AUTHOR_REF), Some("user-7"));
    }

    #[test]
    fn test_validate_uses_existing_values() {
        let table = MappingTable::admin_to_canonical();
        let existing = Record::new()
            .with(canonical::TITLE, "Kept")
            .with(canonical::BODY, "Kept")
            .with(canonical::SLUG, "kept");

        assert!(table.validate(&Record::new(), Some(&existing)).is_ok());

        let blank_title = Record::new().with(canonical::TITLE, " ");
        let err = table.validate(&blank_title, Some(&existing)).unwrap_err();
        assert!(matches!(err, SyncError::ValidationFailure { ref field, .. } if field == "title"));

        let cleared = Record::new().with(canonical::BODY, FieldValue::Null);
        assert!(table.validate(&cleared, Some(&existing)).is_err());
    }

    #[test]
    fn test_validate_rejects_unsafe_slug() {
        let table = MappingTable::admin_to_canonical();
        let source = admin_entry().with(admin::SLUG, "Hello World!");
        let patch = table.map_fields(&source, None, now());
        assert_eq!(patch.get_str(canonical::SLUG), Some("Hello World!"));

        let err = table.validate(&patch, None).unwrap_err();
        assert!(matches!(err, SyncError::ValidationFailure { ref field, .. } if field == "slug"));

        let derived = admin_entry().with(admin::SLUG, "  ");
        let patch = table.map_fields(&derived, None, now());
        assert!(table.validate(&patch, None).is_ok());
    }

    #[test]
    fn test_custom_options() {
        let options = MappingOptions {
            summary_length: 5,
            unknown_author_sentinel: "n/a".to_string(),
        };
        let table = MappingTable::for_direction(Direction::AdminToCanonical, &options);
        let source = admin_entry().with(admin::AUTHOR_ID, "n/a");
        let patch = table.map_fields(&source, None, now());

        assert_eq!(patch.get_str(canonical::SUMMARY), Some("Machi..."));
        assert!(patch.get(canonical::AUTHOR_REF).is_none());
    }

    #[test]
    fn test_target_slug_for_prefers_explicit_slug() {
        let table = MappingTable::admin_to_canonical();
        let source = admin_entry().with(admin::SLUG, "custom-slug");
        assert_eq!(table.target_slug_for(&source).as_deref(), Some("custom-slug"));

        let untitled = admin_entry().with(admin::SLUG, "");
        assert_eq!(table.target_slug_for(&untitled).as_deref(), Some("future-of-ai"));
    }
}
