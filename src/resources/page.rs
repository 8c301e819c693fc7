//! The page resource kind
//!
//! A page is addressable by slug, carries an ordered block `content`
//! sequence and a `meta` bag, and is visible to unprivileged readers
//! only while `enabled` is true.

use crate::core::error::{CmsError, CmsResult, DuplicateKind};
use crate::core::resource::{Payload, Resource, fields};
use crate::core::validation as v;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub enabled: bool,
    pub content: Vec<Value>,
    pub meta: Map<String, Value>,
    pub date_added: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Per-field checks shared by create and patch validation. The order
/// within each field is type first, constraints second.
fn check_field(field: &str, value: &Value) -> Result<(), String> {
    match field {
        "name" => v::string_in_range(value, 1, 512),
        "slug" => {
            v::string_in_range(value, 1, 512)?;
            v::slug_format(value)
        }
        "enabled" => v::strict_bool(value),
        "content" => v::block_sequence(value),
        "meta" => v::meta_map(value),
        _ => Ok(()), // unknown fields are ignored, not rejected
    }
}

fn check_supplied(payload: &Payload) -> CmsResult<()> {
    for field in ["name", "slug", "enabled", "content", "meta"] {
        if let Some(value) = payload.get(field) {
            check_field(field, value).map_err(|msg| CmsError::validation(field, msg))?;
        }
    }
    Ok(())
}

impl Resource for Page {
    fn kind() -> &'static str {
        "page"
    }

    fn collection_name() -> &'static str {
        "pages"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    fn date_updated(&self) -> DateTime<Utc> {
        self.date_updated
    }

    fn validate_create(payload: &Payload) -> CmsResult<()> {
        // presence before type before constraint
        for field in ["name", "slug"] {
            v::required(payload.get(field)).map_err(|msg| CmsError::validation(field, msg))?;
        }
        check_supplied(payload)
    }

    fn validate_patch(patch: &Payload) -> CmsResult<()> {
        check_supplied(patch)
    }

    fn from_payload(payload: &Payload, now: DateTime<Utc>) -> CmsResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: fields::str(payload, "name")
                .ok_or_else(|| CmsError::validation("name", "is required"))?,
            slug: fields::str(payload, "slug")
                .ok_or_else(|| CmsError::validation("slug", "is required"))?,
            enabled: fields::bool(payload, "enabled").unwrap_or(false),
            content: fields::array(payload, "content").unwrap_or_default(),
            meta: fields::object(payload, "meta").unwrap_or_default(),
            date_added: now,
            date_updated: now,
        })
    }

    fn apply_patch(&mut self, patch: &Payload, now: DateTime<Utc>) -> CmsResult<()> {
        if let Some(name) = fields::str(patch, "name") {
            self.name = name;
        }
        if let Some(slug) = fields::str(patch, "slug") {
            self.slug = slug;
        }
        if let Some(enabled) = fields::bool(patch, "enabled") {
            self.enabled = enabled;
        }
        if let Some(content) = fields::array(patch, "content") {
            self.content = content;
        }
        if let Some(meta) = fields::object(patch, "meta") {
            self.meta = meta;
        }
        self.date_updated = now;
        Ok(())
    }

    fn is_publicly_visible(&self) -> bool {
        self.enabled
    }

    fn unique_keys(&self) -> Vec<(DuplicateKind, String)> {
        vec![(DuplicateKind::Slug, self.slug.clone())]
    }
}
