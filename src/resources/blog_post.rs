//! The blog post resource kind
//!
//! Posts carry a two-flag visibility pair: `draft` marks work in
//! progress, `public` opts the post into the public listing. Readers
//! without edit rights see a post only when `draft` is false AND
//! `public` is true.

use crate::core::error::{CmsError, CmsResult, DuplicateKind};
use crate::core::resource::{Payload, Resource, fields};
use crate::core::validation as v;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub draft: bool,
    pub public: bool,
    pub content: Vec<Value>,
    pub meta: Map<String, Value>,
    pub date_added: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

fn check_field(field: &str, value: &Value) -> Result<(), String> {
    match field {
        "name" => v::string_in_range(value, 1, 512),
        "slug" => {
            v::string_in_range(value, 1, 512)?;
            v::slug_format(value)
        }
        "draft" | "public" => v::strict_bool(value),
        "content" => v::block_sequence(value),
        "meta" => v::meta_map(value),
        _ => Ok(()),
    }
}

fn check_supplied(payload: &Payload) -> CmsResult<()> {
    for field in ["name", "slug", "draft", "public", "content", "meta"] {
        if let Some(value) = payload.get(field) {
            check_field(field, value).map_err(|msg| CmsError::validation(field, msg))?;
        }
    }
    Ok(())
}

impl Resource for BlogPost {
    fn kind() -> &'static str {
        "blog post"
    }

    fn collection_name() -> &'static str {
        "blog_posts"
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
            // new posts start as private drafts unless stated otherwise
            draft: fields::bool(payload, "draft").unwrap_or(true),
            public: fields::bool(payload, "public").unwrap_or(false),
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
        if let Some(draft) = fields::bool(patch, "draft") {
            self.draft = draft;
        }
        if let Some(public) = fields::bool(patch, "public") {
            self.public = public;
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
        !self.draft && self.public
    }

    fn unique_keys(&self) -> Vec<(DuplicateKind, String)> {
        vec![(DuplicateKind::Slug, self.slug.clone())]
    }
}
