//! The resource abstraction shared by all content kinds
//!
//! A [`Resource`] is a persisted record with a stable id, a URL-safe
//! slug unique within its kind, timestamps, and kind-specific payload
//! rules. The controller and every storage adapter are generic over
//! this trait; concrete kinds (page, blog post, user) live in
//! `crate::resources`.
//!
//! Create and update payloads arrive as explicit field→value mappings
//! ([`Payload`]), never as full records with defaulted fields, so a
//! sparse update can only touch the fields the caller supplied.

use crate::core::error::{CmsResult, DuplicateKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// An explicit field-name → value mapping from a request body.
pub type Payload = serde_json::Map<String, Value>;

/// Capability contract for one resource kind.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Singular kind name used in error messages (e.g. "page").
    fn kind() -> &'static str;

    /// Plural storage name: Mongo collection / relational kind
    /// discriminator (e.g. "pages").
    fn collection_name() -> &'static str;

    fn id(&self) -> Uuid;

    fn slug(&self) -> &str;

    fn date_added(&self) -> DateTime<Utc>;

    fn date_updated(&self) -> DateTime<Utc>;

    /// Check a full create payload. Presence checks run first, then
    /// type checks, then constraint checks, so rejection reasons are
    /// deterministic.
    fn validate_create(payload: &Payload) -> CmsResult<()>;

    /// Check a sparse update payload: only supplied fields are
    /// validated, with the same per-field order as `validate_create`.
    fn validate_patch(patch: &Payload) -> CmsResult<()>;

    /// Build a record from a validated create payload. Both timestamps
    /// are stamped with the same request-time value.
    fn from_payload(payload: &Payload, now: DateTime<Utc>) -> CmsResult<Self>;

    /// Apply a validated sparse patch. Only supplied fields change;
    /// `date_updated` always refreshes.
    fn apply_patch(&mut self, patch: &Payload, now: DateTime<Utc>) -> CmsResult<()>;

    /// Is this record visible to actors without edit rights?
    fn is_publicly_visible(&self) -> bool;

    /// Whether reads of this kind require the view capability instead
    /// of degrading to narrowed results. Account data opts in.
    fn requires_view_to_read() -> bool {
        false
    }

    /// Unique keys the storage engine enforces for this record, as
    /// `(which constraint, key value)` pairs. Used by engines without
    /// declarative indexes (the in-memory store) and for mapping
    /// engine violations back to the taxonomy.
    fn unique_keys(&self) -> Vec<(DuplicateKind, String)>;

    /// Serialize for a response. Kinds with sensitive fields override
    /// this to strip them; the default is the full record.
    fn public_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Typed accessors over a [`Payload`], used by `from_payload` /
/// `apply_patch` after validation has pinned the field types.
pub mod fields {
    use super::Payload;
    use serde_json::{Map, Value};

    pub fn str(payload: &Payload, key: &str) -> Option<String> {
        payload.get(key).and_then(|v| v.as_str()).map(String::from)
    }

    pub fn bool(payload: &Payload, key: &str) -> Option<bool> {
        payload.get(key).and_then(|v| v.as_bool())
    }

    pub fn array(payload: &Payload, key: &str) -> Option<Vec<Value>> {
        payload.get(key).and_then(|v| v.as_array()).cloned()
    }

    pub fn object(payload: &Payload, key: &str) -> Option<Map<String, Value>> {
        payload.get(key).and_then(|v| v.as_object()).cloned()
    }
}
