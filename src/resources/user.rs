//! The user resource kind
//!
//! Users hold a credential digest (argon2 PHC string) that is written
//! to storage but stripped from every response, plus the role name the
//! permission registry resolves. Username and email are unique within
//! the kind, in addition to the slug every resource carries.

use crate::core::error::{CmsError, CmsResult, DuplicateKind};
use crate::core::resource::{Payload, Resource, fields};
use crate::core::validation as v;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub username: String,
    pub email: String,
    /// argon2 PHC string. Never serialized to clients (see
    /// `public_json`), only to storage.
    pub password_digest: String,
    pub role: String,
    pub meta: Map<String, Value>,
    pub date_added: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash_password(plain: &str) -> CmsResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CmsError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored digest.
/// An undecodable digest verifies as false, never as an error.
pub fn verify_password(plain: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Derive a URL-safe slug from a username.
fn slugify(username: &str) -> String {
    username
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9') => c,
            _ => '-',
        })
        .collect()
}

fn check_field(field: &str, value: &Value) -> Result<(), String> {
    match field {
        "name" => v::string_in_range(value, 1, 512),
        "slug" => {
            v::string_in_range(value, 1, 512)?;
            v::slug_format(value)
        }
        "username" => {
            v::string_in_range(value, 1, 512)?;
            v::username_format(value)
        }
        "email" => v::email_format(value),
        "password" => v::password_length(value),
        "role" => v::string_in_range(value, 1, 128),
        "meta" => v::meta_map(value),
        _ => Ok(()),
    }
}

fn check_supplied(payload: &Payload) -> CmsResult<()> {
    for field in ["name", "slug", "username", "email", "password", "role", "meta"] {
        if let Some(value) = payload.get(field) {
            check_field(field, value).map_err(|msg| CmsError::validation(field, msg))?;
        }
    }
    Ok(())
}

impl Resource for User {
    fn kind() -> &'static str {
        "user"
    }

    fn collection_name() -> &'static str {
        "users"
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
        for field in ["username", "email", "password"] {
            v::required(payload.get(field)).map_err(|msg| CmsError::validation(field, msg))?;
        }
        check_supplied(payload)
    }

    fn validate_patch(patch: &Payload) -> CmsResult<()> {
        check_supplied(patch)
    }

    fn from_payload(payload: &Payload, now: DateTime<Utc>) -> CmsResult<Self> {
        let username = fields::str(payload, "username")
            .ok_or_else(|| CmsError::validation("username", "is required"))?;
        let password = fields::str(payload, "password")
            .ok_or_else(|| CmsError::validation("password", "is required"))?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: fields::str(payload, "name").unwrap_or_else(|| username.clone()),
            slug: fields::str(payload, "slug").unwrap_or_else(|| slugify(&username)),
            email: fields::str(payload, "email")
                .ok_or_else(|| CmsError::validation("email", "is required"))?,
            password_digest: hash_password(&password)?,
            role: fields::str(payload, "role").unwrap_or_else(|| "subscriber".to_string()),
            meta: fields::object(payload, "meta").unwrap_or_default(),
            username,
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
        if let Some(username) = fields::str(patch, "username") {
            self.username = username;
        }
        if let Some(email) = fields::str(patch, "email") {
            self.email = email;
        }
        if let Some(password) = fields::str(patch, "password") {
            self.password_digest = hash_password(&password)?;
        }
        if let Some(role) = fields::str(patch, "role") {
            self.role = role;
        }
        if let Some(meta) = fields::object(patch, "meta") {
            self.meta = meta;
        }
        self.date_updated = now;
        Ok(())
    }

    /// Every stored user is visible to actors allowed to read the kind
    /// at all; the gate is `requires_view_to_read`, not a record flag.
    fn is_publicly_visible(&self) -> bool {
        true
    }

    fn requires_view_to_read() -> bool {
        true
    }

    fn unique_keys(&self) -> Vec<(DuplicateKind, String)> {
        // Username first: the slug derives from it, so a username
        // collision would otherwise surface as a slug collision.
        vec![
            (DuplicateKind::Username, self.username.clone()),
            (DuplicateKind::Email, self.email.clone()),
            (DuplicateKind::Slug, self.slug.clone()),
        ]
    }

    fn public_json(&self) -> Value {
        let mut json = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(obj) = json.as_object_mut() {
            obj.remove("passwordDigest");
        }
        json
    }
}
