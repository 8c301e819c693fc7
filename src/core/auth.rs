//! Roles, capabilities, and per-request authentication context
//!
//! Three pieces live here:
//! - [`PermissionRegistry`]: static role → capability lookup. Unknown
//!   roles fail closed (no capabilities).
//! - [`TokenKeys`]: HS256 sign/verify with an explicitly injected
//!   secret. The secret is a constructor argument, never ambient state,
//!   so verification is independently testable and rotation needs no
//!   process-wide coordination.
//! - [`AuthContext`]: the decoded (or anonymous) identity attached to
//!   exactly one request. Derivation never fails past its boundary:
//!   any missing, malformed, or forged credential yields `Anonymous`
//!   and authorization is decided later, per endpoint.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use uuid::Uuid;

/// A named permission checked against a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    View,
    Edit,
}

/// Registry mapping role names to capability sets.
///
/// Built-in roles: `superAdmin`/`admin` → {view, edit}, `editor` →
/// {view}, `subscriber` → {}. Host applications merge extension
/// entries over the built-ins at construction time.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    roles: HashMap<String, HashSet<Capability>>,
}

impl PermissionRegistry {
    /// Create a registry containing only the built-in roles.
    pub fn with_builtins() -> Self {
        let mut roles = HashMap::new();
        let full: HashSet<Capability> = [Capability::View, Capability::Edit].into();
        let view_only: HashSet<Capability> = [Capability::View].into();

        roles.insert("superAdmin".to_string(), full.clone());
        roles.insert("admin".to_string(), full);
        roles.insert("editor".to_string(), view_only);
        roles.insert("subscriber".to_string(), HashSet::new());

        Self { roles }
    }

    /// Merge an extension entry over the built-ins.
    ///
    /// Extension entries win on name collision; removing a built-in is
    /// not possible, only redefining it.
    pub fn extend(&mut self, role: impl Into<String>, capabilities: HashSet<Capability>) {
        self.roles.insert(role.into(), capabilities);
    }

    fn has(&self, role: &str, capability: Capability) -> bool {
        self.roles
            .get(role)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// Can this role read unrestricted content?
    pub fn can_view(&self, role: &str) -> bool {
        self.has(role, Capability::View)
    }

    /// Can this role create, update, or delete content?
    pub fn can_edit(&self, role: &str) -> bool {
        self.has(role, Capability::Edit)
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// JWT claims carried by an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    /// Expiration (unix seconds).
    pub exp: i64,
    /// Issued at (unix seconds).
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, username: String, role: String, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            username,
            role,
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// HS256 signing keys derived from one injected secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a signed token for the given claims.
    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::default(), claims, &self.encoding)?)
    }

    /// Verify a token and return its claims, or `None` if the token is
    /// invalid, expired, or signed with another secret.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }
}

/// The decoded (or anonymous) identity attached to one request.
///
/// Created once per inbound request, read-only afterward.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No credential, or one that failed verification.
    Anonymous,

    /// A verified bearer token.
    Authenticated {
        user_id: Uuid,
        username: String,
        role: String,
    },
}

impl AuthContext {
    /// Derive a context from the raw `Authorization` header value.
    ///
    /// Anything other than a verifiable `Bearer <token>` resolves to
    /// `Anonymous`; this never rejects the request.
    pub fn derive(header: Option<&str>, keys: &TokenKeys) -> Self {
        let Some(raw) = header else {
            return AuthContext::Anonymous;
        };
        let Some(token) = raw.strip_prefix("Bearer ") else {
            return AuthContext::Anonymous;
        };
        match keys.verify(token.trim()) {
            Some(claims) => AuthContext::Authenticated {
                user_id: claims.sub,
                username: claims.username,
                role: claims.role,
            },
            None => AuthContext::Anonymous,
        }
    }

    /// The role name, if authenticated.
    pub fn role(&self) -> Option<&str> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated { role, .. } => Some(role),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthContext::Anonymous)
    }

    /// Does this actor hold the view capability?
    pub fn can_view(&self, registry: &PermissionRegistry) -> bool {
        self.role().is_some_and(|r| registry.can_view(r))
    }

    /// Does this actor hold the edit capability?
    pub fn can_edit(&self, registry: &PermissionRegistry) -> bool {
        self.role().is_some_and(|r| registry.can_edit(r))
    }
}
