//! Controller pipeline tests: authorization and validation ordering,
//! visibility narrowing, and storage error mapping.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use slate::core::auth::{AuthContext, PermissionRegistry};
use slate::core::controller::ResourceController;
use slate::core::error::CmsError;
use slate::core::plugins::PluginHandler;
use slate::core::resource::Resource;
use slate::resources::{Page, User};
use slate::storage::{InMemoryStore, Lookup, ResourceStore, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Counts every call that reaches the storage layer.
struct SpyStore<T: Resource> {
    inner: InMemoryStore<T>,
    calls: Arc<AtomicUsize>,
}

impl<T: Resource> SpyStore<T> {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner: InMemoryStore::new(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for SpyStore<T> {
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(lookup).await
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_many().await
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, record).await
    }

    async fn delete(&self, id: &Uuid) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(id).await
    }
}

/// A store whose writes always claim to have affected nothing.
struct VanishingStore<T: Resource> {
    inner: InMemoryStore<T>,
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for VanishingStore<T> {
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError> {
        self.inner.find_one(lookup).await
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        self.inner.find_many().await
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.inner.insert(record).await
    }

    async fn update(&self, _id: &Uuid, _record: T) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn delete(&self, _id: &Uuid) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// A store that answers every call with a malformed-response error.
struct BrokenStore;

#[async_trait]
impl<T: Resource> ResourceStore<T> for BrokenStore {
    async fn find_one(&self, _lookup: &Lookup) -> Result<Option<T>, StoreError> {
        Err(StoreError::ContractViolation("missing count field".into()))
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        Err(StoreError::ContractViolation("missing count field".into()))
    }

    async fn insert(&self, _record: T) -> Result<T, StoreError> {
        Err(StoreError::ContractViolation("missing count field".into()))
    }

    async fn update(&self, _id: &Uuid, _record: T) -> Result<u64, StoreError> {
        Err(StoreError::ContractViolation("missing count field".into()))
    }

    async fn delete(&self, _id: &Uuid) -> Result<u64, StoreError> {
        Err(StoreError::ContractViolation("missing count field".into()))
    }
}

fn controller_with<T: Resource>(store: Arc<dyn ResourceStore<T>>) -> ResourceController<T> {
    ResourceController::new(
        store,
        Arc::new(PermissionRegistry::with_builtins()),
        Arc::new(PluginHandler::new()),
    )
}

fn actor(role: &str) -> AuthContext {
    AuthContext::Authenticated {
        user_id: Uuid::new_v4(),
        username: format!("{role}-actor"),
        role: role.to_string(),
    }
}

fn page_payload(name: &str, slug: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("name".into(), name.into());
    payload.insert("slug".into(), slug.into());
    payload
}

fn user_payload(username: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("username".into(), username.into());
    payload.insert("email".into(), format!("{username}@example.com").into());
    payload.insert("password".into(), "longenough".into());
    payload
}

// ---------------------------------------------------------------------------
// Ordering: authorization and validation run before storage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn denied_create_never_touches_storage() {
    let (spy, calls) = SpyStore::<Page>::new();
    let controller = controller_with(Arc::new(spy));

    for auth in [AuthContext::Anonymous, actor("editor"), actor("subscriber")] {
        let err = controller
            .create(&auth, &page_payload("Home", "home"))
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::AccessDenied));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_payload_never_touches_storage() {
    let (spy, calls) = SpyStore::<Page>::new();
    let controller = controller_with(Arc::new(spy));

    let err = controller
        .create(&actor("admin"), &page_payload("Home", "Not A Slug"))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation { .. }));

    let mut missing_name = Map::new();
    missing_name.insert("slug".into(), "home".into());
    let err = controller
        .create(&actor("admin"), &missing_name)
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation { .. }));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn denied_user_read_never_touches_storage() {
    let (spy, calls) = SpyStore::<User>::new();
    let controller = controller_with(Arc::new(spy));

    let err = controller.list(&AuthContext::Anonymous).await.unwrap_err();
    assert!(matches!(err, CmsError::AccessDenied));
    let err = controller
        .get_one(&actor("subscriber"), "someone")
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::AccessDenied));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Permission model
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_role_fails_closed() {
    let controller = controller_with(Arc::new(InMemoryStore::<Page>::new()));
    let err = controller
        .create(&actor("wizard"), &page_payload("Home", "home"))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::AccessDenied));
}

#[tokio::test]
async fn super_admin_has_edit() {
    let controller = controller_with(Arc::new(InMemoryStore::<Page>::new()));
    controller
        .create(&actor("superAdmin"), &page_payload("Home", "home"))
        .await
        .unwrap();
}

#[tokio::test]
async fn editor_can_read_users_but_not_write_them() {
    let controller = controller_with(Arc::new(InMemoryStore::<User>::new()));
    controller
        .create(&actor("admin"), &user_payload("alice"))
        .await
        .unwrap();

    let listed = controller.list(&actor("editor")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("passwordDigest").is_none());

    let err = controller
        .create(&actor("editor"), &user_payload("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::AccessDenied));
}

// ---------------------------------------------------------------------------
// Duplicate mapping per unique key
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_username_and_email_are_distinct_errors() {
    let controller = controller_with(Arc::new(InMemoryStore::<User>::new()));
    controller
        .create(&actor("admin"), &user_payload("alice"))
        .await
        .unwrap();

    let mut same_username = user_payload("alice");
    same_username.insert("email".into(), "other@example.com".into());
    let err = controller
        .create(&actor("admin"), &same_username)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "DUPLICATE_USERNAME");

    let mut same_email = user_payload("bob");
    same_email.insert("email".into(), "alice@example.com".into());
    let err = controller
        .create(&actor("admin"), &same_email)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "DUPLICATE_EMAIL");
}

// ---------------------------------------------------------------------------
// Write-count contract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_affected_update_is_not_modified() {
    let store = VanishingStore {
        inner: InMemoryStore::<Page>::new(),
    };
    let controller = controller_with(Arc::new(store));
    controller
        .create(&actor("admin"), &page_payload("Home", "home"))
        .await
        .unwrap();

    let mut patch = Map::new();
    patch.insert("name".into(), "Homepage".into());
    let err = controller
        .update(&actor("admin"), "home", &patch)
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::NotModified));
}

#[tokio::test]
async fn zero_affected_delete_is_not_deleted() {
    let store = VanishingStore {
        inner: InMemoryStore::<Page>::new(),
    };
    let controller = controller_with(Arc::new(store));
    controller
        .create(&actor("admin"), &page_payload("Home", "home"))
        .await
        .unwrap();

    let err = controller.delete(&actor("admin"), "home").await.unwrap_err();
    assert!(matches!(err, CmsError::NotDeleted));
}

// ---------------------------------------------------------------------------
// Read-back fidelity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nested_content_and_meta_read_back_exactly_as_written() {
    let controller = controller_with(Arc::new(InMemoryStore::<Page>::new()));

    let content = json!([
        { "type": "hero", "blocks": [
            { "type": "text", "text": "Welcome", "marks": ["em", "strong"] },
            { "type": "image", "src": "/hero.png", "meta": { "alt": "skyline" } }
        ]},
        { "type": "columns", "children": [[{ "type": "text", "text": "left" }], []] }
    ]);
    let meta = json!({
        "seo": { "title": "Home", "keywords": ["cms", "rust"] },
        "weights": [1, 2.5, null],
        "order": 3
    });

    let mut payload = page_payload("Home", "home");
    payload.insert("content".into(), content.clone());
    payload.insert("meta".into(), meta.clone());

    let created = controller.create(&actor("admin"), &payload).await.unwrap();
    assert_eq!(created["content"], content);
    assert_eq!(created["meta"], meta);

    let by_id = controller
        .get_one(&actor("admin"), created["id"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(by_id["content"], content);
    assert_eq!(by_id["meta"], meta);
    assert_eq!(by_id, created);

    // Reads have no side effects; a second fetch answers identically.
    let again = controller
        .get_one(&actor("admin"), "home")
        .await
        .unwrap();
    assert_eq!(again, by_id);
}

#[tokio::test]
async fn malformed_store_response_is_a_contract_violation() {
    let controller = controller_with(Arc::new(BrokenStore) as Arc<dyn ResourceStore<Page>>);
    let err = controller.list(&actor("admin")).await.unwrap_err();
    assert!(matches!(err, CmsError::StorageContractViolation { .. }));
    assert_eq!(err.status_code().as_u16(), 500);
}
