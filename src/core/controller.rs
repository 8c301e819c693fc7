//! Resource controllers.
//!
//! One generic controller serves every resource kind. It owns the
//! request pipeline: authorization first, then payload validation,
//! then storage, with lifecycle hooks dispatched after successful
//! writes. Hooks run off the request path, so the response never
//! waits on a plugin. A request rejected by authorization or
//! validation never reaches the store.

use crate::core::auth::{AuthContext, PermissionRegistry};
use crate::core::error::{CmsError, CmsResult};
use crate::core::plugins::{Hook, HookArgs, PluginHandler};
use crate::core::resource::{Payload, Resource};
use crate::storage::{Lookup, ResourceStore, StoreError};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Translate adapter errors into the response taxonomy.
fn map_store_error(err: StoreError) -> CmsError {
    match err {
        StoreError::Duplicate(kind) => CmsError::Duplicate { kind },
        StoreError::ContractViolation(detail) => CmsError::StorageContractViolation { detail },
        StoreError::Engine(detail) => CmsError::UnexpectedStorage { detail },
    }
}

/// Resolve a path selector: anything that parses as a UUID addresses
/// by id, everything else is treated as a slug.
fn selector_lookup(selector: &str) -> Lookup {
    match Uuid::parse_str(selector) {
        Ok(id) => Lookup::Id(id),
        Err(_) => Lookup::Slug(selector.to_string()),
    }
}

/// Request pipeline for one resource kind, generic over the storage
/// engine behind it.
pub struct ResourceController<T: Resource> {
    store: Arc<dyn ResourceStore<T>>,
    permissions: Arc<PermissionRegistry>,
    plugins: Arc<PluginHandler>,
}

impl<T: Resource> Clone for ResourceController<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permissions: Arc::clone(&self.permissions),
            plugins: Arc::clone(&self.plugins),
        }
    }
}

impl<T: Resource> ResourceController<T> {
    pub fn new(
        store: Arc<dyn ResourceStore<T>>,
        permissions: Arc<PermissionRegistry>,
        plugins: Arc<PluginHandler>,
    ) -> Self {
        Self {
            store,
            permissions,
            plugins,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore<T>> {
        &self.store
    }

    /// Reads on some kinds are not public; for those, an actor without
    /// the view capability is turned away before storage is touched.
    fn check_read(&self, auth: &AuthContext) -> CmsResult<()> {
        if T::requires_view_to_read() && !auth.can_view(&self.permissions) {
            return Err(CmsError::AccessDenied);
        }
        Ok(())
    }

    fn check_write(&self, auth: &AuthContext) -> CmsResult<()> {
        if !auth.can_edit(&self.permissions) {
            return Err(CmsError::AccessDenied);
        }
        Ok(())
    }

    /// List every record the actor may see, newest first.
    ///
    /// Actors without the edit capability get the narrowed view: only
    /// publicly visible records.
    pub async fn list(&self, auth: &AuthContext) -> CmsResult<Vec<Value>> {
        self.check_read(auth)?;

        let records = self.store.find_many().await.map_err(map_store_error)?;
        let narrowed = !auth.can_edit(&self.permissions);

        Ok(records
            .into_iter()
            .filter(|r| !narrowed || r.is_publicly_visible())
            .map(|r| r.public_json())
            .collect())
    }

    /// Fetch one record by UUID or slug.
    ///
    /// A record hidden from the actor answers exactly like a missing
    /// one, so existence never leaks through the narrowed view.
    pub async fn get_one(&self, auth: &AuthContext, selector: &str) -> CmsResult<Value> {
        self.check_read(auth)?;

        let record = self
            .store
            .find_one(&selector_lookup(selector))
            .await
            .map_err(map_store_error)?
            .ok_or(CmsError::NotFound { kind: T::kind() })?;

        if !auth.can_edit(&self.permissions) && !record.is_publicly_visible() {
            return Err(CmsError::NotFound { kind: T::kind() });
        }

        Ok(record.public_json())
    }

    /// Validate and store a new record.
    pub async fn create(&self, auth: &AuthContext, payload: &Payload) -> CmsResult<Value> {
        self.check_write(auth)?;
        T::validate_create(payload)?;

        let record = T::from_payload(payload, Utc::now())?;
        let stored = self.store.insert(record).await.map_err(map_store_error)?;

        let json = stored.public_json();
        self.plugins
            .dispatch_lifecycle_hook(Hook::AfterCreate, HookArgs::for_record(T::kind(), json.clone()));

        Ok(json)
    }

    /// Apply a sparse patch to an existing record. Only the fields
    /// present in the payload change; everything else keeps its stored
    /// value.
    pub async fn update(&self, auth: &AuthContext, selector: &str, payload: &Payload) -> CmsResult<Value> {
        self.check_write(auth)?;
        T::validate_patch(payload)?;

        let mut record = self
            .store
            .find_one(&selector_lookup(selector))
            .await
            .map_err(map_store_error)?
            .ok_or(CmsError::NotFound { kind: T::kind() })?;

        let id = record.id();
        record.apply_patch(payload, Utc::now())?;

        let affected = self
            .store
            .update(&id, record.clone())
            .await
            .map_err(map_store_error)?;
        if affected == 0 {
            return Err(CmsError::NotModified);
        }

        let json = record.public_json();
        self.plugins
            .dispatch_lifecycle_hook(Hook::AfterUpdate, HookArgs::for_record(T::kind(), json.clone()));

        Ok(json)
    }

    /// Remove an existing record.
    pub async fn delete(&self, auth: &AuthContext, selector: &str) -> CmsResult<Value> {
        self.check_write(auth)?;

        let record = self
            .store
            .find_one(&selector_lookup(selector))
            .await
            .map_err(map_store_error)?
            .ok_or(CmsError::NotFound { kind: T::kind() })?;

        let affected = self
            .store
            .delete(&record.id())
            .await
            .map_err(map_store_error)?;
        if affected == 0 {
            return Err(CmsError::NotDeleted);
        }

        let json = record.public_json();
        self.plugins
            .dispatch_lifecycle_hook(Hook::AfterDelete, HookArgs::for_record(T::kind(), json.clone()));

        Ok(json)
    }
}
