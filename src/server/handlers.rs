//! HTTP handlers.
//!
//! Thin wrappers around the controllers: each handler derives the
//! auth context from the headers exactly once, unwraps the request
//! envelope, and delegates. All domain decisions live in the
//! controllers; failures surface through `CmsError::into_response`.

use crate::core::auth::{AuthContext, Claims, PermissionRegistry, TokenKeys};
use crate::core::controller::ResourceController;
use crate::core::error::{CmsError, CmsResult};
use crate::core::plugins::{Hook, HookArgs, PluginHandler};
use crate::core::resource::{Payload, Resource};
use crate::resources::{BlogPost, Page, User, user};
use crate::storage::Lookup;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pages: ResourceController<Page>,
    pub blog_posts: ResourceController<BlogPost>,
    pub users: ResourceController<User>,
    pub permissions: Arc<PermissionRegistry>,
    pub plugins: Arc<PluginHandler>,
    pub keys: TokenKeys,
    pub token_ttl_secs: i64,
}

fn auth_from(headers: &HeaderMap, keys: &TokenKeys) -> AuthContext {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    AuthContext::derive(header, keys)
}

/// Pull the envelope object out of a request body, e.g. the `"page"`
/// in `{ "page": {...} }`.
fn envelope<'a>(body: &'a Value, key: &'static str) -> CmsResult<&'a Payload> {
    body.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| CmsError::validation(key, "Expected a JSON object"))
}

fn required_str<'a>(body: &'a Value, key: &'static str) -> CmsResult<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CmsError::validation(key, "This field is required"))
}

// ---------------------------------------------------------------------------
// Generic delegates
// ---------------------------------------------------------------------------

async fn list_kind<T: Resource>(
    controller: &ResourceController<T>,
    auth: &AuthContext,
) -> CmsResult<Json<Value>> {
    Ok(Json(Value::Array(controller.list(auth).await?)))
}

async fn get_kind<T: Resource>(
    controller: &ResourceController<T>,
    auth: &AuthContext,
    selector: &str,
) -> CmsResult<Json<Value>> {
    Ok(Json(controller.get_one(auth, selector).await?))
}

async fn create_kind<T: Resource>(
    controller: &ResourceController<T>,
    auth: &AuthContext,
    body: &Value,
    key: &'static str,
) -> CmsResult<Json<Value>> {
    Ok(Json(controller.create(auth, envelope(body, key)?).await?))
}

async fn update_kind<T: Resource>(
    controller: &ResourceController<T>,
    auth: &AuthContext,
    selector: &str,
    body: &Value,
    key: &'static str,
) -> CmsResult<Json<Value>> {
    Ok(Json(
        controller.update(auth, selector, envelope(body, key)?).await?,
    ))
}

async fn delete_kind<T: Resource>(
    controller: &ResourceController<T>,
    auth: &AuthContext,
    selector: &str,
) -> CmsResult<Json<Value>> {
    Ok(Json(controller.delete(auth, selector).await?))
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

pub async fn list_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    list_kind(&state.pages, &auth).await
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    get_kind(&state.pages, &auth, &selector).await
}

pub async fn create_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    create_kind(&state.pages, &auth, &body, "page").await
}

pub async fn update_page(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    update_kind(&state.pages, &auth, &selector, &body, "page").await
}

pub async fn delete_page(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    delete_kind(&state.pages, &auth, &selector).await
}

// ---------------------------------------------------------------------------
// Blog posts
// ---------------------------------------------------------------------------

pub async fn list_blog_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    list_kind(&state.blog_posts, &auth).await
}

pub async fn get_blog_post(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    get_kind(&state.blog_posts, &auth, &selector).await
}

pub async fn create_blog_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    create_kind(&state.blog_posts, &auth, &body, "blogPost").await
}

pub async fn update_blog_post(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    update_kind(&state.blog_posts, &auth, &selector, &body, "blogPost").await
}

pub async fn delete_blog_post(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    delete_kind(&state.blog_posts, &auth, &selector).await
}

// ---------------------------------------------------------------------------
// Users
//
// User mutations address records through the request body rather than
// the path, so updates and deletes parse an id out of the envelope.
// ---------------------------------------------------------------------------

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    list_kind(&state.users, &auth).await
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    get_kind(&state.users, &auth, &selector).await
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    create_kind(&state.users, &auth, &body, "newUser").await
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    let updated = envelope(&body, "updatedUser")?;
    let id = updated
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| CmsError::validation("id", "Expected a UUID"))?;
    let data = updated
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| CmsError::validation("data", "Expected a JSON object"))?;
    Ok(Json(
        state.users.update(&auth, &id.to_string(), data).await?,
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let auth = auth_from(&headers, &state.keys);
    let deleted = envelope(&body, "deletedUser")?;
    let id = deleted
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| CmsError::validation("id", "Expected a UUID"))?;
    Ok(Json(state.users.delete(&auth, &id.to_string()).await?))
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> CmsResult<Json<Value>> {
    let username = required_str(&body, "username")?;
    let password = required_str(&body, "password")?;

    state
        .plugins
        .dispatch_lifecycle_hook(Hook::BeforeLogin, HookArgs::for_login(username));

    let found = state
        .users
        .store()
        .find_one(&Lookup::Username(username.to_string()))
        .await
        .map_err(|e| CmsError::UnexpectedStorage {
            detail: e.to_string(),
        })?;

    let account = match found {
        Some(account) if user::verify_password(password, &account.password_digest) => account,
        _ => {
            state
                .plugins
                .dispatch_lifecycle_hook(Hook::LoginFailed, HookArgs::for_login(username));
            return Err(CmsError::BadCredentials);
        }
    };

    let claims = Claims::new(
        account.id,
        account.username.clone(),
        account.role.clone(),
        chrono::Duration::seconds(state.token_ttl_secs),
    );
    let token = state
        .keys
        .sign(&claims)
        .map_err(|e| CmsError::Internal(e.to_string()))?;

    state
        .plugins
        .dispatch_lifecycle_hook(Hook::LoginSucceeded, HookArgs::for_login(username));

    Ok(Json(json!({ "token": token })))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
