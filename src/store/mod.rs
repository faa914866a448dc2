//! Storage backends for routes and the user directory

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::{Route, ShareEntry, User};

pub mod memory;

/// Errors surfaced by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A route with path '{path}' already exists for this user")]
    DuplicatePath { path: String },

    #[error("A user with email '{email}' already exists")]
    DuplicateEmail { email: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields of a route before the store assigns its id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoute {
    pub path: String,
    pub response: JsonValue,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub shared_with: Vec<ShareEntry>,
}

impl NewRoute {
    pub fn new(path: String, response: JsonValue, owner_id: Uuid) -> Self {
        Self {
            path,
            response,
            owner_id,
            name: None,
            description: None,
            shared_with: Vec::new(),
        }
    }
}

/// Document store holding every user's routes.
///
/// `path` is unique per owner; the same path may exist under several owners.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Route with exactly this path across all owners, earliest-created first
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Route>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>>;

    async fn find_owned_by_path(&self, path: &str, owner_id: Uuid) -> StoreResult<Option<Route>>;

    /// Owner's routes inside `folder`, anchored at a `/` boundary, sorted by path
    async fn find_by_prefix(&self, folder: &str, owner_id: Uuid) -> StoreResult<Vec<Route>>;

    /// Routes owned by or shared with the user, sorted by path
    async fn find_by_owner_or_shared_with(&self, user_id: Uuid) -> StoreResult<Vec<Route>>;

    async fn insert(&self, route: NewRoute) -> StoreResult<Route>;

    /// Persist path, response, name, description and shares of an owned route.
    ///
    /// Returns `None` when no route with this id belongs to `route.owner_id`.
    async fn update(&self, route: &Route) -> StoreResult<Option<Route>>;

    /// Delete an owned route, returning whether it existed
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Directory of known users, consulted for folder sharing
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Insert or replace the profile; email stays unique across users
    async fn upsert(&self, user: User) -> StoreResult<User>;

    /// Case-insensitive substring match on name or email, sorted by name
    async fn search_by_name_or_email(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<User>>;
}
