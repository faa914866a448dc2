//! In-memory storage backend
//!
//! Fast but non-persistent: everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewRoute, RouteStore, StoreError, StoreResult, UserDirectory};
use crate::models::{Route, User};
use crate::sharing::path_in_folder;

/// Routes kept in insertion order, which breaks `created_at` ties
#[derive(Clone, Default)]
pub struct MemoryRouteStore {
    routes: Arc<RwLock<Vec<Route>>>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }
}

fn sorted_by_path(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| a.path.cmp(&b.path).then(a.created_at.cmp(&b.created_at)));
    routes
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Route>> {
        let routes = self.routes.read().await;
        Ok(routes
            .iter()
            .filter(|route| route.path == path)
            .min_by_key(|route| route.created_at)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>> {
        let routes = self.routes.read().await;
        Ok(routes.iter().find(|route| route.id == id).cloned())
    }

    async fn find_owned_by_path(&self, path: &str, owner_id: Uuid) -> StoreResult<Option<Route>> {
        let routes = self.routes.read().await;
        Ok(routes
            .iter()
            .find(|route| route.owner_id == owner_id && route.path == path)
            .cloned())
    }

    async fn find_by_prefix(&self, folder: &str, owner_id: Uuid) -> StoreResult<Vec<Route>> {
        let routes = self.routes.read().await;
        Ok(sorted_by_path(
            routes
                .iter()
                .filter(|route| route.owner_id == owner_id && path_in_folder(folder, &route.path))
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_owner_or_shared_with(&self, user_id: Uuid) -> StoreResult<Vec<Route>> {
        let routes = self.routes.read().await;
        Ok(sorted_by_path(
            routes
                .iter()
                .filter(|route| route.is_visible_to(user_id))
                .cloned()
                .collect(),
        ))
    }

    async fn insert(&self, route: NewRoute) -> StoreResult<Route> {
        let mut routes = self.routes.write().await;
        if routes
            .iter()
            .any(|existing| existing.owner_id == route.owner_id && existing.path == route.path)
        {
            return Err(StoreError::DuplicatePath { path: route.path });
        }

        let now = Utc::now();
        let stored = Route {
            id: Uuid::new_v4(),
            path: route.path,
            response: route.response,
            owner_id: route.owner_id,
            name: route.name,
            description: route.description,
            shared_with: route.shared_with,
            created_at: now,
            updated_at: now,
        };
        routes.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, route: &Route) -> StoreResult<Option<Route>> {
        let mut routes = self.routes.write().await;
        if routes.iter().any(|existing| {
            existing.id != route.id && existing.owner_id == route.owner_id && existing.path == route.path
        }) {
            return Err(StoreError::DuplicatePath {
                path: route.path.clone(),
            });
        }

        let Some(existing) = routes
            .iter_mut()
            .find(|existing| existing.id == route.id && existing.owner_id == route.owner_id)
        else {
            return Ok(None);
        };

        existing.path = route.path.clone();
        existing.response = route.response.clone();
        existing.name = route.name.clone();
        existing.description = route.description.clone();
        existing.shared_with = route.shared_with.clone();
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let mut routes = self.routes.write().await;
        let before = routes.len();
        routes.retain(|route| !(route.id == id && route.owner_id == owner_id));
        Ok(routes.len() != before)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// User profiles keyed by id
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|other| other.id != user.id && other.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail { email: user.email });
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn search_by_name_or_email(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<User>> {
        let needle = query.to_lowercase();
        let users = self.users.read().await;
        let mut matches: Vec<User> = users
            .values()
            .filter(|user| user.id != exclude_user_id)
            .filter(|user| {
                user.name.to_lowercase().contains(&needle) || user.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.email.cmp(&b.email)));
        matches.truncate(limit);
        Ok(matches)
    }
}
