//! Folder sharing.
//!
//! A folder is a path prefix, not a stored entity. Sharing a folder adds the
//! target user to every route of the owner inside it; routes created later
//! inherit shares from their ancestors once, at creation time.
//!
//! Share and unshare update routes one at a time. A failure part way through
//! leaves the folder partially updated; both operations are set-membership
//! changes, so retrying converges.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{FolderShare, ShareEntry, User};
use crate::store::{RouteStore, StoreError, UserDirectory};

#[derive(Debug, thiserror::Error)]
pub enum SharingError {
    #[error("Invalid folder path: {0}")]
    InvalidFolder(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("You cannot share a folder with yourself")]
    SelfShare,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Normalise a folder path: leading `/` required, trailing `/` dropped except for the root
pub fn normalize_folder(raw: &str) -> Result<String, SharingError> {
    let folder = raw.trim();
    if !folder.starts_with('/') {
        return Err(SharingError::InvalidFolder(format!(
            "'{}' must start with '/'",
            raw
        )));
    }
    let trimmed = folder.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Whether `path` is the folder itself or lies below it on a `/` boundary
pub fn path_in_folder(folder: &str, path: &str) -> bool {
    if folder == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(folder) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every `/`-delimited prefix of `path`, shortest first, ending with `path` itself
pub fn ancestor_prefixes(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .map(|i| &path[..i])
        .chain(std::iter::once(path))
        .filter(|prefix| !prefix.is_empty())
        .collect()
}

/// Shares a new route at `path` inherits from the owner's routes at its ancestor prefixes.
///
/// Distinct users only; each entry is attributed to the new route's creator.
pub async fn inherited_shares(
    store: &dyn RouteStore,
    owner_id: Uuid,
    path: &str,
) -> Result<Vec<ShareEntry>, StoreError> {
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut shares = Vec::new();

    for prefix in ancestor_prefixes(path) {
        let Some(ancestor) = store.find_owned_by_path(prefix, owner_id).await? else {
            continue;
        };
        for share in &ancestor.shared_with {
            if share.user_id != owner_id && seen.insert(share.user_id) {
                shares.push(ShareEntry {
                    user_id: share.user_id,
                    shared_by: owner_id,
                    shared_at: now,
                });
            }
        }
    }

    if !shares.is_empty() {
        tracing::debug!("Route {} inherits {} share(s) from ancestor folders", path, shares.len());
    }
    Ok(shares)
}

/// Result of sharing a folder
#[derive(Debug)]
pub struct ShareOutcome {
    pub user: User,
    /// Routes in the folder now shared with the user
    pub routes_shared: usize,
    /// Routes that did not already carry the share
    pub routes_updated: usize,
}

/// Share every route the owner has inside `folder` with the user registered under `email`
pub async fn share_folder(
    store: &dyn RouteStore,
    users: &dyn UserDirectory,
    owner_id: Uuid,
    folder: &str,
    email: &str,
) -> Result<ShareOutcome, SharingError> {
    let folder = normalize_folder(folder)?;
    let user = users
        .find_by_email(email.trim())
        .await?
        .ok_or_else(|| SharingError::UserNotFound(email.trim().to_string()))?;
    if user.id == owner_id {
        return Err(SharingError::SelfShare);
    }

    let routes = store.find_by_prefix(&folder, owner_id).await?;
    let mut routes_updated = 0;
    for mut route in routes.iter().cloned() {
        if route.is_shared_with(user.id) {
            continue;
        }
        route.shared_with.push(ShareEntry {
            user_id: user.id,
            shared_by: owner_id,
            shared_at: Utc::now(),
        });
        if store.update(&route).await?.is_some() {
            routes_updated += 1;
        }
    }

    tracing::info!(
        "Shared folder {} of {} with {} ({} routes, {} updated)",
        folder,
        owner_id,
        user.id,
        routes.len(),
        routes_updated
    );

    Ok(ShareOutcome {
        user,
        routes_shared: routes.len(),
        routes_updated,
    })
}

/// Remove the user from every route the owner has inside `folder`, returning how many changed
pub async fn unshare_folder(
    store: &dyn RouteStore,
    owner_id: Uuid,
    folder: &str,
    user_id: Uuid,
) -> Result<usize, SharingError> {
    let folder = normalize_folder(folder)?;
    let routes = store.find_by_prefix(&folder, owner_id).await?;

    let mut routes_updated = 0;
    for mut route in routes {
        let before = route.shared_with.len();
        route.shared_with.retain(|share| share.user_id != user_id);
        if route.shared_with.len() != before && store.update(&route).await?.is_some() {
            routes_updated += 1;
        }
    }

    tracing::info!(
        "Removed {} from folder {} of {} ({} routes updated)",
        user_id,
        folder,
        owner_id,
        routes_updated
    );
    Ok(routes_updated)
}

/// Users the owner's routes inside `folder` are shared with, with per-user route counts
pub async fn folder_shares(
    store: &dyn RouteStore,
    users: &dyn UserDirectory,
    owner_id: Uuid,
    folder: &str,
) -> Result<Vec<FolderShare>, SharingError> {
    let folder = normalize_folder(folder)?;
    let routes = store.find_by_prefix(&folder, owner_id).await?;

    let mut counts: BTreeMap<Uuid, usize> = BTreeMap::new();
    for share in routes.iter().flat_map(|route| &route.shared_with) {
        *counts.entry(share.user_id).or_default() += 1;
    }

    let mut shares = Vec::with_capacity(counts.len());
    for (user_id, route_count) in counts {
        let user = users.find_by_id(user_id).await?;
        shares.push(FolderShare {
            id: user_id.to_string(),
            name: user.as_ref().map(|u| u.name.clone()),
            email: user.map(|u| u.email),
            route_count,
        });
    }
    shares.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(shares)
}
