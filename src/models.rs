use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A stored mock route: a path mapped to a canned JSON response
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub path: String,
    pub response: JsonValue,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub shared_with: Vec<ShareEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn is_shared_with(&self, user_id: Uuid) -> bool {
        self.shared_with.iter().any(|share| share.user_id == user_id)
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.is_shared_with(user_id)
    }
}

/// Read-only access granted to another user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareEntry {
    pub user_id: Uuid,
    pub shared_by: Uuid,
    #[schema(value_type = String, format = DateTime)]
    pub shared_at: DateTime<Utc>,
}

/// Directory profile of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Request body for POST /routes
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRouteRequest {
    pub path: String,
    pub response: JsonValue,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Request body for PUT /routes/{id}; absent fields are left untouched
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRouteRequest {
    pub path: Option<String>,
    pub response: Option<JsonValue>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Full route representation returned by the CRUD endpoints
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub id: String,
    pub path: String,
    pub response: JsonValue,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub shared_with: Vec<ShareEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        RouteResponse {
            id: route.id.to_string(),
            path: route.path,
            response: route.response,
            owner_id: route.owner_id.to_string(),
            name: route.name,
            description: route.description,
            shared_with: route.shared_with,
            created_at: route.created_at.to_rfc3339(),
            updated_at: route.updated_at.to_rfc3339(),
        }
    }
}

/// Entry of GET /routes/summary, used to build the route tree
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: String,
    pub path: String,
    pub owner_id: String,
    pub owned: bool,
}

/// Generic message response
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters for GET /folders/shares
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct FolderQuery {
    pub folder_path: String,
}

/// Request body for POST /folders/share
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareFolderRequest {
    pub folder_path: String,
    pub user_email: String,
}

/// Request body for DELETE /folders/share
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnshareFolderRequest {
    pub folder_path: String,
    pub user_id: Uuid,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareFolderResponse {
    pub message: String,
    pub routes_shared: usize,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnshareFolderResponse {
    pub message: String,
    pub routes_updated: usize,
}

/// One user a folder is shared with, aggregated over the folder's routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderShare {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub route_count: usize,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderSharesResponse {
    pub folder_path: String,
    pub shared_with: Vec<FolderShare>,
}

/// Request body for PUT /users/me
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub name: String,
}

/// Query parameters for GET /users/search
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// Successful page of a paginated mock response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub id: String,
    pub data: Vec<JsonValue>,
    pub pagination: PaginationMeta,
    pub next_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub records: u64,
    pub index: u64,
    pub returned: usize,
    pub total: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_index: Option<u64>,
}
