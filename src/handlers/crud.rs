use crate::auth::AuthUser;
use crate::engine::pattern::classify;
use crate::error::{ApiError, ErrorResponse};
use crate::models::{
    CreateRouteRequest, MessageResponse, RouteResponse, RouteSummary, UpdateRouteRequest,
};
use crate::routes;
use crate::sharing::{inherited_shares, path_in_folder};
use crate::state::AppState;
use crate::store::NewRoute;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// Check that `path` can be registered as a mock route
fn validate_route_path(path: &str) -> Result<(), ApiError> {
    if !path.starts_with('/') {
        return Err(ApiError::InvalidRequest(
            "Route path must start with '/'".to_string(),
        ));
    }
    if path.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return Err(ApiError::InvalidRequest(
            "Route path must not contain whitespace, '?' or '#'".to_string(),
        ));
    }
    if let Some(prefix) = routes::RESERVED_PREFIXES
        .iter()
        .find(|prefix| path_in_folder(prefix, path))
    {
        return Err(ApiError::InvalidRequest(format!(
            "Route path must not live under the reserved prefix {}",
            prefix
        )));
    }
    if routes::RESERVED_PATHS.contains(&path) {
        return Err(ApiError::InvalidRequest(format!(
            "Route path {} is an administrative endpoint",
            path
        )));
    }
    match classify(path) {
        Ok(pattern) if pattern.is_plain() => Ok(()),
        _ => Err(ApiError::InvalidRequest(
            "Route path must not end with a pagination suffix".to_string(),
        )),
    }
}

/// Trimmed text, `None` when blank
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_route_id(id_str: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id_str)
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid route id: {}", id_str)))
}

fn route_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Route not found: {}", id))
}

/// GET /routes handler - Routes owned by or shared with the caller
#[utoipa::path(
    get,
    path = routes::ROUTES,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Visible routes sorted by path", body = Vec<RouteResponse>),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RouteResponse>>, ApiError> {
    let routes = state.routes.find_by_owner_or_shared_with(user_id).await?;

    tracing::debug!("Listing {} routes visible to {}", routes.len(), user_id);
    Ok(Json(routes.into_iter().map(RouteResponse::from).collect()))
}

/// GET /routes/summary handler - Lightweight listing for building the route tree
#[utoipa::path(
    get,
    path = routes::ROUTES_SUMMARY,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Visible routes sorted by path", body = Vec<RouteSummary>),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn routes_summary_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RouteSummary>>, ApiError> {
    let routes = state.routes.find_by_owner_or_shared_with(user_id).await?;

    let summary = routes
        .into_iter()
        .map(|route| RouteSummary {
            id: route.id.to_string(),
            owned: route.owner_id == user_id,
            owner_id: route.owner_id.to_string(),
            path: route.path,
        })
        .collect();
    Ok(Json(summary))
}

/// GET /routes/{id} handler - A single route the caller owns or can see
#[utoipa::path(
    get,
    path = routes::ROUTE_ITEM,
    params(
        ("id" = String, Path, description = "Route id"),
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Route found", body = RouteResponse),
        (status = 400, description = "Invalid route id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 404, description = "Route not found or not visible", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id_str): Path<String>,
) -> Result<Json<RouteResponse>, ApiError> {
    let id = parse_route_id(&id_str)?;

    match state.routes.find_by_id(id).await? {
        Some(route) if route.is_visible_to(user_id) => Ok(Json(route.into())),
        _ => Err(route_not_found(id)),
    }
}

/// POST /routes handler - Register a mock route
///
/// The new route inherits the shares of the caller's routes at its ancestor paths.
#[utoipa::path(
    post,
    path = routes::ROUTES,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    request_body = CreateRouteRequest,
    responses(
        (status = 201, description = "Route created", body = RouteResponse),
        (status = 400, description = "Invalid route path", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 409, description = "Caller already has a route at this path", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn create_route_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteResponse>), ApiError> {
    let path = request.path.trim().to_string();
    validate_route_path(&path)?;

    let mut new_route = NewRoute::new(path, request.response, user_id);
    new_route.name = optional_text(request.name);
    new_route.description = optional_text(request.description);
    new_route.shared_with = inherited_shares(state.routes.as_ref(), user_id, &new_route.path).await?;

    let route = state.routes.insert(new_route).await?;

    tracing::info!("Created route {} at {} for {}", route.id, route.path, user_id);
    Ok((StatusCode::CREATED, Json(route.into())))
}

/// PUT /routes/{id} handler - Partially update a route the caller owns
#[utoipa::path(
    put,
    path = routes::ROUTE_ITEM,
    params(
        ("id" = String, Path, description = "Route id"),
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    request_body = UpdateRouteRequest,
    responses(
        (status = 200, description = "Route updated", body = RouteResponse),
        (status = 400, description = "Invalid route id or path", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 404, description = "Route not found or not owned", body = ErrorResponse),
        (status = 409, description = "Caller already has a route at the new path", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn update_route_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id_str): Path<String>,
    Json(request): Json<UpdateRouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let id = parse_route_id(&id_str)?;

    let mut route = match state.routes.find_by_id(id).await? {
        Some(route) if route.owner_id == user_id => route,
        _ => return Err(route_not_found(id)),
    };

    if let Some(path) = request.path {
        let path = path.trim().to_string();
        validate_route_path(&path)?;
        route.path = path;
    }
    if let Some(response) = request.response {
        route.response = response;
    }
    if request.name.is_some() {
        route.name = optional_text(request.name);
    }
    if request.description.is_some() {
        route.description = optional_text(request.description);
    }

    let updated = state
        .routes
        .update(&route)
        .await?
        .ok_or_else(|| route_not_found(id))?;

    tracing::info!("Updated route {} ({})", updated.id, updated.path);
    Ok(Json(updated.into()))
}

/// DELETE /routes/{id} handler - Remove a route the caller owns
#[utoipa::path(
    delete,
    path = routes::ROUTE_ITEM,
    params(
        ("id" = String, Path, description = "Route id"),
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Route deleted", body = MessageResponse),
        (status = 400, description = "Invalid route id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 404, description = "Route not found or not owned", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn delete_route_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id_str): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_route_id(&id_str)?;

    if !state.routes.delete(id, user_id).await? {
        return Err(route_not_found(id));
    }

    tracing::info!("Deleted route {} for {}", id, user_id);
    Ok(Json(MessageResponse {
        message: "Route deleted".to_string(),
    }))
}
