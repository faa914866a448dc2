use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{
    CreateRouteRequest, FolderShare, FolderSharesResponse, MessageResponse, PageResponse,
    PaginationMeta, RouteResponse, RouteSummary, ShareEntry, ShareFolderRequest,
    ShareFolderResponse, UnshareFolderRequest, UnshareFolderResponse, UpdateProfileRequest,
    UpdateRouteRequest, User,
};

/// OpenAPI documentation
///
/// Dynamic resolution is served by the router fallback and is not listed here;
/// its page body is published as the `PageResponse` schema.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-spanner-mock API",
        version = "1.0.0",
        description = "Mock API server: stored JSON routes with pagination and fault simulation, backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::health::ping_handler,
        handlers::crud::list_routes_handler,
        handlers::crud::routes_summary_handler,
        handlers::crud::get_route_handler,
        handlers::crud::create_route_handler,
        handlers::crud::update_route_handler,
        handlers::crud::delete_route_handler,
        handlers::folders::folder_shares_handler,
        handlers::folders::share_folder_handler,
        handlers::folders::unshare_folder_handler,
        handlers::users::update_profile_handler,
        handlers::users::search_users_handler
    ),
    components(
        schemas(
            CreateRouteRequest,
            UpdateRouteRequest,
            RouteResponse,
            RouteSummary,
            ShareEntry,
            MessageResponse,
            ShareFolderRequest,
            ShareFolderResponse,
            UnshareFolderRequest,
            UnshareFolderResponse,
            FolderShare,
            FolderSharesResponse,
            UpdateProfileRequest,
            User,
            PageResponse,
            PaginationMeta,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "routes", description = "Mock route management"),
        (name = "folders", description = "Folder sharing"),
        (name = "users", description = "User directory")
    )
)]
pub struct ApiDoc;
