use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{
    create_route_handler, delete_route_handler, dynamic_handler, folder_shares_handler,
    get_route_handler, health_handler, list_routes_handler, ping_handler, routes_summary_handler,
    search_users_handler, share_folder_handler, unshare_folder_handler, update_profile_handler,
    update_route_handler,
};
use crate::routes;
use crate::state::AppState;

/// Build the service router.
///
/// Administrative endpoints are matched first; every other path falls through
/// to dynamic resolution against the stored mock routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(routes::PING, get(ping_handler))
        .route(
            routes::ROUTES,
            get(list_routes_handler).post(create_route_handler),
        )
        .route(routes::ROUTES_SUMMARY, get(routes_summary_handler))
        .route(
            routes::ROUTE_ITEM,
            get(get_route_handler)
                .put(update_route_handler)
                .delete(delete_route_handler),
        )
        .route(routes::FOLDER_SHARES, get(folder_shares_handler))
        .route(
            routes::FOLDER_SHARE,
            post(share_folder_handler).delete(unshare_folder_handler),
        )
        .route(routes::USERS_ME, put(update_profile_handler))
        .route(routes::USERS_SEARCH, get(search_users_handler))
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .fallback(dynamic_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{send, setup_test_app};
    use crate::routes;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_openapi_document_lists_endpoints() {
        let (app, _) = setup_test_app();

        let (status, body) = send(&app, "GET", routes::OPENAPI_JSON, None, None).await;

        assert_eq!(status, StatusCode::OK);
        let paths = body["paths"].as_object().unwrap();
        for path in [
            routes::HEALTH,
            routes::ROUTES,
            routes::ROUTE_ITEM,
            routes::FOLDER_SHARE,
            routes::USERS_SEARCH,
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }
}
