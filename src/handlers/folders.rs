use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorResponse};
use crate::models::{
    FolderQuery, FolderSharesResponse, ShareFolderRequest, ShareFolderResponse,
    UnshareFolderRequest, UnshareFolderResponse,
};
use crate::routes;
use crate::sharing::{self, normalize_folder};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};

/// GET /folders/shares handler - Who a folder is shared with
#[utoipa::path(
    get,
    path = routes::FOLDER_SHARES,
    params(
        FolderQuery,
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Users the folder is shared with", body = FolderSharesResponse),
        (status = 400, description = "Invalid folder path", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse)
    ),
    tag = "folders"
)]
pub async fn folder_shares_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<FolderQuery>,
) -> Result<Json<FolderSharesResponse>, ApiError> {
    let folder_path = normalize_folder(&query.folder_path)?;
    let shared_with = sharing::folder_shares(
        state.routes.as_ref(),
        state.users.as_ref(),
        user_id,
        &folder_path,
    )
    .await?;

    Ok(Json(FolderSharesResponse {
        folder_path,
        shared_with,
    }))
}

/// POST /folders/share handler - Share every route in a folder with a user
#[utoipa::path(
    post,
    path = routes::FOLDER_SHARE,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    request_body = ShareFolderRequest,
    responses(
        (status = 200, description = "Folder shared", body = ShareFolderResponse),
        (status = 400, description = "Invalid folder path or self-share", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 404, description = "No user with this email", body = ErrorResponse)
    ),
    tag = "folders"
)]
pub async fn share_folder_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<ShareFolderRequest>,
) -> Result<Json<ShareFolderResponse>, ApiError> {
    let outcome = sharing::share_folder(
        state.routes.as_ref(),
        state.users.as_ref(),
        user_id,
        &request.folder_path,
        &request.user_email,
    )
    .await?;

    Ok(Json(ShareFolderResponse {
        message: format!("Folder shared with {}", outcome.user.email),
        routes_shared: outcome.routes_shared,
    }))
}

/// DELETE /folders/share handler - Revoke a user's access to a folder
#[utoipa::path(
    delete,
    path = routes::FOLDER_SHARE,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    request_body = UnshareFolderRequest,
    responses(
        (status = 200, description = "Share removed", body = UnshareFolderResponse),
        (status = 400, description = "Invalid folder path", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse)
    ),
    tag = "folders"
)]
pub async fn unshare_folder_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<UnshareFolderRequest>,
) -> Result<Json<UnshareFolderResponse>, ApiError> {
    let routes_updated = sharing::unshare_folder(
        state.routes.as_ref(),
        user_id,
        &request.folder_path,
        request.user_id,
    )
    .await?;

    Ok(Json(UnshareFolderResponse {
        message: "Folder share removed".to_string(),
        routes_updated,
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{send, setup_test_app};
    use crate::models::User;
    use crate::routes;
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    async fn register(app: &axum::Router, email: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let (status, _) = send(
            app,
            "PUT",
            routes::USERS_ME,
            Some(id),
            Some(json!({"email": email, "name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn create(app: &axum::Router, owner: Uuid, path: &str) -> serde_json::Value {
        let (status, body) = send(
            app,
            "POST",
            routes::ROUTES,
            Some(owner),
            Some(json!({"path": path, "response": {"path": path}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_share_list_and_unshare_folder() {
        let (app, _) = setup_test_app();
        let owner = register(&app, "owner@example.com", "Owner").await;
        let friend = register(&app, "friend@example.com", "Friend").await;

        create(&app, owner, "/api").await;
        create(&app, owner, "/api/users").await;
        create(&app, owner, "/apis").await;

        let (status, body) = send(
            &app,
            "POST",
            routes::FOLDER_SHARE,
            Some(owner),
            Some(json!({"folderPath": "/api/", "userEmail": "Friend@Example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["routesShared"], 2);
        assert!(body["message"].as_str().unwrap().contains("friend@example.com"));

        let (status, body) = send(
            &app,
            "GET",
            "/folders/shares?folderPath=/api",
            Some(owner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["folderPath"], "/api");
        assert_eq!(
            body["sharedWith"],
            json!([{
                "id": friend.to_string(),
                "name": "Friend",
                "email": "friend@example.com",
                "routeCount": 2
            }])
        );

        let (_, visible) = send(&app, "GET", routes::ROUTES_SUMMARY, Some(friend), None).await;
        let paths: Vec<&str> = visible
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/api", "/api/users"]);

        let (status, body) = send(
            &app,
            "DELETE",
            routes::FOLDER_SHARE,
            Some(owner),
            Some(json!({"folderPath": "/api", "userId": friend})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["routesUpdated"], 2);

        let (_, visible) = send(&app, "GET", routes::ROUTES, Some(friend), None).await;
        assert_eq!(visible, json!([]));
    }

    #[tokio::test]
    async fn test_new_route_inherits_folder_share() {
        let (app, _) = setup_test_app();
        let owner = register(&app, "owner@example.com", "Owner").await;
        let friend = register(&app, "friend@example.com", "Friend").await;

        create(&app, owner, "/a").await;
        create(&app, owner, "/a/b").await;
        send(
            &app,
            "POST",
            routes::FOLDER_SHARE,
            Some(owner),
            Some(json!({"folderPath": "/a/b", "userEmail": "friend@example.com"})),
        )
        .await;

        let route = create(&app, owner, "/a/b/c").await;
        let shared_with = route["sharedWith"].as_array().unwrap();
        assert_eq!(shared_with.len(), 1);
        assert_eq!(shared_with[0]["userId"], friend.to_string());
        assert_eq!(shared_with[0]["sharedBy"], owner.to_string());

        let (status, _) = send(
            &app,
            "GET",
            &format!("/routes/{}", route["id"].as_str().unwrap()),
            Some(friend),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_share_errors() {
        let (app, state) = setup_test_app();
        let owner = register(&app, "owner@example.com", "Owner").await;
        create(&app, owner, "/a").await;

        let (status, _) = send(
            &app,
            "POST",
            routes::FOLDER_SHARE,
            Some(owner),
            Some(json!({"folderPath": "/a", "userEmail": "nobody@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            routes::FOLDER_SHARE,
            Some(owner),
            Some(json!({"folderPath": "/a", "userEmail": "owner@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "GET",
            "/folders/shares?folderPath=a",
            Some(owner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored: Option<User> = state.users.find_by_id(owner).await.unwrap();
        assert_eq!(stored.map(|user| user.name), Some("Owner".to_string()));
    }
}
