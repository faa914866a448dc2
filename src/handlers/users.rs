use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorResponse};
use crate::models::{UpdateProfileRequest, User, UserSearchQuery};
use crate::routes;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};

const MIN_QUERY_CHARS: usize = 2;
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

/// PUT /users/me handler - Register or update the caller's directory profile
#[utoipa::path(
    put,
    path = routes::USERS_ME,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile stored", body = User),
        (status = 400, description = "Missing email or name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse),
        (status = 409, description = "Email already registered by another user", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_profile_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let email = request.email.trim().to_lowercase();
    let name = request.name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::InvalidRequest("A valid email is required".to_string()));
    }
    if name.is_empty() {
        return Err(ApiError::InvalidRequest("Name is required".to_string()));
    }

    let user = state
        .users
        .upsert(User {
            id: user_id,
            email,
            name,
        })
        .await?;

    tracing::info!("Stored profile for {}", user.id);
    Ok(Json(user))
}

/// GET /users/search handler - Find users to share folders with
#[utoipa::path(
    get,
    path = routes::USERS_SEARCH,
    params(
        UserSearchQuery,
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Matching users, caller excluded", body = Vec<User>),
        (status = 401, description = "Missing or invalid principal", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn search_users_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let needle = query.q.as_deref().map(str::trim).unwrap_or_default();
    if needle.chars().count() < MIN_QUERY_CHARS {
        return Ok(Json(Vec::new()));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let users = state
        .users
        .search_by_name_or_email(needle, user_id, limit)
        .await?;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, setup_test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    async fn register(app: &axum::Router, id: Uuid, email: &str, name: &str) -> StatusCode {
        send(
            app,
            "PUT",
            routes::USERS_ME,
            Some(id),
            Some(json!({"email": email, "name": name})),
        )
        .await
        .0
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (app, _) = setup_test_app();
        let id = Uuid::new_v4();

        let (status, body) = send(
            &app,
            "PUT",
            routes::USERS_ME,
            Some(id),
            Some(json!({"email": " Alice@Example.com ", "name": " Alice "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"id": id.to_string(), "email": "alice@example.com", "name": "Alice"})
        );

        assert_eq!(register(&app, id, "alice@example.com", "Alice B").await, StatusCode::OK);
        assert_eq!(
            register(&app, Uuid::new_v4(), "alice@example.com", "Other").await,
            StatusCode::CONFLICT
        );
        assert_eq!(register(&app, id, "", "Alice").await, StatusCode::BAD_REQUEST);
        assert_eq!(register(&app, id, "alice@example.com", "  ").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_users() {
        let (app, _) = setup_test_app();
        let me = Uuid::new_v4();
        register(&app, me, "ann@example.com", "Ann").await;
        for i in 0..12 {
            register(&app, Uuid::new_v4(), &format!("user{:02}@example.com", i), &format!("User {:02}", i)).await;
        }

        let (status, body) = send(&app, "GET", "/users/search?q=a", Some(me), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (_, body) = send(&app, "GET", "/users/search", Some(me), None).await;
        assert_eq!(body, json!([]));

        let (_, body) = send(&app, "GET", "/users/search?q=example", Some(me), None).await;
        let found = body.as_array().unwrap();
        assert_eq!(found.len(), DEFAULT_SEARCH_LIMIT);
        assert!(found.iter().all(|user| user["id"] != me.to_string()));
        assert_eq!(found[0]["name"], "User 00");

        let (_, body) = send(&app, "GET", "/users/search?q=user%200&limit=3", Some(me), None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = send(&app, "GET", "/users/search?q=ANN", Some(Uuid::new_v4()), None).await;
        assert_eq!(body[0]["email"], "ann@example.com");
    }
}
