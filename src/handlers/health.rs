use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /health handler - Health check endpoint
///
/// Asks the route store to prove it is reachable.
/// Returns 200 OK if it is, 503 Service Unavailable otherwise.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)> {
    match state.routes.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed ({})", state.routes.name());
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: format!("Cannot connect to database: {}", e),
                }),
            ))
        }
    }
}

/// GET /ping handler - Liveness probe that never touches storage
#[utoipa::path(
    get,
    path = routes::PING,
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn ping_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, setup_test_app};
    use crate::models::Route;
    use crate::store::memory::MemoryUserDirectory;
    use crate::store::{NewRoute, RouteStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Store whose every call fails, as an unreachable database would
    struct UnreachableStore;

    fn unreachable() -> StoreError {
        StoreError::Other(anyhow::anyhow!("connection refused"))
    }

    #[async_trait]
    impl RouteStore for UnreachableStore {
        async fn find_by_path(&self, _: &str) -> StoreResult<Option<Route>> {
            Err(unreachable())
        }
        async fn find_by_id(&self, _: Uuid) -> StoreResult<Option<Route>> {
            Err(unreachable())
        }
        async fn find_owned_by_path(&self, _: &str, _: Uuid) -> StoreResult<Option<Route>> {
            Err(unreachable())
        }
        async fn find_by_prefix(&self, _: &str, _: Uuid) -> StoreResult<Vec<Route>> {
            Err(unreachable())
        }
        async fn find_by_owner_or_shared_with(&self, _: Uuid) -> StoreResult<Vec<Route>> {
            Err(unreachable())
        }
        async fn insert(&self, _: NewRoute) -> StoreResult<Route> {
            Err(unreachable())
        }
        async fn update(&self, _: &Route) -> StoreResult<Option<Route>> {
            Err(unreachable())
        }
        async fn delete(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
            Err(unreachable())
        }
        async fn health_check(&self) -> StoreResult<()> {
            Err(unreachable())
        }
        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    fn unreachable_app() -> axum::Router {
        let state = AppState::new(
            Arc::new(UnreachableStore),
            Arc::new(MemoryUserDirectory::new()),
            crate::handlers::test_support::test_config(),
        );
        crate::app::build_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint_healthy() {
        let (app, _) = setup_test_app();

        let (status, body) = send(&app, "GET", routes::HEALTH, None, None).await;

        assert_eq!(status, StatusCode::OK);
        let response_json: HealthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response_json.status, "healthy");
    }

    #[tokio::test]
    async fn test_health_endpoint_unhealthy() {
        let app = unreachable_app();

        let (status, body) = send(&app, "GET", routes::HEALTH, None, None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let response_json: UnhealthyResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response_json.status, "unhealthy");
        assert!(response_json.error.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_on_dynamic_resolution() {
        let app = unreachable_app();

        let (status, body) = send(&app, "GET", "/items/page/3/0", None, None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorType"], "STORAGE_FAILURE");
    }

    #[tokio::test]
    async fn test_ping() {
        let (app, _) = setup_test_app();
        let (status, body) = send(&app, "GET", routes::PING, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
