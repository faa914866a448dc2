pub mod crud;
pub mod dynamic;
pub mod folders;
pub mod health;
pub mod users;

pub use crud::{
    create_route_handler, delete_route_handler, get_route_handler, list_routes_handler,
    routes_summary_handler, update_route_handler,
};
pub use dynamic::dynamic_handler;
pub use folders::{folder_shares_handler, share_folder_handler, unshare_folder_handler};
pub use health::{health_handler, ping_handler};
pub use users::{search_users_handler, update_profile_handler};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::app::build_router;
    use crate::auth::USER_ID_HEADER;
    use crate::config::{Config, StoreBackend};
    use crate::state::AppState;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use serde_json::Value as JsonValue;
    use tower::ServiceExt;
    use uuid::Uuid;

    pub const TEST_HOST: &str = "mock.test";

    pub fn test_config() -> Config {
        Config {
            backend: StoreBackend::Memory,
            spanner: None,
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
            fault_seed: Some(7),
        }
    }

    pub fn setup_test_app() -> (Router, AppState) {
        let state = AppState::in_memory(test_config());
        (build_router(state.clone()), state)
    }

    /// Send a request and decode the JSON body (`Null` when empty or not JSON)
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<Uuid>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", TEST_HOST);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        (status, json)
    }
}
