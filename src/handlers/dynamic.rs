use crate::engine::{resolve, Resolution, ResolveError};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
    Json,
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// First comma-separated value of a header, if present and non-empty
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Scheme and authority the client used, honouring reverse-proxy headers
fn request_origin(headers: &HeaderMap, fallback: String) -> String {
    let host = first_header_value(headers, FORWARDED_HOST)
        .or_else(|| first_header_value(headers, "host"));
    match host {
        Some(host) => {
            let scheme = first_header_value(headers, FORWARDED_PROTO).unwrap_or("http");
            format!("{}://{}", scheme, host)
        }
        None => fallback,
    }
}

/// Fallback handler - Serve any unclaimed path from the stored mock routes
///
/// Public: no principal is required. Paths ending in `/page/{records}/{index}` or
/// `/perror/{records}/{index}/{errorIndex}` are paginated over the stored array.
pub async fn dynamic_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let origin = request_origin(&headers, state.config.default_origin());

    match resolve(state.routes.as_ref(), &state.faults, uri.path(), &origin).await {
        Ok(Resolution::Plain(value)) => Ok(Json(value).into_response()),
        Ok(Resolution::Page(page)) => Ok(Json(page).into_response()),
        Err(ResolveError::Simulated(fault)) => {
            tracing::warn!(
                "Simulated {} on {} (records {}, index {}, error index {})",
                fault.kind.error_type(),
                uri.path(),
                fault.records,
                fault.index,
                fault.error_index
            );
            Err(ResolveError::Simulated(fault).into())
        }
        Err(err) => {
            tracing::debug!("Dynamic resolution of {} failed: {}", uri.path(), err);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, setup_test_app, TEST_HOST};
    use crate::routes;
    use axum::http::{HeaderValue, StatusCode};
    use serde_json::{json, Value as JsonValue};
    use uuid::Uuid;

    async fn store_items(app: &axum::Router) {
        let (status, _) = send(
            app,
            "POST",
            routes::ROUTES,
            Some(Uuid::new_v4()),
            Some(json!({"path": "/items", "response": (0..10).collect::<Vec<u32>>()})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    fn path_of(url: &JsonValue) -> String {
        let url = url.as_str().unwrap();
        url.strip_prefix(&format!("http://{}", TEST_HOST))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_request_origin() {
        let fallback = || "http://0.0.0.0:3000".to_string();
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers, fallback()), "http://0.0.0.0:3000");

        headers.insert("host", HeaderValue::from_static("localhost:8080"));
        assert_eq!(request_origin(&headers, fallback()), "http://localhost:8080");

        headers.insert(FORWARDED_HOST, HeaderValue::from_static("mock.example.com, proxy.internal"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https,http"));
        assert_eq!(request_origin(&headers, fallback()), "https://mock.example.com");
    }

    #[tokio::test]
    async fn test_plain_route_is_served_verbatim() {
        let (app, _) = setup_test_app();
        send(
            &app,
            "POST",
            routes::ROUTES,
            Some(Uuid::new_v4()),
            Some(json!({"path": "/api/user", "response": {"name": "Ada"}})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/api/user", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_first_page() {
        let (app, _) = setup_test_app();
        store_items(&app).await;

        let (status, body) = send(&app, "GET", "/items/page/3/0", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([0, 1, 2]));
        assert_eq!(
            body["pagination"],
            json!({"records": 3, "index": 0, "returned": 3, "total": 10, "hasMore": true})
        );
        assert_eq!(body["nextUrl"], format!("http://{}/items/page/3/3", TEST_HOST));
        assert!(body["id"].as_str().unwrap().parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn test_last_page_then_out_of_bounds() {
        let (app, _) = setup_test_app();
        store_items(&app).await;

        let (status, body) = send(&app, "GET", "/items/page/3/9", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([9]));
        assert_eq!(body["pagination"]["returned"], 1);
        assert_eq!(body["pagination"]["hasMore"], false);
        assert_eq!(body["nextUrl"], format!("http://{}/items/page/3/10", TEST_HOST));

        let (status, body) = send(&app, "GET", &path_of(&body["nextUrl"]), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "INDEX_OUT_OF_BOUNDS");
    }

    #[tokio::test]
    async fn test_error_threshold_always_fails() {
        let (app, _) = setup_test_app();
        store_items(&app).await;

        for _ in 0..100 {
            let (status, body) = send(&app, "GET", "/items/perror/3/5/8", None, None).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["errorType"], "PERROR_SIMULATION");
            assert_eq!(body["errorIndex"], 8);
        }
    }

    #[tokio::test]
    async fn test_error_form_success_body() {
        let (app, _) = setup_test_app();
        store_items(&app).await;

        let mut page = None;
        for _ in 0..50 {
            let (status, body) = send(&app, "GET", "/items/perror/2/0/9", None, None).await;
            if status == StatusCode::OK {
                page = Some(body);
                break;
            }
            assert_ne!(body["errorType"], "PERROR_SIMULATION");
            assert!(body["retryable"].is_boolean());
        }
        let body = page.expect("every sampled request failed");

        assert_eq!(body["data"], json!([0, 1]));
        assert_eq!(
            body["pagination"],
            json!({
                "records": 2,
                "index": 0,
                "returned": 2,
                "total": 10,
                "hasMore": true,
                "errorIndex": 9
            })
        );
        assert_eq!(body["nextUrl"], format!("http://{}/items/perror/2/2/9", TEST_HOST));
    }

    #[tokio::test]
    async fn test_mock_route_under_users_namespace() {
        let (app, _) = setup_test_app();
        let (status, _) = send(
            &app,
            "POST",
            routes::ROUTES,
            Some(Uuid::new_v4()),
            Some(json!({"path": "/users/42", "response": {"id": 42}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, "GET", "/users/42", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 42}));

        let (status, _) = send(
            &app,
            "POST",
            routes::ROUTES,
            Some(Uuid::new_v4()),
            Some(json!({"path": routes::USERS_ME, "response": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (app, _) = setup_test_app();

        let (status, body) = send(&app, "GET", "/unknown/path", None, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorType"], "ROUTE_NOT_FOUND");
        assert_eq!(body["path"], "/unknown/path");
    }

    #[tokio::test]
    async fn test_following_next_url_walks_the_whole_sequence() {
        let (app, _) = setup_test_app();
        store_items(&app).await;

        let mut collected = Vec::new();
        let mut path = "/items/page/4/0".to_string();
        loop {
            let (status, body) = send(&app, "GET", &path, None, None).await;
            assert_eq!(status, StatusCode::OK);
            collected.extend(body["data"].as_array().unwrap().iter().cloned());
            if body["pagination"]["hasMore"] == false {
                break;
            }
            path = path_of(&body["nextUrl"]);
        }
        assert_eq!(JsonValue::Array(collected), json!((0..10).collect::<Vec<u32>>()));
    }

    #[tokio::test]
    async fn test_pagination_errors() {
        let (app, _) = setup_test_app();
        store_items(&app).await;
        send(
            &app,
            "POST",
            routes::ROUTES,
            Some(Uuid::new_v4()),
            Some(json!({"path": "/object", "response": {"a": 1}})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/items/page/0/0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "INVALID_PAGINATION_PARAMETERS");

        let (status, body) = send(&app, "GET", "/object/page/2/0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "UNSUPPORTED_RESPONSE_TYPE");

        let (status, body) = send(&app, "GET", "/items/page/two/0", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["path"], "/items/page/two/0");
    }
}
