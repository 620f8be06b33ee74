//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; health and the
//! OpenAPI document live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "ops-commander",
        description = "Live PlanetSide 2 Operation tracking for community events."
    ),
    paths(
        handlers::system::health_handler,
        handlers::operations::create_operation,
        handlers::operations::list_operations,
        handlers::operations::get_operation,
        handlers::operations::rebind_roster,
        handlers::operations::start_operation,
        handlers::operations::new_event_point,
        handlers::operations::stop_operation,
        handlers::continents::oldest_lock,
        handlers::continents::sorted_locks,
        handlers::feed::push_message,
        handlers::feed::upstream_subscription,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::service::OperationSnapshot,
        crate::service::OperationSummary,
        crate::service::LockReport,
        dto::CreateOperationRequest,
        dto::RosterRequest,
        dto::StartRequest,
        dto::RosterResponse,
        dto::OperationListResponse,
        dto::FeedPushResponse,
        dto::FeedSubscriptionResponse,
    )),
    tags(
        (name = "System", description = "Health and documentation"),
        (name = "Operations", description = "Live Operation lifecycle and pull views"),
        (name = "Continents", description = "Continent lock reports"),
        (name = "Feed", description = "Event feed ingress"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::config::TrackerConfig;
    use crate::lookup::StaticLookup;

    fn app() -> Router {
        let state = AppState::new(&TrackerConfig::default(), Arc::new(StaticLookup::new()));
        build_router().with_state(state)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let Ok(request) = builder.body(body.map_or_else(Body::empty, Body::from)) else {
            panic!("valid request");
        };
        let Ok(response) = router.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn create(router: &Router, name: &str) -> String {
        let (status, body) = send(
            router,
            Method::POST,
            "/api/v1/operations",
            Some(json!({ "name": name }).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(id) = body["operation_id"].as_str() else {
            panic!("missing operation_id in {body}");
        };
        id.to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let router = app();
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn openapi_lists_operation_routes() {
        let router = app();
        let (status, body) = send(&router, Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/operations/{id}/start"].is_object());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let router = app();
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/operations",
            Some(json!({ "name": "   " }).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn unknown_operation_is_404() {
        let router = app();
        let uri = format!("/api/v1/operations/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn starting_empty_operation_conflicts() {
        let router = app();
        let id = create(&router, "Empty").await;
        let uri = format!("/api/v1/operations/{id}/start");
        let (status, body) = send(&router, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], 2002);
    }

    #[tokio::test]
    async fn operation_lifecycle_over_http() {
        let router = app();
        let id = create(&router, "Friday Op").await;

        let roster = json!({
            "participants": [
                { "user": { "id": 1, "display_name": "Medic" },
                  "character": { "id": 5428010618015189713u64, "name": "MedicChar" } },
                { "user": { "id": 2, "display_name": "Walker" } }
            ]
        });
        let (status, body) = send(
            &router,
            Method::PUT,
            &format!("/api/v1/operations/{id}/roster"),
            Some(roster.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["watched_characters"], 1);

        let (status, body) =
            send(&router, Method::POST, &format!("/api/v1/operations/{id}/start"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "running");
        assert_eq!(body["current_event_point"]["active_participants"], 2);

        let message = json!({
            "service": "event",
            "type": "serviceMessage",
            "payload": {
                "event_name": "GainExperience",
                "character_id": "5428010618015189713",
                "other_id": "1",
                "experience_id": "53",
                "amount": "75",
                "world_id": "1",
                "zone_id": "2",
                "timestamp": "1714594440"
            }
        });
        let (status, body) = send(&router, Method::POST, "/api/v1/feed", Some(message.to_string())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["accepted"], true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, body) =
            send(&router, Method::GET, &format!("/api/v1/operations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participants"][0]["session"]["revives"], 1);
        assert_eq!(body["participants"][0]["session"]["score"], 75);

        let (status, _) = send(
            &router,
            Method::POST,
            &format!("/api/v1/operations/{id}/event-points"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&router, Method::POST, &format!("/api/v1/operations/{id}/stop"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "stopped");
        assert_eq!(body["event_points"].as_array().map(Vec::len), Some(1));

        let (status, body) = send(&router, Method::GET, "/api/v1/feed/subscription", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggers"], 0);
    }

    #[tokio::test]
    async fn malformed_feed_message_is_400() {
        let router = app();
        let (status, body) =
            send(&router, Method::POST, "/api/v1/feed", Some("{oops".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1002);
    }

    #[tokio::test]
    async fn heartbeat_is_accepted_but_dropped() {
        let router = app();
        let heartbeat = json!({ "service": "event", "type": "heartbeat" }).to_string();
        let (status, body) = send(&router, Method::POST, "/api/v1/feed", Some(heartbeat)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["accepted"], false);
    }

    #[tokio::test]
    async fn lock_report_without_data() {
        let router = app();
        let (status, body) =
            send(&router, Method::GET, "/api/v1/continents/oldest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "No continent locks recorded yet.");
        assert!(body["broadcast_channel"].is_null());

        let (status, body) =
            send(&router, Method::GET, "/api/v1/continents/locks?broadcast=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["broadcast_channel"], "ps2-continents");
    }
}
