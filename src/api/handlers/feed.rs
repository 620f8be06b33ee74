//! Feed ingress: the upstream streaming client pushes raw messages here.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{FeedPushResponse, FeedSubscriptionResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, TrackerError};
use crate::feed::wire;

/// `POST /feed`: Push one raw streaming message.
///
/// # Errors
///
/// Returns [`TrackerError::Wire`] if the message cannot be decoded.
#[utoipa::path(
    post,
    path = "/api/v1/feed",
    tag = "Feed",
    summary = "Push a raw feed message",
    description = "Decodes one Census streaming message and publishes it to every matching trigger. Heartbeats and unsupported events are accepted and dropped.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 202, description = "Message processed", body = FeedPushResponse),
        (status = 400, description = "Malformed message", body = ErrorResponse),
    )
)]
pub async fn push_message(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, TrackerError> {
    let response = match wire::decode_message(&body)? {
        Some(event) => {
            let event_name = event.kind().event_name().to_string();
            let receivers = state.feed.publish(event);
            tracing::trace!(%event_name, receivers, "feed event published");
            FeedPushResponse {
                accepted: true,
                event_name: Some(event_name),
                receivers,
            }
        }
        None => FeedPushResponse {
            accepted: false,
            event_name: None,
            receivers: 0,
        },
    };
    Ok((axum::http::StatusCode::ACCEPTED, Json(response)))
}

/// `GET /feed/subscription`: What the upstream must subscribe to.
#[utoipa::path(
    get,
    path = "/api/v1/feed/subscription",
    tag = "Feed",
    summary = "Upstream subscription",
    description = "Union of every active trigger's filter.",
    responses(
        (status = 200, description = "Current subscription", body = FeedSubscriptionResponse),
    )
)]
pub async fn upstream_subscription(State(state): State<AppState>) -> impl IntoResponse {
    Json(FeedSubscriptionResponse {
        triggers: state.feed.trigger_count(),
        upstream: state.feed.upstream_subscription(),
    })
}

/// Feed routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed", post(push_message))
        .route("/feed/subscription", get(upstream_subscription))
}
