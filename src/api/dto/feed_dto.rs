//! Feed push DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::feed::UpstreamSubscription;

/// Response body for `POST /feed`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeedPushResponse {
    /// Whether the message carried a consumable event.
    pub accepted: bool,
    /// Census event name, if accepted.
    pub event_name: Option<String>,
    /// Triggers the event was queued for.
    pub receivers: usize,
}

/// Response body for `GET /feed/subscription`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeedSubscriptionResponse {
    /// Registered triggers.
    pub triggers: usize,
    /// What the upstream connection must be subscribed to.
    pub upstream: UpstreamSubscription,
}
