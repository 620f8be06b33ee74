//! Operation-related DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OperationId, RosterEntry, UserHandle};
use crate::service::OperationSummary;

/// Request body for `POST /operations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOperationRequest {
    /// Operation name (1-100 chars).
    pub name: String,
    /// Managing user.
    #[serde(default)]
    pub manager: Option<UserHandle>,
}

/// Request body for `PUT /operations/{id}/roster`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterRequest {
    /// Signups, in order.
    pub participants: Vec<RosterEntry>,
}

/// Optional request body for `POST /operations/{id}/start`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartRequest {
    /// Finalized roster; the current roster is used when absent.
    #[serde(default)]
    pub participants: Option<Vec<RosterEntry>>,
}

/// Response body for `PUT /operations/{id}/roster`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    /// Operation identifier.
    pub operation_id: OperationId,
    /// Roster size.
    pub participants: usize,
    /// Characters the presence subscriptions now watch.
    pub watched_characters: usize,
}

/// Response body for `GET /operations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OperationListResponse {
    /// Operation summaries, oldest first.
    pub data: Vec<OperationSummary>,
    /// Number of live Operations.
    pub total: usize,
}
