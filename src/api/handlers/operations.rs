//! Operation handlers: create, list, pull, rebind, start, rotate, stop.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    CreateOperationRequest, OperationListResponse, RosterRequest, RosterResponse, StartRequest,
};
use crate::app_state::AppState;
use crate::domain::{EventPoint, OperationId};
use crate::error::{ErrorResponse, TrackerError};
use crate::service::{OperationSnapshot, OperationSummary};

const MAX_NAME_LEN: usize = 100;

/// `POST /operations`: Create a live Operation.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] for an empty or overlong name.
#[utoipa::path(
    post,
    path = "/api/v1/operations",
    tag = "Operations",
    summary = "Create a live Operation",
    description = "Creates a pending Operation with an empty roster. Signups are bound with the roster endpoint and tracking begins with start.",
    request_body = CreateOperationRequest,
    responses(
        (status = 201, description = "Operation created", body = OperationSummary),
        (status = 400, description = "Invalid name", body = ErrorResponse),
    )
)]
pub async fn create_operation(
    State(state): State<AppState>,
    Json(req): Json<CreateOperationRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(TrackerError::InvalidRequest(format!(
            "name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    let summary = state.operations.create(name.to_string(), req.manager).await;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// `GET /operations`: List live Operations.
#[utoipa::path(
    get,
    path = "/api/v1/operations",
    tag = "Operations",
    summary = "List live Operations",
    responses(
        (status = 200, description = "Operation list", body = OperationListResponse),
    )
)]
pub async fn list_operations(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.operations.list().await;
    Json(OperationListResponse {
        total: data.len(),
        data,
    })
}

/// `GET /operations/{id}`: Pull an Operation snapshot.
///
/// # Errors
///
/// Returns [`TrackerError::OperationNotFound`] if the Operation does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/operations/{id}",
    tag = "Operations",
    summary = "Get Operation snapshot",
    description = "Participants with their sessions, current and closed event points, the facility feed and the last captured/defended facilities.",
    params(
        ("id" = uuid::Uuid, Path, description = "Operation UUID"),
    ),
    responses(
        (status = 200, description = "Operation snapshot", body = OperationSnapshot),
        (status = 404, description = "Operation not found", body = ErrorResponse),
    )
)]
pub async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, TrackerError> {
    let snapshot = state
        .operations
        .snapshot(OperationId::from_uuid(id))
        .await?;
    Ok(Json(snapshot))
}

/// `PUT /operations/{id}/roster`: Rebind the roster.
///
/// # Errors
///
/// Returns [`TrackerError::OperationNotFound`] or
/// [`TrackerError::OperationStopped`].
#[utoipa::path(
    put,
    path = "/api/v1/operations/{id}/roster",
    tag = "Operations",
    summary = "Rebind roster",
    description = "Replaces the roster and the presence subscriptions. An empty roster, or one without bound characters, leaves no subscriptions.",
    params(
        ("id" = uuid::Uuid, Path, description = "Operation UUID"),
    ),
    request_body = RosterRequest,
    responses(
        (status = 200, description = "Roster rebound", body = RosterResponse),
        (status = 404, description = "Operation not found", body = ErrorResponse),
        (status = 409, description = "Operation stopped", body = ErrorResponse),
    )
)]
pub async fn rebind_roster(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RosterRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let operation_id = OperationId::from_uuid(id);
    let participants = req.participants.len();
    let watched_characters = state
        .operations
        .rebind(operation_id, req.participants)
        .await?;
    Ok(Json(RosterResponse {
        operation_id,
        participants,
        watched_characters,
    }))
}

/// `POST /operations/{id}/start`: Start tracking.
///
/// The body is optional; when present its roster replaces the current one
/// first.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] for a malformed body,
/// [`TrackerError::EmptyRoster`] when nobody signed up, and
/// [`TrackerError::OperationNotFound`] or [`TrackerError::OperationStopped`].
#[utoipa::path(
    post,
    path = "/api/v1/operations/{id}/start",
    tag = "Operations",
    summary = "Start Operation",
    params(
        ("id" = uuid::Uuid, Path, description = "Operation UUID"),
    ),
    request_body(content = StartRequest, description = "Optional finalized roster"),
    responses(
        (status = 200, description = "Tracking started", body = OperationSnapshot),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 404, description = "Operation not found", body = ErrorResponse),
        (status = 409, description = "Empty roster or operation stopped", body = ErrorResponse),
    )
)]
pub async fn start_operation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, TrackerError> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice::<StartRequest>(&body)
            .map_err(|e| TrackerError::InvalidRequest(e.to_string()))?
    };
    let snapshot = state
        .operations
        .start(OperationId::from_uuid(id), req.participants)
        .await?;
    Ok(Json(snapshot))
}

/// `POST /operations/{id}/event-points`: Rotate the event point.
///
/// # Errors
///
/// Returns [`TrackerError::OperationNotFound`],
/// [`TrackerError::OperationNotStarted`] or [`TrackerError::OperationStopped`].
#[utoipa::path(
    post,
    path = "/api/v1/operations/{id}/event-points",
    tag = "Operations",
    summary = "New event point",
    description = "Closes the current event point and opens a new one counting the participants currently online.",
    params(
        ("id" = uuid::Uuid, Path, description = "Operation UUID"),
    ),
    responses(
        (status = 201, description = "New current event point", body = EventPoint),
        (status = 404, description = "Operation not found", body = ErrorResponse),
        (status = 409, description = "Operation not running", body = ErrorResponse),
    )
)]
pub async fn new_event_point(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, TrackerError> {
    let point = state
        .operations
        .new_event_point(OperationId::from_uuid(id))
        .await?;
    Ok((StatusCode::CREATED, Json(point)))
}

/// `POST /operations/{id}/stop`: Stop and retire an Operation.
///
/// # Errors
///
/// Returns [`TrackerError::OperationNotFound`] if the Operation does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/operations/{id}/stop",
    tag = "Operations",
    summary = "Stop Operation",
    description = "Releases every subscription, returns the final snapshot and removes the Operation.",
    params(
        ("id" = uuid::Uuid, Path, description = "Operation UUID"),
    ),
    responses(
        (status = 200, description = "Final snapshot", body = OperationSnapshot),
        (status = 404, description = "Operation not found", body = ErrorResponse),
    )
)]
pub async fn stop_operation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, TrackerError> {
    let snapshot = state.operations.stop(OperationId::from_uuid(id)).await?;
    Ok(Json(snapshot))
}

/// Operation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/operations", post(create_operation).get(list_operations))
        .route("/operations/{id}", get(get_operation))
        .route("/operations/{id}/roster", put(rebind_roster))
        .route("/operations/{id}/start", post(start_operation))
        .route("/operations/{id}/event-points", post(new_event_point))
        .route("/operations/{id}/stop", post(stop_operation))
}
