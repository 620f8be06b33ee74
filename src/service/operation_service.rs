//! Registry of live Operations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::operation::{LiveOperation, OperationContext, OperationSnapshot, OperationSummary};
use crate::domain::{EventPoint, OperationId, RosterEntry, UserHandle};
use crate::error::TrackerError;

/// Creates, looks up and retires live Operations.
///
/// The outer map is only locked long enough to clone an `Arc`; every
/// Operation serializes its own work internally.
#[derive(Debug)]
pub struct OperationService {
    operations: RwLock<HashMap<OperationId, Arc<LiveOperation>>>,
    ctx: OperationContext,
}

impl OperationService {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(ctx: OperationContext) -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            ctx,
        }
    }

    /// Shared collaborators handed to every Operation.
    #[must_use]
    pub const fn context(&self) -> &OperationContext {
        &self.ctx
    }

    /// Creates a pending Operation.
    pub async fn create(&self, name: String, manager: Option<UserHandle>) -> OperationSummary {
        let id = OperationId::new();
        let operation = Arc::new(LiveOperation::new(id, name, manager, self.ctx.clone()));
        let summary = operation.summary().await;
        self.operations.write().await.insert(id, operation);
        tracing::info!(operation_id = %id, name = %summary.name, "operation created");
        summary
    }

    /// Looks up an Operation.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] for unknown IDs.
    pub async fn get(&self, id: OperationId) -> Result<Arc<LiveOperation>, TrackerError> {
        self.operations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TrackerError::OperationNotFound(id))
    }

    /// Summaries of every live Operation, oldest first.
    pub async fn list(&self) -> Vec<OperationSummary> {
        let operations: Vec<Arc<LiveOperation>> =
            self.operations.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(operations.len());
        for operation in operations {
            summaries.push(operation.summary().await);
        }
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Pull view of one Operation.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] for unknown IDs.
    pub async fn snapshot(&self, id: OperationId) -> Result<OperationSnapshot, TrackerError> {
        Ok(self.get(id).await?.snapshot().await)
    }

    /// Rebinds an Operation's roster.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] or the Operation's own
    /// error.
    pub async fn rebind(
        &self,
        id: OperationId,
        roster: Vec<RosterEntry>,
    ) -> Result<usize, TrackerError> {
        self.get(id).await?.rebind(roster).await
    }

    /// Starts an Operation.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] or the Operation's own
    /// error.
    pub async fn start(
        &self,
        id: OperationId,
        roster: Option<Vec<RosterEntry>>,
    ) -> Result<OperationSnapshot, TrackerError> {
        self.get(id).await?.start(roster).await
    }

    /// Rotates an Operation's event point.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] or the Operation's own
    /// error.
    pub async fn new_event_point(&self, id: OperationId) -> Result<EventPoint, TrackerError> {
        self.get(id).await?.new_event_point().await
    }

    /// Stops an Operation and removes it from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotFound`] for unknown IDs.
    pub async fn stop(&self, id: OperationId) -> Result<OperationSnapshot, TrackerError> {
        let operation = self
            .operations
            .write()
            .await
            .remove(&id)
            .ok_or(TrackerError::OperationNotFound(id))?;
        Ok(operation.stop().await)
    }

    /// Number of live Operations.
    pub async fn len(&self) -> usize {
        self.operations.read().await.len()
    }

    /// Whether no Operation is live.
    pub async fn is_empty(&self) -> bool {
        self.operations.read().await.is_empty()
    }
}
