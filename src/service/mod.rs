//! Service layer: async orchestration around the trackers.
//!
//! [`OperationService`] keeps the live Operations, each a
//! [`LiveOperation`] owning its own trackers and subscriptions.
//! [`ContinentTracker`] follows continent locks and openings for the
//! configured world.

pub mod continent_tracker;
pub mod operation;
pub mod operation_service;

pub use continent_tracker::{ContinentTracker, Delivery, LockReport};
pub use operation::{LiveOperation, OperationContext, OperationSnapshot, OperationSummary};
pub use operation_service::OperationService;
