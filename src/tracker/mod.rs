//! Core tracker state machines.
//!
//! Everything here is synchronous and owned by exactly one live Operation
//! (or, for continents, one world). The async glue that feeds them lives in
//! [`crate::service`]; the only async piece is [`RosterBinder`], which owns
//! feed subscriptions and queries presence while rebinding.

pub mod continent_locks;
pub mod facility;
pub mod fun;
pub mod roster;
pub mod session;
pub mod warpgate;

use chrono::TimeDelta;

use crate::config::FunEventSettings;

pub use continent_locks::ContinentLockRegistry;
pub use facility::{CaptureOutcome, FacilityTracker};
pub use fun::{SquadVehicle, VehicleMishap, VehicleTally};
pub use roster::RosterBinder;
pub use session::{AllegianceCheck, DeathOutcome, SessionAggregator, SessionPhase};
pub use warpgate::{WarpgateCapture, WarpgateTracker, WarpgateVerdict};

/// Mutable state of one live Operation, guarded by a single lock.
#[derive(Debug)]
pub struct OperationState {
    /// Participant statistics and event points.
    pub session: SessionAggregator,
    /// Facility records and feed.
    pub facilities: FacilityTracker,
}

impl OperationState {
    /// Creates empty state.
    #[must_use]
    pub fn new(fun: FunEventSettings, recapture_window: TimeDelta) -> Self {
        Self {
            session: SessionAggregator::new(fun),
            facilities: FacilityTracker::new(recapture_window),
        }
    }
}
