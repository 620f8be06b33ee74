//! Time-bucketed snapshots of squad activity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Session-wide totals accumulated between two rotations.
///
/// The aggregator mutates only its *current* point; closed points are
/// stored in an append-only sequence and never written again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventPoint {
    /// When this bucket was opened.
    pub timestamp: DateTime<Utc>,
    /// Participants online when the bucket was opened.
    pub active_participants: u32,
    /// Kills by participants.
    pub kills: u32,
    /// Deaths of participants.
    pub deaths: u32,
    /// Repair experience earned by participants.
    pub repairs: u64,
    /// Facilities captured.
    pub captures: u32,
    /// Revives performed by participants.
    pub revives: u32,
}

impl EventPoint {
    /// Opens a bucket with zeroed counters.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, active_participants: u32) -> Self {
        Self {
            timestamp,
            active_participants,
            kills: 0,
            deaths: 0,
            repairs: 0,
            captures: 0,
            revives: 0,
        }
    }

    /// Whether nothing has been counted in this bucket.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.kills == 0
            && self.deaths == 0
            && self.repairs == 0
            && self.captures == 0
            && self.revives == 0
    }
}
