//! Observer notifications emitted by the trackers.
//!
//! Notices are pushed through the [`super::NoticeBus`] to whatever renders
//! them (chat embeds, channel broadcasts). Aggregate state itself is never
//! pushed; renderers pull it from the services.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Continent, FacilityAction, FacilityId, Faction, MapRegion, OperationId, UserHandle};

/// Notification emitted after a state change worth showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum TrackerNotice {
    /// A new logical capture or defence was recorded.
    Facility {
        /// Operation that recorded it.
        operation_id: OperationId,
        /// Facility ID.
        facility_id: FacilityId,
        /// Capture or defence.
        action: FacilityAction,
        /// Region metadata if the lookup succeeded.
        region: Option<MapRegion>,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A participant's character logged in or out.
    PresenceChanged {
        /// Operation the participant belongs to.
        operation_id: OperationId,
        /// Participant.
        user: UserHandle,
        /// New presence.
        online: bool,
    },

    /// A participant was killed by a squadmate's vehicle.
    VehicleMishap {
        /// Operation the participants belong to.
        operation_id: OperationId,
        /// Participant driving the vehicle.
        driver: UserHandle,
        /// Participant who died.
        victim: UserHandle,
        /// Rendered line.
        message: String,
    },

    /// A continent was locked.
    ContinentLocked {
        /// Locked continent.
        continent: Continent,
        /// Empire credited with the lock.
        faction: Option<Faction>,
        /// Lock time.
        timestamp: DateTime<Utc>,
    },

    /// A continent opened.
    ContinentOpened {
        /// Opened continent.
        continent: Continent,
        /// Time of the last warpgate change.
        timestamp: DateTime<Utc>,
    },

    /// A continent lock report to broadcast on a channel.
    LockReport {
        /// Configured broadcast channel.
        channel: String,
        /// Rendered report.
        text: String,
    },
}

impl TrackerNotice {
    /// Operation this notice belongs to, if it is operation-scoped.
    #[must_use]
    pub const fn operation_id(&self) -> Option<OperationId> {
        match self {
            Self::Facility { operation_id, .. }
            | Self::PresenceChanged { operation_id, .. }
            | Self::VehicleMishap { operation_id, .. } => Some(*operation_id),
            Self::ContinentLocked { .. }
            | Self::ContinentOpened { .. }
            | Self::LockReport { .. } => None,
        }
    }

    /// Notice type as a static string slice.
    #[must_use]
    pub const fn notice_type_str(&self) -> &'static str {
        match self {
            Self::Facility { .. } => "facility",
            Self::PresenceChanged { .. } => "presence_changed",
            Self::VehicleMishap { .. } => "vehicle_mishap",
            Self::ContinentLocked { .. } => "continent_locked",
            Self::ContinentOpened { .. } => "continent_opened",
            Self::LockReport { .. } => "lock_report",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continent_notices_are_not_operation_scoped() {
        let notice = TrackerNotice::ContinentOpened {
            continent: Continent::Esamir,
            timestamp: Utc::now(),
        };
        assert_eq!(notice.operation_id(), None);
        assert_eq!(notice.notice_type_str(), "continent_opened");
    }

    #[test]
    fn serializes_with_notice_tag() {
        let id = OperationId::new();
        let notice = TrackerNotice::PresenceChanged {
            operation_id: id,
            user: UserHandle {
                id: 7,
                display_name: "Medic".to_string(),
            },
            online: true,
        };
        assert_eq!(notice.operation_id(), Some(id));
        let json = serde_json::to_string(&notice).unwrap_or_default();
        assert!(json.contains("\"notice\":\"presence_changed\""));
    }
}
