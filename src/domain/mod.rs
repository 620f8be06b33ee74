//! Domain layer: identifiers, feed events, participants, and notices.
//!
//! This module contains the data model shared by the feed adapter, the
//! trackers and the services: typed game identifiers, the closed set of
//! feed events, per-participant session statistics, event points,
//! facility and continent records, and the notice bus used to tell
//! renderers that something changed.

pub mod continent;
pub mod event_point;
pub mod facility;
pub mod feed_event;
pub mod ids;
pub mod notice;
pub mod notice_bus;
pub mod operation_id;
pub mod participant;

pub use continent::{Continent, ContinentLock, WarpgateTable};
pub use event_point::EventPoint;
pub use facility::{FacilityAction, FacilityData, FacilityFeedEntry, MapRegion};
pub use feed_event::{EventKind, ExperienceCategory, FeedEvent};
pub use ids::{CharacterId, FacilityId, Faction, WorldId, ZoneId};
pub use notice::TrackerNotice;
pub use notice_bus::NoticeBus;
pub use operation_id::OperationId;
pub use participant::{CharacterRef, KdaStats, Participant, RosterEntry, UserHandle, UserSession};
