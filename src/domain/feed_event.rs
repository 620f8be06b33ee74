//! Typed push notifications delivered by the Event Feed.
//!
//! Raw feed payloads are decoded into [`FeedEvent`] at the adapter boundary
//! (see [`crate::feed::wire`]); the trackers only ever see this closed set of
//! variants, each carrying exactly the fields they consume.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CharacterId, FacilityId, WorldId, ZoneId};

/// Discriminator used by subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
    /// Character logged in.
    PlayerLogin,
    /// Character logged out.
    PlayerLogout,
    /// Character earned experience.
    GainExperience,
    /// Character died.
    Death,
    /// Character took part in a facility capture.
    PlayerFacilityCapture,
    /// Character took part in a facility defence.
    PlayerFacilityDefend,
    /// A continent was locked.
    ContinentLock,
    /// A facility changed owner.
    FacilityControl,
}

impl EventKind {
    /// Census `event_name` for this kind.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PlayerLogin => "PlayerLogin",
            Self::PlayerLogout => "PlayerLogout",
            Self::GainExperience => "GainExperience",
            Self::Death => "Death",
            Self::PlayerFacilityCapture => "PlayerFacilityCapture",
            Self::PlayerFacilityDefend => "PlayerFacilityDefend",
            Self::ContinentLock => "ContinentLock",
            Self::FacilityControl => "FacilityControl",
        }
    }

    /// Whether events of this kind are scoped to characters rather than
    /// worlds.
    #[must_use]
    pub const fn is_character_scoped(self) -> bool {
        !matches!(self, Self::ContinentLock | Self::FacilityControl)
    }
}

/// A decoded feed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event_name")]
pub enum FeedEvent {
    /// Character logged in.
    PlayerLogin {
        /// Character that logged in.
        character_id: CharacterId,
        /// World the character logged into.
        world_id: WorldId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Character logged out.
    PlayerLogout {
        /// Character that logged out.
        character_id: CharacterId,
        /// World the character left.
        world_id: WorldId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Character earned experience.
    GainExperience {
        /// Character earning the experience.
        character_id: CharacterId,
        /// Other party of the action (revived player, repaired vehicle owner).
        other_id: CharacterId,
        /// Census experience ID.
        experience_id: u32,
        /// Experience amount.
        amount: u32,
        /// World of the event.
        world_id: WorldId,
        /// Zone of the event.
        zone_id: ZoneId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Character died.
    Death {
        /// Victim.
        character_id: CharacterId,
        /// Killer; `0` for environmental deaths.
        attacker_character_id: CharacterId,
        /// Vehicle the killer was using; `0` when on foot.
        attacker_vehicle_id: u32,
        /// World of the event.
        world_id: WorldId,
        /// Zone of the event.
        zone_id: ZoneId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Character took part in a facility capture.
    PlayerFacilityCapture {
        /// Participating character.
        character_id: CharacterId,
        /// Captured facility.
        facility_id: FacilityId,
        /// World of the event.
        world_id: WorldId,
        /// Zone of the event.
        zone_id: ZoneId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Character took part in a facility defence.
    PlayerFacilityDefend {
        /// Participating character.
        character_id: CharacterId,
        /// Defended facility.
        facility_id: FacilityId,
        /// World of the event.
        world_id: WorldId,
        /// Zone of the event.
        zone_id: ZoneId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// A continent was locked.
    ContinentLock {
        /// World of the event.
        world_id: WorldId,
        /// Locked zone.
        zone_id: ZoneId,
        /// Faction ID credited with the lock (`0` if unknown).
        triggering_faction: u32,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// A facility changed owner.
    FacilityControl {
        /// Facility that changed hands.
        facility_id: FacilityId,
        /// World of the event.
        world_id: WorldId,
        /// Zone of the facility.
        zone_id: ZoneId,
        /// Previous owning faction ID.
        old_faction_id: u32,
        /// New owning faction ID.
        new_faction_id: u32,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Returns the kind discriminator of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PlayerLogin { .. } => EventKind::PlayerLogin,
            Self::PlayerLogout { .. } => EventKind::PlayerLogout,
            Self::GainExperience { .. } => EventKind::GainExperience,
            Self::Death { .. } => EventKind::Death,
            Self::PlayerFacilityCapture { .. } => EventKind::PlayerFacilityCapture,
            Self::PlayerFacilityDefend { .. } => EventKind::PlayerFacilityDefend,
            Self::ContinentLock { .. } => EventKind::ContinentLock,
            Self::FacilityControl { .. } => EventKind::FacilityControl,
        }
    }

    /// Characters this event concerns. A death concerns both the victim and
    /// the attacker, matching the upstream character filter semantics.
    #[must_use]
    pub fn characters(&self) -> Vec<CharacterId> {
        match self {
            Self::PlayerLogin { character_id, .. }
            | Self::PlayerLogout { character_id, .. }
            | Self::GainExperience { character_id, .. }
            | Self::PlayerFacilityCapture { character_id, .. }
            | Self::PlayerFacilityDefend { character_id, .. } => vec![*character_id],
            Self::Death {
                character_id,
                attacker_character_id,
                ..
            } => vec![*character_id, *attacker_character_id],
            Self::ContinentLock { .. } | Self::FacilityControl { .. } => Vec::new(),
        }
    }

    /// World the event happened on.
    #[must_use]
    pub const fn world_id(&self) -> WorldId {
        match self {
            Self::PlayerLogin { world_id, .. }
            | Self::PlayerLogout { world_id, .. }
            | Self::GainExperience { world_id, .. }
            | Self::Death { world_id, .. }
            | Self::PlayerFacilityCapture { world_id, .. }
            | Self::PlayerFacilityDefend { world_id, .. }
            | Self::ContinentLock { world_id, .. }
            | Self::FacilityControl { world_id, .. } => *world_id,
        }
    }

    /// Experience ID for `GainExperience` events.
    #[must_use]
    pub const fn experience_id(&self) -> Option<u32> {
        match self {
            Self::GainExperience { experience_id, .. } => Some(*experience_id),
            _ => None,
        }
    }
}

/// Experience categories the session aggregator accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperienceCategory {
    /// Killed an enemy player.
    Kill,
    /// Healed a squad member.
    SquadHeal,
    /// Revived a squad member.
    SquadRevive,
    /// Resupplied a squad member.
    SquadResupply,
    /// Repaired a squad vehicle.
    SquadVehicleRepair,
}

/// Census experience ID for a player kill.
pub const KILL_EXPERIENCE_ID: u32 = 1;
/// Census experience ID for a squad heal.
pub const SQUAD_HEAL_EXPERIENCE_ID: u32 = 51;
/// Census experience ID for a squad revive.
pub const SQUAD_REVIVE_EXPERIENCE_ID: u32 = 53;
/// Census experience ID for a squad resupply.
pub const SQUAD_RESUPPLY_EXPERIENCE_ID: u32 = 55;
/// Census experience IDs for squad vehicle repairs (one per vehicle type).
pub const SQUAD_REPAIR_EXPERIENCE_IDS: &[u32] = &[
    28, 129, 130, 131, 132, 133, 134, 135, 136, 137, 138, 139, 140, 141, 142, 143, 144,
];

impl ExperienceCategory {
    /// Maps a Census experience ID onto a tracked category.
    #[must_use]
    pub fn from_experience_id(experience_id: u32) -> Option<Self> {
        match experience_id {
            KILL_EXPERIENCE_ID => Some(Self::Kill),
            SQUAD_HEAL_EXPERIENCE_ID => Some(Self::SquadHeal),
            SQUAD_REVIVE_EXPERIENCE_ID => Some(Self::SquadRevive),
            SQUAD_RESUPPLY_EXPERIENCE_ID => Some(Self::SquadResupply),
            id if SQUAD_REPAIR_EXPERIENCE_IDS.contains(&id) => Some(Self::SquadVehicleRepair),
            _ => None,
        }
    }

    /// Every experience ID mapped to some category, for subscription filters.
    #[must_use]
    pub fn tracked_experience_ids() -> Vec<u32> {
        let mut ids = vec![
            KILL_EXPERIENCE_ID,
            SQUAD_HEAL_EXPERIENCE_ID,
            SQUAD_REVIVE_EXPERIENCE_ID,
            SQUAD_RESUPPLY_EXPERIENCE_ID,
        ];
        ids.extend_from_slice(SQUAD_REPAIR_EXPERIENCE_IDS);
        ids
    }
}
