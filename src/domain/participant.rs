//! Operation participants and their per-session statistics.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CharacterId;

/// Chat-platform identity of a roster member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct UserHandle {
    /// Chat-platform user ID.
    pub id: u64,
    /// Display name at signup time.
    pub display_name: String,
}

/// Game character bound to a roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CharacterRef {
    /// Census character ID.
    pub id: CharacterId,
    /// Character name.
    pub name: String,
}

/// One signup as handed over by the roster workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RosterEntry {
    /// Chat-platform identity.
    pub user: UserHandle,
    /// Bound game character, if the user registered one.
    #[serde(default)]
    pub character: Option<CharacterRef>,
}

/// Kill/death breakdown for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct KdaStats {
    /// Enemy players killed.
    pub kills: u32,
    /// All deaths, including environment and self-inflicted ones.
    pub deaths: u32,
    /// Deaths caused by another participant.
    pub deaths_by_squad: u32,
    /// Other participants this participant killed.
    pub killed_squad: u32,
    /// Deaths caused by non-participant allies.
    pub deaths_by_allies: u32,
    /// Deaths caused by enemies.
    pub deaths_by_enemies: u32,
}

/// Statistics accumulated by one participant during a live Operation.
///
/// Every counter is monotonic non-decreasing for the lifetime of the
/// session; only [`crate::tracker::SessionAggregator::start`] resets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserSession {
    /// Score from kills and revives.
    pub score: u64,
    /// Kill/death breakdown.
    pub kda: KdaStats,
    /// Experience earned healing squad members.
    pub heals: u64,
    /// Squad members revived.
    pub revives: u32,
    /// Experience earned repairing squad vehicles.
    pub repairs: u64,
    /// Experience earned resupplying squad members.
    pub resupplies: u64,
    /// Cosmetic lines describing memorable moments.
    pub fun_events: Vec<String>,
}

/// A roster member for the live Operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Participant {
    /// Chat-platform identity.
    pub user: UserHandle,
    /// Bound game character; without one the participant is only counted.
    pub character: Option<CharacterRef>,
    /// Whether the bound character is currently logged in.
    pub online: bool,
    /// Session statistics, owned exclusively by this participant.
    pub session: UserSession,
}

impl Participant {
    /// Creates an offline participant with an empty session.
    #[must_use]
    pub fn new(entry: RosterEntry) -> Self {
        Self {
            user: entry.user,
            character: entry.character,
            online: false,
            session: UserSession::default(),
        }
    }

    /// ID of the bound character, if any.
    #[must_use]
    pub fn character_id(&self) -> Option<CharacterId> {
        self.character.as_ref().map(|c| c.id)
    }

    /// Whether this participant is bound to `character_id`.
    #[must_use]
    pub fn is_character(&self, character_id: CharacterId) -> bool {
        self.character_id() == Some(character_id)
    }
}
