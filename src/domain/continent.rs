//! Continents, their warpgates, and lock records.
//!
//! A continent has exactly three warpgates. When a continent locks, all
//! three end up owned by the locking empire; when it opens, they are split
//! between the empires again. The warpgate tracker only sees the three new
//! owners, so ownership is reduced to a weighted sum and compared against
//! the per-empire lock sums below.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{FacilityId, Faction, ZoneId};

/// The five permanent continents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema,
)]
pub enum Continent {
    /// Indar, zone 2.
    Indar,
    /// Hossin, zone 4.
    Hossin,
    /// Amerish, zone 6.
    Amerish,
    /// Esamir, zone 8.
    Esamir,
    /// Oshur, zone 344.
    Oshur,
}

impl Continent {
    /// All tracked continents.
    pub const ALL: [Self; 5] = [
        Self::Indar,
        Self::Hossin,
        Self::Amerish,
        Self::Esamir,
        Self::Oshur,
    ];

    /// Census zone ID.
    #[must_use]
    pub const fn zone_id(self) -> ZoneId {
        match self {
            Self::Indar => ZoneId(2),
            Self::Hossin => ZoneId(4),
            Self::Amerish => ZoneId(6),
            Self::Esamir => ZoneId(8),
            Self::Oshur => ZoneId(344),
        }
    }

    /// Resolves a zone ID; dynamic and instanced zones yield `None`.
    #[must_use]
    pub const fn from_zone_id(zone_id: ZoneId) -> Option<Self> {
        match zone_id.0 {
            2 => Some(Self::Indar),
            4 => Some(Self::Hossin),
            6 => Some(Self::Amerish),
            8 => Some(Self::Esamir),
            344 => Some(Self::Oshur),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Indar => "Indar",
            Self::Hossin => "Hossin",
            Self::Amerish => "Amerish",
            Self::Esamir => "Esamir",
            Self::Oshur => "Oshur",
        }
    }

    /// Built-in warpgate facility IDs.
    #[must_use]
    pub const fn default_warpgates(self) -> [FacilityId; 3] {
        match self {
            Self::Indar => [FacilityId(1801), FacilityId(4801), FacilityId(7801)],
            Self::Hossin => [FacilityId(300_000), FacilityId(301_000), FacilityId(302_000)],
            Self::Amerish => [FacilityId(200_000), FacilityId(201_000), FacilityId(202_000)],
            Self::Esamir => [FacilityId(18_029), FacilityId(18_030), FacilityId(18_062)],
            Self::Oshur => [FacilityId(400_370), FacilityId(400_371), FacilityId(400_372)],
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lookup from warpgate facility ID to its continent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpgateTable {
    gates: HashMap<FacilityId, Continent>,
}

impl WarpgateTable {
    /// Builds a table from explicit per-continent gate lists.
    #[must_use]
    pub fn new(gates: impl IntoIterator<Item = (Continent, Vec<FacilityId>)>) -> Self {
        let gates = gates
            .into_iter()
            .flat_map(|(continent, ids)| ids.into_iter().map(move |id| (id, continent)))
            .collect();
        Self { gates }
    }

    /// Continent owning the warpgate, or `None` for ordinary facilities.
    #[must_use]
    pub fn continent_of(&self, facility_id: FacilityId) -> Option<Continent> {
        self.gates.get(&facility_id).copied()
    }
}

impl Default for WarpgateTable {
    fn default() -> Self {
        Self::new(
            Continent::ALL
                .into_iter()
                .map(|c| (c, c.default_warpgates().to_vec())),
        )
    }
}

/// Weight of a faction ID in a warpgate ownership sum.
///
/// Raw faction IDs cannot be summed directly: `1 + 2 + 3 == 2 + 2 + 2`.
/// Weighting each ID by `4^(id - 1)` keeps every multiset of three owners
/// distinct, since no faction can appear more than three times. Unowned
/// (`0`) and unknown IDs weigh nothing.
#[must_use]
pub const fn faction_weight(faction_id: u32) -> u32 {
    match faction_id {
        1..=4 => 4u32.pow(faction_id - 1),
        _ => 0,
    }
}

/// Warpgate sum when the VS own all three gates.
pub const VS_LOCK_SUM: u32 = 3 * faction_weight(Faction::Vs as u32);
/// Warpgate sum when the NC own all three gates.
pub const NC_LOCK_SUM: u32 = 3 * faction_weight(Faction::Nc as u32);
/// Warpgate sum when the TR own all three gates.
pub const TR_LOCK_SUM: u32 = 3 * faction_weight(Faction::Tr as u32);

/// Empire that locked the continent, if `sum` is one of the lock sums.
#[must_use]
pub const fn locking_faction(sum: u32) -> Option<Faction> {
    match sum {
        VS_LOCK_SUM => Some(Faction::Vs),
        NC_LOCK_SUM => Some(Faction::Nc),
        TR_LOCK_SUM => Some(Faction::Tr),
        _ => None,
    }
}

/// Most recent lock of one continent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContinentLock {
    /// Locked continent.
    pub continent: Continent,
    /// When the lock happened.
    pub timestamp: DateTime<Utc>,
    /// Empire credited with the lock, when known.
    pub faction: Option<Faction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_ids_round_trip() {
        for continent in Continent::ALL {
            assert_eq!(Continent::from_zone_id(continent.zone_id()), Some(continent));
        }
        assert_eq!(Continent::from_zone_id(ZoneId(96)), None);
    }

    #[test]
    fn warpgate_table_maps_every_gate() {
        let table = WarpgateTable::default();
        for continent in Continent::ALL {
            for gate in continent.default_warpgates() {
                assert_eq!(table.continent_of(gate), Some(continent));
            }
        }
        assert_eq!(table.continent_of(FacilityId(222_280)), None);
    }

    #[test]
    fn raw_faction_ids_would_collide() {
        let mixed: u32 = Faction::EMPIRES.iter().map(|f| f.id()).sum();
        assert_eq!(mixed, 3 * Faction::Nc.id());
    }

    #[test]
    fn lock_sums_never_collide_with_mixed_ownership() {
        // Every multiset of three owners drawn from {none, VS, NC, TR, NSO}.
        let ids = [0u32, 1, 2, 3, 4];
        for (i, a) in ids.iter().enumerate() {
            for (j, b) in ids.iter().enumerate().skip(i) {
                for c in ids.iter().skip(j) {
                    let sum = faction_weight(*a) + faction_weight(*b) + faction_weight(*c);
                    let same_empire = a == b && b == c && (1..=3).contains(a);
                    assert_eq!(
                        locking_faction(sum).is_some(),
                        same_empire,
                        "owners ({a}, {b}, {c}) summed to {sum}"
                    );
                    if same_empire {
                        assert_eq!(locking_faction(sum).map(Faction::id), Some(*a));
                    }
                }
            }
        }
    }

    #[test]
    fn lock_sums_are_distinct() {
        assert_eq!(VS_LOCK_SUM, 3);
        assert_eq!(NC_LOCK_SUM, 12);
        assert_eq!(TR_LOCK_SUM, 48);
    }
}
