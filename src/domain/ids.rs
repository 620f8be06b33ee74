//! Game-entity identifiers and factions.
//!
//! Census identifiers are plain integers; the newtypes below keep a
//! character ID from being passed where a facility or zone ID is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// PlanetSide 2 character ID (64-bit Census ID).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

/// Map region / facility ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct FacilityId(pub u32);

/// Zone (continent) ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

/// World (server) ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct WorldId(pub u32);

impl CharacterId {
    /// Census uses character ID `0` for the environment (fall damage,
    /// pain fields, ...).
    #[must_use]
    pub const fn is_environment(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorldId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Playable factions, with their Census faction IDs as discriminants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Faction {
    /// Vanu Sovereignty.
    Vs = 1,
    /// New Conglomerate.
    Nc = 2,
    /// Terran Republic.
    Tr = 3,
    /// Nanite Systems Operatives.
    Nso = 4,
}

impl Faction {
    /// The three empires that can hold warpgates and lock continents.
    pub const EMPIRES: [Self; 3] = [Self::Vs, Self::Nc, Self::Tr];

    /// Resolves a Census faction ID. `0` and unknown IDs yield `None`.
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Vs),
            2 => Some(Self::Nc),
            3 => Some(Self::Tr),
            4 => Some(Self::Nso),
            _ => None,
        }
    }

    /// Census faction ID.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Short faction tag, e.g. `"NC"`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Vs => "VS",
            Self::Nc => "NC",
            Self::Tr => "TR",
            Self::Nso => "NSO",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Faction {
    type Err = String;

    /// Accepts either the tag (`"nc"`, `"NC"`) or the numeric ID (`"2"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u32>() {
            return Self::from_id(id).ok_or_else(|| format!("unknown faction id {id}"));
        }
        match s.to_ascii_uppercase().as_str() {
            "VS" => Ok(Self::Vs),
            "NC" => Ok(Self::Nc),
            "TR" => Ok(Self::Tr),
            "NSO" => Ok(Self::Nso),
            other => Err(format!("unknown faction {other}")),
        }
    }
}
