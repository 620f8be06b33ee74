//! Cosmetic "fun event" lines for squad vehicle team-kills.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CharacterId, UserHandle};

/// Squad transport vehicles whose team-kills earn a fun event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum SquadVehicle {
    /// Sunderer, vehicle ID 1.
    Sunderer,
    /// Galaxy, vehicle ID 11.
    Galaxy,
}

impl SquadVehicle {
    /// Resolves a Census vehicle ID.
    #[must_use]
    pub const fn from_vehicle_id(vehicle_id: u32) -> Option<Self> {
        match vehicle_id {
            1 => Some(Self::Sunderer),
            11 => Some(Self::Galaxy),
            _ => None,
        }
    }

    const fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Galaxy => GALAXY_DEATH_LINES,
            Self::Sunderer => PARTY_BUS_DEATH_LINES,
        }
    }

    const fn driver_lines(self) -> &'static [&'static str] {
        match self {
            Self::Galaxy => GALAXY_DEATH_BY_LINES,
            Self::Sunderer => PARTY_BUS_DEATH_BY_LINES,
        }
    }
}

const DRIVER: &str = "_USER";

const GALAXY_DEATH_LINES: &[&str] = &[
    "Found out _USER's Galaxy does not have seatbelts.",
    "Was used as a landing cushion by _USER's Galaxy.",
    "Trusted _USER's piloting. Once.",
    "Tested the structural integrity of _USER's Galaxy, with their face.",
];

const PARTY_BUS_DEATH_LINES: &[&str] = &[
    "Missed the party bus. The party bus did not miss them. (_USER)",
    "Got run over by _USER's Sunderer on the way to the fight.",
    "Became a speed bump for _USER's Sunderer.",
];

const GALAXY_DEATH_BY_LINES: &[&str] = &[
    "Flies a Galaxy like it owes them money.",
    "Thinks the ground is a landing pad.",
    "Has never met a cliff they did not want to hug.",
];

const PARTY_BUS_DEATH_BY_LINES: &[&str] = &[
    "Drives the party bus with their eyes closed.",
    "Treats the squad as optional cargo.",
    "Considers brakes a suggestion.",
];

/// Renders a randomly picked fun-event line for a victim of `driver`'s
/// vehicle.
#[must_use]
pub fn mishap_line<R: Rng + ?Sized>(vehicle: SquadVehicle, driver: &str, rng: &mut R) -> String {
    vehicle
        .lines()
        .choose(rng)
        .copied()
        .unwrap_or(DRIVER)
        .replace(DRIVER, driver)
}

/// Picks the driver-side "death by" line kept on a [`VehicleTally`].
#[must_use]
pub fn driver_line<R: Rng + ?Sized>(vehicle: SquadVehicle, rng: &mut R) -> String {
    vehicle
        .driver_lines()
        .choose(rng)
        .copied()
        .unwrap_or_default()
        .to_string()
}

/// Running count of squad members killed by one driver's vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VehicleTally {
    /// Driver's character.
    pub driver: CharacterId,
    /// Vehicle type.
    pub vehicle: SquadVehicle,
    /// Squad members killed with it.
    pub team_kills: u32,
    /// Line describing the driver, picked on the first team-kill.
    pub message: String,
}

/// A squad vehicle team-kill, as reported by the session aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleMishap {
    /// Participant driving.
    pub driver: UserHandle,
    /// Participant killed.
    pub victim: UserHandle,
    /// Vehicle involved.
    pub vehicle: SquadVehicle,
    /// Rendered fun-event line.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn vehicle_ids_resolve() {
        assert_eq!(SquadVehicle::from_vehicle_id(11), Some(SquadVehicle::Galaxy));
        assert_eq!(SquadVehicle::from_vehicle_id(1), Some(SquadVehicle::Sunderer));
        assert_eq!(SquadVehicle::from_vehicle_id(0), None);
    }

    #[test]
    fn line_names_the_driver() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..16 {
            let line = mishap_line(SquadVehicle::Galaxy, "Pilot", &mut rng);
            assert!(line.contains("Pilot"));
            assert!(!line.contains(DRIVER));
            assert!(GALAXY_DEATH_LINES
                .iter()
                .any(|t| t.replace(DRIVER, "Pilot") == line));
        }
    }

    #[test]
    fn lines_are_drawn_from_the_whole_list() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(mishap_line(SquadVehicle::Sunderer, "Driver", &mut rng));
        }
        assert_eq!(seen.len(), PARTY_BUS_DEATH_LINES.len());
    }

    #[test]
    fn driver_line_comes_from_vehicle_list() {
        let mut rng = SmallRng::seed_from_u64(1);
        let line = driver_line(SquadVehicle::Galaxy, &mut rng);
        assert!(GALAXY_DEATH_BY_LINES.contains(&line.as_str()));
    }
}
