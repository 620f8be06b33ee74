//! Tracker configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable values fall back to
//! the defaults of [`TrackerConfig::default`].

use std::net::SocketAddr;

use chrono::TimeDelta;

use crate::census::DEFAULT_CENSUS_URL;
use crate::domain::{Continent, FacilityId, Faction, WarpgateTable, WorldId};
use crate::error::TrackerError;

/// Toggles for cosmetic "fun event" features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunEventSettings {
    /// Record fun-event lines for squad vehicle team-kills.
    pub vehicle_death_events: bool,
    /// Broadcast a notice for squad vehicle team-kills.
    pub broadcast_vehicle_deaths: bool,
}

impl Default for FunEventSettings {
    fn default() -> Self {
        Self {
            vehicle_death_events: true,
            broadcast_vehicle_deaths: false,
        }
    }
}

/// Top-level tracker configuration.
///
/// Loaded once at startup via [`TrackerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// World whose continents are tracked.
    pub world_id: WorldId,

    /// The community's own faction; decides ally- vs enemy-caused deaths.
    pub home_faction: Faction,

    /// Window within which repeated capture reports of the same facility
    /// count as one capture.
    pub recapture_window: TimeDelta,

    /// Seconds between automatic event point rotations (0 = manual only).
    pub event_point_interval_secs: u64,

    /// Capacity of the event feed broadcast channel.
    pub feed_capacity: usize,

    /// Capacity of the notice bus broadcast channel.
    pub notice_capacity: usize,

    /// Channel that continent notices and lock reports are broadcast to.
    pub continent_channel: String,

    /// Warpgate facility IDs per continent.
    pub warpgates: WarpgateTable,

    /// Fun event toggles.
    pub fun: FunEventSettings,

    /// Census service ID; without one no game API lookups are made.
    pub census_service_id: Option<String>,

    /// Census API base URL.
    pub census_base_url: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            world_id: WorldId(1),
            home_faction: Faction::Nc,
            recapture_window: TimeDelta::minutes(15),
            event_point_interval_secs: 0,
            feed_capacity: 10_000,
            notice_capacity: 1_000,
            continent_channel: "ps2-continents".to_string(),
            warpgates: WarpgateTable::default(),
            fun: FunEventSettings::default(),
            census_service_id: None,
            census_base_url: DEFAULT_CENSUS_URL.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if `LISTEN_ADDR` is set but cannot
    /// be parsed as a [`SocketAddr`], or if `FACILITY_RECAPTURE_WINDOW_SECS`
    /// is not a positive number of seconds.
    pub fn from_env() -> Result<Self, TrackerError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| TrackerError::Config(format!("LISTEN_ADDR {raw:?}: {e}")))?,
            Err(_) => defaults.listen_addr,
        };

        let world_id = parse_env("PS2_WORLD_ID", defaults.world_id);
        let home_faction = parse_env("PS2_HOME_FACTION", defaults.home_faction);
        let recapture_window = match std::env::var("FACILITY_RECAPTURE_WINDOW_SECS") {
            Ok(raw) => parse_recapture_window(&raw)?,
            Err(_) => defaults.recapture_window,
        };
        let event_point_interval_secs = parse_env("EVENT_POINT_INTERVAL_SECS", 0);
        let feed_capacity = parse_env("EVENT_FEED_CAPACITY", defaults.feed_capacity);
        let notice_capacity = parse_env("NOTICE_BUS_CAPACITY", defaults.notice_capacity);
        let continent_channel =
            std::env::var("CONTINENT_NOTIFY_CHANNEL").unwrap_or(defaults.continent_channel);

        let warpgates = WarpgateTable::new(Continent::ALL.into_iter().map(|continent| {
            let key = format!("CONTINENT_WARPGATES_{}", continent.name().to_ascii_uppercase());
            let gates = std::env::var(&key)
                .ok()
                .and_then(|raw| parse_facility_list(&raw))
                .unwrap_or_else(|| continent.default_warpgates().to_vec());
            (continent, gates)
        }));

        let fun = FunEventSettings {
            vehicle_death_events: parse_env_bool(
                "FUN_VEHICLE_DEATH_EVENTS",
                defaults.fun.vehicle_death_events,
            ),
            broadcast_vehicle_deaths: parse_env_bool(
                "FUN_BROADCAST_VEHICLE_DEATHS",
                defaults.fun.broadcast_vehicle_deaths,
            ),
        };

        let census_service_id = std::env::var("PS2_SERVICE_ID")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|id| !id.is_empty());
        let census_base_url =
            std::env::var("CENSUS_BASE_URL").unwrap_or(defaults.census_base_url);

        Ok(Self {
            listen_addr,
            world_id,
            home_faction,
            recapture_window,
            event_point_interval_secs,
            feed_capacity,
            notice_capacity,
            continent_channel,
            warpgates,
            fun,
            census_service_id,
            census_base_url,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Ok("true" | "1") => true,
        Ok("false" | "0") => false,
        _ => default,
    }
}

/// Parses a recapture window in seconds. Must be positive and within
/// chrono's range.
fn parse_recapture_window(raw: &str) -> Result<TimeDelta, TrackerError> {
    let invalid = |reason: &str| {
        TrackerError::Config(format!("FACILITY_RECAPTURE_WINDOW_SECS {raw:?}: {reason}"))
    };
    let secs: i64 = raw.trim().parse().map_err(|e| invalid(&format!("{e}")))?;
    if secs <= 0 {
        return Err(invalid("must be greater than zero"));
    }
    TimeDelta::try_seconds(secs).ok_or_else(|| invalid("out of range"))
}

/// Parses a comma-separated list of exactly three facility IDs.
fn parse_facility_list(raw: &str) -> Option<Vec<FacilityId>> {
    let ids = raw
        .split(',')
        .map(|s| s.trim().parse().map(FacilityId))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    (ids.len() == 3).then_some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TrackerConfig::default();
        assert_eq!(config.recapture_window, TimeDelta::minutes(15));
        assert_eq!(config.home_faction, Faction::Nc);
        assert_eq!(config.event_point_interval_secs, 0);
        assert!(config.fun.vehicle_death_events);
        assert!(!config.fun.broadcast_vehicle_deaths);
        assert_eq!(config.census_service_id, None);
        assert_eq!(config.census_base_url, DEFAULT_CENSUS_URL);
    }

    #[test]
    fn facility_list_needs_three_ids() {
        assert_eq!(
            parse_facility_list("1, 2,3"),
            Some(vec![FacilityId(1), FacilityId(2), FacilityId(3)])
        );
        assert_eq!(parse_facility_list("1,2"), None);
        assert_eq!(parse_facility_list("1,two,3"), None);
    }

    #[test]
    fn recapture_window_accepts_positive_seconds() {
        assert!(matches!(
            parse_recapture_window(" 600 "),
            Ok(window) if window == TimeDelta::minutes(10)
        ));
    }

    #[test]
    fn recapture_window_rejects_non_positive_and_huge_values() {
        for raw in ["0", "-60", "99999999999999999", "soon"] {
            assert!(
                matches!(parse_recapture_window(raw), Err(TrackerError::Config(_))),
                "{raw} should be rejected"
            );
        }
    }
}
