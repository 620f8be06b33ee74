//! Most recent lock per continent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{Continent, ContinentLock, Faction, ZoneId};

/// Latest lock of each tracked continent.
#[derive(Debug, Clone, Default)]
pub struct ContinentLockRegistry {
    locks: HashMap<Continent, ContinentLock>,
}

impl ContinentLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored lock for the continent of `zone_id`.
    ///
    /// Returns the continent, or `None` if the zone is not tracked.
    pub fn record_lock(
        &mut self,
        zone_id: ZoneId,
        timestamp: DateTime<Utc>,
        faction: Option<Faction>,
    ) -> Option<Continent> {
        let Some(continent) = Continent::from_zone_id(zone_id) else {
            tracing::warn!(%zone_id, "lock for untracked zone dropped");
            return None;
        };
        self.locks.insert(
            continent,
            ContinentLock {
                continent,
                timestamp,
                faction,
            },
        );
        tracing::info!(%continent, %timestamp, "continent lock recorded");
        Some(continent)
    }

    /// Continent locked longest ago, among those with a recorded lock.
    #[must_use]
    pub fn oldest_lock(&self) -> Option<&ContinentLock> {
        self.locks
            .values()
            .min_by_key(|lock| (lock.timestamp, lock.continent))
    }

    /// All recorded locks, oldest first.
    #[must_use]
    pub fn sorted_locks(&self) -> Vec<ContinentLock> {
        let mut locks: Vec<ContinentLock> = self.locks.values().cloned().collect();
        locks.sort_by_key(|lock| (lock.timestamp, lock.continent));
        locks
    }

    /// Renders the oldest-lock report.
    #[must_use]
    pub fn render_oldest(&self) -> String {
        match self.oldest_lock() {
            Some(lock) => format!("Oldest locked continent: {}", render_lock(lock)),
            None => "No continent locks recorded yet.".to_string(),
        }
    }

    /// Renders the sorted-lock report, one continent per line.
    #[must_use]
    pub fn render_sorted(&self) -> String {
        let locks = self.sorted_locks();
        if locks.is_empty() {
            return "No continent locks recorded yet.".to_string();
        }
        let mut out = String::from("Continent locks, oldest first:");
        for lock in &locks {
            out.push('\n');
            out.push_str(&render_lock(lock));
        }
        out
    }
}

fn render_lock(lock: &ContinentLock) -> String {
    let when = lock.timestamp.format("%Y-%m-%d %H:%M UTC");
    match lock.faction {
        Some(faction) => format!("{} (locked by {faction}, {when})", lock.continent),
        None => format!("{} ({when})", lock.continent),
    }
}
