//! Continent lock/open inference from warpgate ownership changes.
//!
//! When a continent locks or opens, its three warpgates all change owner
//! within moments of each other. Each `FacilityControl` event for a
//! warpgate is buffered until its zone has three, then the buffered owners
//! are reduced to a weighted sum (see [`crate::domain::continent`]).
//! Changes that sit in the buffer longer than [`WARPGATE_BURST_WINDOW`]
//! are stray flips and are dropped before they can join a later triple.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::continent::{faction_weight, locking_faction};
use crate::domain::{Continent, FacilityId, Faction, WarpgateTable, ZoneId};

/// How long a buffered warpgate change waits for the rest of its triple.
pub const WARPGATE_BURST_WINDOW: TimeDelta = TimeDelta::minutes(2);

/// One buffered warpgate ownership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpgateCapture {
    /// Warpgate facility.
    pub facility_id: FacilityId,
    /// Zone the warpgate belongs to.
    pub zone_id: ZoneId,
    /// New owner's faction ID.
    pub faction_id: u32,
    /// When the change was reported.
    pub timestamp: DateTime<Utc>,
}

/// What a warpgate change meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpgateVerdict {
    /// Fewer than three changes buffered for the zone so far.
    Pending,
    /// All three gates went to one empire.
    Locked {
        /// Locked continent.
        continent: Continent,
        /// Locking empire.
        faction: Faction,
    },
    /// Gates split between empires.
    Opened {
        /// Opened continent.
        continent: Continent,
    },
}

/// Buffers warpgate changes per zone and classifies complete triples.
#[derive(Debug, Clone, Default)]
pub struct WarpgateTracker {
    table: WarpgateTable,
    pending: Vec<WarpgateCapture>,
}

impl WarpgateTracker {
    /// Creates a tracker over the given warpgate table.
    #[must_use]
    pub const fn new(table: WarpgateTable) -> Self {
        Self {
            table,
            pending: Vec::new(),
        }
    }

    /// Handles a facility ownership change.
    ///
    /// Returns `None` for facilities that are not warpgates.
    pub fn on_facility_control(
        &mut self,
        facility_id: FacilityId,
        zone_id: ZoneId,
        new_faction_id: u32,
        at: DateTime<Utc>,
    ) -> Option<WarpgateVerdict> {
        let continent = self.table.continent_of(facility_id)?;
        if continent.zone_id() != zone_id {
            tracing::warn!(
                %facility_id,
                %zone_id,
                expected = %continent.zone_id(),
                "warpgate reported in an unexpected zone"
            );
        }

        self.expire(at);
        self.pending.push(WarpgateCapture {
            facility_id,
            zone_id,
            faction_id: new_faction_id,
            timestamp: at,
        });

        let buffered = self.pending.iter().filter(|c| c.zone_id == zone_id).count();
        if buffered < 3 {
            tracing::debug!(%continent, buffered, "waiting for remaining warpgates");
            return Some(WarpgateVerdict::Pending);
        }

        let mut sum = 0u32;
        let mut taken = 0usize;
        self.pending.retain(|c| {
            if taken < 3 && c.zone_id == zone_id {
                taken += 1;
                sum = sum.saturating_add(faction_weight(c.faction_id));
                false
            } else {
                true
            }
        });

        let verdict = match locking_faction(sum) {
            Some(faction) => {
                tracing::info!(%continent, %faction, "continent locked");
                WarpgateVerdict::Locked { continent, faction }
            }
            None => {
                tracing::info!(%continent, sum, "continent opened");
                WarpgateVerdict::Opened { continent }
            }
        };
        Some(verdict)
    }

    fn expire(&mut self, now: DateTime<Utc>) {
        let before = self.pending.len();
        self.pending
            .retain(|c| now.signed_duration_since(c.timestamp) <= WARPGATE_BURST_WINDOW);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            tracing::debug!(dropped, "expired stray warpgate changes");
        }
    }

    /// Buffered changes for `zone_id`.
    #[must_use]
    pub fn pending_for(&self, zone_id: ZoneId) -> Vec<WarpgateCapture> {
        self.pending
            .iter()
            .filter(|c| c.zone_id == zone_id)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_594_440 + secs, 0).unwrap_or_default()
    }

    fn indar_gates() -> [FacilityId; 3] {
        Continent::Indar.default_warpgates()
    }

    fn feed(tracker: &mut WarpgateTracker, owners: [u32; 3]) -> Vec<Option<WarpgateVerdict>> {
        indar_gates()
            .into_iter()
            .zip(owners)
            .map(|(gate, owner)| tracker.on_facility_control(gate, ZoneId(2), owner, at(0)))
            .collect()
    }

    #[test]
    fn same_empire_triple_locks_and_clears_buffer() {
        let mut tracker = WarpgateTracker::default();
        let verdicts = feed(&mut tracker, [3, 3, 3]);
        assert_eq!(
            verdicts,
            vec![
                Some(WarpgateVerdict::Pending),
                Some(WarpgateVerdict::Pending),
                Some(WarpgateVerdict::Locked {
                    continent: Continent::Indar,
                    faction: Faction::Tr,
                }),
            ]
        );
        assert!(tracker.pending_for(ZoneId(2)).is_empty());
    }

    #[test]
    fn mixed_triple_opens_and_clears_buffer() {
        let mut tracker = WarpgateTracker::default();
        let verdicts = feed(&mut tracker, [1, 2, 3]);
        assert_eq!(
            verdicts.last(),
            Some(&Some(WarpgateVerdict::Opened {
                continent: Continent::Indar
            }))
        );
        assert!(tracker.pending_for(ZoneId(2)).is_empty());
    }

    #[test]
    fn all_nc_is_not_confused_with_mixed() {
        let mut tracker = WarpgateTracker::default();
        let verdicts = feed(&mut tracker, [2, 2, 2]);
        assert_eq!(
            verdicts.last(),
            Some(&Some(WarpgateVerdict::Locked {
                continent: Continent::Indar,
                faction: Faction::Nc,
            }))
        );
    }

    #[test]
    fn non_warpgate_is_ignored() {
        let mut tracker = WarpgateTracker::default();
        assert_eq!(
            tracker.on_facility_control(FacilityId(222_280), ZoneId(2), 1, at(0)),
            None
        );
        assert!(tracker.pending_for(ZoneId(2)).is_empty());
    }

    #[test]
    fn zones_are_buffered_independently() {
        let mut tracker = WarpgateTracker::default();
        let [a, b, _] = indar_gates();
        let [x, ..] = Continent::Esamir.default_warpgates();
        tracker.on_facility_control(a, ZoneId(2), 1, at(0));
        tracker.on_facility_control(x, ZoneId(8), 1, at(0));
        assert_eq!(
            tracker.on_facility_control(b, ZoneId(2), 1, at(1)),
            Some(WarpgateVerdict::Pending)
        );
        assert_eq!(tracker.pending_for(ZoneId(2)).len(), 2);
        assert_eq!(tracker.pending_for(ZoneId(8)).len(), 1);
    }

    #[test]
    fn only_three_records_are_consumed() {
        let mut tracker = WarpgateTracker::default();
        let [a, b, c] = indar_gates();
        tracker.on_facility_control(a, ZoneId(2), 1, at(0));
        tracker.on_facility_control(b, ZoneId(2), 1, at(0));
        tracker.on_facility_control(c, ZoneId(2), 1, at(0));
        tracker.on_facility_control(a, ZoneId(2), 2, at(1));
        assert_eq!(tracker.pending_for(ZoneId(2)).len(), 1);
    }

    #[test]
    fn stray_flip_expires_before_next_lock() {
        let mut tracker = WarpgateTracker::default();
        let [a, b, c] = indar_gates();
        assert_eq!(
            tracker.on_facility_control(a, ZoneId(2), 1, at(0)),
            Some(WarpgateVerdict::Pending)
        );

        let later = 600;
        assert_eq!(
            tracker.on_facility_control(a, ZoneId(2), 3, at(later)),
            Some(WarpgateVerdict::Pending)
        );
        assert_eq!(
            tracker.on_facility_control(b, ZoneId(2), 3, at(later + 1)),
            Some(WarpgateVerdict::Pending)
        );
        assert_eq!(
            tracker.on_facility_control(c, ZoneId(2), 3, at(later + 2)),
            Some(WarpgateVerdict::Locked {
                continent: Continent::Indar,
                faction: Faction::Tr,
            })
        );
        assert!(tracker.pending_for(ZoneId(2)).is_empty());
    }
}
