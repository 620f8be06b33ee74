//! World-level continent tracking: lock events, warpgate inference and
//! lock reports.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::config::TrackerConfig;
use crate::domain::{
    ContinentLock, EventKind, Faction, FeedEvent, NoticeBus, TrackerNotice, WorldId,
};
use crate::feed::{EventFeed, EventFilter, SubscriptionSlot};
use crate::tracker::{ContinentLockRegistry, WarpgateTracker, WarpgateVerdict};

/// Where a lock report goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Returned to the caller only.
    #[default]
    Reply,
    /// Also broadcast on the configured channel.
    Broadcast,
}

/// A rendered lock report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LockReport {
    /// Rendered text.
    pub text: String,
    /// Locks the report covers, oldest first.
    pub locks: Vec<ContinentLock>,
    /// Channel the report was broadcast to, if it was.
    pub broadcast_channel: Option<String>,
}

#[derive(Debug, Default)]
struct ContinentState {
    warpgates: WarpgateTracker,
    locks: ContinentLockRegistry,
}

/// Tracks continent locks and openings on one world.
#[derive(Debug)]
pub struct ContinentTracker {
    world_id: WorldId,
    channel: String,
    notices: NoticeBus,
    state: Arc<Mutex<ContinentState>>,
    trigger: Mutex<SubscriptionSlot>,
}

impl ContinentTracker {
    /// Creates a tracker for the configured world.
    #[must_use]
    pub fn new(config: &TrackerConfig, notices: NoticeBus) -> Self {
        Self {
            world_id: config.world_id,
            channel: config.continent_channel.clone(),
            notices,
            state: Arc::new(Mutex::new(ContinentState {
                warpgates: WarpgateTracker::new(config.warpgates.clone()),
                locks: ContinentLockRegistry::new(),
            })),
            trigger: Mutex::new(SubscriptionSlot::new()),
        }
    }

    /// Subscribes to lock and facility control events of the tracked world,
    /// replacing any earlier subscription.
    pub async fn subscribe(&self, feed: &EventFeed) {
        let filter = EventFilter::new([EventKind::ContinentLock, EventKind::FacilityControl])
            .worlds([self.world_id]);
        let state = Arc::clone(&self.state);
        let notices = self.notices.clone();
        let channel = self.channel.clone();
        let handle = feed.add_trigger(filter, move |event| {
            let state = Arc::clone(&state);
            let notices = notices.clone();
            let channel = channel.clone();
            async move { handle_event(&state, &notices, &channel, event).await }
        });
        self.trigger.lock().await.replace(handle);
        tracing::info!(world_id = %self.world_id, "continent tracking subscribed");
    }

    /// Drops the feed subscription. Idempotent.
    pub async fn unsubscribe(&self) -> bool {
        self.trigger.lock().await.cancel()
    }

    /// Continent locked longest ago.
    pub async fn oldest_lock(&self) -> Option<ContinentLock> {
        self.state.lock().await.locks.oldest_lock().cloned()
    }

    /// All recorded locks, oldest first.
    pub async fn sorted_locks(&self) -> Vec<ContinentLock> {
        self.state.lock().await.locks.sorted_locks()
    }

    /// Renders the oldest-lock report and delivers it.
    pub async fn report_oldest(&self, delivery: Delivery) -> LockReport {
        let (text, locks) = {
            let state = self.state.lock().await;
            let locks: Vec<ContinentLock> = state.locks.oldest_lock().cloned().into_iter().collect();
            (state.locks.render_oldest(), locks)
        };
        self.deliver(text, locks, delivery)
    }

    /// Renders the sorted-lock report and delivers it.
    pub async fn report_sorted(&self, delivery: Delivery) -> LockReport {
        let (text, locks) = {
            let state = self.state.lock().await;
            (state.locks.render_sorted(), state.locks.sorted_locks())
        };
        self.deliver(text, locks, delivery)
    }

    /// Applies one event directly, bypassing the feed. Events from other
    /// worlds are ignored.
    pub async fn apply(&self, event: FeedEvent) {
        if event.world_id() != self.world_id {
            return;
        }
        handle_event(&self.state, &self.notices, &self.channel, event).await;
    }

    fn deliver(&self, text: String, locks: Vec<ContinentLock>, delivery: Delivery) -> LockReport {
        let broadcast_channel = match delivery {
            Delivery::Reply => None,
            Delivery::Broadcast => {
                self.notices.publish(TrackerNotice::LockReport {
                    channel: self.channel.clone(),
                    text: text.clone(),
                });
                Some(self.channel.clone())
            }
        };
        LockReport {
            text,
            locks,
            broadcast_channel,
        }
    }
}

async fn handle_event(
    state: &Arc<Mutex<ContinentState>>,
    notices: &NoticeBus,
    channel: &str,
    event: FeedEvent,
) {
    match event {
        FeedEvent::ContinentLock {
            zone_id,
            triggering_faction,
            timestamp,
            ..
        } => {
            let faction = Faction::from_id(triggering_faction);
            let (continent, report) = {
                let mut guard = state.lock().await;
                let continent = guard.locks.record_lock(zone_id, timestamp, faction);
                (continent, guard.locks.render_sorted())
            };
            let Some(continent) = continent else {
                return;
            };
            notices.publish(TrackerNotice::ContinentLocked {
                continent,
                faction,
                timestamp,
            });
            notices.publish(TrackerNotice::LockReport {
                channel: channel.to_string(),
                text: report,
            });
        }
        FeedEvent::FacilityControl {
            facility_id,
            zone_id,
            new_faction_id,
            timestamp,
            ..
        } => {
            let mut guard = state.lock().await;
            let Some(verdict) =
                guard
                    .warpgates
                    .on_facility_control(facility_id, zone_id, new_faction_id, timestamp)
            else {
                return;
            };
            match verdict {
                WarpgateVerdict::Pending => {}
                WarpgateVerdict::Locked { continent, faction } => {
                    // The ContinentLock event announces; this only keeps
                    // the registry current if that event is missed.
                    guard
                        .locks
                        .record_lock(continent.zone_id(), timestamp, Some(faction));
                }
                WarpgateVerdict::Opened { continent } => {
                    drop(guard);
                    notices.publish(TrackerNotice::ContinentOpened {
                        continent,
                        timestamp,
                    });
                }
            }
        }
        other => {
            tracing::trace!(kind = ?other.kind(), "event not handled by continent tracker");
        }
    }
}
