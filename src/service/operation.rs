//! One live Operation: its trackers, its feed subscriptions and the async
//! glue between them.
//!
//! Trigger tasks call into [`dispatch`], which holds the state lock only for
//! the synchronous tracker call. Anything that needs an external lookup
//! (death allegiance, facility names) is spawned onto its own task so the
//! trigger keeps draining the feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use crate::config::{FunEventSettings, TrackerConfig};
use crate::domain::{
    CharacterId, EventKind, EventPoint, ExperienceCategory, FacilityAction, FacilityData,
    FacilityId, Faction, FeedEvent, NoticeBus, OperationId, Participant, RosterEntry,
    TrackerNotice, UserHandle,
};
use crate::error::TrackerError;
use crate::feed::{EventFeed, EventFilter, SubscriptionSlot};
use crate::lookup::{self, EntityLookup};
use crate::tracker::{
    AllegianceCheck, DeathOutcome, OperationState, RosterBinder, SessionPhase, VehicleTally,
};

/// Shared collaborators every live Operation needs.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Shared event feed.
    pub feed: EventFeed,
    /// Game metadata lookups.
    pub lookup: Arc<dyn EntityLookup>,
    /// Notice bus for renderers.
    pub notices: NoticeBus,
    /// The community's faction.
    pub home_faction: Faction,
    /// Fun event toggles.
    pub fun: FunEventSettings,
    /// Facility recapture window.
    pub recapture_window: TimeDelta,
    /// Automatic event point rotation period, if any.
    pub event_point_interval: Option<Duration>,
}

impl OperationContext {
    /// Builds a context from configuration and the shared collaborators.
    #[must_use]
    pub fn from_config(
        config: &TrackerConfig,
        feed: EventFeed,
        lookup: Arc<dyn EntityLookup>,
        notices: NoticeBus,
    ) -> Self {
        let event_point_interval = (config.event_point_interval_secs > 0)
            .then(|| Duration::from_secs(config.event_point_interval_secs));
        Self {
            feed,
            lookup,
            notices,
            home_faction: config.home_faction,
            fun: config.fun,
            recapture_window: config.recapture_window,
            event_point_interval,
        }
    }
}

/// Full pull view of a live Operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationSnapshot {
    /// Operation identifier.
    pub operation_id: OperationId,
    /// Operation name.
    pub name: String,
    /// Managing user, if one was named.
    pub manager: Option<UserHandle>,
    /// When the Operation was created.
    pub created_at: DateTime<Utc>,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Roster with per-participant sessions.
    pub participants: Vec<Participant>,
    /// Open event point.
    pub current_event_point: Option<EventPoint>,
    /// Closed event points, oldest first.
    pub event_points: Vec<EventPoint>,
    /// Rendered facility feed, oldest first.
    pub facility_feed: Vec<String>,
    /// Most recent capture.
    pub last_captured: Option<FacilityData>,
    /// Most recent defence.
    pub last_defended: Option<FacilityData>,
    /// Squad vehicle team-kill tallies.
    pub vehicle_tallies: Vec<VehicleTally>,
}

/// Compact view for listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationSummary {
    /// Operation identifier.
    pub operation_id: OperationId,
    /// Operation name.
    pub name: String,
    /// When the Operation was created.
    pub created_at: DateTime<Utc>,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Roster size.
    pub participants: usize,
    /// Participants currently online.
    pub online: u32,
}

#[derive(Debug)]
struct Control {
    binder: RosterBinder,
    session_trigger: SubscriptionSlot,
    rotation: Option<JoinHandle<()>>,
}

/// A live Operation.
///
/// Each Operation owns its own aggregator, binder and facility tracker;
/// nothing is shared with other Operations except the feed.
#[derive(Debug)]
pub struct LiveOperation {
    id: OperationId,
    name: String,
    manager: Option<UserHandle>,
    created_at: DateTime<Utc>,
    ctx: OperationContext,
    state: Arc<Mutex<OperationState>>,
    control: Mutex<Control>,
}

impl LiveOperation {
    /// Creates a pending Operation with an empty roster.
    #[must_use]
    pub fn new(
        id: OperationId,
        name: String,
        manager: Option<UserHandle>,
        ctx: OperationContext,
    ) -> Self {
        let binder = RosterBinder::new(
            id,
            ctx.feed.clone(),
            Arc::clone(&ctx.lookup),
            ctx.notices.clone(),
        );
        let state = OperationState::new(ctx.fun, ctx.recapture_window);
        Self {
            id,
            name,
            manager,
            created_at: Utc::now(),
            ctx,
            state: Arc::new(Mutex::new(state)),
            control: Mutex::new(Control {
                binder,
                session_trigger: SubscriptionSlot::new(),
                rotation: None,
            }),
        }
    }

    /// Operation identifier.
    #[must_use]
    pub const fn id(&self) -> OperationId {
        self.id
    }

    /// Replaces the roster and re-scopes every subscription.
    ///
    /// Returns the number of characters now watched.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationStopped`] after [`Self::stop`].
    pub async fn rebind(&self, roster: Vec<RosterEntry>) -> Result<usize, TrackerError> {
        let mut control = self.control.lock().await;
        if self.phase().await == SessionPhase::Stopped {
            return Err(TrackerError::OperationStopped(self.id));
        }
        let watched = control.binder.rebind(roster, &self.state).await;

        let characters = {
            let state = self.state.lock().await;
            (state.session.phase() == SessionPhase::Running).then(|| state.session.character_ids())
        };
        if let Some(characters) = characters {
            self.install_session_trigger(&mut control, characters);
        }
        Ok(watched)
    }

    /// Starts tracking, optionally rebinding to a final roster first.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::EmptyRoster`] if there is nobody to track
    /// and [`TrackerError::OperationStopped`] after [`Self::stop`].
    pub async fn start(
        &self,
        roster: Option<Vec<RosterEntry>>,
    ) -> Result<OperationSnapshot, TrackerError> {
        let mut control = self.control.lock().await;
        if self.phase().await == SessionPhase::Stopped {
            return Err(TrackerError::OperationStopped(self.id));
        }
        if let Some(roster) = roster {
            control.binder.rebind(roster, &self.state).await;
        }

        let characters = {
            let mut state = self.state.lock().await;
            let entries: Vec<RosterEntry> = state
                .session
                .participants()
                .iter()
                .map(|p| RosterEntry {
                    user: p.user.clone(),
                    character: p.character.clone(),
                })
                .collect();
            if !state.session.start(entries) {
                return Err(TrackerError::EmptyRoster(self.id));
            }
            state.session.character_ids()
        };

        self.install_session_trigger(&mut control, characters);
        self.install_rotation(&mut control);
        drop(control);

        tracing::info!(operation_id = %self.id, name = %self.name, "operation started");
        Ok(self.snapshot().await)
    }

    /// Closes the current event point and opens a new one.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::OperationNotStarted`] before start and
    /// [`TrackerError::OperationStopped`] after stop.
    pub async fn new_event_point(&self) -> Result<EventPoint, TrackerError> {
        let mut state = self.state.lock().await;
        match state.session.phase() {
            SessionPhase::Pending => Err(TrackerError::OperationNotStarted(self.id)),
            SessionPhase::Stopped => Err(TrackerError::OperationStopped(self.id)),
            SessionPhase::Running => {
                state.session.new_event_point();
                state.session.current_point().cloned().ok_or_else(|| {
                    TrackerError::Internal(format!("operation {} lost its event point", self.id))
                })
            }
        }
    }

    /// Stops tracking and releases every subscription. Idempotent.
    pub async fn stop(&self) -> OperationSnapshot {
        let mut control = self.control.lock().await;
        control.session_trigger.cancel();
        control.binder.cancel();
        if let Some(rotation) = control.rotation.take() {
            rotation.abort();
        }
        drop(control);

        self.state.lock().await.session.stop();
        tracing::info!(operation_id = %self.id, "operation stopped");
        self.snapshot().await
    }

    /// Full pull view.
    pub async fn snapshot(&self) -> OperationSnapshot {
        let state = self.state.lock().await;
        OperationSnapshot {
            operation_id: self.id,
            name: self.name.clone(),
            manager: self.manager.clone(),
            created_at: self.created_at,
            phase: state.session.phase(),
            participants: state.session.participants().to_vec(),
            current_event_point: state.session.current_point().cloned(),
            event_points: state.session.closed_points().to_vec(),
            facility_feed: state.facilities.feed_lines(),
            last_captured: state.facilities.last_captured().cloned(),
            last_defended: state.facilities.last_defended().cloned(),
            vehicle_tallies: state.session.vehicle_tallies().to_vec(),
        }
    }

    /// Listing view.
    pub async fn summary(&self) -> OperationSummary {
        let state = self.state.lock().await;
        OperationSummary {
            operation_id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            phase: state.session.phase(),
            participants: state.session.participants().len(),
            online: state.session.online_count(),
        }
    }

    async fn phase(&self) -> SessionPhase {
        self.state.lock().await.session.phase()
    }

    fn install_session_trigger(&self, control: &mut Control, characters: Vec<CharacterId>) {
        if characters.is_empty() {
            control.session_trigger.cancel();
            tracing::debug!(operation_id = %self.id, "no bound characters; session trigger removed");
            return;
        }
        let filter = EventFilter::new([
            EventKind::GainExperience,
            EventKind::Death,
            EventKind::PlayerFacilityCapture,
            EventKind::PlayerFacilityDefend,
        ])
        .characters(characters)
        .experience_ids(ExperienceCategory::tracked_experience_ids());

        let ctx = self.ctx.clone();
        let state = Arc::clone(&self.state);
        let operation_id = self.id;
        let handle = self.ctx.feed.add_trigger(filter, move |event| {
            let ctx = ctx.clone();
            let state = Arc::clone(&state);
            async move { dispatch(&ctx, &state, operation_id, event).await }
        });
        control.session_trigger.replace(handle);
    }

    fn install_rotation(&self, control: &mut Control) {
        if let Some(previous) = control.rotation.take() {
            previous.abort();
        }
        let Some(period) = self.ctx.event_point_interval else {
            return;
        };
        let state = Arc::clone(&self.state);
        let operation_id = self.id;
        control.rotation = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !state.lock().await.session.new_event_point() {
                    break;
                }
            }
            tracing::debug!(%operation_id, "event point rotation finished");
        }));
    }
}

/// Routes one matching feed event into the Operation's trackers.
async fn dispatch(
    ctx: &OperationContext,
    state: &Arc<Mutex<OperationState>>,
    operation_id: OperationId,
    event: FeedEvent,
) {
    match event {
        FeedEvent::GainExperience {
            character_id,
            experience_id,
            amount,
            ..
        } => {
            let Some(category) = ExperienceCategory::from_experience_id(experience_id) else {
                return;
            };
            state
                .lock()
                .await
                .session
                .handle_experience(character_id, amount, category);
        }
        FeedEvent::Death {
            character_id,
            attacker_character_id,
            attacker_vehicle_id,
            ..
        } => {
            let outcome = state.lock().await.session.handle_death(
                character_id,
                attacker_character_id,
                attacker_vehicle_id,
            );
            match outcome {
                DeathOutcome::Squad {
                    mishap: Some(mishap),
                } if ctx.fun.broadcast_vehicle_deaths => {
                    ctx.notices.publish(TrackerNotice::VehicleMishap {
                        operation_id,
                        driver: mishap.driver,
                        victim: mishap.victim,
                        message: mishap.message,
                    });
                }
                DeathOutcome::NeedsAllegiance(check) => {
                    tokio::spawn(classify_death(ctx.clone(), Arc::clone(state), check));
                }
                DeathOutcome::Ignored | DeathOutcome::Settled | DeathOutcome::Squad { .. } => {}
            }
        }
        FeedEvent::PlayerFacilityCapture {
            facility_id,
            timestamp,
            ..
        } => {
            let logical = {
                let mut guard = state.lock().await;
                let logical = guard
                    .facilities
                    .on_facility_capture(facility_id, timestamp)
                    .is_logical();
                if logical {
                    guard.session.record_capture();
                }
                logical
            };
            if logical {
                tokio::spawn(announce_facility(
                    ctx.clone(),
                    Arc::clone(state),
                    operation_id,
                    facility_id,
                    FacilityAction::Captured,
                    timestamp,
                ));
            }
        }
        FeedEvent::PlayerFacilityDefend {
            facility_id,
            timestamp,
            ..
        } => {
            let logical = state
                .lock()
                .await
                .facilities
                .on_facility_defend(facility_id, timestamp)
                .is_logical();
            if logical {
                tokio::spawn(announce_facility(
                    ctx.clone(),
                    Arc::clone(state),
                    operation_id,
                    facility_id,
                    FacilityAction::Defended,
                    timestamp,
                ));
            }
        }
        other => {
            tracing::trace!(%operation_id, kind = ?other.kind(), "event not handled by operations");
        }
    }
}

async fn classify_death(
    ctx: OperationContext,
    state: Arc<Mutex<OperationState>>,
    check: AllegianceCheck,
) {
    match lookup::bounded(ctx.lookup.character_faction(check.attacker())).await {
        Ok(Some(faction)) => {
            state
                .lock()
                .await
                .session
                .apply_allegiance(&check, faction, ctx.home_faction);
        }
        Ok(None) => {
            tracing::debug!(attacker = %check.attacker(), "attacker unknown; death left unclassified");
        }
        Err(e) => {
            tracing::warn!(
                attacker = %check.attacker(),
                error = %e,
                "faction lookup failed; death left unclassified"
            );
        }
    }
}

async fn announce_facility(
    ctx: OperationContext,
    state: Arc<Mutex<OperationState>>,
    operation_id: OperationId,
    facility_id: FacilityId,
    action: FacilityAction,
    timestamp: DateTime<Utc>,
) {
    let region = match lookup::bounded(ctx.lookup.map_region(facility_id)).await {
        Ok(region) => region,
        Err(e) => {
            tracing::warn!(%facility_id, error = %e, "facility region lookup failed");
            None
        }
    };
    if let Some(region) = &region {
        state
            .lock()
            .await
            .facilities
            .resolve_region(facility_id, region);
    }
    ctx.notices.publish(TrackerNotice::Facility {
        operation_id,
        facility_id,
        action,
        region,
        timestamp,
    });
}
