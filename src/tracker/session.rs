//! Per-participant statistics and time-bucketed session snapshots.
//!
//! [`SessionAggregator`] turns typed gameplay notifications into
//! [`UserSession`] counters and [`EventPoint`] buckets for one live
//! Operation. Every handler is synchronous and short; the only step that
//! needs an external lookup (death allegiance) is split into
//! [`SessionAggregator::handle_death`], which hands back an
//! [`AllegianceCheck`], and [`SessionAggregator::apply_allegiance`], which
//! re-validates the check before writing.
//!
//! Events that reference characters outside the roster are expected (feed
//! subscriptions are coarse and change asynchronously) and are dropped
//! without touching any state.

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use utoipa::ToSchema;

use super::fun::{self, SquadVehicle, VehicleMishap, VehicleTally};
use crate::config::FunEventSettings;
use crate::domain::{
    CharacterId, EventPoint, ExperienceCategory, Faction, Participant, RosterEntry, UserHandle,
    UserSession,
};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Roster known, tracking not started.
    Pending,
    /// Tracking events.
    Running,
    /// Terminal; no further events are processed.
    Stopped,
}

/// A death whose attacker is outside the roster and needs a faction
/// lookup before it can be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllegianceCheck {
    generation: u64,
    victim: CharacterId,
    attacker: CharacterId,
}

impl AllegianceCheck {
    /// Character whose faction must be looked up.
    #[must_use]
    pub const fn attacker(&self) -> CharacterId {
        self.attacker
    }

    /// Participant character that died.
    #[must_use]
    pub const fn victim(&self) -> CharacterId {
        self.victim
    }
}

/// Result of [`SessionAggregator::handle_death`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathOutcome {
    /// Victim not in the roster, or the session is not running.
    Ignored,
    /// Counted; nothing left to classify (environment or self-inflicted).
    Settled,
    /// Killed by another participant.
    Squad {
        /// Vehicle team-kill details, when fun events apply.
        mishap: Option<VehicleMishap>,
    },
    /// Counted; allegiance of the attacker still unknown.
    NeedsAllegiance(AllegianceCheck),
}

/// Statistics accumulator for one live Operation.
#[derive(Debug)]
pub struct SessionAggregator {
    participants: Vec<Participant>,
    current: Option<EventPoint>,
    closed: Vec<EventPoint>,
    phase: SessionPhase,
    generation: u64,
    fun: FunEventSettings,
    vehicle_tallies: Vec<VehicleTally>,
    rng: SmallRng,
}

impl SessionAggregator {
    /// Creates an aggregator with an empty roster.
    #[must_use]
    pub fn new(fun: FunEventSettings) -> Self {
        Self {
            participants: Vec::new(),
            current: None,
            closed: Vec::new(),
            phase: SessionPhase::Pending,
            generation: 0,
            fun,
            vehicle_tallies: Vec::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Replaces the roster.
    ///
    /// Participants already present (matched by chat user) keep their
    /// session and presence; a participant whose bound character changed
    /// is marked offline until proven otherwise.
    pub fn replace_roster(&mut self, entries: Vec<RosterEntry>) {
        let mut previous = std::mem::take(&mut self.participants);
        self.participants = entries
            .into_iter()
            .map(|entry| match previous.iter().position(|p| p.user.id == entry.user.id) {
                Some(idx) => {
                    let mut kept = previous.swap_remove(idx);
                    if kept.character != entry.character {
                        kept.online = false;
                    }
                    kept.user = entry.user;
                    kept.character = entry.character;
                    kept
                }
                None => Participant::new(entry),
            })
            .collect();
    }

    /// Locks in `entries` and starts tracking.
    ///
    /// Returns `false` (and changes nothing) if `entries` is empty.
    /// Calling it again re-initialises every session.
    pub fn start(&mut self, entries: Vec<RosterEntry>) -> bool {
        if entries.is_empty() {
            tracing::warn!("not starting session tracking: no participants");
            return false;
        }
        self.replace_roster(entries);
        for participant in &mut self.participants {
            participant.session = UserSession::default();
        }
        self.closed.clear();
        self.vehicle_tallies.clear();
        self.current = Some(EventPoint::new(
            Utc::now(),
            saturating_u32(self.participants.len()),
        ));
        self.phase = SessionPhase::Running;
        self.generation = self.generation.saturating_add(1);
        tracing::info!(
            participants = self.participants.len(),
            "session tracking started"
        );
        true
    }

    /// Ends tracking. Terminal and idempotent.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Stopped {
            return;
        }
        self.phase = SessionPhase::Stopped;
        self.generation = self.generation.saturating_add(1);
        tracing::info!(
            event_points = self.closed.len(),
            "session tracking stopped"
        );
    }

    /// Routes an experience gain by category.
    ///
    /// Returns `true` if the event was accounted for.
    pub fn handle_experience(
        &mut self,
        character: CharacterId,
        amount: u32,
        category: ExperienceCategory,
    ) -> bool {
        if category == ExperienceCategory::Kill {
            return self.handle_kill(character, amount);
        }
        let Some((point, participant)) = self.running_entry(character) else {
            return false;
        };
        let session = &mut participant.session;
        let amount = u64::from(amount);
        match category {
            ExperienceCategory::SquadVehicleRepair => {
                session.repairs = session.repairs.saturating_add(amount);
                point.repairs = point.repairs.saturating_add(amount);
            }
            ExperienceCategory::SquadResupply => {
                session.resupplies = session.resupplies.saturating_add(amount);
            }
            ExperienceCategory::SquadHeal => {
                session.heals = session.heals.saturating_add(amount);
            }
            ExperienceCategory::SquadRevive => {
                session.revives = session.revives.saturating_add(1);
                session.score = session.score.saturating_add(amount);
                point.revives = point.revives.saturating_add(1);
            }
            ExperienceCategory::Kill => {}
        }
        true
    }

    /// Counts a kill by a participant.
    pub fn handle_kill(&mut self, killer: CharacterId, amount: u32) -> bool {
        let Some((point, participant)) = self.running_entry(killer) else {
            return false;
        };
        point.kills = point.kills.saturating_add(1);
        let session = &mut participant.session;
        session.kda.kills = session.kda.kills.saturating_add(1);
        session.score = session.score.saturating_add(u64::from(amount));
        true
    }

    /// Counts a participant's death and classifies it as far as the roster
    /// allows.
    pub fn handle_death(
        &mut self,
        victim: CharacterId,
        attacker: CharacterId,
        attacker_vehicle_id: u32,
    ) -> DeathOutcome {
        let Some((point, participant)) = self.running_entry(victim) else {
            return DeathOutcome::Ignored;
        };
        point.deaths = point.deaths.saturating_add(1);
        let kda = &mut participant.session.kda;
        kda.deaths = kda.deaths.saturating_add(1);

        if attacker.is_environment() || attacker == victim {
            return DeathOutcome::Settled;
        }

        let (Some(victim_idx), Some(attacker_idx)) =
            (self.index_of(victim), self.index_of(attacker))
        else {
            return DeathOutcome::NeedsAllegiance(AllegianceCheck {
                generation: self.generation,
                victim,
                attacker,
            });
        };

        tracing::debug!(%victim, %attacker, "killed by squadmate");
        if let Some(p) = self.participants.get_mut(victim_idx) {
            p.session.kda.deaths_by_squad = p.session.kda.deaths_by_squad.saturating_add(1);
        }
        if let Some(p) = self.participants.get_mut(attacker_idx) {
            p.session.kda.killed_squad = p.session.kda.killed_squad.saturating_add(1);
        }
        let mishap = self.vehicle_mishap(victim_idx, attacker_idx, attacker, attacker_vehicle_id);
        DeathOutcome::Squad { mishap }
    }

    /// Completes a death classification once the attacker's faction is
    /// known.
    ///
    /// The check is discarded if the session was restarted or stopped
    /// since it was issued, or if the victim left the roster.
    pub fn apply_allegiance(
        &mut self,
        check: &AllegianceCheck,
        attacker_faction: Faction,
        home_faction: Faction,
    ) -> bool {
        if check.generation != self.generation || self.phase != SessionPhase::Running {
            tracing::debug!(victim = %check.victim, "discarding stale allegiance check");
            return false;
        }
        let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.is_character(check.victim))
        else {
            tracing::debug!(victim = %check.victim, "victim left the roster");
            return false;
        };
        let kda = &mut participant.session.kda;
        if attacker_faction == home_faction {
            kda.deaths_by_allies = kda.deaths_by_allies.saturating_add(1);
        } else {
            kda.deaths_by_enemies = kda.deaths_by_enemies.saturating_add(1);
        }
        true
    }

    /// Updates a participant's presence.
    ///
    /// Returns the participant's chat identity if it matched. Presence is
    /// tracked before start too; after stop nothing changes.
    pub fn handle_login(&mut self, character: CharacterId, online: bool) -> Option<UserHandle> {
        if self.phase == SessionPhase::Stopped {
            return None;
        }
        let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.is_character(character))
        else {
            tracing::debug!(%character, "presence update for unknown character");
            return None;
        };
        participant.online = online;
        tracing::debug!(
            user = %participant.user.display_name,
            online,
            "participant presence updated"
        );
        Some(participant.user.clone())
    }

    /// Closes the current event point and opens a fresh one counting the
    /// participants currently online.
    pub fn new_event_point(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            tracing::warn!(phase = ?self.phase, "event point rotation outside a running session");
            return false;
        }
        let online = self.online_count();
        if let Some(closed) = self.current.replace(EventPoint::new(Utc::now(), online)) {
            self.closed.push(closed);
        }
        tracing::debug!(active_participants = online, "new event point");
        true
    }

    /// Counts one logical facility capture in the current event point.
    pub fn record_capture(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        let Some(point) = self.current.as_mut() else {
            return false;
        };
        point.captures = point.captures.saturating_add(1);
        true
    }

    /// Roster, in signup order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Participant bound to `character`.
    #[must_use]
    pub fn participant(&self, character: CharacterId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_character(character))
    }

    /// Characters bound to roster members.
    #[must_use]
    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.participants
            .iter()
            .filter_map(Participant::character_id)
            .collect()
    }

    /// Participants currently online.
    #[must_use]
    pub fn online_count(&self) -> u32 {
        saturating_u32(self.participants.iter().filter(|p| p.online).count())
    }

    /// The open event point, once started.
    #[must_use]
    pub fn current_point(&self) -> Option<&EventPoint> {
        self.current.as_ref()
    }

    /// Closed event points, oldest first.
    #[must_use]
    pub fn closed_points(&self) -> &[EventPoint] {
        &self.closed
    }

    /// Squad vehicle team-kill tallies.
    #[must_use]
    pub fn vehicle_tallies(&self) -> &[VehicleTally] {
        &self.vehicle_tallies
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn index_of(&self, character: CharacterId) -> Option<usize> {
        self.participants.iter().position(|p| p.is_character(character))
    }

    /// Current event point and the participant bound to `character`, if
    /// the session is running and the character is in the roster.
    fn running_entry(
        &mut self,
        character: CharacterId,
    ) -> Option<(&mut EventPoint, &mut Participant)> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        let point = self.current.as_mut()?;
        let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.is_character(character))
        else {
            tracing::debug!(%character, "dropping event for character outside the roster");
            return None;
        };
        Some((point, participant))
    }

    fn vehicle_mishap(
        &mut self,
        victim_idx: usize,
        attacker_idx: usize,
        attacker: CharacterId,
        attacker_vehicle_id: u32,
    ) -> Option<VehicleMishap> {
        if !self.fun.vehicle_death_events && !self.fun.broadcast_vehicle_deaths {
            return None;
        }
        let vehicle = SquadVehicle::from_vehicle_id(attacker_vehicle_id)?;
        let driver = self.participants.get(attacker_idx)?.user.clone();

        match self
            .vehicle_tallies
            .iter_mut()
            .find(|t| t.driver == attacker && t.vehicle == vehicle)
        {
            Some(tally) => tally.team_kills = tally.team_kills.saturating_add(1),
            None => self.vehicle_tallies.push(VehicleTally {
                driver: attacker,
                vehicle,
                team_kills: 1,
                message: fun::driver_line(vehicle, &mut self.rng),
            }),
        }

        let record_line = self.fun.vehicle_death_events;
        let victim = self.participants.get_mut(victim_idx)?;
        let message = fun::mishap_line(vehicle, &driver.display_name, &mut self.rng);
        if record_line {
            victim.session.fun_events.push(message.clone());
        }
        Some(VehicleMishap {
            driver,
            victim: victim.user.clone(),
            vehicle,
            message,
        })
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::CharacterRef;

    fn entry(user: u64, character: Option<u64>) -> RosterEntry {
        RosterEntry {
            user: UserHandle {
                id: user,
                display_name: format!("user-{user}"),
            },
            character: character.map(|id| CharacterRef {
                id: CharacterId(id),
                name: format!("char-{id}"),
            }),
        }
    }

    fn roster() -> Vec<RosterEntry> {
        vec![entry(1, Some(101)), entry(2, Some(102)), entry(3, None)]
    }

    fn started() -> SessionAggregator {
        let mut agg = SessionAggregator::new(FunEventSettings::default());
        assert!(agg.start(roster()));
        agg
    }

    fn session(agg: &SessionAggregator, character: u64) -> UserSession {
        let Some(p) = agg.participant(CharacterId(character)) else {
            panic!("participant {character} missing");
        };
        p.session.clone()
    }

    fn current(agg: &SessionAggregator) -> EventPoint {
        let Some(point) = agg.current_point() else {
            panic!("no current event point");
        };
        point.clone()
    }

    #[test]
    fn start_with_empty_roster_is_noop() {
        let mut agg = SessionAggregator::new(FunEventSettings::default());
        assert!(!agg.start(Vec::new()));
        assert_eq!(agg.phase(), SessionPhase::Pending);
        assert!(agg.current_point().is_none());
    }

    #[test]
    fn start_counts_whole_roster_as_active() {
        let agg = started();
        assert_eq!(current(&agg).active_participants, 3);
        assert_eq!(agg.character_ids(), vec![CharacterId(101), CharacterId(102)]);
    }

    #[test]
    fn revive_counts_events_and_scores_amount() {
        let mut agg = started();
        for amount in [75, 100, 25] {
            assert!(agg.handle_experience(
                CharacterId(101),
                amount,
                ExperienceCategory::SquadRevive
            ));
        }
        let s = session(&agg, 101);
        assert_eq!(s.revives, 3);
        assert_eq!(s.score, 200);
        assert_eq!(current(&agg).revives, 3);
    }

    #[test]
    fn only_kills_and_revives_add_score() {
        let mut agg = started();
        let c = CharacterId(101);
        agg.handle_experience(c, 50, ExperienceCategory::SquadHeal);
        agg.handle_experience(c, 40, ExperienceCategory::SquadResupply);
        agg.handle_experience(c, 30, ExperienceCategory::SquadVehicleRepair);
        assert_eq!(session(&agg, 101).score, 0);

        agg.handle_experience(c, 100, ExperienceCategory::Kill);
        agg.handle_experience(c, 75, ExperienceCategory::SquadRevive);
        let s = session(&agg, 101);
        assert_eq!(s.score, 175);
        assert_eq!(s.heals, 50);
        assert_eq!(s.resupplies, 40);
        assert_eq!(s.repairs, 30);
        assert_eq!(s.kda.kills, 1);

        let point = current(&agg);
        assert_eq!(point.repairs, 30);
        assert_eq!(point.kills, 1);
        assert_eq!(point.revives, 1);
    }

    #[test]
    fn unknown_character_changes_nothing() {
        let mut agg = started();
        let before_point = current(&agg);
        let before: Vec<Participant> = agg.participants().to_vec();

        let stranger = CharacterId(999);
        assert!(!agg.handle_experience(stranger, 100, ExperienceCategory::SquadRevive));
        assert!(!agg.handle_kill(stranger, 100));
        assert_eq!(
            agg.handle_death(stranger, CharacterId(101), 0),
            DeathOutcome::Ignored
        );
        assert_eq!(agg.handle_login(stranger, true), None);

        assert_eq!(current(&agg), before_point);
        assert_eq!(agg.participants(), before.as_slice());
    }

    #[test]
    fn squad_death_needs_no_lookup() {
        let mut agg = SessionAggregator::new(FunEventSettings {
            vehicle_death_events: false,
            broadcast_vehicle_deaths: false,
        });
        agg.start(roster());

        let outcome = agg.handle_death(CharacterId(101), CharacterId(102), 0);
        assert_eq!(outcome, DeathOutcome::Squad { mishap: None });
        assert_eq!(session(&agg, 101).kda.deaths_by_squad, 1);
        assert_eq!(session(&agg, 101).kda.deaths, 1);
        assert_eq!(session(&agg, 102).kda.killed_squad, 1);
        assert_eq!(current(&agg).deaths, 1);
    }

    #[test]
    fn galaxy_team_kill_records_fun_event() {
        let mut agg = started();
        let DeathOutcome::Squad { mishap: Some(mishap) } =
            agg.handle_death(CharacterId(101), CharacterId(102), 11)
        else {
            panic!("expected a vehicle mishap");
        };
        assert_eq!(mishap.vehicle, SquadVehicle::Galaxy);
        assert_eq!(mishap.driver.id, 2);
        assert!(mishap.message.contains("user-2"));
        assert_eq!(session(&agg, 101).fun_events, vec![mishap.message]);
        assert_eq!(agg.vehicle_tallies().len(), 1);
    }

    #[test]
    fn repeat_team_kills_keep_the_first_driver_line() {
        let mut agg = started();
        agg.handle_death(CharacterId(101), CharacterId(102), 11);
        let Some(first) = agg.vehicle_tallies().first().map(|t| t.message.clone()) else {
            panic!("expected a vehicle tally");
        };
        assert!(!first.is_empty());

        agg.handle_death(CharacterId(101), CharacterId(102), 11);
        let Some(tally) = agg.vehicle_tallies().first() else {
            panic!("expected a vehicle tally");
        };
        assert_eq!(tally.team_kills, 2);
        assert_eq!(tally.message, first);
        assert_eq!(session(&agg, 101).fun_events.len(), 2);
    }

    #[test]
    fn environment_death_is_settled() {
        let mut agg = started();
        assert_eq!(
            agg.handle_death(CharacterId(101), CharacterId(0), 0),
            DeathOutcome::Settled
        );
        assert_eq!(session(&agg, 101).kda.deaths, 1);
        assert_eq!(current(&agg).deaths, 1);
    }

    #[test]
    fn outside_attacker_needs_allegiance() {
        let mut agg = started();
        let DeathOutcome::NeedsAllegiance(check) =
            agg.handle_death(CharacterId(101), CharacterId(555), 0)
        else {
            panic!("expected an allegiance check");
        };
        assert_eq!(check.attacker(), CharacterId(555));
        assert_eq!(session(&agg, 101).kda.deaths, 1);

        assert!(agg.apply_allegiance(&check, Faction::Tr, Faction::Nc));
        assert!(agg.apply_allegiance(&check, Faction::Nc, Faction::Nc));
        let kda = session(&agg, 101).kda;
        assert_eq!(kda.deaths_by_enemies, 1);
        assert_eq!(kda.deaths_by_allies, 1);
    }

    #[test]
    fn allegiance_after_stop_is_discarded() {
        let mut agg = started();
        let DeathOutcome::NeedsAllegiance(check) =
            agg.handle_death(CharacterId(101), CharacterId(555), 0)
        else {
            panic!("expected an allegiance check");
        };
        agg.stop();
        assert!(!agg.apply_allegiance(&check, Faction::Tr, Faction::Nc));
        assert_eq!(session(&agg, 101).kda.deaths_by_enemies, 0);
    }

    #[test]
    fn allegiance_survives_rotation() {
        let mut agg = started();
        let DeathOutcome::NeedsAllegiance(check) =
            agg.handle_death(CharacterId(101), CharacterId(555), 0)
        else {
            panic!("expected an allegiance check");
        };
        agg.new_event_point();
        assert!(agg.apply_allegiance(&check, Faction::Vs, Faction::Nc));
    }

    #[test]
    fn rotation_twice_yields_zeroed_second_point() {
        let mut agg = started();
        agg.handle_login(CharacterId(101), true);
        agg.handle_kill(CharacterId(101), 100);

        assert!(agg.new_event_point());
        assert!(agg.new_event_point());

        let closed = agg.closed_points();
        assert_eq!(closed.len(), 2);
        let Some(first) = closed.first() else {
            panic!("missing first point");
        };
        let Some(second) = closed.get(1) else {
            panic!("missing second point");
        };
        assert_eq!(first.kills, 1);
        assert!(second.is_quiet());
        assert_eq!(second.active_participants, 1);
        assert_eq!(current(&agg).active_participants, 1);
    }

    #[test]
    fn stop_is_terminal() {
        let mut agg = started();
        agg.stop();
        agg.stop();
        assert!(!agg.handle_kill(CharacterId(101), 100));
        assert!(!agg.new_event_point());
        assert_eq!(agg.handle_login(CharacterId(101), true), None);
        assert_eq!(agg.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn presence_tracked_before_start() {
        let mut agg = SessionAggregator::new(FunEventSettings::default());
        agg.replace_roster(roster());
        assert!(agg.handle_login(CharacterId(102), true).is_some());
        assert_eq!(agg.online_count(), 1);
        assert!(!agg.handle_kill(CharacterId(102), 100));
    }

    #[test]
    fn replace_roster_keeps_existing_sessions() {
        let mut agg = started();
        agg.handle_login(CharacterId(101), true);
        agg.handle_kill(CharacterId(101), 100);

        agg.replace_roster(vec![entry(1, Some(101)), entry(4, Some(104))]);
        assert_eq!(agg.participants().len(), 2);
        let Some(kept) = agg.participant(CharacterId(101)) else {
            panic!("kept participant missing");
        };
        assert!(kept.online);
        assert_eq!(kept.session.kda.kills, 1);
        assert!(agg.participant(CharacterId(102)).is_none());
    }

    #[test]
    fn capture_counts_in_current_point() {
        let mut agg = started();
        assert!(agg.record_capture());
        assert_eq!(current(&agg).captures, 1);
    }
}
