//! Keeps the feed's presence subscriptions in step with the roster.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::OperationState;
use crate::domain::{
    CharacterId, EventKind, NoticeBus, OperationId, RosterEntry, TrackerNotice,
};
use crate::feed::{EventFeed, EventFilter, SubscriptionHandle, SubscriptionSlot};
use crate::lookup::{self, EntityLookup};

/// Owns the login and logout subscriptions of one live Operation.
///
/// At most one of each is active at any time; [`RosterBinder::rebind`]
/// always replaces both.
#[derive(Debug)]
pub struct RosterBinder {
    operation_id: OperationId,
    feed: EventFeed,
    lookup: Arc<dyn EntityLookup>,
    notices: NoticeBus,
    login: SubscriptionSlot,
    logout: SubscriptionSlot,
}

impl RosterBinder {
    /// Creates a binder with no active subscriptions.
    #[must_use]
    pub fn new(
        operation_id: OperationId,
        feed: EventFeed,
        lookup: Arc<dyn EntityLookup>,
        notices: NoticeBus,
    ) -> Self {
        Self {
            operation_id,
            feed,
            lookup,
            notices,
            login: SubscriptionSlot::new(),
            logout: SubscriptionSlot::new(),
        }
    }

    /// Replaces the roster and re-scopes the presence subscriptions.
    ///
    /// Characters not yet known to be online are queried first, since a
    /// login that happened before the subscription exists never fires.
    /// The queries run concurrently. Lookup failures are logged and leave
    /// the participant offline.
    ///
    /// Returns the number of characters the new subscriptions watch.
    pub async fn rebind(
        &mut self,
        roster: Vec<RosterEntry>,
        state: &Arc<Mutex<OperationState>>,
    ) -> usize {
        let (characters, unknown_presence) = {
            let mut guard = state.lock().await;
            guard.session.replace_roster(roster);
            let unknown: Vec<CharacterId> = guard
                .session
                .participants()
                .iter()
                .filter(|p| !p.online)
                .filter_map(|p| p.character_id())
                .collect();
            (guard.session.character_ids(), unknown)
        };

        let cancelled = self.cancel();
        if characters.is_empty() {
            tracing::info!(
                operation_id = %self.operation_id,
                cancelled,
                "roster has no bound characters; presence tracking disabled"
            );
            return 0;
        }

        let mut lookups = JoinSet::new();
        for character in unknown_presence {
            let lookup = Arc::clone(&self.lookup);
            lookups.spawn(async move {
                (character, lookup::bounded(lookup.is_online(character)).await)
            });
        }
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((character, Ok(true))) => {
                    apply_presence(state, &self.notices, self.operation_id, character, true).await;
                }
                Ok((_, Ok(false))) => {}
                Ok((character, Err(e))) => {
                    tracing::warn!(
                        operation_id = %self.operation_id,
                        character_id = %character,
                        error = %e,
                        "online status lookup failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        operation_id = %self.operation_id,
                        error = %e,
                        "online status lookup task failed"
                    );
                }
            }
        }

        self.login
            .replace(self.presence_trigger(EventKind::PlayerLogin, &characters, state));
        self.logout
            .replace(self.presence_trigger(EventKind::PlayerLogout, &characters, state));

        tracing::info!(
            operation_id = %self.operation_id,
            characters = characters.len(),
            "roster rebound"
        );
        characters.len()
    }

    /// Cancels both presence subscriptions. Safe to call repeatedly.
    ///
    /// Returns `true` if anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        let login = self.login.cancel();
        let logout = self.logout.cancel();
        login || logout
    }

    /// Whether presence subscriptions are installed.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.login.is_active() && self.logout.is_active()
    }

    fn presence_trigger(
        &self,
        kind: EventKind,
        characters: &[CharacterId],
        state: &Arc<Mutex<OperationState>>,
    ) -> SubscriptionHandle {
        let online = kind == EventKind::PlayerLogin;
        let filter = EventFilter::new([kind]).characters(characters.iter().copied());
        let state = Arc::clone(state);
        let notices = self.notices.clone();
        let operation_id = self.operation_id;

        self.feed.add_trigger(filter, move |event| {
            let state = Arc::clone(&state);
            let notices = notices.clone();
            async move {
                if let Some(character) = event.characters().first().copied() {
                    apply_presence(&state, &notices, operation_id, character, online).await;
                }
            }
        })
    }
}

async fn apply_presence(
    state: &Arc<Mutex<OperationState>>,
    notices: &NoticeBus,
    operation_id: OperationId,
    character: CharacterId,
    online: bool,
) {
    let user = state.lock().await.session.handle_login(character, online);
    if let Some(user) = user {
        notices.publish(TrackerNotice::PresenceChanged {
            operation_id,
            user,
            online,
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::FunEventSettings;
    use crate::domain::{CharacterRef, FeedEvent, UserHandle, WorldId};
    use crate::lookup::StaticLookup;
    use chrono::{TimeDelta, Utc};
    use std::time::Duration;

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

    fn setup(lookup: StaticLookup) -> (EventFeed, RosterBinder, Arc<Mutex<OperationState>>) {
        let feed = EventFeed::new(64);
        let binder = RosterBinder::new(
            OperationId::new(),
            feed.clone(),
            Arc::new(lookup),
            NoticeBus::new(16),
        );
        let state = Arc::new(Mutex::new(OperationState::new(
            FunEventSettings::default(),
            TimeDelta::minutes(15),
        )));
        (feed, binder, state)
    }

    async fn online(state: &Arc<Mutex<OperationState>>, character: u64) -> bool {
        state
            .lock()
            .await
            .session
            .participant(CharacterId(character))
            .is_some_and(|p| p.online)
    }

    #[tokio::test]
    async fn rebind_installs_one_login_and_one_logout_trigger() {
        let (feed, mut binder, state) = setup(StaticLookup::new());
        binder.rebind(vec![entry(1, Some(101))], &state).await;
        binder
            .rebind(vec![entry(1, Some(101)), entry(2, Some(102))], &state)
            .await;
        assert_eq!(feed.trigger_count(), 2);
        assert!(binder.is_bound());
        let upstream = feed.upstream_subscription();
        assert!(upstream.characters.contains(&CharacterId(102)));
    }

    #[tokio::test]
    async fn rebind_without_bound_characters_leaves_no_triggers() {
        let (feed, mut binder, state) = setup(StaticLookup::new());
        binder.rebind(vec![entry(1, Some(101))], &state).await;
        assert_eq!(feed.trigger_count(), 2);

        let watched = binder.rebind(vec![entry(1, None), entry(2, None)], &state).await;
        assert_eq!(watched, 0);
        assert_eq!(feed.trigger_count(), 0);
        assert!(!binder.is_bound());

        binder.rebind(Vec::new(), &state).await;
        assert_eq!(feed.trigger_count(), 0);
    }

    #[tokio::test]
    async fn already_online_characters_are_detected() {
        let lookup = StaticLookup::new().with_online(CharacterId(101), true);
        let (_feed, mut binder, state) = setup(lookup);
        binder
            .rebind(vec![entry(1, Some(101)), entry(2, Some(102))], &state)
            .await;
        assert!(online(&state, 101).await);
        assert!(!online(&state, 102).await);
    }

    #[tokio::test]
    async fn lookup_failure_does_not_block_binding() {
        let (feed, mut binder, state) = setup(StaticLookup::new().unavailable());
        let watched = binder.rebind(vec![entry(1, Some(101))], &state).await;
        assert_eq!(watched, 1);
        assert_eq!(feed.trigger_count(), 2);
        assert!(!online(&state, 101).await);
    }

    #[tokio::test]
    async fn login_event_updates_presence() {
        let (feed, mut binder, state) = setup(StaticLookup::new());
        binder.rebind(vec![entry(1, Some(101))], &state).await;

        feed.publish(FeedEvent::PlayerLogin {
            character_id: CharacterId(101),
            world_id: WorldId(1),
            timestamp: Utc::now(),
        });

        let became_online = tokio::time::timeout(Duration::from_secs(1), async {
            while !online(&state, 101).await {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(became_online.is_ok());
    }

    #[derive(Debug)]
    struct SlowLookup;

    #[async_trait::async_trait]
    impl EntityLookup for SlowLookup {
        async fn character_faction(
            &self,
            _id: CharacterId,
        ) -> Result<Option<crate::domain::Faction>, crate::error::LookupError> {
            Ok(None)
        }

        async fn is_online(&self, _id: CharacterId) -> Result<bool, crate::error::LookupError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(true)
        }

        async fn map_region(
            &self,
            _id: crate::domain::FacilityId,
        ) -> Result<Option<crate::domain::MapRegion>, crate::error::LookupError> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn presence_queries_run_concurrently() {
        let feed = EventFeed::new(64);
        let mut binder = RosterBinder::new(
            OperationId::new(),
            feed.clone(),
            Arc::new(SlowLookup),
            NoticeBus::new(16),
        );
        let state = Arc::new(Mutex::new(OperationState::new(
            FunEventSettings::default(),
            TimeDelta::minutes(15),
        )));

        let started = tokio::time::Instant::now();
        let watched = binder
            .rebind(
                vec![entry(1, Some(101)), entry(2, Some(102)), entry(3, Some(103))],
                &state,
            )
            .await;
        assert_eq!(watched, 3);
        assert!(started.elapsed() < Duration::from_secs(10));
        for character in [101, 102, 103] {
            assert!(online(&state, character).await);
        }
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (feed, mut binder, state) = setup(StaticLookup::new());
        assert!(!binder.cancel());
        binder.rebind(vec![entry(1, Some(101))], &state).await;
        assert!(binder.cancel());
        assert!(!binder.cancel());
        assert_eq!(feed.trigger_count(), 0);
    }
}
