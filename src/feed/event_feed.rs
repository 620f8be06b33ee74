//! Shared in-process fan-out of decoded feed events.
//!
//! [`EventFeed`] wraps a [`tokio::sync::broadcast`] channel. The upstream
//! feed client publishes every decoded [`FeedEvent`] into it; each trigger
//! registered with [`EventFeed::add_trigger`] gets its own receiver, its own
//! filter and its own dispatch task. Removing a trigger never touches the
//! channel, so one subscriber tearing down cannot disturb the others.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use super::subscription::{CharacterScope, EventFilter, SubscriptionHandle, TriggerId};
use crate::domain::{CharacterId, FeedEvent, WorldId};

/// Broadcast feed for [`FeedEvent`]s with a trigger registry.
#[derive(Debug, Clone)]
pub struct EventFeed {
    sender: broadcast::Sender<FeedEvent>,
    triggers: Arc<Mutex<HashMap<TriggerId, EventFilter>>>,
    next_id: Arc<AtomicU64>,
}

/// What the upstream connection must currently be subscribed to: the
/// union of every active trigger's filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UpstreamSubscription {
    /// Census event names.
    pub event_names: BTreeSet<String>,
    /// Character IDs, unless `all_characters` is set.
    pub characters: BTreeSet<CharacterId>,
    /// Whether some trigger listens to every character.
    pub all_characters: bool,
    /// World IDs, unless `all_worlds` is set.
    pub worlds: BTreeSet<WorldId>,
    /// Whether some trigger listens to every world.
    pub all_worlds: bool,
}

impl EventFeed {
    /// Creates a new `EventFeed` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            triggers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publishes an event to every registered trigger.
    ///
    /// Returns the number of receivers the event was queued for. Without
    /// triggers the event is silently dropped.
    pub fn publish(&self, event: FeedEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Registers a trigger and spawns its dispatch task.
    ///
    /// `action` is awaited once per matching event, in delivery order. The
    /// receiver is created before this returns, so every event published
    /// afterwards is seen. Must be called from within a Tokio runtime.
    pub fn add_trigger<F, Fut>(&self, filter: EventFilter, mut action: F) -> SubscriptionHandle
    where
        F: FnMut(FeedEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rx = self.sender.subscribe();
        self.registry().insert(id, filter.clone());

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if filter.matches(&event) {
                            action(event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(trigger = id, lagged = n, "trigger lagged behind feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!(trigger = id, "trigger task finished");
        });

        tracing::debug!(trigger = id, "trigger added");
        SubscriptionHandle::new(id, self.clone(), task)
    }

    /// Removes a trigger's filter. Removing an unknown trigger is a no-op
    /// and returns `false`.
    pub fn remove_trigger(&self, id: TriggerId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            tracing::debug!(trigger = id, "trigger removed");
        }
        removed
    }

    /// Number of registered triggers.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.registry().len()
    }

    /// Union of all active filters.
    #[must_use]
    pub fn upstream_subscription(&self) -> UpstreamSubscription {
        let registry = self.registry();
        let mut upstream = UpstreamSubscription::default();
        for filter in registry.values() {
            upstream
                .event_names
                .extend(filter.kinds().iter().map(|k| k.event_name().to_string()));
            match filter.character_scope() {
                CharacterScope::Any => upstream.all_characters = true,
                CharacterScope::Only(ids) => upstream.characters.extend(ids.iter().copied()),
            }
            match filter.world_scope() {
                None => upstream.all_worlds = true,
                Some(ids) => upstream.worlds.extend(ids.iter().copied()),
            }
        }
        upstream
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<TriggerId, EventFilter>> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
