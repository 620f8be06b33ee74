//! Trigger filters and subscription handles.
//!
//! An [`EventFilter`] decides which feed events a trigger receives. A
//! [`SubscriptionHandle`] owns one registered trigger and cancels it on
//! [`SubscriptionHandle::cancel`] or drop; a [`SubscriptionSlot`] holds at
//! most one handle so a subscriber can swap its trigger without ever
//! layering two.

use std::collections::HashSet;

use tokio::task::JoinHandle;

use super::EventFeed;
use crate::domain::{CharacterId, EventKind, FeedEvent, WorldId};

/// Which characters a filter accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CharacterScope {
    /// Any character (or none, for world-scoped events).
    #[default]
    Any,
    /// Only the listed characters. An empty set matches nothing.
    Only(HashSet<CharacterId>),
}

/// Filter deciding which feed events reach a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    kinds: HashSet<EventKind>,
    characters: CharacterScope,
    worlds: Option<HashSet<WorldId>>,
    experience_ids: Option<HashSet<u32>>,
}

impl EventFilter {
    /// Filter accepting the given event kinds from anyone on any world.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Restricts the filter to the given characters.
    #[must_use]
    pub fn characters(mut self, ids: impl IntoIterator<Item = CharacterId>) -> Self {
        self.characters = CharacterScope::Only(ids.into_iter().collect());
        self
    }

    /// Restricts the filter to the given worlds.
    #[must_use]
    pub fn worlds(mut self, ids: impl IntoIterator<Item = WorldId>) -> Self {
        self.worlds = Some(ids.into_iter().collect());
        self
    }

    /// Restricts `GainExperience` events to the given experience IDs.
    #[must_use]
    pub fn experience_ids(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.experience_ids = Some(ids.into_iter().collect());
        self
    }

    /// Returns `true` if the event passes the filter.
    #[must_use]
    pub fn matches(&self, event: &FeedEvent) -> bool {
        let kind = event.kind();
        if !self.kinds.contains(&kind) {
            return false;
        }
        if let Some(worlds) = &self.worlds
            && !worlds.contains(&event.world_id())
        {
            return false;
        }
        if let (Some(ids), Some(experience_id)) = (&self.experience_ids, event.experience_id())
            && !ids.contains(&experience_id)
        {
            return false;
        }
        match &self.characters {
            CharacterScope::Any => true,
            CharacterScope::Only(ids) => {
                kind.is_character_scoped()
                    && event.characters().iter().any(|id| ids.contains(id))
            }
        }
    }

    /// Event kinds accepted by this filter.
    #[must_use]
    pub fn kinds(&self) -> &HashSet<EventKind> {
        &self.kinds
    }

    /// Character scope of this filter.
    #[must_use]
    pub fn character_scope(&self) -> &CharacterScope {
        &self.characters
    }

    /// World restriction of this filter, if any.
    #[must_use]
    pub fn world_scope(&self) -> Option<&HashSet<WorldId>> {
        self.worlds.as_ref()
    }
}

/// Identifier of a registered trigger.
pub type TriggerId = u64;

/// Owner of one registered trigger.
///
/// Cancelling removes the trigger's filter from the feed and stops its
/// dispatch task; the shared feed itself stays up.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: TriggerId,
    feed: EventFeed,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub(super) fn new(id: TriggerId, feed: EventFeed, task: JoinHandle<()>) -> Self {
        Self {
            id,
            feed,
            task: Some(task),
        }
    }

    /// Trigger ID within the feed.
    #[must_use]
    pub const fn id(&self) -> TriggerId {
        self.id
    }

    /// Whether the trigger is still registered.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Cancels the trigger. Returns `false` if it was already cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        self.feed.remove_trigger(self.id);
        true
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Holds at most one subscription for a logical subscriber.
#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    handle: Option<SubscriptionHandle>,
}

impl SubscriptionSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handle`, cancelling whatever the slot held before.
    pub fn replace(&mut self, handle: SubscriptionHandle) {
        self.cancel();
        self.handle = Some(handle);
    }

    /// Cancels the held subscription. Returns `false` if the slot was empty.
    pub fn cancel(&mut self) -> bool {
        self.handle.take().is_some_and(|mut handle| handle.cancel())
    }

    /// Whether the slot holds an active subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(SubscriptionHandle::is_active)
    }
}
