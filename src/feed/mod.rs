//! Event Feed Adapter boundary.
//!
//! The upstream push-service client (connection, reconnection and
//! authentication live outside this crate) decodes raw messages with
//! [`wire::decode_message`] and publishes them into the shared
//! [`EventFeed`]. Trackers register filtered triggers against the feed and
//! own the returned [`SubscriptionHandle`]s.

pub mod event_feed;
pub mod subscription;
pub mod wire;

pub use event_feed::{EventFeed, UpstreamSubscription};
pub use subscription::{CharacterScope, EventFilter, SubscriptionHandle, SubscriptionSlot, TriggerId};
