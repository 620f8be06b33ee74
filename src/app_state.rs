//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::domain::NoticeBus;
use crate::feed::EventFeed;
use crate::lookup::EntityLookup;
use crate::service::{ContinentTracker, OperationContext, OperationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live Operations.
    pub operations: Arc<OperationService>,
    /// Continent lock tracking for the configured world.
    pub continents: Arc<ContinentTracker>,
    /// Shared event feed the upstream client publishes into.
    pub feed: EventFeed,
    /// Notice bus renderers subscribe to.
    pub notices: NoticeBus,
}

impl AppState {
    /// Wires the feed, notice bus and services together.
    ///
    /// The continent tracker is not subscribed yet; call
    /// [`ContinentTracker::subscribe`] once a runtime is available.
    #[must_use]
    pub fn new(config: &TrackerConfig, lookup: Arc<dyn EntityLookup>) -> Self {
        let feed = EventFeed::new(config.feed_capacity);
        let notices = NoticeBus::new(config.notice_capacity);
        let ctx = OperationContext::from_config(config, feed.clone(), lookup, notices.clone());
        Self {
            operations: Arc::new(OperationService::new(ctx)),
            continents: Arc::new(ContinentTracker::new(config, notices.clone())),
            feed,
            notices,
        }
    }
}
