//! External entity lookups.
//!
//! The trackers occasionally need game metadata the feed does not carry:
//! an attacker's faction, whether a character is already online, a
//! facility's name. [`EntityLookup`] abstracts the game API behind an
//! async seam. Every call is a suspension point; callers must not hold
//! tracker state across it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{CharacterId, FacilityId, Faction, MapRegion};
use crate::error::LookupError;

/// Game metadata lookups used mid-handler.
#[async_trait]
pub trait EntityLookup: Send + Sync + std::fmt::Debug {
    /// Faction of a character; `Ok(None)` if the character is unknown.
    async fn character_faction(&self, id: CharacterId) -> Result<Option<Faction>, LookupError>;

    /// Whether the character is currently logged in.
    async fn is_online(&self, id: CharacterId) -> Result<bool, LookupError>;

    /// Region metadata of a facility; `Ok(None)` if unknown.
    async fn map_region(&self, id: FacilityId) -> Result<Option<MapRegion>, LookupError>;
}

/// Upper bound on a single lookup made on behalf of an event handler.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Awaits `lookup` for at most [`LOOKUP_TIMEOUT`].
///
/// # Errors
///
/// Returns the lookup's own error, or [`LookupError::TimedOut`].
pub async fn bounded<T>(
    lookup: impl Future<Output = Result<T, LookupError>>,
) -> Result<T, LookupError> {
    tokio::time::timeout(LOOKUP_TIMEOUT, lookup)
        .await
        .unwrap_or(Err(LookupError::TimedOut))
}

/// In-memory lookup backed by fixed tables.
///
/// Used when no game API client is wired in, and by tests.
#[derive(Debug, Default, Clone)]
pub struct StaticLookup {
    factions: HashMap<CharacterId, Faction>,
    online: HashMap<CharacterId, bool>,
    regions: HashMap<FacilityId, MapRegion>,
    unavailable: bool,
}

impl StaticLookup {
    /// Creates an empty lookup that knows nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a character's faction.
    #[must_use]
    pub fn with_faction(mut self, id: CharacterId, faction: Faction) -> Self {
        self.factions.insert(id, faction);
        self
    }

    /// Registers a character's online status.
    #[must_use]
    pub fn with_online(mut self, id: CharacterId, online: bool) -> Self {
        self.online.insert(id, online);
        self
    }

    /// Registers a facility's region metadata.
    #[must_use]
    pub fn with_region(mut self, id: FacilityId, region: MapRegion) -> Self {
        self.regions.insert(id, region);
        self
    }

    /// Makes every lookup fail with [`LookupError::Unavailable`].
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn check(&self) -> Result<(), LookupError> {
        if self.unavailable {
            return Err(LookupError::Unavailable("static lookup disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityLookup for StaticLookup {
    async fn character_faction(&self, id: CharacterId) -> Result<Option<Faction>, LookupError> {
        self.check()?;
        Ok(self.factions.get(&id).copied())
    }

    async fn is_online(&self, id: CharacterId) -> Result<bool, LookupError> {
        self.check()?;
        Ok(self.online.get(&id).copied().unwrap_or(false))
    }

    async fn map_region(&self, id: FacilityId) -> Result<Option<MapRegion>, LookupError> {
        self.check()?;
        Ok(self.regions.get(&id).cloned())
    }
}

/// Caches answers that never change during a session (factions, regions)
/// in front of another lookup. Online status is always forwarded.
#[derive(Debug)]
pub struct CachedLookup {
    inner: Arc<dyn EntityLookup>,
    factions: RwLock<HashMap<CharacterId, Faction>>,
    regions: RwLock<HashMap<FacilityId, MapRegion>>,
}

impl CachedLookup {
    /// Wraps `inner` with empty caches.
    #[must_use]
    pub fn new(inner: Arc<dyn EntityLookup>) -> Self {
        Self {
            inner,
            factions: RwLock::new(HashMap::new()),
            regions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl EntityLookup for CachedLookup {
    async fn character_faction(&self, id: CharacterId) -> Result<Option<Faction>, LookupError> {
        if let Some(faction) = self.factions.read().await.get(&id) {
            return Ok(Some(*faction));
        }
        let faction = self.inner.character_faction(id).await?;
        if let Some(faction) = faction {
            self.factions.write().await.insert(id, faction);
        }
        Ok(faction)
    }

    async fn is_online(&self, id: CharacterId) -> Result<bool, LookupError> {
        self.inner.is_online(id).await
    }

    async fn map_region(&self, id: FacilityId) -> Result<Option<MapRegion>, LookupError> {
        if let Some(region) = self.regions.read().await.get(&id) {
            return Ok(Some(region.clone()));
        }
        let region = self.inner.map_region(id).await?;
        if let Some(region) = &region {
            self.regions.write().await.insert(id, region.clone());
        }
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityLookup for CountingLookup {
        async fn character_faction(
            &self,
            _id: CharacterId,
        ) -> Result<Option<Faction>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Faction::Tr))
        }

        async fn is_online(&self, _id: CharacterId) -> Result<bool, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn map_region(&self, _id: FacilityId) -> Result<Option<MapRegion>, LookupError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn static_lookup_answers_from_tables() {
        let lookup = StaticLookup::new()
            .with_faction(CharacterId(1), Faction::Vs)
            .with_online(CharacterId(1), true);
        assert_eq!(lookup.character_faction(CharacterId(1)).await, Ok(Some(Faction::Vs)));
        assert_eq!(lookup.character_faction(CharacterId(2)).await, Ok(None));
        assert_eq!(lookup.is_online(CharacterId(1)).await, Ok(true));
        assert_eq!(lookup.is_online(CharacterId(2)).await, Ok(false));
    }

    #[tokio::test]
    async fn unavailable_static_lookup_fails() {
        let lookup = StaticLookup::new().unavailable();
        assert!(lookup.character_faction(CharacterId(1)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_lookup_times_out() {
        let never = std::future::pending::<Result<bool, LookupError>>();
        assert_eq!(bounded(never).await, Err(LookupError::TimedOut));
    }

    #[tokio::test]
    async fn cached_lookup_hits_inner_once_per_character() {
        let inner = Arc::new(CountingLookup::default());
        let cached = CachedLookup::new(Arc::clone(&inner) as Arc<dyn EntityLookup>);

        for _ in 0..3 {
            assert_eq!(
                cached.character_faction(CharacterId(5)).await,
                Ok(Some(Faction::Tr))
            );
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        let _ = cached.is_online(CharacterId(5)).await;
        let _ = cached.is_online(CharacterId(5)).await;
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
