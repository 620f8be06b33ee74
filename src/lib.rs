//! # ops-commander
//!
//! Live Operation tracking for PlanetSide 2 community events.
//!
//! An Operation binds a roster of signed-up players to their in-game
//! characters, follows them on the Census event stream while it runs and
//! keeps per-player sessions, periodic event points and a facility feed.
//! Alongside Operations a single continent tracker watches warpgate
//! control and continent locks for the configured world.
//!
//! ## Architecture
//!
//! ```text
//! Upstream streaming client
//!     │  POST /api/v1/feed
//!     ├── wire decoder (feed/)
//!     ├── EventFeed triggers (feed/)
//!     │
//!     ├── OperationService / LiveOperation (service/)
//!     │       ├── RosterBinder, SessionAggregator (tracker/)
//!     │       └── FacilityTracker (tracker/)
//!     ├── ContinentTracker (service/)
//!     │       ├── WarpgateTracker (tracker/)
//!     │       └── ContinentLockRegistry (tracker/)
//!     │
//!     ├── EntityLookup (lookup) ── CensusLookup (census)
//!     └── NoticeBus ──> renderers
//! ```

pub mod api;
pub mod app_state;
pub mod census;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod lookup;
pub mod service;
pub mod tracker;
