//! Data Transfer Objects for REST request/response serialization.
//!
//! Pull views (snapshots, summaries, lock reports) are serialized straight
//! from the service types; this module only holds request bodies, query
//! parameters and thin response wrappers.

pub mod continent_dto;
pub mod feed_dto;
pub mod operation_dto;

pub use continent_dto::*;
pub use feed_dto::*;
pub use operation_dto::*;
