//! ideavault/crates/iv-core/src/lib.rs
//!
//! The central domain logic and interface definitions for IdeaVault:
//! models, port traits, errors, and the pure filter/aggregation and
//! temporal bucketing engines shared by the list, calendar, and
//! dashboard views.

pub mod calendar;
pub mod error;
pub mod filter;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
