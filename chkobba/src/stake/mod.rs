//! Stake policy: allowed stake amounts and settlement of finished matches.
//!
//! Stakes are volatile bookkeeping only. Nothing here moves real funds.

pub mod models;
pub mod policy;

pub use models::{Outcome, Settlement, Stake};
pub use policy::{DEFAULT_VALID_STAKES, StakePolicy};
