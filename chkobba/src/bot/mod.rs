//! Scripted fallback player seated when no human opponent shows up in time.
//!
//! The fallback always plays a uniformly random card from its hand as a
//! non-capturing play. It never captures or declares chkobba.

pub mod decision;
pub mod models;

pub use decision::FallbackPlayer;
pub use models::{FALLBACK_ID_PREFIX, fallback_id, is_fallback_id};
