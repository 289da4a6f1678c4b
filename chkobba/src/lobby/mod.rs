//! Lobby: live matches and the service that composes them with the queue.
//!
//! This module implements:
//! - MatchActor: async actor owning one match engine
//! - MatchManager: registry of match actors
//! - Lobby: queue admission, match formation, moves and retirement
//!
//! ## Architecture
//!
//! Each match runs in its own Tokio task with an mpsc inbox, so all
//! mutations of one match are serialized. Replies travel back on oneshot
//! channels. The queue buckets live behind a single mutex that both
//! request handlers and the periodic matching loop go through.
//!
//! ## Example
//!
//! ```no_run
//! use chkobba::game::{GameMode, PlayerId};
//! use chkobba::lobby::{Lobby, LobbyConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let lobby = Lobby::new(LobbyConfig::default());
//!     tokio::spawn(lobby.clone().run_matching_loop());
//!
//!     lobby
//!         .enqueue(PlayerId::new("alice"), 5, GameMode::OneVsOne)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod service;

pub use actor::{MatchActor, MatchHandle};
pub use config::LobbyConfig;
pub use manager::MatchManager;
pub use messages::{MatchMessage, MoveOutcome, NotificationKind, StateChangeNotification};
pub use service::Lobby;
