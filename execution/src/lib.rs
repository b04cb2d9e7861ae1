//! Tycoon execution layer.
//!
//! This crate holds every rule of the game: the GM-driven stage machine, the per-step
//! commitment collector, the auction, trend timelines and lawyer/analyst powers, card
//! bookkeeping, the yearly audit, the per-viewer projector and the in-memory session store
//! that ties them together.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Randomness only comes from a per-game seed (trend timelines) or the store's seeded
//!   generator (game codes).
//! - Iterate ordered collections wherever iteration order reaches an output.
//!
//! ## Atomicity
//! Operations take `&mut Game` and may leave it half-written when they return an error.
//! [`SessionStore`] runs them against a scratch copy and keeps the copy only on success, so
//! callers outside this crate always see whole commands or nothing.
//!
//! The primary entrypoint is [`SessionStore`].
//!
//! ## Minimal session (example)
//! ```rust
//! use std::sync::Arc;
//! use tycoon_execution::{Command, SessionStore};
//! use tycoon_types::{Catalog, GameConfig};
//!
//! let store = SessionStore::new(Arc::new(Catalog::standard()), Some(7));
//! let gm = store.create_game("Host", GameConfig::default()).unwrap();
//! let ada = store.join_game(&gm.code, "Ada").unwrap();
//! store.execute(&gm.code, gm.player_id, Command::StartGame).unwrap();
//! store.execute(&gm.code, ada.player_id, Command::CommitMlBid { bid: Some(10) }).unwrap();
//! let view = store.view(&gm.code, Some(ada.player_id)).unwrap();
//! assert_eq!(view.ml_bid.own_bid, Some(10));
//! ```

pub mod auction;
pub mod audit;
pub mod cards;
pub mod collector;
pub mod command;
pub mod lobby;
pub mod projector;
pub mod ranking;
pub mod stage_machine;
pub mod store;
pub mod trend_generator;
pub mod trends;

mod guards;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod integration_tests;

pub use command::{Command, Reply};
pub use projector::{lobby_summary, project};
pub use stage_machine::Transition;
pub use store::{Joined, SessionStore};
