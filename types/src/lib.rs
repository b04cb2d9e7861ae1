//! Tycoon domain types.
//!
//! Defines the static catalog, the per-session [`Game`] aggregate with its per-step sub-state,
//! the per-viewer projections sent to clients, and the [`GameError`] taxonomy shared by the
//! execution layer and the game-room service.

mod catalog;
mod constants;
mod error;
mod game;
mod player;
mod rounds;
mod stage;
mod trend;
mod view;

pub use catalog::*;
pub use constants::*;
pub use error::*;
pub use game::*;
pub use player::*;
pub use rounds::*;
pub use stage::*;
pub use trend::*;
pub use view::*;
