//! Game entities.

mod collectible;
mod player;

pub use collectible::{Collectible, CollectibleKind};
pub use player::Player;
