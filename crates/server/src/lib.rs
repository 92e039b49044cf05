//! Arena game server library.

pub mod collision;
pub mod config;
pub mod entity;
pub mod net;
pub mod registry;
pub mod room;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use registry::RoomRegistry;
pub use room::Room;
