//! Spatial indexing utilities.

mod quadtree;

pub use quadtree::{Bounds, Collidable, CollidableKind, QuadTree};
