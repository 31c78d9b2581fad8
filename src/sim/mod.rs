//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Rendering, audio and overlays only through the `hooks` traits

pub mod collision;
pub mod entity;
pub mod flow;
pub mod grid;
pub mod reaction;
pub mod state;
pub mod tick;
pub mod transform;
pub mod world;

pub use collision::{CollisionEngine, Contact, overlaps, point_in_polygon};
pub use entity::{EdgePolicy, Entity, EntityId, EntityKind, EntityPool};
pub use flow::GameFlow;
pub use grid::{Cell, CellId, Direction, SpatialGrid};
pub use state::{GameEvent, GamePhase, GameState, UpgradeLadder};
pub use tick::{Game, TickInput, tick};
pub use transform::Transform;
pub use world::World;
