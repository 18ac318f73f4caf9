//! Physics-side collaborators: collision layers and the obstacle query port.
//!
//! ## Layers (bitmask, one bit per layer):
//! - `LAYER_PLAYER` (0b0001): the cat
//! - `LAYER_GUARD` (0b0010): guards
//! - `LAYER_OBSTACLE` (0b0100): walls, furniture, anything static
//! - `LAYER_PROJECTILE` (0b1000): hairballs
//!
//! ## Masks:
//! - `MASK_VISION_BLOCKERS`: what stops a line of sight
//! - `MASK_PROJECTILE_BLOCKERS`: what a thrown hairball lands on
//!
//! ```rust
//! use catwalk_simulation::physics::*;
//!
//! let mut map = ObstacleMap::default();
//! map.add_box(bevy::math::Vec2::new(2.0, -1.0), bevy::math::Vec2::new(3.0, 1.0), LAYER_OBSTACLE);
//! assert!(map.raycast(bevy::math::Vec2::ZERO, bevy::math::Vec2::X, 10.0, MASK_VISION_BLOCKERS).is_some());
//! ```

pub mod obstacles;

pub use obstacles::*;

pub const LAYER_PLAYER: u32 = 1 << 0;
pub const LAYER_GUARD: u32 = 1 << 1;
pub const LAYER_OBSTACLE: u32 = 1 << 2;
pub const LAYER_PROJECTILE: u32 = 1 << 3;

/// Line of sight is blocked by static geometry only (guards do not occlude each other).
pub const MASK_VISION_BLOCKERS: u32 = LAYER_OBSTACLE;

/// Hairballs land on static geometry.
pub const MASK_PROJECTILE_BLOCKERS: u32 = LAYER_OBSTACLE;
