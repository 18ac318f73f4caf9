//! Vision: cone-shaped line-of-sight sensor + visible-area polygon.
//!
//! - `VisionSensor::can_see` answers "is the target visible now" (gameplay)
//! - `VisionCone::build_polygon` approximates the visible area (presentation)
//!
//! Both share the same range/angle and raycast against `ObstacleWorld`.

use bevy::prelude::*;

pub mod cone;
pub mod sensor;
pub mod systems;

pub use cone::*;
pub use sensor::*;
pub use systems::*;

/// Vision Plugin
///
/// Polygons are rebuilt after the AI has moved and turned everyone, so the
/// cone matches the facing the FSM settled on this tick.
pub struct VisionPlugin;

impl Plugin for VisionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_vision_polygons.in_set(crate::SimulationSet::Presentation),
        );
    }
}
