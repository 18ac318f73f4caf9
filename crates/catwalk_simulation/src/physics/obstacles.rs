//! Obstacle raycast port + axis-aligned box implementation.

use bevy::prelude::*;

/// Nearest hit of a ray against the obstacle world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub distance: f32,
    /// Layer bits of the collider that was hit
    pub layers: u32,
}

/// Raycast service consumed by vision and projectiles.
///
/// `direction` does not have to be normalized; a zero direction or a
/// non-positive `max_distance` never hits. Only colliders whose layers
/// intersect `mask` are considered.
pub trait ObstacleQuery: Send + Sync {
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: u32) -> Option<RayHit>;
}

/// Resource: the obstacle query used by every system that needs raycasts.
#[derive(Resource)]
pub struct ObstacleWorld(pub Box<dyn ObstacleQuery>);

impl ObstacleWorld {
    pub fn new(query: impl ObstacleQuery + 'static) -> Self {
        Self(Box::new(query))
    }

    pub fn query(&self) -> &dyn ObstacleQuery {
        self.0.as_ref()
    }
}

impl Default for ObstacleWorld {
    fn default() -> Self {
        Self::new(ObstacleMap::default())
    }
}

/// Axis-aligned box collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleBox {
    pub min: Vec2,
    pub max: Vec2,
    pub layers: u32,
}

impl ObstacleBox {
    /// Box from two arbitrary corners.
    pub fn new(a: Vec2, b: Vec2, layers: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
            layers,
        }
    }

    /// Point-in-box test with the box grown by `inflate` on every side.
    pub fn contains(&self, point: Vec2, inflate: f32) -> bool {
        point.x >= self.min.x - inflate
            && point.x <= self.max.x + inflate
            && point.y >= self.min.y - inflate
            && point.y <= self.max.y + inflate
    }

    /// Slab test. Returns the entry distance along the unit `direction`,
    /// 0.0 when the origin starts inside the box.
    fn intersect(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<f32> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for axis in 0..2 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                // Parallel to this slab: must already be inside it
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));
        }

        if t_exit < t_enter.max(0.0) {
            return None;
        }

        let t = t_enter.max(0.0);
        (t <= max_distance).then_some(t)
    }
}

/// Static set of box colliders. Empty by default (nothing ever blocks).
#[derive(Debug, Clone, Default)]
pub struct ObstacleMap {
    boxes: Vec<ObstacleBox>,
}

impl ObstacleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_box(&mut self, a: Vec2, b: Vec2, layers: u32) -> &mut Self {
        self.boxes.push(ObstacleBox::new(a, b, layers));
        self
    }

    /// Builder-style variant of [`ObstacleMap::add_box`].
    pub fn with_box(mut self, a: Vec2, b: Vec2, layers: u32) -> Self {
        self.add_box(a, b, layers);
        self
    }

    pub fn boxes(&self) -> &[ObstacleBox] {
        &self.boxes
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// True when `point` lies inside any box on `mask`, grown by `inflate`.
    pub fn is_blocked(&self, point: Vec2, inflate: f32, mask: u32) -> bool {
        self.boxes
            .iter()
            .any(|b| b.layers & mask != 0 && b.contains(point, inflate))
    }
}

impl ObstacleQuery for ObstacleMap {
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: u32) -> Option<RayHit> {
        if max_distance <= 0.0 {
            return None;
        }
        let direction = direction.try_normalize()?;

        let mut nearest: Option<RayHit> = None;
        for collider in self.boxes.iter().filter(|b| b.layers & mask != 0) {
            let Some(distance) = collider.intersect(origin, direction, max_distance) else {
                continue;
            };

            if nearest.is_none_or(|hit| distance < hit.distance) {
                nearest = Some(RayHit {
                    point: origin + direction * distance,
                    distance,
                    layers: collider.layers,
                });
            }
        }

        nearest
    }
}
