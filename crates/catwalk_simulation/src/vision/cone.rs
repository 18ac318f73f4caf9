//! Visible-area polygon (triangle fan) for a vision sensor.

use bevy::prelude::*;

use super::{VisionConeConfig, VisionSensor};
use crate::physics::ObstacleQuery;

/// Result of one ray of the fan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCast {
    pub hit: bool,
    pub point: Vec2,
    pub distance: f32,
    /// World angle, radians
    pub angle: f32,
}

/// Triangle fan in world space: `vertices[0]` is the sensor origin,
/// every triangle is `(0, i, i + 1)`.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct VisionPolygon {
    pub vertices: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
}

impl VisionPolygon {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
    }
}

/// Polygon builder attached next to a `VisionSensor`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
#[require(VisionPolygon)]
pub struct VisionCone {
    pub config: VisionConeConfig,
}

impl VisionCone {
    pub fn new(config: VisionConeConfig) -> Self {
        Self { config }
    }

    /// Number of fan segments for a field of view of `angle_degrees` (>= 1).
    pub fn step_count(&self, angle_degrees: f32) -> usize {
        let steps = (angle_degrees * self.config.resolution as f32 / 360.0).round();
        (steps as usize).max(1)
    }

    fn view_cast(&self, sensor: &VisionSensor, origin: Vec2, angle: f32, obstacles: &dyn ObstacleQuery) -> ViewCast {
        let direction = Vec2::from_angle(angle);
        match obstacles.raycast(origin, direction, sensor.range, sensor.blockers) {
            Some(hit) => ViewCast {
                hit: true,
                point: hit.point,
                distance: hit.distance,
                angle,
            },
            None => ViewCast {
                hit: false,
                point: origin + direction * sensor.range,
                distance: sensor.range,
                angle,
            },
        }
    }

    fn is_edge(&self, a: &ViewCast, b: &ViewCast) -> bool {
        let jump = (a.distance - b.distance).abs() > self.config.edge_distance_threshold;
        a.hit != b.hit || (a.hit && b.hit && jump)
    }

    /// Bisects between two disagreeing rays. Returns the last refined point
    /// on each side (None when that side never moved).
    fn find_edge(
        &self,
        sensor: &VisionSensor,
        origin: Vec2,
        min: ViewCast,
        max: ViewCast,
        obstacles: &dyn ObstacleQuery,
    ) -> (Option<Vec2>, Option<Vec2>) {
        let mut min_angle = min.angle;
        let mut max_angle = max.angle;
        let mut min_point = None;
        let mut max_point = None;

        for _ in 0..self.config.edge_resolve_iterations {
            let angle = (min_angle + max_angle) * 0.5;
            let cast = self.view_cast(sensor, origin, angle, obstacles);
            let jump = (min.distance - cast.distance).abs() > self.config.edge_distance_threshold;

            if cast.hit == min.hit && !jump {
                min_angle = angle;
                min_point = Some(cast.point);
            } else {
                max_angle = angle;
                max_point = Some(cast.point);
            }
        }

        (min_point, max_point)
    }

    /// Fan over the sensor's field of view. Empty for degenerate sensors.
    pub fn build_polygon(
        &self,
        sensor: &VisionSensor,
        origin: Vec2,
        facing: Vec2,
        obstacles: &dyn ObstacleQuery,
    ) -> VisionPolygon {
        let mut polygon = VisionPolygon::default();
        if sensor.is_degenerate() {
            return polygon;
        }

        let fov = sensor.angle_degrees.min(360.0).to_radians();
        let steps = self.step_count(sensor.angle_degrees.min(360.0));
        let step_size = fov / steps as f32;
        let base = facing.try_normalize().unwrap_or(Vec2::X).to_angle();

        let mut points: Vec<Vec2> = Vec::with_capacity(steps + 1);
        let mut previous: Option<ViewCast> = None;

        for i in 0..=steps {
            let angle = base - fov * 0.5 + step_size * i as f32;
            let cast = self.view_cast(sensor, origin, angle, obstacles);

            if let Some(old) = previous {
                if self.is_edge(&old, &cast) {
                    let (a, b) = self.find_edge(sensor, origin, old, cast, obstacles);
                    points.extend(a);
                    points.extend(b);
                }
            }

            points.push(cast.point);
            previous = Some(cast);
        }

        polygon.vertices.reserve(points.len() + 1);
        polygon.vertices.push(origin);
        polygon.vertices.extend(points);

        let count = polygon.vertices.len() as u32;
        polygon.triangles = (0..count.saturating_sub(2)).map(|i| [0, i + 1, i + 2]).collect();
        polygon
    }
}
