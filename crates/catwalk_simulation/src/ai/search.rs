//! Search ring generation and traversal.

use std::f32::consts::TAU;

use bevy::prelude::*;

use crate::navigation::NavigationQuery;

/// Tolerance on "snapped point is still within the search radius".
const RADIUS_SLACK: f32 = 0.01;

/// Ring of points around a last known position, visited nearest-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPlan {
    pub points: Vec<Vec2>,
    /// Index of the point currently being walked to
    pub cursor: usize,
    pub exhausted: bool,
}

impl SearchPlan {
    /// `count` points at angles 2πi/count on a circle of `radius` around
    /// `center`, each snapped onto the nav mesh within `snap_radius`.
    /// Unsnappable points and points that snap outside the circle are
    /// dropped; the rest are sorted by distance to `guard_position`.
    pub fn generate(
        center: Vec2,
        guard_position: Vec2,
        radius: f32,
        count: usize,
        snap_radius: f32,
        navigation: &dyn NavigationQuery,
    ) -> Self {
        let mut points: Vec<Vec2> = (0..count)
            .filter_map(|i| {
                let angle = TAU * i as f32 / count as f32;
                let candidate = center + Vec2::from_angle(angle) * radius;
                navigation.sample_position(candidate, snap_radius)
            })
            .filter(|point| point.distance(center) <= radius + RADIUS_SLACK)
            .collect();

        points.sort_by(|a, b| {
            a.distance_squared(guard_position)
                .total_cmp(&b.distance_squared(guard_position))
        });

        Self {
            points,
            cursor: 0,
            exhausted: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn current(&self) -> Option<Vec2> {
        if self.exhausted {
            return None;
        }
        self.points.get(self.cursor).copied()
    }

    /// Moves to the next point. Returns it, or None (and marks the plan
    /// exhausted) once every point has been visited.
    pub fn advance(&mut self) -> Option<Vec2> {
        if self.exhausted {
            return None;
        }
        self.cursor += 1;
        if self.cursor >= self.points.len() {
            self.exhausted = true;
            return None;
        }
        self.points.get(self.cursor).copied()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
