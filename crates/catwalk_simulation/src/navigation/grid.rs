//! Uniform walkability grid with A* (the `pathfinding` crate).
//!
//! - 8-neighbour moves, diagonal only when both adjacent orthogonal cells are walkable
//! - integer costs: 10 orthogonal, 14 diagonal; octile heuristic
//! - unreachable goal → partial path to the reachable cell closest to the goal

use bevy::prelude::*;
use pathfinding::prelude::{astar, bfs_reach};
use thiserror::Error;

use super::{NavPath, NavigationQuery};
use crate::physics::ObstacleMap;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Upper bound on cells, keeps a typo in a level file from allocating gigabytes.
const MAX_CELLS: usize = 4_000_000;

#[derive(Debug, Error, PartialEq)]
pub enum NavGridError {
    #[error("cell size must be a finite value > 0, got {0}")]
    InvalidCellSize(f32),

    #[error("grid bounds are empty: min {min}, max {max}")]
    EmptyBounds { min: Vec2, max: Vec2 },

    #[error("grid would have {cells} cells (limit {limit})")]
    TooLarge { cells: usize, limit: usize },
}

type Cell = (i32, i32);

#[derive(Debug, Clone)]
pub struct NavGrid {
    origin: Vec2,
    cell_size: f32,
    width: i32,
    height: i32,
    walkable: Vec<bool>,
}

impl NavGrid {
    /// Fully walkable grid covering `min..max`.
    pub fn open(min: Vec2, max: Vec2, cell_size: f32) -> Result<Self, NavGridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(NavGridError::InvalidCellSize(cell_size));
        }
        let size = max - min;
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(NavGridError::EmptyBounds { min, max });
        }

        let width = (size.x / cell_size).ceil() as usize;
        let height = (size.y / cell_size).ceil() as usize;
        let cells = width.saturating_mul(height);
        if cells > MAX_CELLS {
            return Err(NavGridError::TooLarge {
                cells,
                limit: MAX_CELLS,
            });
        }

        Ok(Self {
            origin: min,
            cell_size,
            width: width as i32,
            height: height as i32,
            walkable: vec![true; cells],
        })
    }

    /// Rasterises `obstacles` (layers in `mask`), blocking every cell whose
    /// centre is within `agent_radius` of a box.
    pub fn from_obstacles(
        obstacles: &ObstacleMap,
        mask: u32,
        min: Vec2,
        max: Vec2,
        cell_size: f32,
        agent_radius: f32,
    ) -> Result<Self, NavGridError> {
        let mut grid = Self::open(min, max, cell_size)?;
        for y in 0..grid.height {
            for x in 0..grid.width {
                let center = grid.cell_center((x, y));
                if obstacles.is_blocked(center, agent_radius, mask) {
                    grid.set_walkable_cell((x, y), false);
                }
            }
        }
        Ok(grid)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }

    /// Marks the cell containing `point`. Points outside the grid are ignored.
    pub fn set_walkable(&mut self, point: Vec2, walkable: bool) {
        if let Some(cell) = self.cell_of(point) {
            self.set_walkable_cell(cell, walkable);
        }
    }

    pub fn is_walkable(&self, point: Vec2) -> bool {
        self.cell_of(point).is_some_and(|cell| self.walkable_cell(cell))
    }

    fn set_walkable_cell(&mut self, cell: Cell, walkable: bool) {
        if let Some(index) = self.index(cell) {
            self.walkable[index] = walkable;
        }
    }

    fn index(&self, (x, y): Cell) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    fn walkable_cell(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|index| self.walkable[index])
    }

    fn cell_of(&self, point: Vec2) -> Option<Cell> {
        let local = (point - self.origin) / self.cell_size;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let cell = (local.x.floor() as i32, local.y.floor() as i32);
        self.index(cell).map(|_| cell)
    }

    fn cell_center(&self, (x, y): Cell) -> Vec2 {
        self.origin + (Vec2::new(x as f32, y as f32) + Vec2::splat(0.5)) * self.cell_size
    }

    /// Closest point of `cell` to `point`, kept strictly inside the cell so
    /// that `cell_of` maps it back to the same cell.
    fn clamp_into(&self, cell: Cell, point: Vec2) -> Vec2 {
        let inset = self.cell_size * 1e-3;
        let min = self.origin + Vec2::new(cell.0 as f32, cell.1 as f32) * self.cell_size;
        point.clamp(min + Vec2::splat(inset), min + Vec2::splat(self.cell_size - inset))
    }

    fn successors(&self, &(x, y): &Cell) -> Vec<(Cell, u32)> {
        let mut next = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let cell = (x + dx, y + dy);
                if !self.walkable_cell(cell) {
                    continue;
                }
                if dx != 0 && dy != 0 {
                    // No corner cutting
                    if !self.walkable_cell((x + dx, y)) || !self.walkable_cell((x, y + dy)) {
                        continue;
                    }
                    next.push((cell, DIAGONAL_COST));
                } else {
                    next.push((cell, STRAIGHT_COST));
                }
            }
        }
        next
    }

    fn heuristic(&(x, y): &Cell, &(gx, gy): &Cell) -> u32 {
        let dx = (x - gx).unsigned_abs();
        let dy = (y - gy).unsigned_abs();
        STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
    }

    /// Nearest walkable cell to `point` whose clamped point lies within `max_distance`.
    fn nearest_walkable(&self, point: Vec2, max_distance: f32) -> Option<(Cell, Vec2)> {
        let reach = (max_distance / self.cell_size).ceil().max(0.0) as i32 + 1;
        let local = ((point - self.origin) / self.cell_size).floor();
        if !local.is_finite() {
            return None;
        }
        let (cx, cy) = (local.x as i32, local.y as i32);

        let mut best: Option<(Cell, Vec2, f32)> = None;
        for y in (cy - reach)..=(cy + reach) {
            for x in (cx - reach)..=(cx + reach) {
                let cell = (x, y);
                if !self.walkable_cell(cell) {
                    continue;
                }
                let candidate = self.clamp_into(cell, point);
                let distance = candidate.distance(point);
                if distance > max_distance {
                    continue;
                }
                if best.is_none_or(|(_, _, d)| distance < d) {
                    best = Some((cell, candidate, distance));
                }
            }
        }
        best.map(|(cell, candidate, _)| (cell, candidate))
    }

    fn to_path(&self, cells: &[Cell], end: Vec2, complete: bool) -> NavPath {
        // Skip the start cell; the last cell is replaced by the exact end point
        let mut waypoints: Vec<Vec2> = cells
            .iter()
            .skip(1)
            .take(cells.len().saturating_sub(2))
            .map(|cell| self.cell_center(*cell))
            .collect();
        waypoints.push(end);
        NavPath { waypoints, complete }
    }
}

impl NavigationQuery for NavGrid {
    fn sample_position(&self, point: Vec2, max_distance: f32) -> Option<Vec2> {
        if self.is_walkable(point) {
            return Some(point);
        }
        self.nearest_walkable(point, max_distance).map(|(_, p)| p)
    }

    fn find_path(&self, from: Vec2, to: Vec2) -> Option<NavPath> {
        // Agents standing on a cell edge may round into a blocked neighbour
        let start = match self.cell_of(from).filter(|c| self.walkable_cell(*c)) {
            Some(cell) => cell,
            None => self.nearest_walkable(from, self.cell_size)?.0,
        };

        if let Some(goal) = self.cell_of(to).filter(|c| self.walkable_cell(*c)) {
            if let Some((cells, _)) = astar(
                &start,
                |cell| self.successors(cell),
                |cell| Self::heuristic(cell, &goal),
                |cell| *cell == goal,
            ) {
                return Some(self.to_path(&cells, to, true));
            }
        }

        // Unreachable: head for the reachable cell closest to the goal
        let closest = bfs_reach(start, |cell| {
            self.successors(cell).into_iter().map(|(next, _)| next)
        })
        .min_by(|a, b| {
            let da = self.clamp_into(*a, to).distance_squared(to);
            let db = self.clamp_into(*b, to).distance_squared(to);
            da.total_cmp(&db)
        })?;

        let (cells, _) = astar(
            &start,
            |cell| self.successors(cell),
            |cell| Self::heuristic(cell, &closest),
            |cell| *cell == closest,
        )?;
        Some(self.to_path(&cells, self.clamp_into(closest, to), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::LAYER_OBSTACLE;

    fn open_grid() -> NavGrid {
        NavGrid::open(Vec2::ZERO, Vec2::new(10.0, 10.0), 1.0).expect("valid grid")
    }

    /// Wall along x = 5 with no gap.
    fn split_grid() -> NavGrid {
        let mut grid = open_grid();
        for y in 0..10 {
            grid.set_walkable(Vec2::new(5.5, y as f32 + 0.5), false);
        }
        grid
    }

    #[test]
    fn test_invalid_construction() {
        assert_eq!(
            NavGrid::open(Vec2::ZERO, Vec2::ONE, 0.0).unwrap_err(),
            NavGridError::InvalidCellSize(0.0)
        );
        assert!(matches!(
            NavGrid::open(Vec2::ONE, Vec2::ZERO, 1.0),
            Err(NavGridError::EmptyBounds { .. })
        ));
        assert!(matches!(
            NavGrid::open(Vec2::ZERO, Vec2::splat(100_000.0), 0.01),
            Err(NavGridError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_sample_returns_point_when_walkable() {
        let grid = open_grid();
        let p = Vec2::new(2.3, 7.9);
        assert_eq!(grid.sample_position(p, 0.0), Some(p));
    }

    #[test]
    fn test_sample_snaps_out_of_blocked_cell() {
        let grid = split_grid();
        let snapped = grid
            .sample_position(Vec2::new(5.4, 3.5), 1.0)
            .expect("neighbour cell is walkable");
        assert!(grid.is_walkable(snapped));
        assert!(snapped.distance(Vec2::new(5.4, 3.5)) <= 1.0);
    }

    #[test]
    fn test_sample_respects_max_distance() {
        let grid = open_grid();
        assert!(grid.sample_position(Vec2::new(-5.0, -5.0), 1.0).is_none());
        assert!(grid.sample_position(Vec2::new(-0.5, 5.0), 1.0).is_some());
    }

    #[test]
    fn test_path_on_open_grid_ends_at_goal() {
        let grid = open_grid();
        let goal = Vec2::new(8.2, 1.7);
        let path = grid.find_path(Vec2::new(1.5, 1.5), goal).expect("path");
        assert!(path.complete);
        assert_eq!(path.end(), Some(goal));
    }

    #[test]
    fn test_wall_gives_partial_path() {
        let grid = split_grid();
        let path = grid
            .find_path(Vec2::new(1.5, 5.5), Vec2::new(8.5, 5.5))
            .expect("start is on the mesh");

        assert!(!path.complete);
        let end = path.end().expect("non-empty path");
        assert!(end.x <= 5.0, "partial path must stop before the wall, got {:?}", end);
        assert!(!grid.path_exists(Vec2::new(1.5, 5.5), Vec2::new(8.5, 5.5)));
    }

    #[test]
    fn test_path_routes_through_gap() {
        let mut grid = split_grid();
        grid.set_walkable(Vec2::new(5.5, 9.5), true);

        let path = grid
            .find_path(Vec2::new(1.5, 1.5), Vec2::new(8.5, 1.5))
            .expect("path");
        assert!(path.complete);
        assert!(
            path.waypoints.iter().any(|p| p.y > 8.0),
            "path must detour through the gap at the top"
        );
    }

    #[test]
    fn test_from_obstacles_blocks_inflated_cells() {
        let map = ObstacleMap::new().with_box(Vec2::new(4.0, 0.0), Vec2::new(6.0, 10.0), LAYER_OBSTACLE);
        let grid = NavGrid::from_obstacles(&map, LAYER_OBSTACLE, Vec2::ZERO, Vec2::splat(10.0), 1.0, 0.6)
            .expect("valid grid");

        assert!(!grid.is_walkable(Vec2::new(5.0, 5.0)));
        // Centre 3.5 is 0.5 from the box: inside the agent radius
        assert!(!grid.is_walkable(Vec2::new(3.5, 5.0)));
        assert!(grid.is_walkable(Vec2::new(2.5, 5.0)));
    }
}
