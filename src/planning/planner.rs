//! Best-first (A*) planner over the inflated planning grid.
//!
//! Cells are expanded in order of f cost. Improved neighbours are pushed again
//! without removing stale heap entries; a stale entry is skipped when popped
//! because its cell is already visited.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::{GridCoord, WorldPoint};
use crate::error::{MadhuError, Result};

use super::grid::{CellState, PlanningGrid};

/// Configuration for the grid planner.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Arena extent along X
    pub arena_width: f32,
    /// Arena extent along Y
    pub arena_height: f32,
    /// Edge length of one grid cell in arena units
    pub cell_size: f32,
    /// Cells blocked around each obstacle (square window radius)
    pub inflation_radius: i32,
    /// Radius of the square expansion window
    pub neighbor_radius: i32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            arena_width: 3500.0,
            arena_height: 2000.0,
            cell_size: 250.0,
            inflation_radius: 1,
            neighbor_radius: 2,
        }
    }
}

impl PlannerConfig {
    /// Reject grids that cannot be built.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(MadhuError::Config(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if !(self.arena_width > 0.0 && self.arena_height > 0.0)
            || !(self.arena_width.is_finite() && self.arena_height.is_finite())
        {
            return Err(MadhuError::Config(format!(
                "arena must have a positive size, got {}x{}",
                self.arena_width, self.arena_height
            )));
        }
        if self.inflation_radius < 0 || self.neighbor_radius < 1 {
            return Err(MadhuError::Config(format!(
                "inflation_radius {} / neighbor_radius {} out of range",
                self.inflation_radius, self.neighbor_radius
            )));
        }
        Ok(())
    }
}

/// Planned route, stored goal-first.
///
/// Popping yields waypoints in start→goal order. The start cell itself is not
/// part of the route.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Waypoints {
    points: Vec<WorldPoint>,
}

impl Waypoints {
    /// Wrap a goal-first list of waypoints.
    pub fn from_goal_first(points: Vec<WorldPoint>) -> Self {
        Self { points }
    }

    /// Take the next waypoint to drive to.
    pub fn pop(&mut self) -> Option<WorldPoint> {
        self.points.pop()
    }

    pub fn peek(&self) -> Option<WorldPoint> {
        self.points.last().copied()
    }

    /// Final waypoint of the route.
    pub fn goal(&self) -> Option<WorldPoint> {
        self.points.first().copied()
    }

    /// Replace the final waypoint, e.g. with the exact unrounded target.
    pub fn set_goal(&mut self, goal: WorldPoint) {
        if let Some(first) = self.points.first_mut() {
            *first = goal;
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Waypoints in traversal (start→goal) order.
    pub fn in_travel_order(&self) -> impl Iterator<Item = &WorldPoint> {
        self.points.iter().rev()
    }

    /// Length of the polyline from `start` through every remaining waypoint.
    pub fn length_from(&self, start: WorldPoint) -> f32 {
        let mut length = 0.0;
        let mut previous = start;
        for point in self.in_travel_order() {
            length += previous.distance(point);
            previous = *point;
        }
        length
    }
}

/// Open set entry. Ordered so the max-heap pops the lowest f cost first;
/// ties go to the lower h cost, then to the lower cell index.
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    f_cost: f32,
    h_cost: f32,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.h_cost.total_cmp(&self.h_cost))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grid planner. Holds no state between calls.
#[derive(Clone, Debug)]
pub struct GridPlanner {
    config: PlannerConfig,
}

impl GridPlanner {
    /// Create a planner, failing on a configuration no grid can be built from.
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: PlannerConfig::default(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Build the inflated grid for a set of obstacles.
    pub fn build_grid(&self, obstacles: &[WorldPoint]) -> PlanningGrid {
        PlanningGrid::with_obstacles(
            self.config.arena_width,
            self.config.arena_height,
            self.config.cell_size,
            self.config.inflation_radius,
            obstacles,
        )
    }

    /// Plan an obstacle-free route from `start` to `goal`.
    ///
    /// Returns `None` when the goal cell cannot be reached. A start and goal in
    /// the same cell yield an empty route.
    pub fn plan(
        &self,
        start: WorldPoint,
        goal: WorldPoint,
        obstacles: &[WorldPoint],
    ) -> Option<Waypoints> {
        let mut grid = self.build_grid(obstacles);
        self.search(&mut grid, start, goal)
    }

    /// Run the search on a freshly built grid. Cell costs and states are left
    /// mutated, so a grid serves a single search.
    pub fn search(
        &self,
        grid: &mut PlanningGrid,
        start: WorldPoint,
        goal: WorldPoint,
    ) -> Option<Waypoints> {
        let start_coord = grid.world_to_grid(start);
        let goal_coord = grid.world_to_grid(goal);

        if grid.is_blocked(goal_coord) {
            tracing::debug!(
                "Goal cell ({}, {}) is blocked",
                goal_coord.x,
                goal_coord.y
            );
            return None;
        }
        if grid.is_blocked(start_coord) {
            tracing::debug!(
                "Start cell ({}, {}) lies inside an inflated obstacle",
                start_coord.x,
                start_coord.y
            );
        }

        let start_idx = grid.index(start_coord)?;
        let goal_idx = grid.index(goal_coord)?;

        let start_cell = grid.cell_at_mut(start_idx);
        start_cell.g_cost = 0.0;
        start_cell.h_cost = start_coord.euclidean_distance(&goal_coord);

        let mut open_set = BinaryHeap::new();
        open_set.push(OpenEntry {
            f_cost: start_cell.f_cost(),
            h_cost: start_cell.h_cost,
            index: start_idx,
        });

        let mut expanded = 0usize;

        while let Some(entry) = open_set.pop() {
            let current_idx = entry.index;

            if grid.cell_at(current_idx).state == CellState::Visited {
                continue;
            }

            if current_idx == goal_idx {
                tracing::debug!("Path found after expanding {} cells", expanded);
                return Some(Self::reconstruct(grid, goal_idx));
            }

            grid.cell_at_mut(current_idx).state = CellState::Visited;
            expanded += 1;

            self.expand(grid, current_idx, goal_idx, &mut open_set);
        }

        tracing::debug!("No path after expanding {} cells", expanded);
        None
    }

    /// Relax every free, unvisited cell in the square window around `current_idx`.
    fn expand(
        &self,
        grid: &mut PlanningGrid,
        current_idx: usize,
        goal_idx: usize,
        open_set: &mut BinaryHeap<OpenEntry>,
    ) {
        let current = *grid.cell_at(current_idx);
        let goal = grid.cell_at(goal_idx).coord;
        let (min, max) = grid.window(current.coord, self.config.neighbor_radius);

        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let Some(idx) = grid.index(GridCoord::new(x, y)) else {
                    continue;
                };
                if idx == current_idx {
                    continue;
                }

                let neighbor = grid.cell_at_mut(idx);
                if neighbor.state != CellState::Free {
                    continue;
                }

                let tentative = current.g_cost + current.coord.euclidean_distance(&neighbor.coord);
                if neighbor.parent.is_none() || tentative < neighbor.g_cost {
                    neighbor.parent = Some(current_idx);
                    neighbor.g_cost = tentative;
                    neighbor.h_cost = neighbor.coord.euclidean_distance(&goal);
                    open_set.push(OpenEntry {
                        f_cost: neighbor.f_cost(),
                        h_cost: neighbor.h_cost,
                        index: idx,
                    });
                }
            }
        }
    }

    /// Follow predecessor links from the goal, producing goal-first arena points.
    fn reconstruct(grid: &PlanningGrid, goal_idx: usize) -> Waypoints {
        let mut points = Vec::new();
        let mut current = grid.cell_at(goal_idx);

        while let Some(parent) = current.parent {
            points.push(grid.grid_to_world(current.coord));
            current = grid.cell_at(parent);
        }

        Waypoints::from_goal_first(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_planner() -> GridPlanner {
        GridPlanner::new(PlannerConfig {
            arena_width: 2000.0,
            arena_height: 1000.0,
            cell_size: 100.0,
            inflation_radius: 1,
            neighbor_radius: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_degenerate_cells() {
        for cell_size in [0.0, -250.0, f32::NAN, f32::INFINITY] {
            let result = GridPlanner::new(PlannerConfig {
                cell_size,
                ..Default::default()
            });
            assert!(
                matches!(result, Err(MadhuError::Config(_))),
                "cell_size {cell_size} accepted"
            );
        }

        let no_window = GridPlanner::new(PlannerConfig {
            neighbor_radius: 0,
            ..Default::default()
        });
        assert!(no_window.is_err());
        assert!(GridPlanner::new(PlannerConfig::default()).is_ok());
    }

    #[test]
    fn test_straight_path_on_empty_grid() {
        let planner = small_planner();
        let start = WorldPoint::new(0.0, 500.0);
        let goal = WorldPoint::new(1000.0, 500.0);

        let path = planner.plan(start, goal, &[]).unwrap();
        assert_eq!(path.goal(), Some(goal));
        assert_relative_eq!(path.length_from(start), 1000.0, epsilon = 1e-3);
        // Window radius 2 allows two-cell hops
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_pop_order_is_start_to_goal() {
        let planner = small_planner();
        let start = WorldPoint::new(0.0, 0.0);
        let goal = WorldPoint::new(800.0, 0.0);

        let mut path = planner.plan(start, goal, &[]).unwrap();
        let mut last_x = start.x;
        while let Some(wp) = path.pop() {
            assert!(wp.x > last_x);
            last_x = wp.x;
        }
        assert_relative_eq!(last_x, 800.0);
    }

    #[test]
    fn test_same_cell_gives_empty_route() {
        let planner = small_planner();
        let path = planner
            .plan(WorldPoint::new(510.0, 490.0), WorldPoint::new(490.0, 510.0), &[])
            .unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_blocked_goal_is_unreachable() {
        let planner = small_planner();
        let obstacle = WorldPoint::new(1000.0, 500.0);
        let path = planner.plan(WorldPoint::new(0.0, 500.0), WorldPoint::new(1050.0, 480.0), &[obstacle]);
        assert!(path.is_none());
    }

    #[test]
    fn test_detour_around_obstacle() {
        let planner = small_planner();
        let start = WorldPoint::new(0.0, 500.0);
        let goal = WorldPoint::new(1200.0, 500.0);
        let obstacle = WorldPoint::new(600.0, 500.0);

        let path = planner.plan(start, goal, &[obstacle]).unwrap();
        assert!(path.length_from(start) > 1200.0);
        for wp in path.in_travel_order() {
            assert!(
                (wp.x - obstacle.x).abs() > 100.0 || (wp.y - obstacle.y).abs() > 100.0,
                "waypoint ({}, {}) inside inflated obstacle",
                wp.x,
                wp.y
            );
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = small_planner();
        let obstacles = [WorldPoint::new(600.0, 400.0), WorldPoint::new(900.0, 700.0)];
        let a = planner.plan(WorldPoint::new(100.0, 100.0), WorldPoint::new(1700.0, 800.0), &obstacles);
        let b = planner.plan(WorldPoint::new(100.0, 100.0), WorldPoint::new(1700.0, 800.0), &obstacles);
        assert_eq!(a, b);
    }
}
