//! Planning grid with obstacle inflation.
//!
//! The grid owns every cell for the duration of one planning call. Predecessor
//! links are plain cell indices into the same grid.

use crate::core::{GridCoord, WorldPoint};

/// Classification of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Traversable, not yet expanded
    Free,
    /// Within the inflation radius of an obstacle
    Blocked,
    /// Expanded by the search; its g cost is final
    Visited,
}

/// Search node for one grid cell.
#[derive(Clone, Copy, Debug)]
pub struct Cell {
    pub coord: GridCoord,
    /// Cost from the start along the best known path
    pub g_cost: f32,
    /// Heuristic cost to the goal
    pub h_cost: f32,
    pub state: CellState,
    /// Index of the predecessor on the best known path
    pub parent: Option<usize>,
}

impl Cell {
    fn new(coord: GridCoord) -> Self {
        Self {
            coord,
            g_cost: 0.0,
            h_cost: 0.0,
            state: CellState::Free,
            parent: None,
        }
    }

    #[inline]
    pub fn f_cost(&self) -> f32 {
        self.g_cost + self.h_cost
    }
}

/// Uniform grid discretizing the arena.
#[derive(Clone, Debug)]
pub struct PlanningGrid {
    width: usize,
    height: usize,
    cell_size: f32,
    cells: Vec<Cell>,
}

impl PlanningGrid {
    /// Build an empty grid of `arena_width / cell_size` by `arena_height / cell_size` cells.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not a positive finite number. Planners check
    /// this up front through `PlannerConfig::validate`.
    pub fn new(arena_width: f32, arena_height: f32, cell_size: f32) -> Self {
        assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "cell size must be positive, got {cell_size}"
        );
        let width = ((arena_width / cell_size).floor() as usize).max(1);
        let height = ((arena_height / cell_size).floor() as usize).max(1);

        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                cells.push(Cell::new(GridCoord::new(x, y)));
            }
        }

        Self {
            width,
            height,
            cell_size,
            cells,
        }
    }

    /// Build a grid and block every cell within `inflation_radius` cells of each obstacle.
    pub fn with_obstacles(
        arena_width: f32,
        arena_height: f32,
        cell_size: f32,
        inflation_radius: i32,
        obstacles: &[WorldPoint],
    ) -> Self {
        let mut grid = Self::new(arena_width, arena_height, cell_size);
        for &obstacle in obstacles {
            let center = grid.world_to_grid(obstacle);
            grid.block_around(center, inflation_radius);
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Nearest cell to an arena point. Rounds rather than floors, then clamps to the grid.
    pub fn world_to_grid(&self, point: WorldPoint) -> GridCoord {
        let x = (point.x / self.cell_size).round() as i32;
        let y = (point.y / self.cell_size).round() as i32;
        GridCoord::new(
            x.clamp(0, self.width as i32 - 1),
            y.clamp(0, self.height as i32 - 1),
        )
    }

    /// Arena position of a cell.
    pub fn grid_to_world(&self, coord: GridCoord) -> WorldPoint {
        WorldPoint::new(
            coord.x as f32 * self.cell_size,
            coord.y as f32 * self.cell_size,
        )
    }

    /// Flat index of a coordinate, `None` outside the grid.
    #[inline]
    pub fn index(&self, coord: GridCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as usize, coord.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Inclusive bounds `(min, max)` of a square window around `center`, clipped to the grid.
    pub fn window(&self, center: GridCoord, radius: i32) -> (GridCoord, GridCoord) {
        let min = GridCoord::new((center.x - radius).max(0), (center.y - radius).max(0));
        let max = GridCoord::new(
            (center.x + radius).min(self.width as i32 - 1),
            (center.y + radius).min(self.height as i32 - 1),
        );
        (min, max)
    }

    /// Mark the square window of `radius` cells around `center` as blocked.
    pub fn block_around(&mut self, center: GridCoord, radius: i32) {
        let (min, max) = self.window(center, radius);
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                if let Some(idx) = self.index(GridCoord::new(x, y)) {
                    self.cells[idx].state = CellState::Blocked;
                }
            }
        }
    }

    pub fn is_blocked(&self, coord: GridCoord) -> bool {
        self.cell(coord)
            .is_none_or(|cell| cell.state == CellState::Blocked)
    }

    pub fn cell(&self, coord: GridCoord) -> Option<&Cell> {
        self.index(coord).map(|idx| &self.cells[idx])
    }

    #[inline]
    pub(super) fn cell_at(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    #[inline]
    pub(super) fn cell_at_mut(&mut self, idx: usize) -> &mut Cell {
        &mut self.cells[idx]
    }

    /// Arena positions of all blocked cells.
    pub fn blocked_points(&self) -> Vec<WorldPoint> {
        self.cells
            .iter()
            .filter(|cell| cell.state == CellState::Blocked)
            .map(|cell| self.grid_to_world(cell.coord))
            .collect()
    }
}
