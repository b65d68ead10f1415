//! Grid index: cell coordinates, bounds, disabled cells, and world <-> grid conversion.

use crate::coin::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Discrete grid coordinate. `z` grows "up" the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Neighbouring cell one step in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dz) = dir.offset();
        Self::new(self.x + dx, self.z + dz)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Placement in world space. `y` is stacking height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Height of the first coin above a cell and of each coin stacked on it.
pub const FIRST_COIN_OFFSET_Y: f32 = 0.5;
pub const STACK_OFFSET_Y: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct GridIndex {
    width: i32,
    height: i32,
    spacing: (f32, f32),
    origin: WorldPos,
    disabled: HashSet<Cell>,
}

impl GridIndex {
    /// Callers validate dimensions and spacing first (see `LevelData::validate`).
    pub fn new(
        width: i32,
        height: i32,
        spacing: (f32, f32),
        origin: WorldPos,
        disabled: impl IntoIterator<Item = Cell>,
    ) -> Self {
        Self {
            width,
            height,
            spacing,
            origin,
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Round a world position onto the grid.
    pub fn to_cell(&self, pos: WorldPos) -> Cell {
        let lx = pos.x - self.origin.x;
        let lz = pos.z - self.origin.z;
        Cell::new(
            (lx / self.spacing.0).round() as i32,
            (lz / self.spacing.1).round() as i32,
        )
    }

    /// World position of the coin at `level` (0 = bottom) of the stack on `cell`.
    pub fn to_world(&self, cell: Cell, level: usize) -> WorldPos {
        WorldPos::new(
            self.origin.x + cell.x as f32 * self.spacing.0,
            self.origin.y + FIRST_COIN_OFFSET_Y + level as f32 * STACK_OFFSET_Y,
            self.origin.z + cell.z as f32 * self.spacing.1,
        )
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.z)
    }

    pub fn is_disabled(&self, cell: Cell) -> bool {
        self.disabled.contains(&cell)
    }

    pub fn is_enabled(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.is_disabled(cell)
    }

    /// Enabled cells, row by row from the top (highest z) down, left to right.
    pub fn enabled_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height)
            .rev()
            .flat_map(move |z| (0..self.width).map(move |x| Cell::new(x, z)))
            .filter(|c| !self.is_disabled(*c))
    }
}
