//! Cellular automaton grid

use ndarray::{Array2, ArrayView2};

/// State of a single cell of the grid
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Cell {
    /// Empty cell
    #[default]
    Dead,

    /// Populated cell
    Alive,
}
//
impl Cell {
    /// Translate a boolean "is alive" flag into a cell state
    #[inline]
    pub fn from_alive(alive: bool) -> Self {
        if alive {
            Self::Alive
        } else {
            Self::Dead
        }
    }

    /// Truth that this cell is alive
    #[inline]
    pub fn is_alive(self) -> bool {
        self == Self::Alive
    }

    /// Contribution of this cell to its neighbors' live neighbor count
    #[inline]
    pub fn population(self) -> u8 {
        self as u8
    }
}

/// Full simulation grid, or a row-wise subset thereof
///
/// Rows are the first axis, columns the second one. Cells outside of the grid
/// are treated as dead, there is no wraparound.
pub type Grid = Array2<Cell>;

/// Set up an all-dead grid of a certain `[rows, cols]` shape
pub fn dead(shape: [usize; 2]) -> Grid {
    Grid::default(shape)
}

/// Build a grid of a certain `[rows, cols]` shape where the listed
/// `[row, col]` positions are alive and other cells are dead
///
/// # Panics
///
/// If one of the positions is out of bounds.
pub fn with_alive(shape: [usize; 2], alive: impl IntoIterator<Item = [usize; 2]>) -> Grid {
    let mut grid = dead(shape);
    for pos in alive {
        grid[pos] = Cell::Alive;
    }
    grid
}

/// Set up a random grid where each cell is alive with probability `density`
///
/// # Panics
///
/// If `density` is not between 0.0 and 1.0.
#[cfg(feature = "random")]
pub fn random(shape: [usize; 2], density: f64, rng: &mut impl rand::Rng) -> Grid {
    Grid::from_shape_simple_fn(shape, || Cell::from_alive(rng.gen_bool(density)))
}

/// Count the live cells of a grid
pub fn population(grid: ArrayView2<Cell>) -> usize {
    grid.iter().filter(|cell| cell.is_alive()).count()
}
