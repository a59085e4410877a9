//! Local evolution kernel
//!
//! Advances the rows owned by one worker by one generation. Rows above and
//! below the owned region come from the halo exchange, and cells beyond the
//! left and right edges of the grid are dead.

use data::{
    grid::{Cell, Grid},
    rule::Rule,
};
use ndarray::{s, Array2, ArrayView1, Zip};

/// Offsets of the 8 Moore neighbors within a 3x3 window of the padded buffer
const NEIGHBOR_OFFSETS: [[usize; 2]; 8] = [
    [0, 0],
    [0, 1],
    [0, 2],
    [1, 0],
    [1, 2],
    [2, 0],
    [2, 1],
    [2, 2],
];

/// Per-worker evolution kernel with reusable scratch buffers
#[derive(Clone, Debug)]
pub struct Kernel {
    /// Automaton rule
    rule: Rule,

    /// Owned cells surrounded by one row of halo above and below and one
    /// column of dead cells on each side, as live neighbor contributions
    padded: Array2<u8>,

    /// Live neighbor count of each owned cell
    neighbors: Array2<u8>,
}
//
impl Kernel {
    /// Prepare to evolve an owned region of shape `[rows, cols]`
    pub fn new(rule: Rule, [rows, cols]: [usize; 2]) -> Self {
        Self {
            rule,
            padded: Array2::zeros([rows + 2, cols + 2]),
            neighbors: Array2::zeros([rows, cols]),
        }
    }

    /// Advance `owned` by one generation
    ///
    /// `above` and `below` are copies of the neighboring workers' boundary
    /// rows. A missing halo row means that `owned` touches the top or bottom
    /// edge of the grid, in which case the matching neighbors are dead.
    ///
    /// # Panics
    ///
    /// If `owned` does not have the shape this kernel was set up for, or if a
    /// halo row does not have as many cells as `owned` has columns.
    pub fn step(
        &mut self,
        owned: &mut Grid,
        above: Option<ArrayView1<Cell>>,
        below: Option<ArrayView1<Cell>>,
    ) {
        assert_eq!(owned.shape(), self.neighbors.shape());
        self.refresh_padded(owned, above, below);
        self.count_neighbors();

        // Only now that all neighbor counts are known can cells be updated
        let rule = &self.rule;
        Zip::from(owned)
            .and(&self.neighbors)
            .for_each(|cell, &live_neighbors| *cell = rule.next_state(*cell, live_neighbors));
    }

    /// Copy the current owned cells and halos into the padded buffer
    fn refresh_padded(
        &mut self,
        owned: &Grid,
        above: Option<ArrayView1<Cell>>,
        below: Option<ArrayView1<Cell>>,
    ) {
        let [rows, cols] = [owned.nrows(), owned.ncols()];
        let mut fill_row = |row: usize, halo: Option<ArrayView1<Cell>>| {
            let mut target = self.padded.slice_mut(s![row, 1..=cols]);
            match halo {
                Some(halo) => target.assign(&halo.mapv(Cell::population)),
                None => target.fill(0),
            }
        };
        fill_row(0, above);
        fill_row(rows + 1, below);
        self.padded
            .slice_mut(s![1..=rows, 1..=cols])
            .assign(&owned.mapv(Cell::population));
    }

    /// Sum the 8 shifted views of the padded buffer
    fn count_neighbors(&mut self) {
        let [rows, cols] = [self.neighbors.nrows(), self.neighbors.ncols()];
        self.neighbors.fill(0);
        for [row_offset, col_offset] in NEIGHBOR_OFFSETS {
            self.neighbors += &self.padded.slice(s![
                row_offset..row_offset + rows,
                col_offset..col_offset + cols
            ]);
        }
    }
}
