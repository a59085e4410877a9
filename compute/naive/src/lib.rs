//! Naive implementation of the Game of Life
//!
//! This version processes the whole grid in a single process, looking up the
//! Moore neighborhood of each cell with bounds clamped to the grid's edges. It
//! is slow for that reason, but simple enough to serve as a reference against
//! which other backends are checked.

use compute::{NoArgs, SimulateBase, SimulateCreate, SimulateStep};
use data::{
    array2,
    grid::{Cell, Grid},
    rule::Rule,
};
use std::convert::Infallible;

/// Game of Life simulation
#[derive(Debug)]
pub struct Simulation {
    /// Automaton rule
    rule: Rule,
}
//
impl SimulateBase for Simulation {
    type CliArgs = NoArgs;

    type Error = Infallible;
}
//
impl SimulateCreate for Simulation {
    fn new(rule: Rule, _args: NoArgs) -> Result<Self, Infallible> {
        Ok(Self { rule })
    }
}
//
impl SimulateStep for Simulation {
    fn perform_step(&self, grid: &mut Grid) -> Result<(), Infallible> {
        let shape = array2(|i| grid.shape()[i]);
        let mut next = Grid::default(shape);

        // Iterate over cells of the grid
        let input = grid.view();
        ndarray::azip!((index (row, col), out in &mut next, &cell in &input) {
            // Determine neighborhood, clamped to the edges of the grid
            let pos = [row, col];
            let start = array2(|i| pos[i].saturating_sub(1));
            let end = array2(|i| (pos[i] + 2).min(shape[i]));
            let neighborhood = input.slice(ndarray::s![start[0]..end[0], start[1]..end[1]]);

            // Count live neighbors, excluding the cell itself
            let live_neighbors = neighborhood
                .iter()
                .map(|neighbor| neighbor.population())
                .sum::<u8>()
                - cell.population();

            // Apply the automaton rule
            *out = self.rule.next_state(cell, live_neighbors);
        });

        *grid = next;
        Ok(())
    }
}
