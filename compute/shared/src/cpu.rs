//! Facilities that are specific to single-process CPU implementations

use crate::{Simulate, SimulateBase, SimulateCreate};
use data::grid::Grid;

/// Simplified version of Simulate that simulates a single generation at a time
///
/// If you implement this, then a [`Simulate`] implementation that loops over
/// generations will be automatically provided.
///
/// This is good enough for single-process computations, but distributed
/// computations, which pay a large setup cost on each call, should rather
/// process all generations in one go by implementing `Simulate` directly.
pub trait SimulateStep: SimulateBase + SimulateCreate {
    /// Perform a single simulation step
    ///
    /// At the end of the step, `grid` must contain the next generation.
    fn perform_step(&self, grid: &mut Grid) -> Result<(), Self::Error>;
}
//
impl<T: SimulateStep> Simulate for T {
    fn perform_steps(&self, grid: &mut Grid, steps: usize) -> Result<(), Self::Error> {
        for _ in 0..steps {
            self.perform_step(grid)?;
        }
        Ok(())
    }
}
