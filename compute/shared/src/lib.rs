//! Common facilities shared by all compute backends

#[cfg(feature = "criterion")]
#[doc(hidden)]
pub mod benchmark;
pub mod cpu;

use clap::Args;
use data::{grid::Grid, rule::Rule};
use std::{error::Error, fmt::Debug};

// Reexport so users of the blanket Simulate impl need only depend on us
pub use cpu::SimulateStep;

/// Commonalities between all ways to set up a simulation
pub trait SimulateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args + Debug;

    /// Things that can go wrong when running the simulation
    type Error: Error + Send + Sync + 'static;

    /// Number of workers that will share the work of simulating a grid of a
    /// certain `[rows, cols]` shape
    fn num_workers(&self, _shape: [usize; 2]) -> usize {
        1
    }
}

/// Simulation creation
///
/// Split out of [`SimulateBase`] so that backends can provide it through
/// blanket implementations when that makes sense.
pub trait SimulateCreate: SimulateBase {
    /// Set up the simulation
    fn new(rule: Rule, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Simulation compute backend interface expected by the binaries
pub trait Simulate: SimulateBase + SimulateCreate {
    /// Perform `steps` simulation steps (generations)
    ///
    /// On success, `grid` contains the state of the automaton after `steps`
    /// generations. On failure, the contents of `grid` are unspecified and
    /// should not be used.
    fn perform_steps(&self, grid: &mut Grid, steps: usize) -> Result<(), Self::Error>;
}

/// Placeholder for backends that do not have any CLI argument
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NoArgs {}

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
#[cfg(feature = "criterion")]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<$backend::Simulation>(c, stringify!($backend))
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}
