//! Pick the best compute backend allowed by enabled crate features, expose it
//! as a Simulation typedef.

cfg_if::cfg_if! {
    if #[cfg(feature = "compute_distributed")] {
        pub type Simulation = compute_distributed::Simulation;
    } else if #[cfg(any(feature = "compute_naive", test))] {
        pub type Simulation = compute_naive::Simulation;
    } else {
        // If no backend was specified, use a backend skeleton that throws a
        // minimal number of compiler errors.
        use compute::{NoArgs, Simulate, SimulateBase, SimulateCreate};
        use data::{grid::Grid, rule::Rule};
        use std::convert::Infallible;
        //
        pub struct Simulation;
        //
        impl SimulateBase for Simulation {
            type CliArgs = NoArgs;

            type Error = Infallible;
        }
        //
        impl SimulateCreate for Simulation {
            fn new(_rule: Rule, _args: NoArgs) -> Result<Self, Infallible> {
                std::compile_error!("Please enable at least one compute backend via crate features")
            }
        }
        //
        impl Simulate for Simulation {
            fn perform_steps(&self, _grid: &mut Grid, _steps: usize) -> Result<(), Infallible> {
                Ok(())
            }
        }
    }
}
