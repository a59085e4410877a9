//! Benchmarking utilities
//!
//! Please consider using the macros provided by this crate instead of calling
//! these implementation details directly.

use crate::Simulate;
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{grid, rule::Rule};
use rand::{rngs::StdRng, SeedableRng};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all Game of Life computations
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<Simulation: Simulate>(c: &mut Criterion, backend_name: &str) {
    init_logger();

    let args = Simulation::CliArgs::from_arg_matches(
        &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    let sim = Simulation::new(black_box(Rule::default()), black_box(args))
        .expect("Failed to set up simulation");
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut group = c.benchmark_group(backend_name.to_owned());
    for num_steps_pow2 in [0, 4, 8] {
        let num_steps = 2u64.pow(num_steps_pow2);
        for size_pow2 in 5..=10 {
            let size = 2usize.pow(size_pow2);
            let shape = [size, size];
            let num_elems = (shape[0] * shape[1]) as u64;

            let initial = grid::random(shape, 0.3, &mut rng);

            group.throughput(Throughput::Elements(num_elems * num_steps));
            group.bench_function(
                BenchmarkId::from_parameter(format!("{num_steps}x{num_elems}")),
                |b| {
                    b.iter_batched_ref(
                        || initial.clone(),
                        |grid| {
                            sim.perform_steps(grid, num_steps as usize)
                                .expect("Failed to compute simulation steps")
                        },
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
    }
    group.finish();
}
