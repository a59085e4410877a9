//! Distributed implementation of Conway's Game of Life
//!
//! The grid is split into contiguous bands of rows, each owned by one worker
//! thread. Workers share no memory: before each generation, every worker
//! exchanges its boundary rows with the workers that own the adjacent bands,
//! then advances its own rows by one generation. Once all generations have
//! been simulated, the coordinator (rank 0) collects everyone's rows back into
//! the full grid.

pub mod barrier;
pub mod kernel;
pub mod partition;
pub mod role;
pub mod subdomain;
pub mod transport;

use crate::{partition::Partition, role::Role, transport::TransportError};
use clap::Args;
use compute::{Simulate, SimulateBase, SimulateCreate};
use data::{grid::Grid, rule::Rule};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::{
    num::{NonZeroU64, NonZeroUsize},
    thread::{self, ScopedJoinHandle},
    time::Duration,
};
use thiserror::Error;

/// Default bound on blocking exchanges between workers, in milliseconds
const DEFAULT_EXCHANGE_TIMEOUT_MS: NonZeroU64 = match NonZeroU64::new(10_000) {
    Some(timeout) => timeout,
    None => unreachable!(),
};

/// Parameters are tunable via CLI args and environment variables
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct CliArgs {
    /// Number of workers
    ///
    /// Defaults to the number of CPU threads, or the number of grid rows if
    /// there are fewer rows than that.
    #[arg(short = 'j', long, env)]
    pub num_workers: Option<NonZeroUsize>,

    /// Time after which a worker gives up on waiting for its peers, in
    /// milliseconds
    #[arg(long, env, default_value_t = DEFAULT_EXCHANGE_TIMEOUT_MS)]
    pub exchange_timeout_ms: NonZeroU64,
}
//
impl Default for CliArgs {
    fn default() -> Self {
        Self {
            num_workers: None,
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
        }
    }
}

/// Game of Life simulation distributed across worker threads
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Automaton rule
    rule: Rule,

    /// Requested number of workers, if any
    num_workers: Option<NonZeroUsize>,

    /// Bound on each blocking exchange between workers
    exchange_timeout: Duration,
}
//
impl SimulateBase for Simulation {
    type CliArgs = CliArgs;

    type Error = Error;

    fn num_workers(&self, [rows, _cols]: [usize; 2]) -> usize {
        match self.num_workers {
            Some(num_workers) => num_workers.get(),
            None => thread::available_parallelism()
                .map_or(1, usize::from)
                .min(rows),
        }
    }
}
//
impl SimulateCreate for Simulation {
    fn new(rule: Rule, args: CliArgs) -> Result<Self, Error> {
        Ok(Self {
            rule,
            num_workers: args.num_workers,
            exchange_timeout: Duration::from_millis(args.exchange_timeout_ms.get()),
        })
    }
}
//
impl Simulate for Simulation {
    fn perform_steps(&self, grid: &mut Grid, steps: usize) -> Result<(), Error> {
        // Check the topology before any worker is started
        let [rows, cols] = [grid.nrows(), grid.ncols()];
        let partition = Partition::new(rows, cols, self.num_workers([rows, cols]))?;
        let num_workers = partition.num_workers();
        debug!("Simulating {steps} generation(s) of a {rows}x{cols} grid on {num_workers} worker(s)");

        let mut endpoints = transport::connect(num_workers, self.exchange_timeout).into_iter();
        let Some(coordinator) = endpoints.next() else {
            return Err(Error::InvalidTopology { rows, workers: 0 });
        };
        let rule = self.rule;
        thread::scope(|s| -> Result<(), Error> {
            let workers = endpoints
                .map(|endpoint| {
                    let rank = endpoint.rank();
                    (rank, s.spawn(move || Role::Worker.run(&endpoint, rule)))
                })
                .collect::<Vec<_>>();

            // The coordinator also processes the first rows
            let coordinator_result = Role::Coordinator {
                grid,
                partition,
                generations: steps,
            }
            .run(&coordinator, rule);
            drop(coordinator);

            // Report the coordinator's error first, as worker errors are
            // usually a consequence of it
            let workers_result = join_workers(workers);
            coordinator_result?;
            workers_result
        })
    }
}

/// Wait for worker threads to finish, logging their errors and returning the
/// first of them in rank order
fn join_workers(
    workers: Vec<(usize, ScopedJoinHandle<'_, Result<(), Error>>)>,
) -> Result<(), Error> {
    let mut first_error = None;
    for (rank, handle) in workers {
        let result = handle
            .join()
            .unwrap_or(Err(Error::WorkerPanicked { rank }));
        if let Err(e) = result {
            error!("Worker {rank} failed: {e}");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Things that can go wrong when running the simulation
#[derive(Debug, Error)]
pub enum Error {
    /// The grid cannot be split across the requested number of workers
    #[error("cannot split {rows} grid row(s) across {workers} worker(s)")]
    InvalidTopology {
        /// Number of rows in the grid
        rows: usize,

        /// Requested number of workers
        workers: usize,
    },

    /// Workers failed to communicate
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Some workers did not deliver their final rows to the coordinator
    #[error("no valid result from worker(s) {missing:?}")]
    IncompleteGather {
        /// Ranks of the workers whose result is missing
        missing: Vec<usize>,
    },

    /// A worker thread panicked
    #[error("worker {rank} panicked")]
    WorkerPanicked {
        /// Rank of the worker that panicked
        rank: usize,
    },
}
