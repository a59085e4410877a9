//! Coordinator and worker roles
//!
//! Every participant of the simulation evolves its own rows with the same
//! kernel and halo exchange protocol. On top of that, the coordinator (rank 0)
//! splits the grid across workers before the simulation, and collects the
//! results afterwards.

use crate::{
    partition::Partition,
    subdomain::Subdomain,
    transport::{Endpoint, Message, Tag, TransportErrorKind},
    Error,
};
use data::{grid::Grid, rule::Rule};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use ndarray::s;

/// Part played by one participant in the simulation
#[derive(Debug)]
pub enum Role<'grid> {
    /// Owner of the full grid, also acts as worker 0
    Coordinator {
        /// Full grid, replaced with the final generation on success
        grid: &'grid mut Grid,

        /// How the grid is split across workers
        partition: Partition,

        /// Number of generations to be simulated
        generations: usize,
    },

    /// Any other worker, which learns what to do from the coordinator
    Worker,
}
//
impl Role<'_> {
    /// Play this role until the simulation is over or something goes wrong
    ///
    /// On failure, the collective barrier is aborted so that other workers
    /// notice the failure without waiting for their timeout.
    pub fn run(self, endpoint: &Endpoint, rule: Rule) -> Result<(), Error> {
        let result = match self {
            Self::Coordinator {
                grid,
                partition,
                generations,
            } => coordinate(grid, partition, generations, endpoint, rule),
            Self::Worker => work(endpoint, rule),
        };
        if let Err(e) = &result {
            debug!("Rank {} failed: {e}", endpoint.rank());
            endpoint.abort();
        }
        result
    }
}

/// Coordinator side of the simulation
fn coordinate(
    grid: &mut Grid,
    partition: Partition,
    generations: usize,
    endpoint: &Endpoint,
    rule: Rule,
) -> Result<(), Error> {
    debug_assert_eq!(partition.num_workers(), endpoint.size());
    debug_assert_eq!(grid.shape(), partition.shape());

    // Ship every other worker its rows
    for rank in 1..partition.num_workers() {
        let range = partition.range(rank);
        endpoint.send(
            rank,
            Tag::Assignment,
            Message::Assignment {
                range,
                generations,
                cells: grid.slice(s![range.rows(), ..]).to_owned(),
            },
        )?;
    }

    // Process our own rows
    let range = partition.range(0);
    let mut subdomain = Subdomain::new(range, grid.slice(s![range.rows(), ..]).to_owned());
    subdomain.evolve(endpoint, rule, generations)?;

    // Reassemble the full grid
    *grid = collect(subdomain, partition, endpoint)?;
    Ok(())
}

/// Gather every worker's final rows into a full grid
///
/// The result of each worker doubles as a signal that it is done with all
/// generations. If any of them is missing, no grid is produced.
fn collect(own: Subdomain, partition: Partition, endpoint: &Endpoint) -> Result<Grid, Error> {
    let [_rows, cols] = partition.shape();
    let mut output = Grid::default(partition.shape());
    output
        .slice_mut(s![own.range().rows(), ..])
        .assign(own.cells());

    let mut missing = Vec::new();
    for rank in 1..partition.num_workers() {
        let range = partition.range(rank);
        match endpoint.recv(rank, Tag::Result) {
            Ok(Message::Result(cells)) if cells.dim() == (range.len(), cols) => {
                output.slice_mut(s![range.rows(), ..]).assign(&cells);
            }
            Ok(_) => {
                let e = endpoint.error(rank, Tag::Result, TransportErrorKind::UnexpectedMessage);
                warn!("Discarding result of rank {rank}: {e}");
                missing.push(rank);
            }
            Err(e) => {
                warn!("No result from rank {rank}: {e}");
                missing.push(rank);
            }
        }
    }

    if missing.is_empty() {
        debug!("Collected results from {} worker(s)", partition.num_workers());
        Ok(output)
    } else {
        Err(Error::IncompleteGather { missing })
    }
}

/// Worker side of the simulation
fn work(endpoint: &Endpoint, rule: Rule) -> Result<(), Error> {
    let Message::Assignment {
        range,
        generations,
        cells,
    } = endpoint.recv(0, Tag::Assignment)?
    else {
        return Err(endpoint
            .error(0, Tag::Assignment, TransportErrorKind::UnexpectedMessage)
            .into());
    };
    if cells.nrows() != range.len() {
        return Err(endpoint
            .error(0, Tag::Assignment, TransportErrorKind::UnexpectedMessage)
            .into());
    }

    let mut subdomain = Subdomain::new(range, cells);
    subdomain.evolve(endpoint, rule, generations)?;
    endpoint.send(0, Tag::Result, Message::Result(subdomain.into_cells()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport;
    use data::grid;
    use std::{thread, time::Duration};

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn missing_result() {
        let initial = grid::with_alive([4, 4], [[0, 0], [3, 3]]);
        let mut grid = initial.clone();
        let partition = Partition::new(4, 4, 2).unwrap();
        let mut endpoints = transport::connect(2, TIMEOUT);
        let worker = endpoints.pop().unwrap();
        let coordinator = endpoints.pop().unwrap();

        // Worker takes its assignment, then vanishes without a result
        let result = thread::scope(|s| {
            s.spawn(move || {
                worker.recv(0, Tag::Assignment).unwrap();
            });
            Role::Coordinator {
                grid: &mut grid,
                partition,
                generations: 0,
            }
            .run(&coordinator, Rule::default())
        });
        assert!(matches!(result, Err(Error::IncompleteGather { missing }) if missing == [1]));
        assert_eq!(grid, initial);
    }

    #[test]
    fn malformed_result() {
        let mut grid = grid::dead([4, 4]);
        let partition = Partition::new(4, 4, 2).unwrap();
        let mut endpoints = transport::connect(2, TIMEOUT);
        let worker = endpoints.pop().unwrap();
        let coordinator = endpoints.pop().unwrap();

        // Worker answers with the wrong number of rows
        let result = thread::scope(|s| {
            s.spawn(move || {
                worker.recv(0, Tag::Assignment).unwrap();
                worker
                    .send(0, Tag::Result, Message::Result(grid::dead([3, 4])))
                    .unwrap();
            });
            Role::Coordinator {
                grid: &mut grid,
                partition,
                generations: 0,
            }
            .run(&coordinator, Rule::default())
        });
        assert!(matches!(result, Err(Error::IncompleteGather { missing }) if missing == [1]));
    }

    #[test]
    fn coordinator_vanishes() {
        let mut endpoints = transport::connect(2, TIMEOUT);
        let worker = endpoints.pop().unwrap();
        drop(endpoints);
        assert!(matches!(
            Role::Worker.run(&worker, Rule::default()),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn neighbor_vanishes_mid_run() {
        let mut grid = grid::dead([6, 6]);
        let partition = Partition::new(6, 6, 3).unwrap();
        let mut endpoints = transport::connect(3, TIMEOUT).into_iter();
        let coordinator = endpoints.next().unwrap();
        let middle = endpoints.next().unwrap();
        let last = endpoints.next().unwrap();

        thread::scope(|s| {
            // Middle worker takes its assignment, then vanishes
            s.spawn(move || {
                middle.recv(0, Tag::Assignment).unwrap();
                middle.abort();
            });
            let last = s.spawn(move || Role::Worker.run(&last, Rule::default()));
            let coordinator_result = Role::Coordinator {
                grid: &mut grid,
                partition,
                generations: 5,
            }
            .run(&coordinator, Rule::default());
            drop(coordinator);
            assert!(matches!(coordinator_result, Err(Error::Transport(_))));
            assert!(matches!(last.join().unwrap(), Err(Error::Transport(_))));
        });
    }
}
