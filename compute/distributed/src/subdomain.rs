//! Rows owned by one worker, and their halo exchange protocol

use crate::{
    kernel::Kernel,
    partition::RowRange,
    transport::{Endpoint, Message, Tag, TransportError, TransportErrorKind},
};
use data::{
    grid::{Cell, Grid},
    rule::Rule,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use ndarray::Array1;

/// Rows of the grid owned by one worker, plus copies of the neighboring
/// workers' boundary rows
#[derive(Clone, Debug, PartialEq)]
pub struct Subdomain {
    /// Global rows covered by `cells`
    range: RowRange,

    /// Owned cells, which only this worker may modify
    cells: Grid,

    /// Copy of the previous worker's last row, if there is a previous worker
    above: Option<Array1<Cell>>,

    /// Copy of the next worker's first row, if there is a next worker
    below: Option<Array1<Cell>>,
}
//
impl Subdomain {
    /// Take ownership of some rows of the grid
    ///
    /// # Panics
    ///
    /// If `cells` does not have as many rows as `range` covers.
    pub fn new(range: RowRange, cells: Grid) -> Self {
        assert_eq!(cells.nrows(), range.len(), "cells should match row range");
        Self {
            range,
            cells,
            above: None,
            below: None,
        }
    }

    /// Global rows owned by this subdomain
    pub fn range(&self) -> RowRange {
        self.range
    }

    /// Owned cells
    pub fn cells(&self) -> &Grid {
        &self.cells
    }

    /// Give up the owned cells
    pub fn into_cells(self) -> Grid {
        self.cells
    }

    /// Run the simulation for a certain number of generations
    ///
    /// All workers must call this with the same number of generations, as
    /// every generation begins with a halo exchange.
    pub fn evolve(
        &mut self,
        endpoint: &Endpoint,
        rule: Rule,
        generations: usize,
    ) -> Result<(), TransportError> {
        debug!(
            "Rank {} evolving rows {:?} for {generations} generation(s)",
            endpoint.rank(),
            self.range.rows()
        );
        let mut kernel = Kernel::new(rule, [self.cells.nrows(), self.cells.ncols()]);
        for generation in 0..generations {
            self.exchange_halos(endpoint)?;
            kernel.step(
                &mut self.cells,
                self.above.as_ref().map(Array1::view),
                self.below.as_ref().map(Array1::view),
            );
            trace!("Rank {} done with generation {generation}", endpoint.rank());
        }
        Ok(())
    }

    /// Exchange boundary rows with the neighboring workers
    ///
    /// Sends never block, so both boundary rows are sent before waiting for
    /// the neighbors' rows. This way, no worker can end up waiting for a
    /// neighbor which is itself waiting for it. Upward and downward transfers
    /// use distinct tags so they cannot be mistaken for one another.
    ///
    /// Workers at the top and bottom edge of the grid have no neighbor on one
    /// side, and the matching halo stays empty (i.e. dead).
    pub fn exchange_halos(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        // Make sure every worker is done with the previous generation
        endpoint.barrier()?;

        let rank = endpoint.rank();
        let predecessor = rank.checked_sub(1);
        let successor = (rank + 1 < endpoint.size()).then_some(rank + 1);

        // Post our boundary rows
        if let Some(predecessor) = predecessor {
            let first_row = self.cells.row(0).to_owned();
            endpoint.send(predecessor, Tag::RowToPredecessor, Message::Row(first_row))?;
        }
        if let Some(successor) = successor {
            let last_row = self.cells.row(self.cells.nrows() - 1).to_owned();
            endpoint.send(successor, Tag::RowToSuccessor, Message::Row(last_row))?;
        }

        // Collect our neighbors' boundary rows
        if let Some(predecessor) = predecessor {
            self.above = Some(self.recv_row(endpoint, predecessor, Tag::RowToSuccessor)?);
        }
        if let Some(successor) = successor {
            self.below = Some(self.recv_row(endpoint, successor, Tag::RowToPredecessor)?);
        }
        Ok(())
    }

    /// Receive a boundary row and check that it has the right length
    fn recv_row(
        &self,
        endpoint: &Endpoint,
        source: usize,
        tag: Tag,
    ) -> Result<Array1<Cell>, TransportError> {
        match endpoint.recv(source, tag)? {
            Message::Row(row) if row.len() == self.cells.ncols() => Ok(row),
            _ => Err(endpoint.error(source, tag, TransportErrorKind::UnexpectedMessage)),
        }
    }

    /// Current halo rows, for inspection
    #[cfg(test)]
    fn halos(&self) -> [Option<ndarray::ArrayView1<Cell>>; 2] {
        [
            self.above.as_ref().map(Array1::view),
            self.below.as_ref().map(Array1::view),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{partition::Partition, transport};
    use data::grid;
    use std::{thread, time::Duration};

    const TIMEOUT: Duration = Duration::from_secs(10);

    /// Split a grid into subdomains, one per worker
    fn split(grid: &Grid, num_workers: usize) -> Vec<Subdomain> {
        let partition = Partition::new(grid.nrows(), grid.ncols(), num_workers).unwrap();
        partition
            .ranges()
            .map(|range| {
                let cells = grid.slice(ndarray::s![range.rows(), ..]).to_owned();
                Subdomain::new(range, cells)
            })
            .collect()
    }

    /// Run some operation on every subdomain concurrently
    fn run_all(
        subdomains: &mut [Subdomain],
        op: impl Fn(&mut Subdomain, &Endpoint) -> Result<(), TransportError> + Sync,
    ) {
        let endpoints = transport::connect(subdomains.len(), TIMEOUT);
        thread::scope(|s| {
            let op = &op;
            let handles = subdomains
                .iter_mut()
                .zip(endpoints)
                .map(|(subdomain, endpoint)| s.spawn(move || op(subdomain, &endpoint)))
                .collect::<Vec<_>>();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });
    }

    #[test]
    fn halo_contents() {
        let grid = grid::with_alive([6, 3], [[0, 0], [1, 1], [2, 2], [3, 0], [4, 1], [5, 2]]);
        let mut subdomains = split(&grid, 3);
        run_all(&mut subdomains, Subdomain::exchange_halos);

        // First worker has no predecessor, last worker has no successor
        let row = |idx: usize| Some(grid.row(idx));
        assert_eq!(subdomains[0].halos(), [None, row(2)]);
        assert_eq!(subdomains[1].halos(), [row(1), row(4)]);
        assert_eq!(subdomains[2].halos(), [row(3), None]);
    }

    #[test]
    fn one_row_per_worker() {
        // Vertical blinker, one row per worker, top and bottom rows touching
        // the edges of the grid
        let grid = grid::with_alive([3, 3], [[0, 1], [1, 1], [2, 1]]);
        let mut subdomains = split(&grid, 3);
        run_all(&mut subdomains, |subdomain, endpoint| {
            subdomain.evolve(endpoint, Rule::default(), 1)
        });
        let rows = subdomains
            .iter()
            .map(|subdomain| subdomain.cells().clone())
            .collect::<Vec<_>>();
        assert_eq!(rows[0], grid::dead([1, 3]));
        assert_eq!(rows[1], grid::with_alive([1, 3], [[0, 0], [0, 1], [0, 2]]));
        assert_eq!(rows[2], grid::dead([1, 3]));
    }

    #[test]
    fn zero_generations() {
        let grid = grid::with_alive([4, 4], [[1, 1], [1, 2], [2, 1]]);
        let mut subdomains = split(&grid, 2);
        let before = subdomains.clone();
        run_all(&mut subdomains, |subdomain, endpoint| {
            subdomain.evolve(endpoint, Rule::default(), 0)
        });
        assert_eq!(subdomains, before);
    }

    #[test]
    fn wrong_row_length() {
        let mut endpoints = transport::connect(2, TIMEOUT);
        let bottom_endpoint = endpoints.pop().unwrap();
        let top_endpoint = endpoints.pop().unwrap();
        let mut bottom = Subdomain::new(RowRange { start: 1, end: 2 }, grid::dead([1, 3]));

        // Top worker sends a row that is too short
        top_endpoint
            .send(1, Tag::RowToSuccessor, Message::Row(Array1::default(2)))
            .unwrap();
        thread::scope(|s| {
            s.spawn(|| top_endpoint.barrier().unwrap());
            assert_eq!(
                bottom.exchange_halos(&bottom_endpoint),
                Err(TransportError::PointToPoint {
                    rank: 1,
                    peer: 0,
                    tag: Tag::RowToSuccessor,
                    kind: TransportErrorKind::UnexpectedMessage
                })
            );
        });
    }
}
