//! Message passing between workers
//!
//! Workers share no memory. They only communicate through tagged
//! point-to-point messages and a collective barrier, much like processes of an
//! MPI job would. Sends never block, receives and barrier waits are bounded by
//! a timeout.

use crate::{
    barrier::{Barrier, BarrierError},
    partition::RowRange,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use data::grid::{Cell, Grid};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use ndarray::Array1;
use std::{collections::HashMap, sync::Arc, thread, time::Duration};
use thiserror::Error;

/// Kind of message, used to tell apart transfers between the same two workers
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Tag {
    /// Coordinator → worker: rows to be evolved and number of generations
    Assignment,

    /// Worker → previous worker: first owned row
    RowToPredecessor,

    /// Worker → next worker: last owned row
    RowToSuccessor,

    /// Worker → coordinator: owned rows after the last generation
    Result,
}

/// Message payload
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Work assigned to a worker by the coordinator
    Assignment {
        /// Global rows owned by the worker
        range: RowRange,

        /// Number of generations to be simulated
        generations: usize,

        /// Initial state of the owned rows
        cells: Grid,
    },

    /// Copy of a boundary row, for use as a halo
    Row(Array1<Cell>),

    /// Final state of a worker's owned rows
    Result(Grid),
}

/// Set up communication endpoints for `size` workers, in rank order
///
/// Only the routes that the simulation needs are set up: assignments from and
/// results to the coordinator (rank 0), boundary rows between workers of
/// adjacent rank.
pub fn connect(size: usize, timeout: Duration) -> Vec<Endpoint> {
    let barrier = Arc::new(Barrier::new(size));
    let mut endpoints = (0..size)
        .map(|rank| Endpoint {
            rank,
            size,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            barrier: barrier.clone(),
            timeout,
        })
        .collect::<Vec<_>>();

    let mut add_route = |source: usize, dest: usize, tag: Tag| {
        let (sender, receiver) = crossbeam_channel::unbounded();
        endpoints[source].outgoing.insert((dest, tag), sender);
        endpoints[dest].incoming.insert((source, tag), receiver);
    };
    for rank in 1..size {
        add_route(0, rank, Tag::Assignment);
        add_route(rank, 0, Tag::Result);
        add_route(rank, rank - 1, Tag::RowToPredecessor);
        add_route(rank - 1, rank, Tag::RowToSuccessor);
    }
    endpoints
}

/// One worker's connection to its peers
#[derive(Debug)]
pub struct Endpoint {
    /// Rank of the worker using this endpoint
    rank: usize,

    /// Total number of workers
    size: usize,

    /// Senders indexed by destination rank and tag
    outgoing: HashMap<(usize, Tag), Sender<Message>>,

    /// Receivers indexed by source rank and tag
    incoming: HashMap<(usize, Tag), Receiver<Message>>,

    /// Collective barrier shared by all workers
    barrier: Arc<Barrier>,

    /// Bound on the duration of blocking operations
    timeout: Duration,
}
//
impl Endpoint {
    /// Rank of the worker using this endpoint
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Total number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Send a message to another worker without waiting for it to be received
    pub fn send(&self, dest: usize, tag: Tag, message: Message) -> Result<(), TransportError> {
        let sender = self
            .outgoing
            .get(&(dest, tag))
            .ok_or_else(|| self.error(dest, tag, TransportErrorKind::NoRoute))?;
        trace!("Rank {} sending {tag:?} message to rank {dest}", self.rank);
        sender
            .send(message)
            .map_err(|_| self.error(dest, tag, TransportErrorKind::Disconnected))
    }

    /// Wait for a message from another worker
    pub fn recv(&self, source: usize, tag: Tag) -> Result<Message, TransportError> {
        let receiver = self
            .incoming
            .get(&(source, tag))
            .ok_or_else(|| self.error(source, tag, TransportErrorKind::NoRoute))?;
        receiver.recv_timeout(self.timeout).map_err(|e| {
            let kind = match e {
                RecvTimeoutError::Timeout => TransportErrorKind::Timeout(self.timeout),
                RecvTimeoutError::Disconnected => TransportErrorKind::Disconnected,
            };
            self.error(source, tag, kind)
        })
    }

    /// Wait for all workers to reach this point
    pub fn barrier(&self) -> Result<(), TransportError> {
        self.barrier
            .wait(self.timeout)
            .map_err(|e| TransportError::Barrier {
                rank: self.rank,
                kind: e,
            })
    }

    /// Give up on collective operations, so that other workers do not wait
    /// for this one at the barrier
    pub fn abort(&self) {
        debug!("Rank {} aborting collective operations", self.rank);
        self.barrier.abort();
    }

    /// Build an error about a point-to-point transfer
    pub(crate) fn error(&self, peer: usize, tag: Tag, kind: TransportErrorKind) -> TransportError {
        TransportError::PointToPoint {
            rank: self.rank,
            peer,
            tag,
            kind,
        }
    }
}
//
impl Drop for Endpoint {
    fn drop(&mut self) {
        // A worker that panics will never reach the barrier again
        if thread::panicking() {
            self.abort();
        }
    }
}

/// Things that can go wrong when exchanging data between workers
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// A point-to-point transfer failed
    #[error("rank {rank} failed to exchange {tag:?} message with rank {peer}: {kind}")]
    PointToPoint {
        /// Rank of the worker that observed the failure
        rank: usize,

        /// Rank of the worker on the other end
        peer: usize,

        /// Kind of message being exchanged
        tag: Tag,

        /// What went wrong
        kind: TransportErrorKind,
    },

    /// Waiting on the collective barrier failed
    #[error("rank {rank} failed to synchronize with other workers: {kind}")]
    Barrier {
        /// Rank of the worker that observed the failure
        rank: usize,

        /// What went wrong
        kind: BarrierError,
    },
}

/// Ways in which a point-to-point transfer can fail
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// The two workers are not supposed to exchange this kind of message
    #[error("no such route")]
    NoRoute,

    /// The other worker is gone
    #[error("peer disconnected")]
    Disconnected,

    /// The other worker did not send anything in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The other worker sent something that does not fit the protocol
    #[error("unexpected message")]
    UnexpectedMessage,
}
