//! Automaton update rule

use crate::grid::Cell;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Largest possible number of live neighbors in a Moore neighborhood
pub const MAX_NEIGHBORS: u8 = 8;

/// Set of live neighbor counts, from 0 to [`MAX_NEIGHBORS`]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NeighborCounts(u16);
//
impl NeighborCounts {
    /// Set up a set from a list of neighbor counts
    ///
    /// # Panics
    ///
    /// If one of the counts is larger than [`MAX_NEIGHBORS`].
    pub fn new(counts: impl IntoIterator<Item = u8>) -> Self {
        let mut result = Self::default();
        for count in counts {
            assert!(count <= MAX_NEIGHBORS, "invalid neighbor count {count}");
            result.insert(count);
        }
        result
    }

    /// Truth that a neighbor count belongs to this set
    #[inline]
    pub fn contains(self, count: u8) -> bool {
        count <= MAX_NEIGHBORS && (self.0 & (1 << count)) != 0
    }

    /// Enumerate the counts from this set in increasing order
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..=MAX_NEIGHBORS).filter(move |&count| self.contains(count))
    }

    /// Add a neighbor count to this set
    fn insert(&mut self, count: u8) {
        self.0 |= 1 << count;
    }
}

/// Life-like automaton rule
///
/// Dead cells become alive if their number of live neighbors is in the
/// `birth` set, and live cells stay alive if their number of live neighbors is
/// in the `survival` set. All other cells die or stay dead.
///
/// Rules are written down using the usual "B3/S23" rulestring notation.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Rule {
    /// Neighbor counts that bring a dead cell to life
    pub birth: NeighborCounts,

    /// Neighbor counts that keep a live cell alive
    pub survival: NeighborCounts,
}
//
impl Rule {
    /// Compute the next state of a cell given its number of live neighbors
    #[inline]
    pub fn next_state(&self, cell: Cell, live_neighbors: u8) -> Cell {
        let counts = match cell {
            Cell::Dead => self.birth,
            Cell::Alive => self.survival,
        };
        Cell::from_alive(counts.contains(live_neighbors))
    }
}
//
impl Default for Rule {
    /// Conway's Game of Life, aka B3/S23
    fn default() -> Self {
        Self {
            birth: NeighborCounts::new([3]),
            survival: NeighborCounts::new([2, 3]),
        }
    }
}
//
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B")?;
        for count in self.birth.iter() {
            write!(f, "{count}")?;
        }
        write!(f, "/S")?;
        for count in self.survival.iter() {
            write!(f, "{count}")?;
        }
        Ok(())
    }
}
//
impl FromStr for Rule {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (birth, survival) = s
            .trim()
            .split_once('/')
            .ok_or(ParseRuleError::MissingSeparator)?;
        Ok(Self {
            birth: parse_counts(birth, 'B')?,
            survival: parse_counts(survival, 'S')?,
        })
    }
}

/// Parse one half of a rulestring, e.g. "B3" or "S23"
fn parse_counts(part: &str, prefix: char) -> Result<NeighborCounts, ParseRuleError> {
    let mut chars = part.chars();
    if !chars
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(&prefix))
    {
        return Err(ParseRuleError::MissingPrefix(prefix));
    }
    let mut counts = NeighborCounts::default();
    for digit in chars {
        match digit.to_digit(10) {
            Some(count) if count <= u32::from(MAX_NEIGHBORS) => counts.insert(count as u8),
            _ => return Err(ParseRuleError::InvalidCount(digit)),
        }
    }
    Ok(counts)
}

/// Things that can go wrong when parsing a rulestring
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseRuleError {
    /// No '/' between the birth and survival parts
    #[error("expected a rule of the form B<digits>/S<digits>, e.g. B3/S23")]
    MissingSeparator,

    /// Birth or survival part does not start with the expected letter
    #[error("expected rule part to start with '{0}'")]
    MissingPrefix(char),

    /// Something other than a neighbor count between 0 and 8
    #[error("{0:?} is not a valid neighbor count (expected a digit from 0 to 8)")]
    InvalidCount(char),
}
