//! Row-wise domain decomposition of the grid

use crate::Error;
use std::ops::Range;

/// Half-open range of global grid rows owned by one worker
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct RowRange {
    /// First owned row
    pub start: usize,

    /// One past the last owned row
    pub end: usize,
}
//
impl RowRange {
    /// Number of owned rows
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Truth that no row is owned
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Owned rows, in a form suitable for slicing grids
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split of a grid into one contiguous [`RowRange`] per worker
///
/// Rows are distributed as evenly as possible: if the number of rows is not a
/// multiple of the number of workers, the first `rows % workers` workers get
/// one extra row.
///
/// The split is a pure function of its inputs, so any worker that knows the
/// grid shape and worker count can work out where everyone's rows are.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Partition {
    /// Shape of the full grid
    shape: [usize; 2],

    /// Number of workers
    num_workers: usize,
}
//
impl Partition {
    /// Split a grid with a certain number of rows and columns across workers
    ///
    /// Fails if there are no workers, or fewer rows than workers, as some
    /// workers would then end up owning nothing.
    pub fn new(total_rows: usize, total_cols: usize, num_workers: usize) -> Result<Self, Error> {
        if num_workers < 1 || total_rows < num_workers {
            return Err(Error::InvalidTopology {
                rows: total_rows,
                workers: num_workers,
            });
        }
        Ok(Self {
            shape: [total_rows, total_cols],
            num_workers,
        })
    }

    /// Shape of the full grid
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of workers
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Rows owned by a certain worker
    ///
    /// # Panics
    ///
    /// If `rank` is not smaller than the number of workers.
    pub fn range(&self, rank: usize) -> RowRange {
        assert!(rank < self.num_workers, "no worker with rank {rank}");
        let chunk_len = self.shape[0] / self.num_workers;
        let remainder = self.shape[0] % self.num_workers;
        let start = rank * chunk_len + rank.min(remainder);
        let end = start + chunk_len + usize::from(rank < remainder);
        RowRange { start, end }
    }

    /// Rows owned by every worker, in rank order
    pub fn ranges(&self) -> impl Iterator<Item = RowRange> + '_ {
        (0..self.num_workers).map(|rank| self.range(rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_rows_evenly() {
        for total_rows in 1..=40 {
            for num_workers in 1..=total_rows {
                let partition = Partition::new(total_rows, 7, num_workers).unwrap();
                let ranges = partition.ranges().collect::<Vec<_>>();
                assert_eq!(ranges.len(), num_workers);

                // Ranges must tile [0, total_rows) in order
                let mut next_row = 0;
                for range in &ranges {
                    assert_eq!(range.start, next_row);
                    assert!(!range.is_empty());
                    next_row = range.end;
                }
                assert_eq!(next_row, total_rows);

                // Sizes differ by at most one, larger ranges come first
                let lens = ranges.iter().map(RowRange::len).collect::<Vec<_>>();
                let min_len = *lens.iter().min().unwrap();
                let max_len = *lens.iter().max().unwrap();
                assert!(max_len - min_len <= 1);
                assert!(lens.windows(2).all(|pair| pair[0] >= pair[1]));
                let remainder = total_rows % num_workers;
                assert_eq!(lens.iter().filter(|&&len| len == max_len).count(), {
                    if remainder == 0 {
                        num_workers
                    } else {
                        remainder
                    }
                });
            }
        }
    }

    #[test]
    fn five_rows_two_workers() {
        let partition = Partition::new(5, 5, 2).unwrap();
        assert_eq!(partition.range(0), RowRange { start: 0, end: 3 });
        assert_eq!(partition.range(1), RowRange { start: 3, end: 5 });
        assert_eq!(partition.shape(), [5, 5]);
        assert_eq!(partition.num_workers(), 2);
    }

    #[test]
    fn deterministic() {
        let first = Partition::new(1000, 3, 7).unwrap();
        let second = Partition::new(1000, 3, 7).unwrap();
        assert!(first.ranges().eq(second.ranges()));
    }

    #[test]
    fn invalid_topology() {
        assert!(matches!(
            Partition::new(10, 10, 0),
            Err(Error::InvalidTopology {
                rows: 10,
                workers: 0
            })
        ));
        assert!(matches!(
            Partition::new(3, 10, 4),
            Err(Error::InvalidTopology {
                rows: 3,
                workers: 4
            })
        ));
        assert!(matches!(
            Partition::new(0, 0, 1),
            Err(Error::InvalidTopology { .. })
        ));
    }
}
